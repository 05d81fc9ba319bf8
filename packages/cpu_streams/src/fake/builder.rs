//! Builders for configuring fake processor topologies.

use std::num::NonZero;

use crate::pal::{RawTopology, TopologyRelation};

/// How many efficient cores share one level-2 cache in the layouts we fabricate.
///
/// Matches the cluster size of contemporary hybrid processors.
const EFFICIENT_CLUSTER_SIZE: usize = 4;

/// Describes one processor package (socket) of a fake topology.
///
/// A socket holds zero or more performance cores, optionally hyperthreaded, and zero or
/// more efficient cores. Efficient cores are grouped into level-2 cache clusters of four,
/// the way real hybrid processors arrange them.
#[derive(Clone, Debug)]
pub struct SocketBuilder {
    performance_cores: usize,
    hyperthreading: bool,
    efficient_cores: usize,
}

impl Default for SocketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketBuilder {
    /// Creates a socket with no cores. Add some before consuming the builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            performance_cores: 0,
            hyperthreading: false,
            efficient_cores: 0,
        }
    }

    /// Sets the number of performance cores on this socket.
    #[must_use]
    pub fn performance_cores(mut self, count: usize) -> Self {
        self.performance_cores = count;
        self
    }

    /// Enables or disables hyperthreading on this socket's performance cores.
    ///
    /// Hyperthreaded performance cores expose two logical processors each. Efficient
    /// cores are never hyperthreaded.
    #[must_use]
    pub fn hyperthreading(mut self, enabled: bool) -> Self {
        self.hyperthreading = enabled;
        self
    }

    /// Sets the number of efficient cores on this socket.
    #[must_use]
    pub fn efficient_cores(mut self, count: usize) -> Self {
        self.efficient_cores = count;
        self
    }

    fn processor_count(&self) -> usize {
        let per_performance_core = if self.hyperthreading { 2 } else { 1 };

        self.performance_cores
            .saturating_mul(per_performance_core)
            .saturating_add(self.efficient_cores)
    }
}

/// Builder for configuring a fake processor topology.
///
/// # Construction modes
///
/// Quick mode via [`from_performance_cores()`][Self::from_performance_cores] fabricates a
/// single socket of plain performance cores. Custom mode via [`new()`][Self::new] +
/// [`socket()`][Self::socket] composes arbitrary hybrid and multi-socket layouts.
///
/// Logical processor identifiers are assigned sequentially across sockets in the order
/// the sockets are added. A hyperthreaded core's two processors receive adjacent
/// identifiers, the lower one being the primary.
///
/// # Panics
///
/// Consuming a builder that describes zero logical processors panics, as no real
/// machine looks like that.
#[derive(Clone, Debug, Default)]
pub struct TopologyBuilder {
    sockets: Vec<SocketBuilder>,
}

impl TopologyBuilder {
    /// Creates an empty topology builder in custom mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sockets: Vec::new(),
        }
    }

    /// Creates a single-socket topology of plain performance cores.
    ///
    /// One logical processor per core, no hyperthreading, no efficient cores.
    #[must_use]
    pub fn from_performance_cores(count: NonZero<usize>) -> Self {
        Self::new().socket(SocketBuilder::new().performance_cores(count.get()))
    }

    /// Adds a socket to the topology.
    #[must_use]
    pub fn socket(mut self, socket: SocketBuilder) -> Self {
        self.sockets.push(socket);
        self
    }

    /// Fabricates the raw topology the fake platform will report.
    pub(crate) fn build_raw(&self) -> RawTopology {
        let processor_count: usize = self
            .sockets
            .iter()
            .map(SocketBuilder::processor_count)
            .sum();

        assert!(
            processor_count > 0,
            "a fake topology must have at least one logical processor"
        );

        let mut relations = Vec::new();
        let mut next_id: u32 = 0;

        for socket in &self.sockets {
            let socket_first_id = next_id;

            for _ in 0..socket.performance_cores {
                if socket.hyperthreading {
                    relations.push(TopologyRelation::Core {
                        processors: vec![next_id, next_id + 1],
                    });
                    next_id += 2;
                } else {
                    // A single-threaded core with a private level-2 cache.
                    relations.push(TopologyRelation::Core {
                        processors: vec![next_id],
                    });
                    relations.push(TopologyRelation::L2Cache {
                        processors: vec![next_id],
                    });
                    next_id += 1;
                }
            }

            let mut cluster: Vec<u32> = Vec::with_capacity(EFFICIENT_CLUSTER_SIZE);

            for _ in 0..socket.efficient_cores {
                relations.push(TopologyRelation::Core {
                    processors: vec![next_id],
                });
                cluster.push(next_id);
                next_id += 1;

                if cluster.len() == EFFICIENT_CLUSTER_SIZE {
                    relations.push(TopologyRelation::L2Cache {
                        processors: std::mem::take(&mut cluster),
                    });
                }
            }

            if !cluster.is_empty() {
                relations.push(TopologyRelation::L2Cache {
                    processors: cluster,
                });
            }

            relations.push(TopologyRelation::Package {
                processors: (socket_first_id..next_id).collect(),
            });
        }

        RawTopology {
            processor_count,
            relations,
        }
    }
}
