//! Normalization of raw platform relationship records into the detection tables.

use foldhash::{HashMap, HashMapExt};

use crate::pal::{RawTopology, TopologyRelation};
use crate::{
    CoreClass, CpuMappingTable, LogicalProcessor, ProcessorId, ProcessorTypeRow,
    ProcessorTypeTable, SocketId,
};

/// The detected topology: the aggregated type table and the per-processor mapping.
///
/// Detection is a pure function of the raw platform answer, so two detections over the
/// same records always agree.
#[derive(Clone, Debug)]
pub(crate) struct Topology {
    pub(crate) proc_type_table: ProcessorTypeTable,
    pub(crate) cpu_mapping: CpuMappingTable,
}

/// Mutable per-processor state while classification is in progress.
#[derive(Clone, Copy, Debug)]
struct PendingProcessor {
    socket_id: SocketId,
    core_id: Option<u32>,
    core_class: Option<CoreClass>,
    group_id: Option<u32>,
}

impl Topology {
    /// Classifies every logical processor in the raw records.
    ///
    /// Classification follows what the relationship records can prove:
    ///
    /// * A core with two members is a hyperthreaded performance core. The lower
    ///   processor ID is the primary, the higher one the hyperthread secondary.
    /// * A processor alone behind a level-2 cache is a performance core with private L2.
    /// * Processors sharing a level-2 cache, none of which is already classified, form
    ///   an efficient-core cluster.
    /// * Anything left over stays unclassified rather than being guessed at.
    ///
    /// Records that prove nothing (no relations at all) produce a degenerate topology
    /// carrying only the processor count.
    pub(crate) fn from_raw(raw: &RawTopology) -> Self {
        if raw.relations.is_empty() {
            return Self::unclassified(raw.processor_count);
        }

        let mut pending: HashMap<ProcessorId, PendingProcessor> = HashMap::new();

        let known_ids = raw.relations.iter().flat_map(|relation| match relation {
            TopologyRelation::Package { processors }
            | TopologyRelation::Core { processors }
            | TopologyRelation::L2Cache { processors } => processors.iter().copied(),
        });

        for id in known_ids {
            pending.entry(id).or_insert(PendingProcessor {
                socket_id: 0,
                core_id: None,
                core_class: None,
                group_id: None,
            });
        }

        // The platform may know of processors no relation mentions. They still get
        // records, just unclassified ones.
        for id in 0..raw.processor_count {
            pending.entry(id as ProcessorId).or_insert(PendingProcessor {
                socket_id: 0,
                core_id: None,
                core_class: None,
                group_id: None,
            });
        }

        let mut next_socket: SocketId = 0;
        let mut next_core: u32 = 0;
        let mut next_group: u32 = 0;

        // Sockets are numbered in package enumeration order.
        for relation in &raw.relations {
            let TopologyRelation::Package { processors } = relation else {
                continue;
            };

            for id in processors {
                if let Some(record) = pending.get_mut(id) {
                    record.socket_id = next_socket;
                }
            }

            next_socket += 1;
        }

        // Core records settle physical core membership and identify hyperthread twins.
        for relation in &raw.relations {
            let TopologyRelation::Core { processors } = relation else {
                continue;
            };

            if processors.is_empty() {
                continue;
            }

            let core_id = next_core;
            next_core += 1;

            if processors.len() == 2 {
                let primary = processors.iter().copied().min().unwrap_or_default();
                let group_id = next_group;
                next_group += 1;

                for &id in processors {
                    if let Some(record) = pending.get_mut(&id) {
                        record.core_id = Some(core_id);
                        record.group_id = Some(group_id);
                        record.core_class = Some(if id == primary {
                            CoreClass::Performance
                        } else {
                            CoreClass::HyperthreadSecondary
                        });
                    }
                }
            } else {
                // Class comes later, from the level-2 cache record.
                for &id in processors {
                    if let Some(record) = pending.get_mut(&id) {
                        record.core_id = Some(core_id);
                    }
                }
            }
        }

        // Level-2 cache records classify whatever the core records left open.
        for relation in &raw.relations {
            let TopologyRelation::L2Cache { processors } = relation else {
                continue;
            };

            let unsettled: Vec<ProcessorId> = processors
                .iter()
                .copied()
                .filter(|id| {
                    pending
                        .get(id)
                        .is_some_and(|record| record.core_class.is_none())
                })
                .collect();

            match unsettled.as_slice() {
                [] => {}
                [lone] => {
                    // A private L2 marks a performance core.
                    if let Some(record) = pending.get_mut(lone) {
                        record.core_class = Some(CoreClass::Performance);
                        record.group_id = Some(next_group);
                        next_group += 1;
                    }
                }
                cluster => {
                    for id in cluster {
                        if let Some(record) = pending.get_mut(id) {
                            record.core_class = Some(CoreClass::Efficient);
                            record.group_id = Some(next_group);
                            next_group += 1;
                        }
                    }
                }
            }
        }

        let mut ids: Vec<ProcessorId> = pending.keys().copied().collect();
        ids.sort_unstable();

        let mut processors = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(record) = pending.get(&id) else {
                continue;
            };

            let core_id = record.core_id.unwrap_or_else(|| {
                let core_id = next_core;
                next_core += 1;
                core_id
            });

            let group_id = record.group_id.unwrap_or_else(|| {
                let group_id = next_group;
                next_group += 1;
                group_id
            });

            processors.push(LogicalProcessor {
                id,
                socket_id: record.socket_id,
                core_id,
                core_class: record.core_class.unwrap_or(CoreClass::Unknown),
                group_id,
            });
        }

        let proc_type_table = aggregate(&processors, next_socket.max(1) as usize);

        Self {
            proc_type_table,
            cpu_mapping: CpuMappingTable::new(processors),
        }
    }

    /// A degenerate topology: a known processor count and nothing else.
    fn unclassified(processor_count: usize) -> Self {
        let processors: Vec<LogicalProcessor> = (0..processor_count)
            .map(|id| LogicalProcessor {
                id: id as ProcessorId,
                socket_id: 0,
                core_id: id as u32,
                core_class: CoreClass::Unknown,
                group_id: id as u32,
            })
            .collect();

        Self {
            proc_type_table: ProcessorTypeTable::unclassified(processor_count),
            cpu_mapping: CpuMappingTable::new(processors),
        }
    }
}

/// Counts processors per class per socket and folds the counts into the type table.
///
/// Also used to recount after reservations, over the subset of unreserved processors.
pub(crate) fn aggregate(
    processors: &[LogicalProcessor],
    socket_count: usize,
) -> ProcessorTypeTable {
    let mut rows: Vec<SocketCounts> = vec![SocketCounts::default(); socket_count];

    for processor in processors {
        let Some(counts) = rows.get_mut(processor.socket_id as usize) else {
            continue;
        };

        counts.all += 1;

        match processor.core_class {
            CoreClass::Performance => counts.performance += 1,
            CoreClass::Efficient => counts.efficient += 1,
            CoreClass::HyperthreadSecondary => counts.hyperthread += 1,
            CoreClass::Unknown => {}
        }
    }

    // A socket of entirely unclassified processors stays degenerate rather than
    // claiming a classification it does not have.
    let socket_rows: Vec<ProcessorTypeRow> = rows
        .iter()
        .map(|counts| {
            if counts.performance + counts.efficient + counts.hyperthread == counts.all {
                ProcessorTypeRow::from_class_counts(
                    counts.performance,
                    counts.efficient,
                    counts.hyperthread,
                )
            } else {
                let mut row = ProcessorTypeRow::from_class_counts(
                    counts.performance,
                    counts.efficient,
                    counts.hyperthread,
                );
                row.all_count = counts.all;
                row
            }
        })
        .collect();

    ProcessorTypeTable::from_socket_rows(socket_rows)
}

#[derive(Clone, Copy, Debug, Default)]
struct SocketCounts {
    all: usize,
    performance: usize,
    efficient: usize,
    hyperthread: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(processor_count: usize, relations: Vec<TopologyRelation>) -> RawTopology {
        RawTopology {
            processor_count,
            relations,
        }
    }

    fn class_of(topology: &Topology, id: ProcessorId) -> CoreClass {
        topology
            .cpu_mapping
            .get(id)
            .map(|p| p.core_class)
            .expect("processor must exist")
    }

    #[test]
    fn no_relations_is_degenerate() {
        let topology = Topology::from_raw(&raw(4, Vec::new()));

        assert_eq!(topology.proc_type_table.summary().all_count, 4);
        assert_eq!(topology.proc_type_table.summary().unclassified_count(), 4);
        assert_eq!(topology.cpu_mapping.len(), 4);
        assert_eq!(class_of(&topology, 0), CoreClass::Unknown);
    }

    #[test]
    fn two_member_core_makes_hyperthread_twins() {
        let topology = Topology::from_raw(&raw(
            2,
            vec![TopologyRelation::Core {
                processors: vec![0, 1],
            }],
        ));

        assert_eq!(class_of(&topology, 0), CoreClass::Performance);
        assert_eq!(class_of(&topology, 1), CoreClass::HyperthreadSecondary);
        assert_eq!(topology.cpu_mapping.hyperthread_twin(0), Some(1));

        let summary = topology.proc_type_table.summary();
        assert_eq!(summary.performance_count, 1);
        assert_eq!(summary.hyperthread_count, 1);
    }

    #[test]
    fn lower_id_is_the_primary_regardless_of_record_order() {
        let topology = Topology::from_raw(&raw(
            2,
            vec![TopologyRelation::Core {
                processors: vec![1, 0],
            }],
        ));

        assert_eq!(class_of(&topology, 0), CoreClass::Performance);
        assert_eq!(class_of(&topology, 1), CoreClass::HyperthreadSecondary);
    }

    #[test]
    fn private_l2_marks_a_performance_core() {
        let topology = Topology::from_raw(&raw(
            1,
            vec![
                TopologyRelation::Core {
                    processors: vec![0],
                },
                TopologyRelation::L2Cache {
                    processors: vec![0],
                },
            ],
        ));

        assert_eq!(class_of(&topology, 0), CoreClass::Performance);
        assert_eq!(topology.proc_type_table.summary().performance_count, 1);
    }

    #[test]
    fn shared_l2_marks_an_efficient_cluster() {
        let topology = Topology::from_raw(&raw(
            4,
            vec![
                TopologyRelation::Core {
                    processors: vec![0],
                },
                TopologyRelation::Core {
                    processors: vec![1],
                },
                TopologyRelation::Core {
                    processors: vec![2],
                },
                TopologyRelation::Core {
                    processors: vec![3],
                },
                TopologyRelation::L2Cache {
                    processors: vec![0, 1, 2, 3],
                },
            ],
        ));

        for id in 0..4 {
            assert_eq!(class_of(&topology, id), CoreClass::Efficient);
            assert_eq!(topology.cpu_mapping.hyperthread_twin(id), None);
        }

        assert_eq!(topology.proc_type_table.summary().efficient_count, 4);
    }

    #[test]
    fn hyperthread_twins_are_not_reclassified_by_their_l2() {
        // Twins share the core's L2 with each other. That must not turn them efficient.
        let topology = Topology::from_raw(&raw(
            2,
            vec![
                TopologyRelation::Core {
                    processors: vec![0, 1],
                },
                TopologyRelation::L2Cache {
                    processors: vec![0, 1],
                },
            ],
        ));

        assert_eq!(class_of(&topology, 0), CoreClass::Performance);
        assert_eq!(class_of(&topology, 1), CoreClass::HyperthreadSecondary);
        assert_eq!(topology.proc_type_table.summary().efficient_count, 0);
    }

    #[test]
    fn hybrid_layout_classifies_every_kind() {
        // Two hyperthreaded performance cores (0+1, 2+3) and a four-way efficient cluster.
        let topology = Topology::from_raw(&raw(
            8,
            vec![
                TopologyRelation::Package {
                    processors: (0..8).collect(),
                },
                TopologyRelation::Core {
                    processors: vec![0, 1],
                },
                TopologyRelation::Core {
                    processors: vec![2, 3],
                },
                TopologyRelation::Core {
                    processors: vec![4],
                },
                TopologyRelation::Core {
                    processors: vec![5],
                },
                TopologyRelation::Core {
                    processors: vec![6],
                },
                TopologyRelation::Core {
                    processors: vec![7],
                },
                TopologyRelation::L2Cache {
                    processors: vec![4, 5, 6, 7],
                },
            ],
        ));

        let summary = topology.proc_type_table.summary();
        assert_eq!(summary.all_count, 8);
        assert_eq!(summary.performance_count, 2);
        assert_eq!(summary.hyperthread_count, 2);
        assert_eq!(summary.efficient_count, 4);
        assert!(summary.is_classified());

        // Twins share a core and a group; efficient cores have their own.
        let p0 = topology.cpu_mapping.get(0).unwrap();
        let p1 = topology.cpu_mapping.get(1).unwrap();
        assert_eq!(p0.core_id, p1.core_id);
        assert_eq!(p0.group_id, p1.group_id);

        let p4 = topology.cpu_mapping.get(4).unwrap();
        let p5 = topology.cpu_mapping.get(5).unwrap();
        assert_ne!(p4.group_id, p5.group_id);
    }

    #[test]
    fn packages_number_sockets_in_enumeration_order() {
        let topology = Topology::from_raw(&raw(
            4,
            vec![
                TopologyRelation::Package {
                    processors: vec![0, 1],
                },
                TopologyRelation::Package {
                    processors: vec![2, 3],
                },
                TopologyRelation::Core {
                    processors: vec![0, 1],
                },
                TopologyRelation::Core {
                    processors: vec![2, 3],
                },
            ],
        ));

        assert_eq!(topology.cpu_mapping.get(0).unwrap().socket_id, 0);
        assert_eq!(topology.cpu_mapping.get(3).unwrap().socket_id, 1);

        assert_eq!(topology.proc_type_table.socket_count(), 2);
        let socket0 = topology.proc_type_table.socket_row(0).unwrap();
        assert_eq!(socket0.performance_count, 1);
        assert_eq!(socket0.hyperthread_count, 1);
    }

    #[test]
    fn processors_outside_all_relations_stay_unknown() {
        // The platform counts 4 processors but only explains 2 of them.
        let topology = Topology::from_raw(&raw(
            4,
            vec![TopologyRelation::Core {
                processors: vec![0, 1],
            }],
        ));

        assert_eq!(topology.cpu_mapping.len(), 4);
        assert_eq!(class_of(&topology, 2), CoreClass::Unknown);
        assert_eq!(class_of(&topology, 3), CoreClass::Unknown);

        let summary = topology.proc_type_table.summary();
        assert_eq!(summary.all_count, 4);
        assert_eq!(summary.unclassified_count(), 2);
        assert!(!summary.is_classified());
    }
}
