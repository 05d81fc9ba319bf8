use std::fmt::Debug;

use crate::ProcessorId;

/// The raw answer of an operating system topology query, before normalization into the
/// processor-type and CPU mapping tables.
///
/// An empty relation list with a non-zero processor count is the degraded answer of a
/// platform that can count processors but cannot inspect their relationships.
#[derive(Clone, Debug, Default)]
pub(crate) struct RawTopology {
    /// Number of logical processors the platform reports, independent of relations.
    pub(crate) processor_count: usize,

    /// The relationship records, in the platform's natural enumeration order.
    pub(crate) relations: Vec<TopologyRelation>,
}

/// One relationship record between logical processors, mirroring what operating systems
/// expose about packages, physical cores and the level-2 cache.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum TopologyRelation {
    /// A processor package (socket) and every logical processor it contains.
    Package { processors: Vec<ProcessorId> },

    /// A physical core. Two members mean hyperthreading is present on this core.
    Core { processors: Vec<ProcessorId> },

    /// A level-2 cache and the logical processors sharing it. A single sharer marks a
    /// performance core with private L2; multiple sharers mark an efficient-core cluster.
    L2Cache { processors: Vec<ProcessorId> },
}

/// The operating system facade used by topology detection.
///
/// One implementation exists per supported operating system, plus a fallback for everything
/// else and fake/mock implementations for testing.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Queries the processor topology.
    ///
    /// Never fails: a platform that cannot answer returns a count-only [`RawTopology`]
    /// (possibly with a zero count), for which detection degrades gracefully.
    fn raw_topology(&self) -> RawTopology;
}
