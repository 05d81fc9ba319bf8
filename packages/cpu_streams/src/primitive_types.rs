use derive_more::derive::Display;

/// Identifies a specific logical processor.
///
/// This will match the numeric identifier used by standard tooling of the operating system.
///
/// It is important to highlight that the values used are not guaranteed to be sequential/contiguous
/// or to start from zero (aspects that are also not guaranteed by operating system tooling).
pub type ProcessorId = u32;

/// Identifies a physical processor package (socket).
pub type SocketId = u32;

/// Identifies a physical core within the system.
///
/// Both logical processors of a hyperthreaded core carry the same core ID.
pub type CoreId = u32;

/// Identifies the hyperthread sharing group of a logical processor.
///
/// The two logical processors that share one physical performance core carry the same group ID.
/// Processors without a hyperthread twin are the sole member of their group.
pub type GroupId = u32;

/// Classifies a logical processor on the performance-efficiency axis.
///
/// The idea behind this classification is that slower processors tend to be more energy-efficient,
/// so we distinguish processors that should be preferred to get processing done fast from
/// processors that should be preferred to conserve energy, plus the secondary hyperthreads that
/// share execution resources with a performance processor.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CoreClass {
    /// A physical core with private level-2 cache, optimized for performance.
    Performance,

    /// A physical core sharing level-2 cache with its cluster siblings, optimized for
    /// energy efficiency at the expense of per-core throughput.
    Efficient,

    /// The second logical processor of a hyperthreaded performance core, sharing physical
    /// execution resources with the primary logical processor.
    HyperthreadSecondary,

    /// Classification was not available from the operating system.
    ///
    /// This occurs when topology detection degrades to counting processors without being able
    /// to inspect their relationships. Callers must tolerate this class appearing on every
    /// processor of a degenerate topology.
    Unknown,
}

/// Selects which logical processors an acquisition applies to.
///
/// Processors classified as [`CoreClass::Unknown`] match only [`CoreClassFilter::Any`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CoreClassFilter {
    /// Matches every logical processor regardless of classification.
    Any,

    /// Matches only [`CoreClass::Performance`] processors.
    Performance,

    /// Matches only [`CoreClass::Efficient`] processors.
    Efficient,

    /// Matches only [`CoreClass::HyperthreadSecondary`] processors.
    HyperthreadSecondary,
}

impl CoreClassFilter {
    /// Whether a processor of the given class is selected by this filter.
    #[inline]
    #[must_use]
    pub fn matches(self, class: CoreClass) -> bool {
        match self {
            Self::Any => true,
            Self::Performance => class == CoreClass::Performance,
            Self::Efficient => class == CoreClass::Efficient,
            Self::HyperthreadSecondary => class == CoreClass::HyperthreadSecondary,
        }
    }
}
