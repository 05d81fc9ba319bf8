//! Aggregated per-class processor counts, cluster-wide and per socket.

use crate::SocketId;

/// Per-class logical processor counts for one scope (the whole cluster or a single socket).
///
/// For a classified topology, `all_count` always equals the sum of the three class counts.
/// A degenerate topology (classification unavailable) carries only `all_count`, with every
/// class count zero.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct ProcessorTypeRow {
    /// Total logical processors in this scope.
    pub all_count: usize,

    /// Physical performance cores (one logical processor each; the hyperthread twin is
    /// counted separately under `hyperthread_count`).
    pub performance_count: usize,

    /// Efficient cores.
    pub efficient_count: usize,

    /// Secondary hyperthread logical processors of performance cores.
    pub hyperthread_count: usize,
}

impl ProcessorTypeRow {
    /// Creates a row from per-class counts, deriving the total.
    #[must_use]
    pub fn from_class_counts(
        performance_count: usize,
        efficient_count: usize,
        hyperthread_count: usize,
    ) -> Self {
        Self {
            all_count: performance_count
                .saturating_add(efficient_count)
                .saturating_add(hyperthread_count),
            performance_count,
            efficient_count,
            hyperthread_count,
        }
    }

    /// Creates a degenerate row carrying only the total processor count.
    ///
    /// Used when the operating system query could not classify processors.
    #[must_use]
    pub fn unclassified(all_count: usize) -> Self {
        Self {
            all_count,
            performance_count: 0,
            efficient_count: 0,
            hyperthread_count: 0,
        }
    }

    /// Logical processors in this scope that no class count accounts for.
    ///
    /// Non-zero only for degenerate rows.
    #[must_use]
    pub fn unclassified_count(&self) -> usize {
        self.all_count
            .saturating_sub(self.performance_count)
            .saturating_sub(self.efficient_count)
            .saturating_sub(self.hyperthread_count)
    }

    /// Whether every logical processor in this scope has a known class.
    #[must_use]
    pub fn is_classified(&self) -> bool {
        self.all_count > 0 && self.unclassified_count() == 0
    }

    fn checked_add(&self, other: &Self) -> Self {
        Self {
            all_count: self.all_count.saturating_add(other.all_count),
            performance_count: self.performance_count.saturating_add(other.performance_count),
            efficient_count: self.efficient_count.saturating_add(other.efficient_count),
            hyperthread_count: self.hyperthread_count.saturating_add(other.hyperthread_count),
        }
    }
}

/// The aggregated processor-type matrix of a topology.
///
/// The summary row covers every socket combined. When the system has more than one socket,
/// one additional row per socket describes that socket alone and the summary row equals the
/// element-wise sum of the socket rows.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessorTypeTable {
    summary: ProcessorTypeRow,
    sockets: Vec<ProcessorTypeRow>,
}

impl ProcessorTypeTable {
    /// Builds a table from per-socket rows, deriving the summary row.
    ///
    /// With zero or one socket rows the table has no per-socket breakdown, matching a
    /// single-socket system where the summary row is the only row.
    #[must_use]
    pub fn from_socket_rows(sockets: Vec<ProcessorTypeRow>) -> Self {
        if sockets.len() <= 1 {
            let summary = sockets.first().copied().unwrap_or_default();
            return Self {
                summary,
                sockets: Vec::new(),
            };
        }

        let summary = sockets
            .iter()
            .fold(ProcessorTypeRow::default(), |acc, row| acc.checked_add(row));

        Self { summary, sockets }
    }

    /// Builds a degenerate single-row table carrying only a total processor count.
    #[must_use]
    pub fn unclassified(all_count: usize) -> Self {
        Self {
            summary: ProcessorTypeRow::unclassified(all_count),
            sockets: Vec::new(),
        }
    }

    /// The cluster-wide summary row.
    #[cfg_attr(test, mutants::skip)] // Trivial accessor, do not waste time on mutation.
    #[inline]
    #[must_use]
    pub fn summary(&self) -> &ProcessorTypeRow {
        &self.summary
    }

    /// Per-socket rows, empty when the system has a single socket.
    #[cfg_attr(test, mutants::skip)] // Trivial accessor, do not waste time on mutation.
    #[inline]
    #[must_use]
    pub fn socket_rows(&self) -> &[ProcessorTypeRow] {
        &self.sockets
    }

    /// The row describing one socket.
    ///
    /// For a single-socket system, socket 0 resolves to the summary row.
    #[must_use]
    pub fn socket_row(&self, socket: SocketId) -> Option<&ProcessorTypeRow> {
        if self.sockets.is_empty() {
            return (socket == 0).then_some(&self.summary);
        }

        self.sockets.get(socket as usize)
    }

    /// Number of sockets described by the table.
    #[must_use]
    pub fn socket_count(&self) -> usize {
        self.sockets.len().max(1)
    }
}
