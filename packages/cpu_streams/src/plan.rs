//! Stream plan rows and the flattened summary record consumed by executors.

use nonempty::NonEmpty;

use crate::CoreClass;

/// One row of a stream plan: a group of identical streams on one core class.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct StreamPlanRow {
    /// The core class the streams of this row run on.
    pub core_class: CoreClass,

    /// Number of identical streams described by this row.
    pub stream_count: usize,

    /// Threads assigned to each stream of this row.
    pub threads_per_stream: usize,
}

impl StreamPlanRow {
    /// Creates a plan row.
    #[must_use]
    pub fn new(core_class: CoreClass, stream_count: usize, threads_per_stream: usize) -> Self {
        Self {
            core_class,
            stream_count,
            threads_per_stream,
        }
    }

    /// Total threads described by this row.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.stream_count.saturating_mul(self.threads_per_stream)
    }
}

/// The flattened summary of a stream plan, consumed by the executor.
///
/// Derived deterministically from a plan by [`parse_plan()`]; has no lifecycle of its own and
/// is recomputed per request.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct StreamCfg {
    /// Total number of streams across all rows.
    pub num_streams: usize,

    /// Total number of threads across all rows.
    pub num_threads: usize,

    /// Streams running on performance cores.
    pub performance_streams: usize,

    /// Streams running on secondary hyperthreads of performance cores.
    pub performance_secondary_streams: usize,

    /// Streams running on efficient cores.
    pub efficient_streams: usize,

    /// Threads per stream on performance cores (width of the first performance row).
    pub threads_per_performance_stream: usize,

    /// Threads per stream on efficient cores (width of the first efficient row).
    pub threads_per_efficient_stream: usize,

    /// Index in the logical processor ID space at which efficient-core IDs begin.
    ///
    /// Zero when the plan uses no efficient cores. Used to translate class-relative stream
    /// indices into absolute processor ranges.
    pub efficient_core_offset: usize,
}

/// Flattens a stream plan into the summary record consumed by the executor.
///
/// Pure and total: every plan produced by [`plan_streams()`][crate::plan_streams] maps to
/// exactly one [`StreamCfg`], with no error path. Rows on unclassified processors count
/// towards the performance totals, since the planner treats unclassified capacity as
/// performance-equivalent.
#[must_use]
pub fn parse_plan(plan: &NonEmpty<StreamPlanRow>) -> StreamCfg {
    let mut cfg = StreamCfg::default();

    for row in plan {
        cfg.num_streams = cfg.num_streams.saturating_add(row.stream_count);
        cfg.num_threads = cfg.num_threads.saturating_add(row.thread_count());

        match row.core_class {
            CoreClass::Performance | CoreClass::Unknown => {
                cfg.performance_streams = cfg.performance_streams.saturating_add(row.stream_count);

                if cfg.threads_per_performance_stream == 0 {
                    cfg.threads_per_performance_stream = row.threads_per_stream;
                }
            }
            CoreClass::HyperthreadSecondary => {
                cfg.performance_secondary_streams = cfg
                    .performance_secondary_streams
                    .saturating_add(row.stream_count);
            }
            CoreClass::Efficient => {
                cfg.efficient_streams = cfg.efficient_streams.saturating_add(row.stream_count);

                if cfg.threads_per_efficient_stream == 0 {
                    cfg.threads_per_efficient_stream = row.threads_per_stream;
                }
            }
        }
    }

    // Efficient-core logical IDs sit above every performance-core logical ID (primary and
    // secondary hyperthreads alike), so the planned non-efficient thread total marks where
    // the efficient range begins.
    if cfg.efficient_streams > 0 {
        cfg.efficient_core_offset = plan
            .iter()
            .filter(|row| row.core_class != CoreClass::Efficient)
            .map(StreamPlanRow::thread_count)
            .sum();
    }

    cfg
}

#[cfg(test)]
mod tests {
    use nonempty::nonempty;

    use super::*;

    #[test]
    fn sums_per_class() {
        let plan = nonempty![
            StreamPlanRow::new(CoreClass::Performance, 3, 2),
            StreamPlanRow::new(CoreClass::Performance, 1, 4),
            StreamPlanRow::new(CoreClass::Efficient, 2, 2),
            StreamPlanRow::new(CoreClass::HyperthreadSecondary, 2, 2),
        ];

        let cfg = parse_plan(&plan);

        assert_eq!(cfg.num_streams, 8);
        assert_eq!(cfg.num_threads, 3 * 2 + 4 + 2 * 2 + 2 * 2);
        assert_eq!(cfg.performance_streams, 4);
        assert_eq!(cfg.performance_secondary_streams, 2);
        assert_eq!(cfg.efficient_streams, 2);
        assert_eq!(cfg.threads_per_performance_stream, 2);
        assert_eq!(cfg.threads_per_efficient_stream, 2);
    }

    #[test]
    fn efficient_offset_counts_non_efficient_threads() {
        let plan = nonempty![
            StreamPlanRow::new(CoreClass::Performance, 4, 2),
            StreamPlanRow::new(CoreClass::Efficient, 2, 4),
        ];

        let cfg = parse_plan(&plan);

        assert_eq!(cfg.efficient_core_offset, 8);
    }

    #[test]
    fn offset_is_zero_without_efficient_rows() {
        let plan = nonempty![StreamPlanRow::new(CoreClass::Performance, 8, 1)];

        let cfg = parse_plan(&plan);

        assert_eq!(cfg.efficient_core_offset, 0);
        assert_eq!(cfg.efficient_streams, 0);
        assert_eq!(cfg.threads_per_efficient_stream, 0);
    }

    #[test]
    fn unknown_rows_count_as_performance() {
        let plan = nonempty![StreamPlanRow::new(CoreClass::Unknown, 2, 3)];

        let cfg = parse_plan(&plan);

        assert_eq!(cfg.performance_streams, 2);
        assert_eq!(cfg.threads_per_performance_stream, 3);
        assert_eq!(cfg.num_threads, 6);
    }

    #[test]
    fn parse_is_deterministic_and_idempotent() {
        let plan = nonempty![
            StreamPlanRow::new(CoreClass::Performance, 2, 4),
            StreamPlanRow::new(CoreClass::Efficient, 1, 3),
        ];

        assert_eq!(parse_plan(&plan), parse_plan(&plan));
    }
}
