//! Heuristic default for threads-per-stream when the caller supplies none.

use crate::ProcessorTypeTable;

/// Workloads whose largest weight tensor holds fewer elements than this are considered small
/// and prefer fewer threads per stream, to keep parallelization overhead from dominating the
/// compute.
///
/// The value is an empirically chosen tuning constant, not a correctness invariant. Callers
/// with better knowledge of their workload should pass an explicit preferred thread count
/// instead of relying on the heuristic.
pub const SMALL_WORKLOAD_THRESHOLD: u64 = 16 * 1024;

/// On hybrid systems, this many efficient cores are batched into one stream so that each
/// stream contributes roughly the compute throughput of one performance-core stream.
pub const EFFICIENT_CORES_PER_PERFORMANCE_STREAM: usize = 2;

/// Derives a default preferred threads-per-stream from the platform shape and a workload hint.
///
/// Used by [`plan_streams()`][crate::plan_streams] whenever the caller passes zero for
/// `preferred_threads_per_stream`. Two signals feed the heuristic: the ratio of physical
/// capacity to `num_streams` (more streams means fewer threads each), and the workload size
/// hint (the element count of the largest weight tensor; zero means unknown). Workloads below
/// [`SMALL_WORKLOAD_THRESHOLD`] prefer fewer threads per stream.
///
/// This is a heuristic, not an optimizer. It is pure and deterministic, so repeated calls
/// with identical inputs always produce the identical answer. The result is always at
/// least 1.
#[must_use]
pub fn prefer_threads(
    num_streams: usize,
    table: &ProcessorTypeTable,
    workload_hint: u64,
) -> usize {
    let summary = table.summary();

    // Secondary hyperthreads do not add meaningful compute for the default plan shape, so
    // the capacity signal counts physical cores only.
    let physical = summary
        .performance_count
        .saturating_add(summary.efficient_count)
        .saturating_add(summary.unclassified_count())
        .max(1);

    let mut preferred = if num_streams > 0 {
        (physical / num_streams).max(1)
    } else if summary.performance_count > 0 && summary.efficient_count > 0 {
        // Hybrid platform: batch efficient cores so one stream matches roughly one
        // performance core's contribution.
        EFFICIENT_CORES_PER_PERFORMANCE_STREAM
    } else {
        // Symmetric platform: one stream per physical core maximizes utilization.
        1
    };

    if workload_hint > 0 && workload_hint < SMALL_WORKLOAD_THRESHOLD {
        preferred = (preferred / 2).max(1);
    }

    preferred
}
