//! The stream planner: carves a processor-type table into parallel execution streams.

use itertools::Itertools;
use nonempty::{NonEmpty, nonempty};

use crate::{CoreClass, ProcessorTypeTable, StreamPlanRow, prefer_threads};

/// How the leftover cores of a class are planned when the core count does not divide evenly
/// by the stream width.
#[derive(Clone, Copy, Eq, PartialEq)]
enum Remainder {
    /// Merge the leftover into the last full stream, over-provisioning it.
    ///
    /// Used for performance cores, where an extra-wide stream is preferable to a stream
    /// too narrow to carry its share of the work.
    MergeIntoLast,

    /// Plan one additional narrower stream for the leftover.
    ///
    /// Used for efficient cores, which are batched to a target width but never silently
    /// dropped.
    OwnStream,
}

/// Generates a stream plan for the given processor-type table.
///
/// * `requested_streams` is the stream count requested by the caller. Zero means the planner
///   picks a count that maximizes core utilization; one is a latency-oriented request that
///   always yields exactly one stream.
/// * `thread_ceiling` is a hard cap on the total planned thread count. Zero means no cap.
/// * `preferred_threads_per_stream` is the target stream width. Zero delegates to
///   [`prefer_threads()`].
///
/// The returned plan is never empty: when even a single minimal stream cannot fit, the
/// planner falls back to one single-thread stream on a performance core.
///
/// Secondary hyperthreads never form streams of their own by default. They are folded into
/// performance streams when a non-zero `thread_ceiling` exceeds the physical core count, and
/// they back additional streams when an explicit `requested_streams` cannot be met from
/// physical cores alone.
#[must_use]
pub fn plan_streams(
    requested_streams: usize,
    thread_ceiling: usize,
    preferred_threads_per_stream: usize,
    table: &ProcessorTypeTable,
) -> NonEmpty<StreamPlanRow> {
    let capacity = Capacity::of(table);

    if capacity.total_logical == 0 {
        return fallback_plan();
    }

    let rows = match requested_streams {
        0 => plan_auto(thread_ceiling, preferred_threads_per_stream, &capacity, table),
        1 => plan_latency(thread_ceiling, &capacity),
        n => plan_explicit(n, thread_ceiling, preferred_threads_per_stream, &capacity, table),
    };

    let rows = apply_ceiling(rows, thread_ceiling);

    NonEmpty::from_vec(rows).unwrap_or_else(fallback_plan)
}

/// The per-class capacity view the planner works from.
struct Capacity {
    /// Performance cores plus any unclassified processors, which the planner treats as
    /// performance-equivalent.
    performance: usize,

    efficient: usize,
    hyperthread: usize,

    /// Physical compute capacity: everything except secondary hyperthreads.
    total_physical: usize,

    /// Every logical processor, secondary hyperthreads included.
    total_logical: usize,

    /// The class to stamp on performance-equivalent rows. [`CoreClass::Unknown`] when the
    /// capacity comes entirely from unclassified processors.
    performance_class: CoreClass,
}

impl Capacity {
    fn of(table: &ProcessorTypeTable) -> Self {
        let summary = table.summary();
        let unclassified = summary.unclassified_count();

        let performance_class = if summary.performance_count == 0 && unclassified > 0 {
            CoreClass::Unknown
        } else {
            CoreClass::Performance
        };

        Self {
            performance: summary.performance_count.saturating_add(unclassified),
            efficient: summary.efficient_count,
            hyperthread: summary.hyperthread_count,
            total_physical: summary.all_count.saturating_sub(summary.hyperthread_count),
            total_logical: summary.all_count,
            performance_class,
        }
    }
}

fn fallback_plan() -> NonEmpty<StreamPlanRow> {
    nonempty![StreamPlanRow::new(CoreClass::Performance, 1, 1)]
}

/// Latency-oriented planning: exactly one stream with the largest contiguous thread count
/// available, never split across core classes unless only mixed classes exist.
fn plan_latency(thread_ceiling: usize, capacity: &Capacity) -> Vec<StreamPlanRow> {
    let (class, available) = if capacity.performance > 0 {
        (capacity.performance_class, capacity.performance)
    } else {
        (CoreClass::Efficient, capacity.efficient)
    };

    let mut width = available;

    if thread_ceiling > 0 {
        // A ceiling above the physical core count is an explicit request for spare
        // capacity, so the secondary hyperthreads of the chosen cores may widen the stream.
        if class != CoreClass::Efficient && thread_ceiling > capacity.total_physical {
            width = available.saturating_add(capacity.hyperthread);
        }

        width = width.min(thread_ceiling);
    }

    vec![StreamPlanRow::new(class, 1, width.max(1))]
}

/// Throughput-oriented auto planning: whole streams on performance cores first, efficient
/// cores batched into streams of matching width.
fn plan_auto(
    thread_ceiling: usize,
    preferred_threads_per_stream: usize,
    capacity: &Capacity,
    table: &ProcessorTypeTable,
) -> Vec<StreamPlanRow> {
    let width = if preferred_threads_per_stream > 0 {
        preferred_threads_per_stream
    } else {
        prefer_threads(0, table, 0)
    };

    let mut performance_widths =
        carve_widths(capacity.performance, width, Remainder::MergeIntoLast);
    let efficient_widths = carve_widths(capacity.efficient, width, Remainder::OwnStream);

    // Fold secondary hyperthreads into the performance streams when the ceiling explicitly
    // asks for more than the physical cores can give.
    if thread_ceiling > capacity.total_physical && !performance_widths.is_empty() {
        let spare = thread_ceiling
            .saturating_sub(capacity.total_physical)
            .min(capacity.hyperthread);

        for extra in 0..spare {
            let index = extra % performance_widths.len();
            if let Some(stream_width) = performance_widths.get_mut(index) {
                *stream_width = stream_width.saturating_add(1);
            }
        }
    }

    let mut rows = compress(capacity.performance_class, &performance_widths);
    rows.extend(compress(CoreClass::Efficient, &efficient_widths));
    rows
}

/// Explicit stream counts: carve the requested number of streams out of performance cores
/// first, then efficient cores, then secondary hyperthreads.
fn plan_explicit(
    requested_streams: usize,
    thread_ceiling: usize,
    preferred_threads_per_stream: usize,
    capacity: &Capacity,
    table: &ProcessorTypeTable,
) -> Vec<StreamPlanRow> {
    let budget = if thread_ceiling > 0 {
        thread_ceiling.min(capacity.total_logical)
    } else {
        capacity.total_logical
    };

    // Every stream needs at least one thread; requests beyond capacity shrink.
    let stream_target = requested_streams.min(budget).max(1);

    let preferred = if preferred_threads_per_stream > 0 {
        preferred_threads_per_stream
    } else {
        prefer_threads(requested_streams, table, 0)
    };

    let width = preferred.min(budget / stream_target).max(1);

    let classes = [
        (capacity.performance_class, capacity.performance),
        (CoreClass::Efficient, capacity.efficient),
        (CoreClass::HyperthreadSecondary, capacity.hyperthread),
    ];

    let mut rows = Vec::new();
    let mut remaining = stream_target;

    for (class, class_capacity) in classes {
        if remaining == 0 || class_capacity == 0 {
            continue;
        }

        let full = remaining.min(class_capacity / width);

        if full > 0 {
            rows.push(StreamPlanRow::new(class, full, width));
            remaining = remaining.saturating_sub(full);
        }

        if remaining > 0 {
            let leftover = class_capacity.saturating_sub(full.saturating_mul(width));

            if leftover > 0 {
                rows.push(StreamPlanRow::new(class, 1, leftover));
                remaining = remaining.saturating_sub(1);
            }
        }
    }

    rows
}

/// Splits a class capacity into per-stream widths.
fn carve_widths(class_capacity: usize, width: usize, remainder: Remainder) -> Vec<usize> {
    if class_capacity == 0 {
        return Vec::new();
    }

    let width = width.max(1);
    let full = class_capacity / width;
    let leftover = class_capacity % width;

    if full == 0 {
        return vec![class_capacity];
    }

    let mut widths = vec![width; full];

    if leftover > 0 {
        match remainder {
            Remainder::MergeIntoLast => {
                if let Some(last) = widths.last_mut() {
                    *last = last.saturating_add(leftover);
                }
            }
            Remainder::OwnStream => widths.push(leftover),
        }
    }

    widths
}

/// Collapses runs of equal stream widths into plan rows.
fn compress(class: CoreClass, widths: &[usize]) -> Vec<StreamPlanRow> {
    widths
        .iter()
        .copied()
        .dedup_with_count()
        .map(|(count, width)| StreamPlanRow::new(class, count, width))
        .collect()
}

/// Enforces the hard thread ceiling by filling planned streams in row order; the stream that
/// straddles the boundary is narrowed, later streams are dropped.
fn apply_ceiling(rows: Vec<StreamPlanRow>, thread_ceiling: usize) -> Vec<StreamPlanRow> {
    if thread_ceiling == 0 {
        return rows;
    }

    let mut budget = thread_ceiling;
    let mut capped = Vec::with_capacity(rows.len());

    for row in rows {
        if budget == 0 || row.threads_per_stream == 0 {
            break;
        }

        let affordable = (budget / row.threads_per_stream).min(row.stream_count);

        if affordable > 0 {
            capped.push(StreamPlanRow::new(
                row.core_class,
                affordable,
                row.threads_per_stream,
            ));
            budget =
                budget.saturating_sub(affordable.saturating_mul(row.threads_per_stream));
        }

        if affordable < row.stream_count && budget > 0 {
            capped.push(StreamPlanRow::new(row.core_class, 1, budget));
            budget = 0;
        }
    }

    capped
}
