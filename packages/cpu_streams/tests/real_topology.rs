//! Tests against whatever machine the test runner happens to be. We cannot know the
//! layout in advance, so these verify invariants that must hold on every machine.

use cpu_streams::{CoreClassFilter, TopologyContext};
use static_assertions::assert_impl_all;

assert_impl_all!(TopologyContext: Clone, Send, Sync);

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn detection_sees_at_least_one_processor() {
    let context = TopologyContext::current();

    let summary = context.processor_types().summary();
    assert!(summary.all_count >= 1);
    assert_eq!(summary.all_count, context.mapping().len());
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn class_counts_account_for_every_classified_processor() {
    let context = TopologyContext::current();
    let summary = context.processor_types().summary();

    let accounted = summary.performance_count + summary.efficient_count + summary.hyperthread_count;
    assert_eq!(accounted + summary.unclassified_count(), summary.all_count);
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn socket_rows_sum_to_the_summary() {
    let context = TopologyContext::current();
    let table = context.processor_types();

    if table.socket_rows().is_empty() {
        // Single socket: the summary row is the only row.
        assert_eq!(table.socket_count(), 1);
        return;
    }

    let all: usize = table.socket_rows().iter().map(|row| row.all_count).sum();
    assert_eq!(all, table.summary().all_count);
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn planning_on_the_real_machine_yields_a_nonempty_plan() {
    let context = TopologyContext::current();

    for requested in [0, 1, 2, 4] {
        let plan = context.plan_streams(requested, 0, 0);
        assert!(!plan.is_empty());

        let total_threads: usize = plan.iter().map(|row| row.thread_count()).sum();
        assert!(total_threads >= 1);
        assert!(total_threads <= context.processor_types().summary().all_count);
    }
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn prefer_threads_is_deterministic_on_the_real_machine() {
    let context = TopologyContext::current();

    let first = context.prefer_threads(0, 0);
    let second = context.prefer_threads(0, 0);

    assert!(first >= 1);
    assert_eq!(first, second);
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn reservations_round_trip_on_the_real_machine() {
    // A fresh context so reservations here cannot collide with other tests using the
    // process-wide one.
    let context = TopologyContext::detect();

    let granted = context.acquire_cpus(CoreClassFilter::Any, 1, "integration-test");

    // Every machine has at least one processor, so one must be grantable.
    assert_eq!(granted.len(), 1);

    // Release on every exit path, so a failing assertion does not leak the reservation
    // into whatever this test harness runs next.
    let context_guard = context.clone();
    let _release = scopeguard::guard(granted.clone(), move |ids| {
        context_guard.release_cpus(&ids);
    });

    assert_eq!(context.reserved_count(), 1);

    let available = context.available_processor_types();
    assert_eq!(
        available.summary().all_count + 1,
        context.processor_types().summary().all_count
    );
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot call platform APIs.
fn hyperthread_twins_are_mutual_on_the_real_machine() {
    let context = TopologyContext::current();

    for processor in context.mapping().processors() {
        let Some(twin) = context.mapping().hyperthread_twin(processor.id) else {
            continue;
        };

        assert_ne!(twin, processor.id);
        assert_eq!(context.mapping().hyperthread_twin(twin), Some(processor.id));
    }
}
