//! The process-facing handle over a detected topology.

#[cfg(any(test, feature = "test-util"))]
use std::borrow::Borrow;
use std::sync::{Arc, Mutex, OnceLock};

use nonempty::NonEmpty;

#[cfg(any(test, feature = "test-util"))]
use crate::fake::{FakePlatform, TopologyBuilder};
use crate::pal::{Platform, PlatformFacade};
use crate::topology::{Topology, aggregate};
use crate::{
    CoreClassFilter, CpuMappingTable, LogicalProcessor, ProcessorId, ProcessorTypeTable,
    StreamCfg, StreamPlanRow, parse_plan, plan_streams, prefer_threads,
};

static CURRENT_CONTEXT: OnceLock<TopologyContext> = OnceLock::new();

/// A handle over one detected processor topology.
///
/// The topology itself is immutable once detected. The only mutable state behind the handle
/// is the reservation ledger, guarded by a single mutex. Clones are cheap and all refer to
/// the same detection and the same ledger.
///
/// Production code typically uses the process-wide instance from
/// [`current()`][Self::current]. Code that should be testable against synthetic machine
/// layouts accepts a `&TopologyContext` parameter instead and lets tests pass in
/// [`fake()`][Self::fake] contexts.
///
/// # Example
///
/// ```
/// use cpu_streams::TopologyContext;
///
/// let context = TopologyContext::current();
/// let summary = context.processor_types().summary();
/// println!("{} logical processors", summary.all_count);
/// ```
#[derive(Clone, Debug)]
pub struct TopologyContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    topology: Topology,

    /// Reservation tag per mapping-table index. `None` means unreserved.
    ///
    /// Indexed in lockstep with `CpuMappingTable::processors()`, so lookups go through
    /// the mapping table's ID index.
    reservations: Mutex<Vec<Option<String>>>,
}

impl TopologyContext {
    /// Returns the process-wide context for the machine this process runs on.
    ///
    /// Detection happens on first access and the answer is reused thereafter. Use
    /// [`detect()`][Self::detect] if processors may have been brought online since.
    #[must_use]
    pub fn current() -> &'static Self {
        CURRENT_CONTEXT.get_or_init(|| Self::from_platform(&PlatformFacade::target()))
    }

    /// Runs a fresh detection and returns a new independent context.
    ///
    /// Existing contexts, including the one behind [`current()`][Self::current], keep
    /// serving their original detection and their own reservation ledgers. A caller
    /// that wants hot-plugged processors reflected switches to the new handle at its
    /// own pace.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_platform(&PlatformFacade::target())
    }

    /// Creates a context over a fabricated topology for testing purposes.
    ///
    /// Only available when the `test-util` feature is enabled. Each fake context has its
    /// own reservation ledger, so parallel tests do not interfere.
    ///
    /// # Example
    ///
    /// ```
    /// use cpu_streams::TopologyContext;
    /// use cpu_streams::fake::TopologyBuilder;
    /// use new_zealand::nz;
    ///
    /// let context = TopologyContext::fake(TopologyBuilder::from_performance_cores(nz!(8)));
    /// assert_eq!(context.mapping().len(), 8);
    /// ```
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn fake(builder: impl Borrow<TopologyBuilder>) -> Self {
        let platform = FakePlatform::from_builder(builder.borrow());
        Self::from_platform(&PlatformFacade::from_fake(platform))
    }

    /// Creates a context using the fallback platform, which only counts processors.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn fallback() -> Self {
        use crate::pal::fallback::BUILD_TARGET_PLATFORM;

        Self::from_platform(&PlatformFacade::Fallback(&BUILD_TARGET_PLATFORM))
    }

    fn from_platform(platform: &PlatformFacade) -> Self {
        let topology = Topology::from_raw(&platform.raw_topology());
        let reservations = vec![None; topology.cpu_mapping.len()];

        Self {
            inner: Arc::new(ContextInner {
                topology,
                reservations: Mutex::new(reservations),
            }),
        }
    }

    /// The aggregated processor-type table of this detection.
    #[inline]
    #[must_use]
    pub fn processor_types(&self) -> &ProcessorTypeTable {
        &self.inner.topology.proc_type_table
    }

    /// The per-processor mapping table of this detection.
    #[inline]
    #[must_use]
    pub fn mapping(&self) -> &CpuMappingTable {
        &self.inner.topology.cpu_mapping
    }

    /// Plans streams over this context's own processor-type table.
    ///
    /// See [`plan_streams()`] for the planning rules.
    #[must_use]
    pub fn plan_streams(
        &self,
        requested_streams: usize,
        thread_ceiling: usize,
        preferred_threads_per_stream: usize,
    ) -> NonEmpty<StreamPlanRow> {
        plan_streams(
            requested_streams,
            thread_ceiling,
            preferred_threads_per_stream,
            self.processor_types(),
        )
    }

    /// Estimates the preferred threads per stream over this context's own table.
    ///
    /// See [`prefer_threads()`] for the heuristic.
    #[must_use]
    pub fn prefer_threads(&self, num_streams: usize, workload_hint: u64) -> usize {
        prefer_threads(num_streams, self.processor_types(), workload_hint)
    }

    /// Plans streams and flattens the plan into a [`StreamCfg`] in one call.
    #[must_use]
    pub fn stream_cfg(
        &self,
        requested_streams: usize,
        thread_ceiling: usize,
        preferred_threads_per_stream: usize,
    ) -> StreamCfg {
        let plan = self.plan_streams(
            requested_streams,
            thread_ceiling,
            preferred_threads_per_stream,
        );

        parse_plan(&plan)
    }

    /// Reserves up to `count` unreserved processors matching the filter.
    ///
    /// Processors are scanned in ascending ID order and marked with the caller's tag.
    /// Returns the IDs actually reserved, which may be fewer than asked for (including
    /// none at all) when the machine cannot satisfy the request. The caller decides
    /// whether a partial grant is worth keeping or should be released.
    ///
    /// # Example
    ///
    /// ```
    /// use cpu_streams::{CoreClassFilter, TopologyContext};
    /// use cpu_streams::fake::TopologyBuilder;
    /// use new_zealand::nz;
    ///
    /// let context = TopologyContext::fake(TopologyBuilder::from_performance_cores(nz!(4)));
    ///
    /// let granted = context.acquire_cpus(CoreClassFilter::Performance, 2, "inference-0");
    /// assert_eq!(granted, vec![0, 1]);
    ///
    /// context.release_cpus(&granted);
    /// ```
    #[must_use]
    pub fn acquire_cpus(
        &self,
        filter: CoreClassFilter,
        count: usize,
        tag: &str,
    ) -> Vec<ProcessorId> {
        if count == 0 {
            return Vec::new();
        }

        let mut reservations = self
            .inner
            .reservations
            .lock()
            .expect("reservation lock should never be poisoned");

        let mut granted = Vec::with_capacity(count);

        for (index, processor) in self.mapping().processors().iter().enumerate() {
            if granted.len() == count {
                break;
            }

            if !filter.matches(processor.core_class) {
                continue;
            }

            let Some(slot) = reservations.get_mut(index) else {
                continue;
            };

            if slot.is_none() {
                *slot = Some(tag.to_string());
                granted.push(processor.id);
            }
        }

        granted
    }

    /// Releases reservations on the given processors.
    ///
    /// Idempotent: releasing an unreserved processor is a no-op, and IDs this topology
    /// does not know are ignored.
    pub fn release_cpus(&self, ids: &[ProcessorId]) {
        let mut reservations = self
            .inner
            .reservations
            .lock()
            .expect("reservation lock should never be poisoned");

        for &id in ids {
            let Some(index) = self.mapping().index_of(id) else {
                continue;
            };

            if let Some(slot) = reservations.get_mut(index) {
                *slot = None;
            }
        }
    }

    /// The hyperthread twins of the given processors.
    ///
    /// Twins already present in the input are not repeated in the output. Efficient and
    /// unclassified processors contribute nothing, as they have no twin.
    #[must_use]
    pub fn sibling_cpus(&self, ids: &[ProcessorId]) -> Vec<ProcessorId> {
        let mut siblings: Vec<ProcessorId> = ids
            .iter()
            .filter_map(|&id| self.mapping().hyperthread_twin(id))
            .filter(|twin| !ids.contains(twin))
            .collect();

        siblings.sort_unstable();
        siblings.dedup();
        siblings
    }

    /// Number of currently reserved processors.
    #[must_use]
    pub fn reserved_count(&self) -> usize {
        self.inner
            .reservations
            .lock()
            .expect("reservation lock should never be poisoned")
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// The processor-type table counting only currently unreserved processors.
    ///
    /// Shaped like [`processor_types()`][Self::processor_types] (same socket structure)
    /// but reflecting the processors still free to hand out. With no reservations held,
    /// the two tables are equal.
    #[must_use]
    pub fn available_processor_types(&self) -> ProcessorTypeTable {
        let reservations = self
            .inner
            .reservations
            .lock()
            .expect("reservation lock should never be poisoned");

        let unreserved: Vec<LogicalProcessor> = self
            .mapping()
            .processors()
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                reservations
                    .get(*index)
                    .is_some_and(|slot| slot.is_none())
            })
            .map(|(_, processor)| *processor)
            .collect();

        aggregate(&unreserved, self.processor_types().socket_count())
    }
}
