use std::num::NonZeroUsize;

use crate::pal::{Platform, RawTopology};

/// Fallback platform implementation for operating systems without native topology support.
///
/// Counts processors via `std::thread::available_parallelism()` and reports no relationship
/// records, which makes detection degrade to the single-row unclassified processor-type
/// table. Code using the degraded tables still functions, it merely cannot distinguish core
/// classes or hyperthread twins.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    fn raw_topology(&self) -> RawTopology {
        let processor_count = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        RawTopology {
            processor_count,
            relations: Vec::new(),
        }
    }
}
