//! Fake platform backend implementation.

use crate::fake::TopologyBuilder;
use crate::pal::{Platform, RawTopology};

/// A platform that reports a fabricated topology instead of asking the operating system.
///
/// This is distinct from the test-only `MockPlatform` because it needs to be available
/// when the `test-util` feature is enabled, not just in test mode.
#[derive(Debug)]
pub(crate) struct FakePlatform {
    topology: RawTopology,
}

impl FakePlatform {
    pub(crate) fn from_builder(builder: &TopologyBuilder) -> Self {
        Self {
            topology: builder.build_raw(),
        }
    }
}

impl Platform for FakePlatform {
    fn raw_topology(&self) -> RawTopology {
        self.topology.clone()
    }
}
