//! Fake processor topologies for testing.
//!
//! This module simulates machine layouts so tests can exercise stream planning logic
//! under hardware scenarios the test runner itself does not have, such as hybrid
//! processors or multi-socket servers.
//!
//! Only available when the `test-util` feature is enabled.
//!
//! # Basic usage
//!
//! ```
//! use cpu_streams::TopologyContext;
//! use cpu_streams::fake::TopologyBuilder;
//! use new_zealand::nz;
//!
//! let context = TopologyContext::fake(TopologyBuilder::from_performance_cores(nz!(4)));
//!
//! assert_eq!(context.processor_types().summary().performance_count, 4);
//! ```
//!
//! # Designing testable code
//!
//! To make your code testable with fake topologies, accept [`crate::TopologyContext`] as a
//! parameter instead of always calling [`crate::TopologyContext::current()`]. This allows
//! tests to substitute a fake topology while production code uses the real machine.
//!
//! # Hybrid layouts
//!
//! For control over core kinds per socket, use [`SocketBuilder`]:
//!
//! ```
//! use cpu_streams::TopologyContext;
//! use cpu_streams::fake::{SocketBuilder, TopologyBuilder};
//!
//! // A hybrid client processor: 6 hyperthreaded performance cores and 8 efficient cores.
//! let context = TopologyContext::fake(
//!     TopologyBuilder::new().socket(
//!         SocketBuilder::new()
//!             .performance_cores(6)
//!             .hyperthreading(true)
//!             .efficient_cores(8),
//!     ),
//! );
//!
//! let summary = context.processor_types().summary();
//! assert_eq!(summary.performance_count, 6);
//! assert_eq!(summary.hyperthread_count, 6);
//! assert_eq!(summary.efficient_count, 8);
//! ```
//!
//! # Isolation
//!
//! Each fake topology instance is independent, so multiple fakes can coexist in
//! parallel tests without interference.

mod builder;

pub(crate) mod platform;

pub use builder::{SocketBuilder, TopologyBuilder};
pub(crate) use platform::FakePlatform;
