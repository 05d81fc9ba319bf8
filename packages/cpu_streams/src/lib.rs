//! Topology-aware stream and thread planning for CPU inference workloads.
//!
//! Serving a compute-bound model well means knowing what processors the machine actually
//! has. A hybrid desktop processor with a handful of performance cores, a cluster of
//! efficient cores and hyperthreading on top behaves very differently from a two-socket
//! server full of identical cores, and a thread plan that ignores the difference leaves
//! throughput on the table or ruins latency.
//!
//! This package detects the processor topology (sockets, physical cores, core kinds,
//! hyperthread pairs) and plans *streams* over it: groups of cooperating threads that each
//! process one request at a time. It answers three questions:
//!
//! 1. What does this machine look like? ([`TopologyContext`], [`ProcessorTypeTable`],
//!    [`CpuMappingTable`])
//! 1. How should streams be laid out over it? ([`plan_streams()`], [`prefer_threads()`],
//!    [`parse_plan()`])
//! 1. Which concrete processors may this stream use right now? (reservations via
//!    [`TopologyContext::acquire_cpus()`])
//!
//! # Quick start
//!
//! ```rust
//! use cpu_streams::TopologyContext;
//!
//! let context = TopologyContext::current();
//!
//! // Plan for throughput: as many streams as the machine sensibly supports.
//! let cfg = context.stream_cfg(0, 0, 0);
//!
//! println!(
//!     "planned {} streams with {} threads in total",
//!     cfg.num_streams, cfg.num_threads
//! );
//! ```
//!
//! # Planning without a context
//!
//! The planning functions are pure: they take a [`ProcessorTypeTable`] and return a plan,
//! with no hidden state. This makes it easy to plan for machines you are not running on:
//!
//! ```rust
//! use cpu_streams::{ProcessorTypeRow, ProcessorTypeTable, plan_streams};
//!
//! // A hybrid processor: 8 performance cores (hyperthreaded) and 8 efficient cores.
//! let table = ProcessorTypeTable::from_socket_rows(vec![ProcessorTypeRow::from_class_counts(
//!     8, 8, 8,
//! )]);
//!
//! let plan = plan_streams(0, 0, 4, &table);
//! assert!(!plan.is_empty());
//! ```
//!
//! # Testing with fake topologies
//!
//! Code that accepts a [`TopologyContext`] parameter can be tested against synthetic
//! machine layouts via the [`fake`] module, available when the `test-util` Cargo feature
//! is enabled.
//!
//! # Operating system compatibility
//!
//! Topology detection reads `sysfs` on Linux and the processor relationship APIs on
//! Windows. On other operating systems the package falls back to a processor count from
//! `std::thread::available_parallelism()`, classification stays unknown and planning
//! degrades to treating every processor alike. Everything still works, it just cannot
//! exploit core kinds it cannot see.

mod cpu_mapping;
mod model_prefer;
mod pal;
mod plan;
mod planner;
mod primitive_types;
mod proc_type_table;
mod topology;
mod topology_context;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use cpu_mapping::*;
pub use model_prefer::*;
pub use plan::*;
pub use planner::plan_streams;
pub use primitive_types::*;
pub use proc_type_table::*;
pub use topology_context::TopologyContext;
