//! GPU-accelerated hash partitioning of columnar tables.
//!
//! The two public operations are [`hash_partition`] and [`hash`]. Everything else in this crate
//! is plumbing: a row hasher (C1) kept bit-identical between host and device, a partitioner (C2),
//! a histogram kernel launch wrapper (C3), a device-wide exclusive scan (C4), the routing tables
//! it produces, and a type-dispatched scatter kernel launch wrapper (C5). [`orchestrator`] wires
//! the six together (C6).

pub mod error;
pub mod hasher;
pub mod histogram;
pub mod kernels;
pub mod orchestrator;
pub mod partitioner;
pub mod prefix_scan;
pub mod routing;
pub mod scatter;

pub use error::{Error, Result};
pub use orchestrator::{hash, hash_partition};
pub use partitioner::PartitionerKind;
