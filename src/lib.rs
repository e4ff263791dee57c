//! allreduce-bench: times and cross-checks all-reduce data paths
//!
//! This crate sweeps message sizes and, at every size, runs a sum all-reduce
//! through each available data path: host memory only, device memory staged
//! through pinned host buffers, device memory handed to a CUDA-aware MPI, and
//! a GPU-native collective library. It reports per-path timings and checks
//! that every path agrees with the host-only result within a tolerance.

pub mod parallel;

pub mod bench;
pub mod collective;
pub mod config;
pub mod core;
pub mod error;
pub mod memory;
pub mod report;
pub mod utils;

// Re-exports for convenience
pub use bench::{Benchmark, SizeReport, execute};
pub use collective::{DeviceCollective, PathSet, ReducePath};
pub use config::{BenchOptions, Inputs};
pub use crate::core::{Precision, Real};
pub use error::BenchError;
pub use memory::{Device, HostDevice};
pub use parallel::{Comm, ThreadComm, UniverseComm};
