//! Timing regions and result checking.

pub mod check;
pub mod profiler;

pub use check::{CheckReport, Mismatch, compare};
pub use profiler::{Profiler, RegionGuard, RegionStats, RegionSummary};
