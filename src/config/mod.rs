//! Run configuration: the key-value inputs source and the options built from it.

pub mod inputs;
pub use inputs::Inputs;
pub mod options;
pub use options::{BenchOptions, SizeSweep};
