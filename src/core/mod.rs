//! Core element types shared by every module.

pub mod traits;
pub use traits::{Precision, Real};
