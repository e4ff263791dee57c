//! Core element traits for allreduce-bench.

use std::fmt::{Debug, Display, LowerExp};

use crate::collective::CollectiveElement;
use crate::memory::DeviceElement;
use crate::parallel::Equivalence;

/// Floating-point precision of the reduced arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// 32-bit `f32` elements.
    Single,
    /// 64-bit `f64` elements.
    #[default]
    Double,
}

impl Precision {
    /// Size of one element in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Precision::Single => std::mem::size_of::<f32>(),
            Precision::Double => std::mem::size_of::<f64>(),
        }
    }
}

impl std::str::FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "float" | "f32" => Ok(Precision::Single),
            "double" | "f64" => Ok(Precision::Double),
            other => Err(format!("expected 'single' or 'double', got '{other}'")),
        }
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::Single => f.write_str("single"),
            Precision::Double => f.write_str("double"),
        }
    }
}

/// Element type that every reduction path can carry.
///
/// The bound collects what each backend needs: an MPI datatype, a device
/// representation, and a device-collective datatype. Backends that are not
/// compiled in contribute an empty marker trait.
pub trait Real:
    num_traits::Float
    + num_traits::FromPrimitive
    + Default
    + Debug
    + Display
    + LowerExp
    + Send
    + Sync
    + Equivalence
    + DeviceElement
    + CollectiveElement
    + 'static
{
    /// Precision tag of this element type.
    const PRECISION: Precision;
}

impl Real for f32 {
    const PRECISION: Precision = Precision::Single;
}

impl Real for f64 {
    const PRECISION: Precision = Precision::Double;
}
