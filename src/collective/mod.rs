//! Reduction paths and GPU-native collectives.
//!
//! The host-only, staged and CUDA-aware paths all go through a
//! [`Comm`](crate::parallel::Comm). The fourth path goes through a
//! [`DeviceCollective`], which owns its own communicator and works on device
//! buffers directly.
//!
//! - [`NcclCollective`]: NCCL all-reduce on the device stream (feature `nccl`).
//! - [`HostCollective`]: forwards to the message-passing communicator; lets the
//!   device-collective path run against [`HostDevice`](crate::memory::HostDevice).

use bitflags::bitflags;

use crate::core::Real;
use crate::error::BenchError;
use crate::memory::Device;

pub mod host;
pub use host::HostCollective;

#[cfg(feature = "nccl")]
pub mod nccl;
#[cfg(feature = "nccl")]
pub use nccl::NcclCollective;

/// Sum all-reduce performed entirely on device buffers.
pub trait DeviceCollective<T: Real, D: Device<T>> {
    /// Name used in timing-region labels.
    fn label(&self) -> &str;

    /// Sum `send` over all ranks into `recv`. May return before the device has
    /// finished; callers synchronize the device to wait for completion.
    fn all_reduce_sum(
        &self,
        device: &D,
        send: &D::Buffer,
        recv: &mut D::Buffer,
    ) -> Result<(), BenchError>;
}

bitflags! {
    /// Reduction paths enabled for a run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PathSet: u8 {
        const HOST = 1 << 0;
        const STAGED = 1 << 1;
        const CUDA_AWARE = 1 << 2;
        const DEVICE_COLLECTIVE = 1 << 3;
    }
}

impl PathSet {
    /// Host and staged paths always run; the others are opt-in.
    pub fn for_run(cuda_aware: bool, device_collective: bool) -> Self {
        let mut paths = PathSet::HOST | PathSet::STAGED;
        paths.set(PathSet::CUDA_AWARE, cuda_aware);
        paths.set(PathSet::DEVICE_COLLECTIVE, device_collective);
        paths
    }
}

/// One of the candidate data paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReducePath {
    /// Host buffer straight into the message-passing all-reduce.
    Host,
    /// Device → pinned host, host all-reduce, pinned host → device.
    Staged,
    /// Device buffers handed to a device-capable message-passing transport.
    CudaAware,
    /// GPU-native collective library.
    DeviceCollective,
}

impl ReducePath {
    pub const ALL: [ReducePath; 4] = [
        ReducePath::Host,
        ReducePath::Staged,
        ReducePath::CudaAware,
        ReducePath::DeviceCollective,
    ];

    pub fn flag(self) -> PathSet {
        match self {
            ReducePath::Host => PathSet::HOST,
            ReducePath::Staged => PathSet::STAGED,
            ReducePath::CudaAware => PathSet::CUDA_AWARE,
            ReducePath::DeviceCollective => PathSet::DEVICE_COLLECTIVE,
        }
    }

    /// Fixed label of the communicator-based paths.
    pub fn label(self) -> &'static str {
        match self {
            ReducePath::Host => "CPU only",
            ReducePath::Staged => "GPU to GPU",
            ReducePath::CudaAware => "CUDA Aware",
            ReducePath::DeviceCollective => "Device collective",
        }
    }
}

pub const WARMUP_SUFFIX: &str = " WARMUP";

/// Timing-region label of iteration `iter` of a path at size `n`.
///
/// The first `warmup` iterations carry [`WARMUP_SUFFIX`].
pub fn region_label(path_label: &str, n: usize, iter: usize, warmup: usize) -> String {
    let suffix = if iter < warmup { WARMUP_SUFFIX } else { "" };
    format!("AllReduce(): {path_label} - {n}{suffix}")
}

#[cfg(feature = "nccl")]
pub trait CollectiveElement: cudarc::nccl::safe::NcclType {}
#[cfg(feature = "nccl")]
impl<T: cudarc::nccl::safe::NcclType> CollectiveElement for T {}

#[cfg(not(feature = "nccl"))]
pub trait CollectiveElement {}
#[cfg(not(feature = "nccl"))]
impl CollectiveElement for f32 {}
#[cfg(not(feature = "nccl"))]
impl CollectiveElement for f64 {}
