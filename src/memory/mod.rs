//! Device memory and host staging buffers.
//!
//! A [`Device`] hands out device buffers and page-locked host buffers and moves
//! data between them. The benchmark allocates a fresh set per message size and
//! drops them before moving on, so no buffer outlives its size iteration.
//!
//! - [`HostDevice`]: device memory emulated by host memory.
//! - [`CudaDevice`]: a CUDA context and stream (feature `cuda`).

use crate::core::Real;
use crate::error::BenchError;

pub mod host;
pub use host::HostDevice;

#[cfg(feature = "cuda")]
pub mod cuda;
#[cfg(feature = "cuda")]
pub use cuda::CudaDevice;

/// A compute device that owns buffers of `T`.
pub trait Device<T: Real> {
    /// Buffer resident in device memory.
    type Buffer;
    /// Page-locked host buffer used for staging.
    type Pinned;

    /// Human-readable device description.
    fn describe(&self) -> String;

    fn alloc(&self, len: usize) -> Result<Self::Buffer, BenchError>;
    fn alloc_pinned(&self, len: usize) -> Result<Self::Pinned, BenchError>;

    /// Copy host data into a device buffer; returns once the copy has landed.
    fn htod(&self, src: &[T], dst: &mut Self::Buffer) -> Result<(), BenchError>;
    fn dtoh(&self, src: &Self::Buffer, dst: &mut [T]) -> Result<(), BenchError>;
    fn dtoh_pinned(&self, src: &Self::Buffer, dst: &mut Self::Pinned) -> Result<(), BenchError>;
    fn htod_pinned(&self, src: &Self::Pinned, dst: &mut Self::Buffer) -> Result<(), BenchError>;

    fn pinned_slice<'a>(&self, buf: &'a Self::Pinned) -> Result<&'a [T], BenchError>;
    fn pinned_slice_mut<'a>(&self, buf: &'a mut Self::Pinned)
        -> Result<&'a mut [T], BenchError>;

    /// Device address of a buffer, for transports that read device memory.
    ///
    /// The pointer may not be dereferenced on the host unless
    /// [`Device::host_accessible`] is true.
    fn device_ptr(&self, buf: &Self::Buffer) -> *const T;

    /// Mutable counterpart of [`Device::device_ptr`].
    fn device_ptr_mut(&self, buf: &mut Self::Buffer) -> *mut T;

    /// Whether device buffers live in host-addressable memory.
    fn host_accessible(&self) -> bool;

    /// Block until all work queued on the device has finished.
    fn synchronize(&self) -> Result<(), BenchError>;
}

#[cfg(feature = "cuda")]
pub trait DeviceElement:
    cudarc::driver::DeviceRepr + cudarc::driver::ValidAsZeroBits + Unpin
{
}
#[cfg(feature = "cuda")]
impl<T: cudarc::driver::DeviceRepr + cudarc::driver::ValidAsZeroBits + Unpin> DeviceElement for T {}

#[cfg(not(feature = "cuda"))]
pub trait DeviceElement {}
#[cfg(not(feature = "cuda"))]
impl DeviceElement for f32 {}
#[cfg(not(feature = "cuda"))]
impl DeviceElement for f64 {}
