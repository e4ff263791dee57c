//! CUDA device backed by `cudarc`.
//!
//! One context per rank, on ordinal `rank % device_count`, with all copies and
//! collectives queued on the context's default stream.

use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaSlice, CudaStream, DevicePtr, DevicePtrMut, DriverError, PinnedHostSlice,
};

use crate::core::Real;
use crate::error::BenchError;
use crate::memory::Device;

fn driver(op: &'static str) -> impl FnOnce(DriverError) -> BenchError {
    move |e| BenchError::Device { op, reason: format!("{e:?}") }
}

pub struct CudaDevice {
    ordinal: usize,
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
}

impl CudaDevice {
    pub fn new(ordinal: usize) -> Result<Self, BenchError> {
        let ctx = CudaContext::new(ordinal).map_err(driver("cuCtxCreate"))?;
        let stream = ctx.default_stream();
        tracing::info!(ordinal, "created CUDA context");
        Ok(Self { ordinal, ctx, stream })
    }

    /// Round-robin device selection: rank `r` uses ordinal `r % device_count`.
    pub fn for_rank(rank: usize) -> Result<Self, BenchError> {
        let count = CudaContext::device_count().map_err(driver("cuDeviceGetCount"))?;
        if count < 1 {
            return Err(BenchError::Device {
                op: "cuDeviceGetCount",
                reason: "no CUDA devices found".into(),
            });
        }
        Self::new(rank % count as usize)
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Stream every copy and collective is issued on.
    pub fn stream(&self) -> &Arc<CudaStream> {
        &self.stream
    }
}

impl<T: Real> Device<T> for CudaDevice {
    type Buffer = CudaSlice<T>;
    type Pinned = PinnedHostSlice<T>;

    fn describe(&self) -> String {
        format!("CUDA device {}", self.ordinal)
    }

    fn alloc(&self, len: usize) -> Result<CudaSlice<T>, BenchError> {
        self.stream.alloc_zeros::<T>(len).map_err(driver("cuMemAlloc"))
    }

    fn alloc_pinned(&self, len: usize) -> Result<PinnedHostSlice<T>, BenchError> {
        // SAFETY: pinned buffers are always written (dtoh or all-reduce) before being read.
        unsafe { self.ctx.alloc_pinned::<T>(len) }.map_err(driver("cuMemHostAlloc"))
    }

    fn htod(&self, src: &[T], dst: &mut CudaSlice<T>) -> Result<(), BenchError> {
        self.stream.memcpy_htod(src, dst).map_err(driver("cuMemcpyHtoD"))?;
        self.stream.synchronize().map_err(driver("cuStreamSynchronize"))
    }

    fn dtoh(&self, src: &CudaSlice<T>, dst: &mut [T]) -> Result<(), BenchError> {
        self.stream.memcpy_dtoh(src, dst).map_err(driver("cuMemcpyDtoH"))?;
        self.stream.synchronize().map_err(driver("cuStreamSynchronize"))
    }

    fn dtoh_pinned(
        &self,
        src: &CudaSlice<T>,
        dst: &mut PinnedHostSlice<T>,
    ) -> Result<(), BenchError> {
        self.stream.memcpy_dtoh(src, dst).map_err(driver("cuMemcpyDtoH"))?;
        self.stream.synchronize().map_err(driver("cuStreamSynchronize"))
    }

    fn htod_pinned(
        &self,
        src: &PinnedHostSlice<T>,
        dst: &mut CudaSlice<T>,
    ) -> Result<(), BenchError> {
        self.stream.memcpy_htod(src, dst).map_err(driver("cuMemcpyHtoD"))?;
        self.stream.synchronize().map_err(driver("cuStreamSynchronize"))
    }

    fn pinned_slice<'a>(&self, buf: &'a PinnedHostSlice<T>) -> Result<&'a [T], BenchError> {
        buf.as_slice().map_err(driver("pinned host view"))
    }

    fn pinned_slice_mut<'a>(
        &self,
        buf: &'a mut PinnedHostSlice<T>,
    ) -> Result<&'a mut [T], BenchError> {
        buf.as_mut_slice().map_err(driver("pinned host view"))
    }

    fn device_ptr(&self, buf: &CudaSlice<T>) -> *const T {
        let (ptr, _record) = buf.device_ptr(&self.stream);
        ptr as usize as *const T
    }

    fn device_ptr_mut(&self, buf: &mut CudaSlice<T>) -> *mut T {
        let (ptr, _record) = buf.device_ptr_mut(&self.stream);
        ptr as usize as *mut T
    }

    fn host_accessible(&self) -> bool {
        false
    }

    fn synchronize(&self) -> Result<(), BenchError> {
        self.stream.synchronize().map_err(driver("cuStreamSynchronize"))
    }
}
