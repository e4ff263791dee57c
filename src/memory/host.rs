// host-emulated device: every arena is plain host memory

use crate::core::Real;
use crate::error::BenchError;
use crate::memory::Device;

/// Device whose "device memory" is host memory.
///
/// Used when no GPU backend is compiled in. Every path still runs through the
/// same allocation and copy calls, so the harness behaves like a CPU-only
/// build of the runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDevice;

impl HostDevice {
    pub fn new() -> Self {
        HostDevice
    }
}

fn copy<T: Copy>(op: &'static str, src: &[T], dst: &mut [T]) -> Result<(), BenchError> {
    if src.len() != dst.len() {
        return Err(BenchError::Device {
            op,
            reason: format!("source has {} elements, destination {}", src.len(), dst.len()),
        });
    }
    dst.copy_from_slice(src);
    Ok(())
}

impl<T: Real> Device<T> for HostDevice {
    type Buffer = Vec<T>;
    type Pinned = Vec<T>;

    fn describe(&self) -> String {
        "host (emulated device)".to_string()
    }

    fn alloc(&self, len: usize) -> Result<Vec<T>, BenchError> {
        Ok(vec![T::zero(); len])
    }

    fn alloc_pinned(&self, len: usize) -> Result<Vec<T>, BenchError> {
        Ok(vec![T::zero(); len])
    }

    fn htod(&self, src: &[T], dst: &mut Vec<T>) -> Result<(), BenchError> {
        copy("htod", src, dst)
    }

    fn dtoh(&self, src: &Vec<T>, dst: &mut [T]) -> Result<(), BenchError> {
        copy("dtoh", src, dst)
    }

    fn dtoh_pinned(&self, src: &Vec<T>, dst: &mut Vec<T>) -> Result<(), BenchError> {
        copy("dtoh", src, dst)
    }

    fn htod_pinned(&self, src: &Vec<T>, dst: &mut Vec<T>) -> Result<(), BenchError> {
        copy("htod", src, dst)
    }

    fn pinned_slice<'a>(&self, buf: &'a Vec<T>) -> Result<&'a [T], BenchError> {
        Ok(buf.as_slice())
    }

    fn pinned_slice_mut<'a>(&self, buf: &'a mut Vec<T>) -> Result<&'a mut [T], BenchError> {
        Ok(buf.as_mut_slice())
    }

    fn device_ptr(&self, buf: &Vec<T>) -> *const T {
        buf.as_ptr()
    }

    fn device_ptr_mut(&self, buf: &mut Vec<T>) -> *mut T {
        buf.as_mut_ptr()
    }

    fn host_accessible(&self) -> bool {
        true
    }

    fn synchronize(&self) -> Result<(), BenchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_pinned() {
        let dev = HostDevice::new();
        let data = vec![1.0f64, 2.0, 3.0];
        let mut d = Device::<f64>::alloc(&dev, 3).unwrap();
        let mut p = Device::<f64>::alloc_pinned(&dev, 3).unwrap();
        dev.htod(&data, &mut d).unwrap();
        dev.dtoh_pinned(&d, &mut p).unwrap();
        assert_eq!(Device::<f64>::pinned_slice(&dev, &p).unwrap(), &data[..]);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let dev = HostDevice::new();
        let mut d = Device::<f32>::alloc(&dev, 2).unwrap();
        assert!(dev.htod(&[1.0f32, 2.0, 3.0], &mut d).is_err());
    }
}
