//! Communicators that carry the message-passing side of every reduction path.
//!
//! The [`Comm`] trait is what the benchmark talks to. [`MpiComm`] maps it onto
//! MPI collectives when the `mpi` feature is enabled, and [`ThreadComm`] runs a
//! group of ranks as threads inside one process. [`UniverseComm`] picks between
//! them at runtime.

#[cfg(feature = "mpi")]
pub use mpi::datatype::Equivalence;

use crate::core::Real;
use crate::error::BenchError;

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);

    /// Element-wise sum of `send` over all ranks, written to `recv` on every rank.
    fn all_reduce_sum<T: Real>(&self, send: &[T], recv: &mut [T]) -> Result<(), BenchError>;

    /// [`Comm::all_reduce_sum`] over `len` elements behind raw addresses.
    ///
    /// # Safety
    /// `send` and `recv` must be valid, non-overlapping allocations of at least
    /// `len` elements with no pending device work. Unless
    /// [`Comm::addresses_device_memory`] is true they must be host memory.
    unsafe fn all_reduce_sum_ptr<T: Real>(
        &self,
        send: *const T,
        recv: *mut T,
        len: usize,
    ) -> Result<(), BenchError>;

    /// Whether buffers handed to the communicator may live in device memory.
    fn addresses_device_memory(&self) -> bool {
        false
    }

    // Scalar collectives used for timing and mismatch summaries
    fn all_reduce_sum_scalar(&self, x: f64) -> f64;
    fn all_reduce_max(&self, x: f64) -> f64;
    fn all_reduce_min(&self, x: f64) -> f64;

    /// Overwrite `buf` on every rank with the contents of `buf` on `root`.
    fn broadcast_bytes(&self, buf: &mut [u8], root: usize);

    /// Terminate every rank of the job.
    fn abort(&self, code: i32) -> !;

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

pub(crate) fn check_lengths(send: usize, recv: usize) -> Result<(), BenchError> {
    if send == recv {
        Ok(())
    } else {
        Err(BenchError::LengthMismatch { send, recv })
    }
}

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

pub mod thread_comm;
pub use thread_comm::ThreadComm;

pub enum UniverseComm {
    #[cfg(feature = "mpi")]
    Mpi(MpiComm),
    Threads(ThreadComm),
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            UniverseComm::Threads(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            UniverseComm::Threads(comm) => comm.size(),
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            UniverseComm::Threads(comm) => comm.barrier(),
        }
    }
    fn all_reduce_sum<T: Real>(&self, send: &[T], recv: &mut [T]) -> Result<(), BenchError> {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_sum(send, recv),
            UniverseComm::Threads(comm) => comm.all_reduce_sum(send, recv),
        }
    }
    unsafe fn all_reduce_sum_ptr<T: Real>(
        &self,
        send: *const T,
        recv: *mut T,
        len: usize,
    ) -> Result<(), BenchError> {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => unsafe { comm.all_reduce_sum_ptr(send, recv, len) },
            UniverseComm::Threads(comm) => unsafe { comm.all_reduce_sum_ptr(send, recv, len) },
        }
    }
    fn addresses_device_memory(&self) -> bool {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.addresses_device_memory(),
            UniverseComm::Threads(comm) => comm.addresses_device_memory(),
        }
    }
    fn all_reduce_sum_scalar(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_sum_scalar(x),
            UniverseComm::Threads(comm) => comm.all_reduce_sum_scalar(x),
        }
    }
    fn all_reduce_max(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_max(x),
            UniverseComm::Threads(comm) => comm.all_reduce_max(x),
        }
    }
    fn all_reduce_min(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_min(x),
            UniverseComm::Threads(comm) => comm.all_reduce_min(x),
        }
    }
    fn broadcast_bytes(&self, buf: &mut [u8], root: usize) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.broadcast_bytes(buf, root),
            UniverseComm::Threads(comm) => comm.broadcast_bytes(buf, root),
        }
    }
    fn abort(&self, code: i32) -> ! {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.abort(code),
            UniverseComm::Threads(comm) => comm.abort(code),
        }
    }
}

#[cfg(not(feature = "mpi"))]
pub trait Equivalence {}
#[cfg(not(feature = "mpi"))]
impl Equivalence for f32 {}
#[cfg(not(feature = "mpi"))]
impl Equivalence for f64 {}
