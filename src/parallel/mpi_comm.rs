//! MPI-based communicator.
//!
//! This module provides an implementation of the `Comm` trait on top of the MPI
//! world communicator. Host-only and staged reductions hand host slices to
//! `MPI_Allreduce`; the CUDA-aware path hands it device addresses, which only
//! works when the MPI library was built with device-memory support.
//!
//! # Usage
//!
//! - `MpiComm::new()` initializes MPI and keeps the universe alive for as long
//!   as the communicator exists. Dropping it finalizes MPI.
//! - Any rank hitting an error should call `abort` so the whole job exits.
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")]
//! # {
//! use allreduce_bench::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().unwrap();
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

use mpi::collective::SystemOperation;
use mpi::raw::AsRaw;
use mpi::{Count, ffi};
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use crate::core::Real;
use crate::error::BenchError;

/// MPI communicator wrapper for distributed runs.
pub struct MpiComm {
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
    // Dropped last: finalizes MPI.
    _universe: Universe,
}

impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    pub fn new() -> Result<Self, BenchError> {
        let universe = mpi::initialize()
            .ok_or_else(|| BenchError::Comm("MPI was already initialized".into()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        tracing::debug!(rank, size, "initialized MPI world communicator");
        Ok(MpiComm { world, rank, size, _universe: universe })
    }
}

impl super::Comm for MpiComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }
    fn barrier(&self) { self.world.barrier(); }

    fn all_reduce_sum<T: Real>(&self, send: &[T], recv: &mut [T]) -> Result<(), BenchError> {
        super::check_lengths(send.len(), recv.len())?;
        self.world.all_reduce_into(send, recv, SystemOperation::sum());
        Ok(())
    }

    unsafe fn all_reduce_sum_ptr<T: Real>(
        &self,
        send: *const T,
        recv: *mut T,
        len: usize,
    ) -> Result<(), BenchError> {
        let count = Count::try_from(len)
            .map_err(|_| BenchError::Comm(format!("{len} elements exceed the MPI count range")))?;
        let datatype = T::equivalent_datatype();
        // The MPI library, not Rust, dereferences these addresses.
        let code = unsafe {
            ffi::MPI_Allreduce(
                send.cast(),
                recv.cast(),
                count,
                datatype.as_raw(),
                SystemOperation::sum().as_raw(),
                self.world.as_raw(),
            )
        };
        if code != 0 {
            return Err(BenchError::Comm(format!("MPI_Allreduce returned error code {code}")));
        }
        Ok(())
    }

    /// CUDA-aware MPI libraries accept device pointers; `do_cuda_aware_mpi`
    /// asserts the library in use is one.
    fn addresses_device_memory(&self) -> bool {
        true
    }

    fn all_reduce_sum_scalar(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, SystemOperation::sum());
        y
    }

    fn all_reduce_max(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, SystemOperation::max());
        y
    }

    fn all_reduce_min(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, SystemOperation::min());
        y
    }

    fn broadcast_bytes(&self, buf: &mut [u8], root: usize) {
        self.world.process_at_rank(root as i32).broadcast_into(buf);
    }

    fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }
}
