//! NCCL all-reduce on CUDA device buffers.
//!
//! Bootstrap follows the usual pattern: rank 0 creates the unique id, the 128
//! raw bytes travel over the message-passing communicator, and every rank
//! joins with its rank and the world size. The NCCL communicator is torn down
//! when the collective is dropped.

use std::ffi::c_char;

use cudarc::nccl::result::NcclError;
use cudarc::nccl::safe::{Comm as NcclComm, Id, ReduceOp};

use crate::collective::DeviceCollective;
use crate::core::Real;
use crate::error::BenchError;
use crate::memory::CudaDevice;
use crate::parallel::Comm;

const ID_BYTES: usize = 128;

fn nccl(op: &'static str) -> impl FnOnce(NcclError) -> BenchError {
    move |e| BenchError::Collective { op, reason: format!("{e:?}") }
}

pub struct NcclCollective {
    comm: NcclComm,
}

impl NcclCollective {
    /// Collective: every rank of `comm` must call this together.
    pub fn bootstrap<C: Comm>(comm: &C, device: &CudaDevice) -> Result<Self, BenchError> {
        let mut bytes = [0u8; ID_BYTES];
        if comm.is_root() {
            let id = Id::new().map_err(nccl("ncclGetUniqueId"))?;
            for (b, c) in bytes.iter_mut().zip(id.internal()) {
                *b = *c as u8;
            }
        }
        comm.broadcast_bytes(&mut bytes, 0);
        let id = Id::uninit(bytes.map(|b| b as c_char));

        let nccl_comm = NcclComm::from_rank(device.stream().clone(), comm.rank(), comm.size(), id)
            .map_err(nccl("ncclCommInitRank"))?;
        tracing::info!(rank = comm.rank(), size = comm.size(), "NCCL communicator ready");
        Ok(Self { comm: nccl_comm })
    }
}

impl<T: Real> DeviceCollective<T, CudaDevice> for NcclCollective {
    fn label(&self) -> &str {
        "NCCL"
    }

    fn all_reduce_sum(
        &self,
        _device: &CudaDevice,
        send: &cudarc::driver::CudaSlice<T>,
        recv: &mut cudarc::driver::CudaSlice<T>,
    ) -> Result<(), BenchError> {
        self.comm
            .all_reduce(send, recv, &ReduceOp::Sum)
            .map(|_| ())
            .map_err(nccl("ncclAllReduce"))
    }
}
