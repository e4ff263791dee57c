use crate::collective::DeviceCollective;
use crate::core::Real;
use crate::error::BenchError;
use crate::memory::HostDevice;
use crate::parallel::Comm;

/// Device collective for [`HostDevice`] that forwards to a communicator.
pub struct HostCollective<'c, C> {
    comm: &'c C,
}

impl<'c, C: Comm> HostCollective<'c, C> {
    pub fn new(comm: &'c C) -> Self {
        Self { comm }
    }
}

impl<T: Real, C: Comm> DeviceCollective<T, HostDevice> for HostCollective<'_, C> {
    fn label(&self) -> &str {
        "Host collective"
    }

    fn all_reduce_sum(
        &self,
        _device: &HostDevice,
        send: &Vec<T>,
        recv: &mut Vec<T>,
    ) -> Result<(), BenchError> {
        self.comm.all_reduce_sum(send, recv)
    }
}
