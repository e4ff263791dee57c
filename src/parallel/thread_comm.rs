// thread-based communicator: N ranks sharing one process

use std::sync::{Arc, Barrier, Mutex, MutexGuard, PoisonError};

use crate::core::Real;
use crate::error::BenchError;

struct Shared {
    size: usize,
    barrier: Barrier,
    arrays: Mutex<Vec<Vec<f64>>>,
    scalars: Mutex<Vec<f64>>,
    bytes: Mutex<Vec<u8>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One rank of an in-process communicator group.
///
/// Every rank of a group must take part in each collective, in the same order,
/// from its own thread. Sums are accumulated in rank order, so every rank sees
/// bit-identical results.
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Build a group of `size` ranks; hand one to each thread.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            arrays: Mutex::new(vec![Vec::new(); size]),
            scalars: Mutex::new(vec![0.0; size]),
            bytes: Mutex::new(Vec::new()),
        });
        (0..size)
            .map(|rank| ThreadComm { rank, shared: Arc::clone(&shared) })
            .collect()
    }

    /// A single-rank group, where every collective is a copy.
    pub fn solo() -> ThreadComm {
        let shared = Arc::new(Shared {
            size: 1,
            barrier: Barrier::new(1),
            arrays: Mutex::new(vec![Vec::new()]),
            scalars: Mutex::new(vec![0.0]),
            bytes: Mutex::new(Vec::new()),
        });
        ThreadComm { rank: 0, shared }
    }

    fn reduce_scalar(&self, x: f64, op: fn(f64, f64) -> f64) -> f64 {
        lock(&self.shared.scalars)[self.rank] = x;
        self.shared.barrier.wait();
        let out = {
            let scalars = lock(&self.shared.scalars);
            scalars[1..].iter().fold(scalars[0], |acc, &v| op(acc, v))
        };
        self.shared.barrier.wait();
        out
    }
}

impl super::Comm for ThreadComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.shared.size }
    fn barrier(&self) { self.shared.barrier.wait(); }

    fn all_reduce_sum<T: Real>(&self, send: &[T], recv: &mut [T]) -> Result<(), BenchError> {
        super::check_lengths(send.len(), recv.len())?;
        lock(&self.shared.arrays)[self.rank] = send
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect();
        self.shared.barrier.wait();
        let result = {
            let arrays = lock(&self.shared.arrays);
            match arrays.iter().find(|a| a.len() != recv.len()) {
                Some(other) => {
                    Err(BenchError::LengthMismatch { send: other.len(), recv: recv.len() })
                }
                None => {
                    for (i, r) in recv.iter_mut().enumerate() {
                        let sum = arrays.iter().fold(0.0, |acc, a| acc + a[i]);
                        *r = T::from_f64(sum).unwrap_or_else(T::nan);
                    }
                    Ok(())
                }
            }
        };
        // Slots stay untouched until every rank has read them.
        self.shared.barrier.wait();
        result
    }

    unsafe fn all_reduce_sum_ptr<T: Real>(
        &self,
        send: *const T,
        recv: *mut T,
        len: usize,
    ) -> Result<(), BenchError> {
        // Host memory only: this communicator reads every element.
        let (send, recv) = unsafe {
            (std::slice::from_raw_parts(send, len), std::slice::from_raw_parts_mut(recv, len))
        };
        self.all_reduce_sum(send, recv)
    }

    fn all_reduce_sum_scalar(&self, x: f64) -> f64 {
        self.reduce_scalar(x, |a, b| a + b)
    }

    fn all_reduce_max(&self, x: f64) -> f64 {
        self.reduce_scalar(x, f64::max)
    }

    fn all_reduce_min(&self, x: f64) -> f64 {
        self.reduce_scalar(x, f64::min)
    }

    fn broadcast_bytes(&self, buf: &mut [u8], root: usize) {
        if self.rank == root {
            *lock(&self.shared.bytes) = buf.to_vec();
        }
        self.shared.barrier.wait();
        if self.rank != root {
            let bytes = lock(&self.shared.bytes);
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
        }
        self.shared.barrier.wait();
    }

    fn abort(&self, code: i32) -> ! {
        tracing::error!(rank = self.rank, code, "aborting thread-rank group");
        std::process::exit(code)
    }
}
