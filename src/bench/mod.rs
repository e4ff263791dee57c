//! Size-sweep runner.
//!
//! [`Benchmark`] walks the configured sweep. For every size it allocates a
//! fresh set of host, pinned and device buffers, fills the input with normally
//! distributed values, runs each enabled path for `warmup_count + test_count`
//! iterations, optionally checks every path against the host-only result, and
//! drops the buffers before the next size.
//!
//! [`execute`] is the entry point used by the binary: it chooses the element
//! type and device for the build and reports results on the root rank.

use std::io::Write;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::collective::{DeviceCollective, PathSet, ReducePath, region_label};
use crate::config::BenchOptions;
use crate::core::{Precision, Real};
use crate::error::BenchError;
use crate::memory::Device;
use crate::parallel::Comm;
use crate::report;
use crate::utils::{CheckReport, Profiler, compare};

pub mod stats;
pub use stats::{PathTiming, TimingStats};

pub const DATA_MEAN: f64 = 1.0;
pub const DATA_STD_DEV: f64 = 0.5;

/// Outcome of the correctness check at one size.
#[derive(Clone, Debug)]
pub struct CheckOutcome {
    /// This rank's comparison.
    pub local: CheckReport,
    /// Wrong elements summed over all ranks.
    pub global_wrong: usize,
    /// Wrong elements per checked path summed over all ranks, in `local.labels` order.
    pub global_wrong_by_label: Vec<usize>,
}

impl CheckOutcome {
    pub fn all_match(&self) -> bool {
        self.global_wrong == 0
    }

    /// False when the path labelled `label` disagreed with the reference on any rank.
    /// Paths that were not checked pass.
    pub fn passed(&self, label: &str) -> bool {
        self.local
            .labels
            .iter()
            .zip(&self.global_wrong_by_label)
            .all(|(l, &wrong)| l != label || wrong == 0)
    }
}

/// Results for one message size.
#[derive(Clone, Debug)]
pub struct SizeReport {
    pub n_elements: usize,
    pub bytes: usize,
    pub timings: Vec<PathTiming>,
    pub check: Option<CheckOutcome>,
}

impl SizeReport {
    /// Whether `timing`'s path agreed with the host-only result, or was not checked.
    pub fn passed(&self, timing: &PathTiming) -> bool {
        self.check.as_ref().is_none_or(|c| c.passed(&timing.label))
    }

    /// Path with the lowest cross-rank mean time among those that passed the check.
    pub fn fastest(&self) -> Option<&PathTiming> {
        self.timings
            .iter()
            .filter(|t| self.passed(t))
            .min_by(|a, b| a.global.mean.total_cmp(&b.global.mean))
    }

    pub fn timing(&self, path: ReducePath) -> Option<&PathTiming> {
        self.timings.iter().find(|t| t.path == path)
    }
}

/// Each iteration first stages its input outside the timed region, then reduces inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Stage,
    Reduce,
}

pub struct Benchmark<'a, T: Real, C, D: Device<T>> {
    opts: &'a BenchOptions,
    comm: &'a C,
    device: &'a D,
    collective: Option<&'a dyn DeviceCollective<T, D>>,
    profiler: Profiler,
    rng: StdRng,
}

impl<'a, T: Real, C: Comm, D: Device<T>> Benchmark<'a, T, C, D> {
    pub fn new(opts: &'a BenchOptions, comm: &'a C, device: &'a D) -> Self {
        let rng = StdRng::seed_from_u64(opts.seed.wrapping_add(comm.rank() as u64));
        Self { opts, comm, device, collective: None, profiler: Profiler::new(), rng }
    }

    /// Enable the device-collective path.
    pub fn with_collective(mut self, collective: &'a dyn DeviceCollective<T, D>) -> Self {
        self.collective = Some(collective);
        self
    }

    pub fn paths(&self) -> PathSet {
        PathSet::for_run(self.opts.cuda_aware, self.collective.is_some())
    }

    /// Fails when an enabled path cannot run on this communicator and device pair.
    ///
    /// The CUDA-aware path hands device addresses to the communicator, which is only
    /// sound when the communicator can address device memory or the device is host memory.
    pub fn check_support(&self) -> Result<(), BenchError> {
        if self.paths().contains(PathSet::CUDA_AWARE)
            && !self.device.host_accessible()
            && !self.comm.addresses_device_memory()
        {
            return Err(BenchError::Unsupported(
                "do_cuda_aware_mpi needs a communicator that can address device memory",
            ));
        }
        Ok(())
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Run the whole sweep, handing each size's report to `on_size` as soon as it is done.
    ///
    /// The sweep as a whole is recorded as the `main` region.
    pub fn run(
        &mut self,
        mut on_size: impl FnMut(&SizeReport),
    ) -> Result<Vec<SizeReport>, BenchError> {
        self.check_support()?;
        let start = Instant::now();
        let mut reports = Vec::new();
        for n in self.opts.sizes() {
            let report = self.run_size(n)?;
            on_size(&report);
            reports.push(report);
        }
        self.profiler.record("main", start.elapsed());
        Ok(reports)
    }

    fn random_data(&mut self, n: usize) -> Result<Vec<T>, BenchError> {
        let normal = Normal::new(DATA_MEAN, DATA_STD_DEV)
            .map_err(|e| BenchError::InvalidOptions(e.to_string()))?;
        Ok((0..n)
            .map(|_| T::from_f64(normal.sample(&mut self.rng)).unwrap_or_else(T::zero))
            .collect())
    }

    pub fn run_size(&mut self, n: usize) -> Result<SizeReport, BenchError> {
        self.check_support()?;
        let paths = self.paths();
        let data = self.random_data(n)?;
        let (opts, comm, device, collective) = (self.opts, self.comm, self.device, self.collective);
        let profiler = &self.profiler;
        let _size_region = profiler.region(format!("Test = {n}"));
        tracing::info!(n, paths = ?paths, "starting size");

        let mut host = vec![T::zero(); n];
        let mut pinned_send = device.alloc_pinned(n)?;
        let mut pinned_recv = device.alloc_pinned(n)?;
        let mut staged = device.alloc(n)?;
        let mut aware = if paths.contains(PathSet::CUDA_AWARE) {
            Some((device.alloc(n)?, device.alloc(n)?))
        } else {
            None
        };
        let mut coll = if paths.contains(PathSet::DEVICE_COLLECTIVE) {
            Some((device.alloc(n)?, device.alloc(n)?))
        } else {
            None
        };

        let mut timings = Vec::new();

        // Host buffer straight into the communicator
        let samples = measure(profiler, opts, ReducePath::Host.label(), n, |step| match step {
            Step::Stage => Ok(()),
            Step::Reduce => comm.all_reduce_sum(&data, &mut host),
        })?;
        timings.push(PathTiming::new(ReducePath::Host, ReducePath::Host.label(), &samples, comm));

        // Device -> pinned host -> communicator -> device
        let samples = measure(profiler, opts, ReducePath::Staged.label(), n, |step| match step {
            Step::Stage => {
                device.htod(&data, &mut staged)?;
                device.synchronize()
            }
            Step::Reduce => {
                device.dtoh_pinned(&staged, &mut pinned_send)?;
                let send = device.pinned_slice(&pinned_send)?;
                let recv = device.pinned_slice_mut(&mut pinned_recv)?;
                comm.all_reduce_sum(send, recv)?;
                device.htod_pinned(&pinned_recv, &mut staged)
            }
        })?;
        let label = ReducePath::Staged.label();
        timings.push(PathTiming::new(ReducePath::Staged, label, &samples, comm));

        // Device buffers handed straight to the communicator
        if let Some((send, recv)) = aware.as_mut() {
            let label = ReducePath::CudaAware.label();
            let samples = measure(profiler, opts, label, n, |step| match step {
                Step::Stage => {
                    device.htod(&data, send)?;
                    device.synchronize()
                }
                Step::Reduce => {
                    let (s, r) = (device.device_ptr(send), device.device_ptr_mut(recv));
                    // SAFETY: both buffers hold `n` elements, the copy into `send`
                    // has completed, and `check_support` rejected device memory
                    // the communicator cannot address.
                    unsafe { comm.all_reduce_sum_ptr(s, r, n) }
                }
            })?;
            timings.push(PathTiming::new(ReducePath::CudaAware, label, &samples, comm));
        }

        // GPU-native collective
        if let (Some(collective), Some((send, recv))) = (collective, coll.as_mut()) {
            let label = collective.label();
            let samples = measure(profiler, opts, label, n, |step| match step {
                Step::Stage => {
                    device.htod(&data, send)?;
                    device.synchronize()
                }
                Step::Reduce => {
                    collective.all_reduce_sum(device, send, recv)?;
                    device.synchronize()
                }
            })?;
            timings.push(PathTiming::new(ReducePath::DeviceCollective, label, &samples, comm));
        }

        let check = if opts.check_result {
            let mut staged_host = vec![T::zero(); n];
            device.dtoh(&staged, &mut staged_host)?;
            let mut candidates: Vec<(&str, Vec<T>)> =
                vec![(ReducePath::Staged.label(), staged_host)];
            if let Some((_, recv)) = aware.as_ref() {
                let mut out = vec![T::zero(); n];
                device.dtoh(recv, &mut out)?;
                candidates.push((ReducePath::CudaAware.label(), out));
            }
            if let (Some(collective), Some((_, recv))) = (collective, coll.as_ref()) {
                let mut out = vec![T::zero(); n];
                device.dtoh(recv, &mut out)?;
                candidates.push((collective.label(), out));
            }
            let views: Vec<(&str, &[T])> =
                candidates.iter().map(|(l, v)| (*l, v.as_slice())).collect();
            let local = compare(&host, &views, opts.epsilon, opts.max_report)?;
            let global_wrong = comm.all_reduce_sum_scalar(local.wrong as f64) as usize;
            let global_wrong_by_label = local
                .wrong_by_label
                .iter()
                .map(|&w| comm.all_reduce_sum_scalar(w as f64) as usize)
                .collect();
            if global_wrong > 0 {
                tracing::warn!(
                    n,
                    local = local.wrong,
                    global = global_wrong,
                    "reductions disagree"
                );
            }
            Some(CheckOutcome { local, global_wrong, global_wrong_by_label })
        } else {
            None
        };

        tracing::debug!(n, "releasing buffers");
        Ok(SizeReport { n_elements: n, bytes: n * std::mem::size_of::<T>(), timings, check })
    }
}

// Runs one path for warmup + timed iterations; returns the timed samples in seconds.
fn measure<F>(
    profiler: &Profiler,
    opts: &BenchOptions,
    label: &str,
    n: usize,
    mut step: F,
) -> Result<Vec<f64>, BenchError>
where
    F: FnMut(Step) -> Result<(), BenchError>,
{
    let mut samples = Vec::with_capacity(opts.test_count);
    for iter in 0..opts.iterations() {
        step(Step::Stage)?;
        let name = region_label(label, n, iter, opts.warmup_count);
        let start = Instant::now();
        step(Step::Reduce)?;
        let elapsed = start.elapsed();
        profiler.record(name, elapsed);
        if iter >= opts.warmup_count {
            samples.push(elapsed.as_secs_f64());
        }
    }
    Ok(samples)
}

/// Run the sweep on this rank with the device this build targets.
///
/// Rank 0 writes per-size results and the final timing table to `out`.
pub fn execute<C: Comm, W: Write>(
    comm: &C,
    opts: &BenchOptions,
    out: &mut W,
) -> Result<Vec<SizeReport>, BenchError> {
    match opts.precision {
        Precision::Double => execute_typed::<f64, C, W>(comm, opts, out),
        Precision::Single => execute_typed::<f32, C, W>(comm, opts, out),
    }
}

fn execute_typed<T: Real, C: Comm, W: Write>(
    comm: &C,
    opts: &BenchOptions,
    out: &mut W,
) -> Result<Vec<SizeReport>, BenchError> {
    #[cfg(feature = "cuda")]
    let device = crate::memory::CudaDevice::for_rank(comm.rank())?;
    #[cfg(not(feature = "cuda"))]
    let device = crate::memory::HostDevice::new();

    #[cfg(feature = "nccl")]
    let nccl = crate::collective::NcclCollective::bootstrap(comm, &device)?;

    let bench = Benchmark::<T, C, _>::new(opts, comm, &device);
    #[cfg(feature = "nccl")]
    let bench = bench.with_collective(&nccl);
    let mut bench = bench;

    bench.check_support()?;
    let root = comm.is_root();
    if root {
        let described = Device::<T>::describe(&device);
        report::write_header(out, opts, comm.size(), &described, bench.paths())?;
    }
    let mut write_err = None;
    let reports = bench.run(|r| {
        if root && write_err.is_none() {
            write_err = report::write_size_report(out, r, opts.max_report).err();
        }
    })?;
    if let Some(e) = write_err {
        return Err(e.into());
    }

    let summary = bench.profiler().summarize(comm);
    if root {
        report::write_profile(out, &summary)?;
    }
    Ok(reports)
}
