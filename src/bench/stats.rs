//! Timing statistics of one path at one size.

use crate::collective::ReducePath;
use crate::parallel::Comm;

/// Mean, min and max of a set of samples, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimingStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl TimingStats {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let sum: f64 = samples.iter().sum();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self { mean: sum / samples.len() as f64, min, max }
    }

    /// Cross-rank view: the slowest rank's mean, the fastest sample and the slowest sample.
    pub fn across<C: Comm>(&self, comm: &C) -> Self {
        Self {
            mean: comm.all_reduce_max(self.mean),
            min: comm.all_reduce_min(self.min),
            max: comm.all_reduce_max(self.max),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PathTiming {
    pub path: ReducePath,
    /// Label used in timing regions, e.g. `CPU only` or `NCCL`.
    pub label: String,
    pub samples: usize,
    pub local: TimingStats,
    pub global: TimingStats,
}

impl PathTiming {
    /// Collective: reduces the local statistics across `comm`.
    pub fn new<C: Comm>(path: ReducePath, label: &str, samples: &[f64], comm: &C) -> Self {
        let local = TimingStats::from_samples(samples);
        Self {
            path,
            label: label.to_string(),
            samples: samples.len(),
            local,
            global: local.across(comm),
        }
    }

    /// Effective bandwidth in bytes per second for a message of `bytes`, from the cross-rank mean.
    pub fn bandwidth(&self, bytes: usize) -> f64 {
        if self.global.mean > 0.0 { bytes as f64 / self.global.mean } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn stats_from_samples() {
        let s = TimingStats::from_samples(&[1.0, 3.0, 2.0]);
        assert_abs_diff_eq!(s.mean, 2.0, epsilon = 1e-15);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert_eq!(TimingStats::from_samples(&[]), TimingStats::default());
    }

    #[test]
    fn bandwidth_uses_global_mean() {
        let comm = crate::parallel::ThreadComm::solo();
        let t = PathTiming::new(ReducePath::Host, "CPU only", &[0.5, 0.5], &comm);
        assert_abs_diff_eq!(t.bandwidth(1024), 2048.0, epsilon = 1e-9);
    }
}
