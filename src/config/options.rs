//! Benchmark options.
//!
//! This module provides the `BenchOptions` struct, read from an [`Inputs`]
//! source, and the `SizeSweep` iterator over message sizes. Required keys
//! mirror the inputs every run must state explicitly; the rest have defaults.

use crate::config::Inputs;
use crate::core::Precision;
use crate::error::BenchError;

pub const DEFAULT_SEED: u64 = 27182;
pub const DEFAULT_MAX_REPORT: usize = 32;

/// Sweep, iteration and checking parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchOptions {
    /// Untimed iterations per path and size
    pub warmup_count: usize,
    /// Timed iterations per path and size
    pub test_count: usize,
    /// First message size, in elements
    pub min_elements: usize,
    /// Inclusive upper bound of the sweep, in elements
    pub max_elements: usize,
    /// Size multiplier between sweep steps
    pub mult_factor: usize,
    /// Compare every path against the host-only result
    pub check_result: bool,
    /// An element is wrong when its difference reaches this value
    pub epsilon: f64,
    /// Run the CUDA-aware path
    pub cuda_aware: bool,
    pub precision: Precision,
    /// Base RNG seed; each rank adds its rank
    pub seed: u64,
    /// Mismatch lines printed per size
    pub max_report: usize,
}

impl BenchOptions {
    pub fn from_inputs(inputs: &Inputs) -> Result<Self, BenchError> {
        let opts = BenchOptions {
            warmup_count: inputs.get("warmup_count")?,
            test_count: inputs.get("test_count")?,
            min_elements: inputs.get("min_elements")?,
            max_elements: inputs.get("max_elements")?,
            mult_factor: inputs.get("mult_factor")?,
            check_result: inputs.get_bool("check_result")?,
            epsilon: inputs.get("epsilon")?,
            cuda_aware: inputs.get_bool("do_cuda_aware_mpi")?,
            precision: inputs.query("precision")?.unwrap_or_default(),
            seed: inputs.query("seed")?.unwrap_or(DEFAULT_SEED),
            max_report: inputs.query("max_report")?.unwrap_or(DEFAULT_MAX_REPORT),
        };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        let fail = |msg: String| Err(BenchError::InvalidOptions(msg));
        if self.min_elements == 0 {
            return fail("min_elements must be at least 1".into());
        }
        if self.max_elements < self.min_elements {
            return fail(format!(
                "max_elements ({}) is smaller than min_elements ({})",
                self.max_elements, self.min_elements
            ));
        }
        if self.mult_factor < 2 {
            return fail(format!("mult_factor must be at least 2, got {}", self.mult_factor));
        }
        if self.test_count == 0 {
            return fail("test_count must be at least 1".into());
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return fail(format!("epsilon must be positive and finite, got {}", self.epsilon));
        }
        Ok(())
    }

    /// Total iterations run per path and size.
    pub fn iterations(&self) -> usize {
        self.warmup_count + self.test_count
    }

    pub fn sizes(&self) -> SizeSweep {
        SizeSweep::new(self.min_elements, self.max_elements, self.mult_factor)
    }
}

/// Multiplicative sweep `min, min*f, min*f², ...` up to and including `max`.
#[derive(Debug, Clone)]
pub struct SizeSweep {
    next: Option<usize>,
    max: usize,
    factor: usize,
}

impl SizeSweep {
    pub fn new(min: usize, max: usize, factor: usize) -> Self {
        let next = (min >= 1 && min <= max && factor >= 2).then_some(min);
        Self { next, max, factor }
    }
}

impl Iterator for SizeSweep {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let n = self.next?;
        self.next = n.checked_mul(self.factor).filter(|&m| m <= self.max);
        Some(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_is_inclusive() {
        let sizes: Vec<_> = SizeSweep::new(1, 8, 2).collect();
        assert_eq!(sizes, vec![1, 2, 4, 8]);
        let sizes: Vec<_> = SizeSweep::new(3, 100, 10).collect();
        assert_eq!(sizes, vec![3, 30]);
    }

    #[test]
    fn sweep_stops_on_overflow() {
        let sizes: Vec<_> = SizeSweep::new(usize::MAX / 2, usize::MAX, 4).collect();
        assert_eq!(sizes, vec![usize::MAX / 2]);
    }

    #[test]
    fn degenerate_sweeps_are_empty() {
        assert_eq!(SizeSweep::new(0, 8, 2).count(), 0);
        assert_eq!(SizeSweep::new(16, 8, 2).count(), 0);
        assert_eq!(SizeSweep::new(1, 8, 1).count(), 0);
    }
}
