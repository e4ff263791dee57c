//! Element-wise tolerance check of every path against the host-only result.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::core::Real;
use crate::error::BenchError;

/// One element where some path strayed from the reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Mismatch {
    pub index: usize,
    pub reference: f64,
    /// Value of each candidate, in candidate order.
    pub values: Vec<f64>,
    /// Largest absolute difference over all candidates.
    pub diff: f64,
}

#[derive(Clone, Debug, Default)]
pub struct CheckReport {
    /// Candidate labels, in the order their values appear in each mismatch.
    pub labels: Vec<String>,
    /// The first mismatches, in index order, capped at the `keep` argument of [`compare`].
    pub mismatches: Vec<Mismatch>,
    /// Total number of wrong elements.
    pub wrong: usize,
    /// Wrong elements per candidate, in label order.
    pub wrong_by_label: Vec<usize>,
    pub checked: usize,
}

impl CheckReport {
    pub fn all_match(&self) -> bool {
        self.wrong == 0
    }
}

fn diff<T: Real>(reference: T, value: T) -> f64 {
    let r = reference.to_f64().unwrap_or(f64::NAN);
    (r - value.to_f64().unwrap_or(f64::NAN)).abs()
}

fn max_diff<T: Real>(reference: T, candidates: &[(&str, &[T])], i: usize) -> f64 {
    candidates.iter().fold(0.0, |acc: f64, (_, values)| {
        let d = diff(reference, values[i]);
        // NaN must survive the fold
        if d.is_nan() || d > acc { d } else { acc }
    })
}

/// Compare each candidate against `reference`.
///
/// Element `i` is wrong when `max_c |reference[i] - c[i]| >= epsilon`; a NaN
/// difference is always wrong. At most `keep` mismatches are kept in the
/// report, but all are counted.
pub fn compare<T: Real>(
    reference: &[T],
    candidates: &[(&str, &[T])],
    epsilon: f64,
    keep: usize,
) -> Result<CheckReport, BenchError> {
    let n = reference.len();
    if let Some((_, values)) = candidates.iter().find(|(_, v)| v.len() != n) {
        return Err(BenchError::LengthMismatch { send: n, recv: values.len() });
    }

    let is_wrong = |i: usize| !(max_diff(reference[i], candidates, i) < epsilon);

    #[cfg(feature = "rayon")]
    let wrong: Vec<usize> = (0..n).into_par_iter().filter(|&i| is_wrong(i)).collect();
    #[cfg(not(feature = "rayon"))]
    let wrong: Vec<usize> = (0..n).filter(|&i| is_wrong(i)).collect();

    let mismatches = wrong
        .iter()
        .take(keep)
        .map(|&i| Mismatch {
            index: i,
            reference: reference[i].to_f64().unwrap_or(f64::NAN),
            values: candidates
                .iter()
                .map(|(_, v)| v[i].to_f64().unwrap_or(f64::NAN))
                .collect(),
            diff: max_diff(reference[i], candidates, i),
        })
        .collect();

    let wrong_by_label = candidates
        .iter()
        .map(|(_, values)| {
            wrong
                .iter()
                .filter(|&&i| !(diff(reference[i], values[i]) < epsilon))
                .count()
        })
        .collect();

    Ok(CheckReport {
        labels: candidates.iter().map(|(l, _)| l.to_string()).collect(),
        mismatches,
        wrong: wrong.len(),
        wrong_by_label,
        checked: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identical_results_match() {
        let r = vec![1.0f64, 2.0, 3.0];
        let report = compare(&r, &[("a", &r[..]), ("b", &r[..])], 1e-12, 10).unwrap();
        assert!(report.all_match());
        assert_eq!(report.checked, 3);
        assert_eq!(report.labels, vec!["a", "b"]);
    }

    #[test]
    fn difference_equal_to_epsilon_is_wrong() {
        let r = vec![1.0f64, 1.0];
        let c = vec![1.5f64, 1.25];
        let report = compare(&r, &[("c", &c[..])], 0.5, 10).unwrap();
        assert_eq!(report.wrong, 1);
        assert_eq!(report.mismatches[0].index, 0);
        assert_abs_diff_eq!(report.mismatches[0].diff, 0.5, epsilon = 1e-15);
    }

    #[test]
    fn worst_candidate_decides() {
        let r = vec![0.0f32; 4];
        let good = vec![0.0f32; 4];
        let bad = vec![0.0f32, 0.0, 2.0, 0.0];
        let report = compare(&r, &[("good", &good[..]), ("bad", &bad[..])], 1e-3, 10).unwrap();
        assert_eq!(report.wrong, 1);
        assert_eq!(report.mismatches[0].values, vec![0.0, 2.0]);
        assert_eq!(report.wrong_by_label, vec![0, 1]);
    }

    #[test]
    fn nan_is_always_wrong() {
        let r = vec![1.0f64];
        let c = vec![f64::NAN];
        assert_eq!(compare(&r, &[("nan", &c[..])], 1.0, 10).unwrap().wrong, 1);
    }

    #[test]
    fn keep_caps_listed_mismatches_only() {
        let r = vec![0.0f64; 100];
        let c = vec![1.0f64; 100];
        let report = compare(&r, &[("c", &c[..])], 0.5, 5).unwrap();
        assert_eq!(report.wrong, 100);
        assert_eq!(report.mismatches.len(), 5);
        assert_eq!(report.mismatches[4].index, 4);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let r = vec![0.0f64; 3];
        let c = vec![0.0f64; 2];
        assert!(compare(&r, &[("c", &c[..])], 0.5, 5).is_err());
    }
}
