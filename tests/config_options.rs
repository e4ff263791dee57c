//! Tests for reading benchmark options from an inputs source.
//!
//! These tests build `BenchOptions` from inputs text the way the binary does,
//! checking required keys, defaults, command-line precedence and validation.

use allreduce_bench::config::{BenchOptions, Inputs};
use allreduce_bench::{BenchError, Precision};

const INPUTS: &str = "\
# sweep
warmup_count = 2
test_count   = 5
min_elements = 4
max_elements = 1024
mult_factor  = 4

check_result = 1
epsilon      = 1.e-10
do_cuda_aware_mpi = 0
";

fn options(extra: &[&str]) -> Result<BenchOptions, BenchError> {
    let mut inputs = Inputs::parse(INPUTS)?;
    inputs.apply_overrides(extra)?;
    BenchOptions::from_inputs(&inputs)
}

/// A complete inputs file yields the stated values and the documented defaults.
#[test]
fn full_inputs_file() {
    let opts = options(&[]).unwrap();
    assert_eq!(opts.warmup_count, 2);
    assert_eq!(opts.test_count, 5);
    assert_eq!(opts.iterations(), 7);
    assert!(opts.check_result);
    assert!(!opts.cuda_aware);
    assert_eq!(opts.epsilon, 1e-10);
    assert_eq!(opts.precision, Precision::Double);
    assert_eq!(opts.seed, allreduce_bench::config::options::DEFAULT_SEED);
    assert_eq!(opts.sizes().collect::<Vec<_>>(), vec![4, 16, 64, 256, 1024]);
}

/// Command-line overrides replace file values and may add optional keys.
#[test]
fn overrides_take_precedence() {
    let opts = options(&["do_cuda_aware_mpi=true", "precision=single", "max_elements=16"]).unwrap();
    assert!(opts.cuda_aware);
    assert_eq!(opts.precision, Precision::Single);
    assert_eq!(opts.sizes().collect::<Vec<_>>(), vec![4, 16]);
}

/// Every required key is reported by name when missing.
#[test]
fn missing_required_key() {
    let text = INPUTS.replace("mult_factor  = 4\n", "");
    let err = BenchOptions::from_inputs(&Inputs::parse(&text).unwrap()).unwrap_err();
    match err {
        BenchError::MissingInput(key) => assert_eq!(key, "mult_factor"),
        other => panic!("unexpected error: {other}"),
    }
}

/// Values that would make the sweep or the check meaningless are rejected.
#[test]
fn validation_rejects_bad_sweeps() {
    for bad in [
        &["mult_factor=1"][..],
        &["min_elements=0"][..],
        &["min_elements=2048"][..],
        &["test_count=0"][..],
        &["epsilon=0"][..],
        &["epsilon=-1"][..],
    ] {
        let err = options(bad).unwrap_err();
        assert!(matches!(err, BenchError::InvalidOptions(_)), "{bad:?} gave {err}");
    }
}

/// Unparsable values name the key and the offending text.
#[test]
fn unparsable_values() {
    let err = options(&["test_count=many"]).unwrap_err();
    match err {
        BenchError::InvalidInput { key, value, .. } => {
            assert_eq!(key, "test_count");
            assert_eq!(value, "many");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(options(&["precision=half"]).is_err());
    assert!(options(&["check_result=sometimes"]).is_err());
}
