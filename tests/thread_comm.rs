//! Tests for the in-process thread communicator.
//!
//! Each test spawns one thread per rank and checks the collectives against a
//! serial computation of the same result.

use allreduce_bench::parallel::{Comm, ThreadComm};
use approx::assert_abs_diff_eq;
use rand::Rng;

fn rank_data(ranks: usize, n: usize) -> Vec<Vec<f64>> {
    let mut rng = rand::thread_rng();
    (0..ranks).map(|_| (0..n).map(|_| rng.r#gen::<f64>()).collect()).collect()
}

/// All-reduce sum over four ranks matches a serial sum, and every rank gets the same bits.
#[test]
fn all_reduce_sum_matches_serial() {
    let ranks = 4;
    let n = 257;
    let data = rank_data(ranks, n);
    let expected: Vec<f64> = (0..n).map(|i| data.iter().map(|d| d[i]).sum()).collect();

    let results: Vec<Vec<f64>> = std::thread::scope(|s| {
        let handles: Vec<_> = ThreadComm::group(ranks)
            .into_iter()
            .map(|comm| {
                let send = &data[comm.rank()];
                s.spawn(move || {
                    let mut recv = vec![0.0; n];
                    comm.all_reduce_sum(send, &mut recv).unwrap();
                    recv
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for r in &results {
        assert_eq!(r, &results[0]);
    }
    for (got, want) in results[0].iter().zip(&expected) {
        assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
    }
}

/// Repeated collectives on the same group stay in step.
#[test]
fn repeated_single_precision_reductions() {
    let ranks = 3;
    std::thread::scope(|s| {
        for comm in ThreadComm::group(ranks) {
            s.spawn(move || {
                for round in 0..10 {
                    let send = vec![(comm.rank() + round) as f32; 8];
                    let mut recv = vec![0.0f32; 8];
                    comm.all_reduce_sum(&send, &mut recv).unwrap();
                    let want = (0..ranks).map(|r| (r + round) as f32).sum::<f32>();
                    assert!(recv.iter().all(|&v| v == want), "round {round}: {recv:?}");
                }
            });
        }
    });
}

/// Broadcast copies the root's bytes to every other rank.
#[test]
fn broadcast_from_root() {
    std::thread::scope(|s| {
        for comm in ThreadComm::group(5) {
            s.spawn(move || {
                let mut buf = if comm.rank() == 2 { [7u8; 16] } else { [0u8; 16] };
                comm.broadcast_bytes(&mut buf, 2);
                assert_eq!(buf, [7u8; 16]);
            });
        }
    });
}
