//! Named timing regions.
//!
//! A region is opened with [`Profiler::region`] and closed when the returned
//! guard drops; durations can also be recorded directly with
//! [`Profiler::record`]. Every rank records the same region names in the same
//! order, which is what lets [`Profiler::summarize`] reduce them across ranks
//! one by one.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::parallel::Comm;

/// Accumulated statistics of one region on this rank.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionStats {
    pub name: String,
    pub calls: usize,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

/// Cross-rank view of one region's inclusive time, in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSummary {
    pub name: String,
    pub calls: usize,
    pub min_total: f64,
    pub avg_total: f64,
    pub max_total: f64,
}

#[derive(Default)]
struct Table {
    stats: Vec<RegionStats>,
    index: HashMap<String, usize>,
}

#[derive(Default)]
pub struct Profiler {
    table: RefCell<Table>,
}

/// Open region; records on drop.
pub struct RegionGuard<'p> {
    profiler: &'p Profiler,
    name: Option<String>,
    start: Instant,
}

impl Drop for RegionGuard<'_> {
    fn drop(&mut self) {
        if let Some(name) = self.name.take() {
            self.profiler.record(name, self.start.elapsed());
        }
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(&self, name: impl Into<String>) -> RegionGuard<'_> {
        RegionGuard { profiler: self, name: Some(name.into()), start: Instant::now() }
    }

    pub fn record(&self, name: impl Into<String>, elapsed: Duration) {
        let name = name.into();
        let mut table = self.table.borrow_mut();
        let Table { stats, index } = &mut *table;
        match index.get(&name) {
            Some(&i) => {
                let s = &mut stats[i];
                s.calls += 1;
                s.total += elapsed;
                s.min = s.min.min(elapsed);
                s.max = s.max.max(elapsed);
            }
            None => {
                index.insert(name.clone(), stats.len());
                stats.push(RegionStats {
                    name,
                    calls: 1,
                    total: elapsed,
                    min: elapsed,
                    max: elapsed,
                });
            }
        }
    }

    /// Local statistics, in first-recorded order.
    pub fn stats(&self) -> Vec<RegionStats> {
        self.table.borrow().stats.clone()
    }

    pub fn get(&self, name: &str) -> Option<RegionStats> {
        let table = self.table.borrow();
        table.index.get(name).map(|&i| table.stats[i].clone())
    }

    /// Reduce every region's total time across ranks. Collective.
    ///
    /// Sorted by the slowest rank's total, descending.
    pub fn summarize<C: Comm>(&self, comm: &C) -> Vec<RegionSummary> {
        let ranks = comm.size() as f64;
        let mut out: Vec<RegionSummary> = self
            .stats()
            .into_iter()
            .map(|s| {
                let total = s.total.as_secs_f64();
                RegionSummary {
                    calls: s.calls,
                    min_total: comm.all_reduce_min(total),
                    avg_total: comm.all_reduce_sum_scalar(total) / ranks,
                    max_total: comm.all_reduce_max(total),
                    name: s.name,
                }
            })
            .collect();
        out.sort_by(|a, b| b.max_total.total_cmp(&a.max_total));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::ThreadComm;

    #[test]
    fn record_accumulates() {
        let p = Profiler::new();
        p.record("a", Duration::from_millis(3));
        p.record("a", Duration::from_millis(1));
        p.record("b", Duration::from_millis(5));
        let a = p.get("a").unwrap();
        assert_eq!(a.calls, 2);
        assert_eq!(a.total, Duration::from_millis(4));
        assert_eq!(a.min, Duration::from_millis(1));
        assert_eq!(a.max, Duration::from_millis(3));
        let names: Vec<_> = p.stats().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn guard_records_on_drop() {
        let p = Profiler::new();
        {
            let _g = p.region("scoped");
            assert!(p.get("scoped").is_none());
        }
        assert_eq!(p.get("scoped").unwrap().calls, 1);
    }

    #[test]
    fn summary_is_sorted_by_max_total() {
        let p = Profiler::new();
        p.record("short", Duration::from_millis(1));
        p.record("long", Duration::from_millis(10));
        let summary = p.summarize(&ThreadComm::solo());
        assert_eq!(summary[0].name, "long");
        assert_eq!(summary[1].name, "short");
        assert_eq!(summary[0].min_total, summary[0].max_total);
    }
}
