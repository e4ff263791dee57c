//! Text output written by the root rank.

use std::io::{self, Write};

use crate::bench::SizeReport;
use crate::collective::{PathSet, ReducePath};
use crate::config::BenchOptions;
use crate::utils::RegionSummary;

/// `1536` -> `1.50 KiB`.
pub fn human_bytes(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{bytes} B") } else { format!("{value:.2} {}", UNITS[unit]) }
}

fn gb_per_s(bytes_per_s: f64) -> f64 {
    bytes_per_s / 1.0e9
}

pub fn write_header<W: Write>(
    out: &mut W,
    opts: &BenchOptions,
    ranks: usize,
    device: &str,
    paths: PathSet,
) -> io::Result<()> {
    let enabled: Vec<&str> = ReducePath::ALL
        .into_iter()
        .filter(|p| paths.contains(p.flag()))
        .map(ReducePath::label)
        .collect();
    writeln!(out, "All-reduce sum benchmark")?;
    writeln!(out, "  ranks      : {ranks}")?;
    writeln!(out, "  device     : {device}")?;
    writeln!(out, "  precision  : {}", opts.precision)?;
    writeln!(
        out,
        "  sizes      : {} .. {} elements, x{}",
        opts.min_elements, opts.max_elements, opts.mult_factor
    )?;
    writeln!(out, "  iterations : {} warmup + {} timed", opts.warmup_count, opts.test_count)?;
    writeln!(out, "  paths      : {}", enabled.join(", "))?;
    if opts.check_result {
        writeln!(out, "  check      : epsilon = {:e}", opts.epsilon)?;
    }
    writeln!(out)
}

/// Timing lines, the fastest passing path and the check outcome for one size.
///
/// Paths that failed the check are marked `MISMATCH` and never named fastest.
pub fn write_size_report<W: Write>(
    out: &mut W,
    report: &SizeReport,
    max_report: usize,
) -> io::Result<()> {
    writeln!(out, "Test = {} ({})", report.n_elements, human_bytes(report.bytes))?;
    for t in &report.timings {
        write!(
            out,
            "  {:<18} mean {:>11.4e} s  min {:>11.4e} s  max {:>11.4e} s  {:>9.3} GB/s",
            t.label,
            t.global.mean,
            t.global.min,
            t.global.max,
            gb_per_s(t.bandwidth(report.bytes)),
        )?;
        if !report.passed(t) {
            write!(out, "  MISMATCH")?;
        }
        writeln!(out)?;
    }
    if let Some(fastest) = report.fastest() {
        writeln!(out, "  fastest: {}", fastest.label)?;
    }

    if let Some(check) = &report.check {
        for m in check.local.mismatches.iter().take(max_report) {
            write!(out, "{} doesn't match: {:.16e}", m.index, m.reference)?;
            for v in &m.values {
                write!(out, " {v:.16e}")?;
            }
            writeln!(out)?;
        }
        if check.all_match() {
            writeln!(out, "All reductions match!")?;
        } else {
            writeln!(
                out,
                "{} mismatched elements across all ranks (columns: reference {})",
                check.global_wrong,
                check.local.labels.join(" "),
            )?;
        }
    }
    writeln!(out)
}

/// Timing-region table: inclusive time per region across ranks.
pub fn write_profile<W: Write>(out: &mut W, summary: &[RegionSummary]) -> io::Result<()> {
    let width = summary.iter().map(|s| s.name.len()).max().unwrap_or(4).max(4);
    writeln!(
        out,
        "{:<width$}  {:>8}  {:>12}  {:>12}  {:>12}",
        "Name", "NCalls", "Incl. Min", "Incl. Avg", "Incl. Max"
    )?;
    writeln!(out, "{}", "-".repeat(width + 52))?;
    for s in summary {
        writeln!(
            out,
            "{:<width$}  {:>8}  {:>12.4e}  {:>12.4e}  {:>12.4e}",
            s.name, s.calls, s.min_total, s.avg_total, s.max_total
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(8), "8 B");
        assert_eq!(human_bytes(1536), "1.50 KiB");
        assert_eq!(human_bytes(8 * 1024 * 1024), "8.00 MiB");
    }

    #[test]
    fn profile_table_lists_every_region() {
        let region = |name: &str, calls, total| RegionSummary {
            name: name.into(),
            calls,
            min_total: total,
            avg_total: total,
            max_total: total,
        };
        let summary = vec![region("Test = 8", 1, 1.0), region("AllReduce(): CPU only - 8", 4, 0.1)];
        let mut buf = Vec::new();
        write_profile(&mut buf, &summary).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Name"));
        assert!(text.contains("Test = 8"));
        assert!(text.contains("AllReduce(): CPU only - 8"));
        assert_eq!(text.lines().count(), 4);
    }
}
