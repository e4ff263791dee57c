//! All-reduce path benchmark
//!
//! Times a sum all-reduce over a sweep of message sizes through every data
//! path this build supports, and checks that they agree.
//!
//! # Usage
//!
//! ```bash
//! # Single process, thread ranks
//! allreduce-bench inputs --ranks 4
//!
//! # MPI build, overriding inputs from the command line
//! mpirun -np 8 allreduce-bench inputs max_elements=16777216 check_result=1
//! ```
//!
//! The inputs file holds `key = value` lines; see `BenchOptions` for the keys.

use std::io;
use std::process::ExitCode;

use allreduce_bench::parallel::{Comm, UniverseComm};
use allreduce_bench::{BenchOptions, Inputs, execute};
use anyhow::{Context, Result, bail};
use clap::Parser;

/// All-reduce benchmark across host, staged, CUDA-aware and device-collective paths
#[derive(Parser, Debug)]
#[command(name = "allreduce-bench")]
#[command(version)]
struct Args {
    /// Inputs file, then any number of `key=value` overrides
    #[arg(value_name = "INPUTS | KEY=VALUE")]
    args: Vec<String>,

    /// Thread ranks to run in this process (builds without MPI)
    #[arg(long, default_value_t = 1)]
    ranks: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_options(args: &[String]) -> Result<BenchOptions> {
    let (overrides, files): (Vec<&String>, Vec<&String>) =
        args.iter().partition(|a| Inputs::is_override(a));
    let mut inputs = match files.as_slice() {
        [] => Inputs::new(),
        [path] => Inputs::from_file(path.as_str())
            .with_context(|| format!("Failed to read inputs file {path}"))?,
        more => bail!("expected at most one inputs file, got {}", more.len()),
    };
    inputs.apply_overrides(overrides).context("Invalid command-line override")?;
    BenchOptions::from_inputs(&inputs).context("Invalid benchmark inputs")
}

fn run_rank(comm: &UniverseComm, opts: &BenchOptions) -> Result<()> {
    let mut out = io::stdout();
    if let Err(e) = execute(comm, opts, &mut out) {
        tracing::error!(rank = comm.rank(), "{e}");
        if comm.size() > 1 {
            comm.abort(1);
        }
        return Err(e).context(format!("rank {} failed", comm.rank()));
    }
    Ok(())
}

#[cfg(feature = "mpi")]
fn run(args: Args) -> Result<()> {
    use allreduce_bench::parallel::MpiComm;

    let comm = UniverseComm::Mpi(MpiComm::new()?);
    if args.ranks != 1 {
        tracing::warn!(ranks = args.ranks, "--ranks is ignored in MPI builds");
    }
    let opts = match load_options(&args.args) {
        Ok(opts) => opts,
        Err(e) => {
            tracing::error!(rank = comm.rank(), "{e:#}");
            comm.abort(1);
        }
    };
    run_rank(&comm, &opts)
}

#[cfg(not(feature = "mpi"))]
fn run(args: Args) -> Result<()> {
    use allreduce_bench::ThreadComm;

    let opts = load_options(&args.args)?;
    let opts = &opts;
    std::thread::scope(|s| {
        let handles: Vec<_> = ThreadComm::group(args.ranks)
            .into_iter()
            .map(|comm| s.spawn(move || run_rank(&UniverseComm::Threads(comm), opts)))
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => bail!("rank thread panicked"),
            }
        }
        Ok(())
    })
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args.log_level);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
