//! Verify a solver against direct summation.
//!
//! Usage: `fmm-verify [config.toml]`. Without an argument the default configuration is used.
//! Built with the `mpi` feature, the harness runs on `MPI_COMM_WORLD`; otherwise in a single
//! process. The exit status is 1 if any case fails its tolerance.
use std::process::ExitCode;

use fmm_verify::config::HarnessConfig;
use fmm_verify::error::VerifyError;
use fmm_verify::harness::{Harness, HarnessReport};
use fmm_verify::solver::DirectSolver;
use fmm_verify::traits::ProcessGroup;
use log::error;
use rayon::ThreadPoolBuilder;

fn load_config() -> Result<HarnessConfig, VerifyError> {
    match std::env::args_os().nth(1) {
        Some(path) => HarnessConfig::from_file(path),
        None => Ok(HarnessConfig::default()),
    }
}

fn run<G: ProcessGroup>(group: &G) -> Result<HarnessReport, VerifyError> {
    let config = load_config()?;

    ThreadPoolBuilder::new()
        .num_threads(config.threads.unwrap_or_else(num_cpus::get))
        .build_global()
        .map_err(|err| VerifyError::InvalidConfig {
            field: "threads",
            reason: err.to_string(),
        })?;

    Harness::new(group, DirectSolver::new(group), config)?.run()
}

fn exit_code(report: &HarnessReport) -> ExitCode {
    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(not(feature = "mpi"))]
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(&fmm_verify::comm::SingleProcess) {
        Ok(report) => exit_code(&report),
        Err(err) => {
            error!("{}", err);
            ExitCode::from(2)
        }
    }
}

#[cfg(feature = "mpi")]
fn main() -> ExitCode {
    use mpi::traits::Communicator;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(universe) = mpi::initialize() else {
        error!("MPI was already initialized");
        return ExitCode::from(2);
    };
    let world = universe.world();
    let group = fmm_verify::comm::MpiGroup::new(&world);

    match run(&group) {
        Ok(report) => exit_code(&report),
        // Other ranks may be blocked in a collective.
        Err(err) => {
            error!("rank {}: {}", world.rank(), err);
            world.abort(2)
        }
    }
}
