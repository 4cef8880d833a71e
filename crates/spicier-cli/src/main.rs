//! `spicier` command-line front end: loads a JSON netlist, runs a
//! transient analysis, and optionally exports the result.

mod netlist_json;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use spicier_core::IntegratorMethod;
use spicier_solver::{circuit, NewtonParams, RunBudget, TransientEngine, TransientResult};

#[derive(Parser)]
#[command(name = "spicier", about = "Transient circuit simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a transient analysis from a JSON netlist.
    Transient {
        #[arg(long)]
        netlist: PathBuf,
        #[arg(long)]
        tend: f64,
        #[arg(long)]
        dt: f64,
        #[arg(long, value_enum, default_value_t = IntegratorArg::Be)]
        integrator: IntegratorArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IntegratorArg {
    Be,
    Tr,
}

impl From<IntegratorArg> for IntegratorMethod {
    fn from(arg: IntegratorArg) -> Self {
        match arg {
            IntegratorArg::Be => IntegratorMethod::BackwardEuler,
            IntegratorArg::Tr => IntegratorMethod::Trapezoidal,
        }
    }
}

/// Exit codes per the CLI surface contract: 0 success, 1 netlist/parse
/// error, 2 analysis failure (non-convergence or singular matrix), 3 I/O
/// error.
const EXIT_OK: u8 = 0;
const EXIT_NETLIST_ERROR: u8 = 1;
const EXIT_ANALYSIS_FAILURE: u8 = 2;
const EXIT_IO_ERROR: u8 = 3;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Transient {
            netlist,
            tend,
            dt,
            integrator,
            out,
        } => run_transient(&netlist, tend, dt, integrator.into(), out.as_deref()),
    }
}

fn run_transient(
    netlist_path: &std::path::Path,
    t_end: f64,
    dt_init: f64,
    integrator: IntegratorMethod,
    out_path: Option<&std::path::Path>,
) -> ExitCode {
    if dt_init <= 0.0 {
        error!("Δt_init must be positive, got {dt_init}");
        return ExitCode::from(EXIT_NETLIST_ERROR);
    }

    let circuit_spec = match netlist_json::load(netlist_path) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load netlist: {e:#}");
            return ExitCode::from(EXIT_NETLIST_ERROR);
        }
    };

    let mut runtime = match circuit::build(&circuit_spec) {
        Ok(r) => r,
        Err(e) => {
            error!("failed to build circuit: {e}");
            return ExitCode::from(EXIT_NETLIST_ERROR);
        }
    };

    let params = NewtonParams::default();
    let mut engine = TransientEngine::new(integrator, params);
    let mut result = TransientResult::new();

    if let Err(e) = engine.run(&mut runtime, t_end, dt_init, &mut result, RunBudget::default()) {
        error!("transient analysis failed: {e}");
        return ExitCode::from(EXIT_ANALYSIS_FAILURE);
    }

    println!("completed {} steps to t={t_end:.3e}", result.len());

    if let Some(path) = out_path {
        let format = output::Format::from_extension(path);
        if let Err(e) = output::write_result(&result, path, format) {
            error!("failed to write result: {e:#}");
            return ExitCode::from(EXIT_IO_ERROR);
        }
    }

    ExitCode::from(EXIT_OK)
}
