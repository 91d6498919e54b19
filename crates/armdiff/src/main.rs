//! armdiff CLI - differential ARM32 instruction testing

mod cli;
mod terminal;

use std::io;

use armdiff::engine::{CandidatePlugin, ReferencePlugin};
use armdiff::{
    CandidateAdapter, Harness, HarnessConfig, LOADSTORE, ReferenceAdapter, RunOutcome, RunReport,
    load_case_file,
};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, EXIT_FAILURE, EXIT_SETUP_ERROR, EXIT_SUCCESS};

fn main() {
    let cli = Cli::parse();

    // Initialize metrics recorder if enabled
    let metrics_handle = if cli.metrics {
        armdiff::metrics::CliRecorder::new().install()
    } else {
        None
    };
    armdiff::metrics::init();

    let directive = cli
        .log_directive()
        .parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::WARN.into());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let exit_code = match run(&cli) {
        Ok(report) => {
            summarize(&cli, &report);
            report.exit_code()
        }
        Err(err) => {
            terminal::error(&err.to_string());
            EXIT_SETUP_ERROR
        }
    };

    if let Some(handle) = metrics_handle {
        handle.print_summary();
    }

    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> armdiff::Result<RunReport> {
    let layout = cli.layout();
    let mode = cli.mode();

    let cases = match &cli.cases {
        Some(path) => load_case_file(path)?,
        None => LOADSTORE.to_vec(),
    };
    let config = HarnessConfig::new(layout).with_cases(cases).with_mode(mode);

    let reference = ReferenceAdapter::new(ReferencePlugin::load(&cli.reference)?, layout)
        .with_mode(config.mode);
    let candidate = CandidateAdapter::new(CandidatePlugin::load(&cli.candidate)?)
        .with_mode(config.mode);
    let harness = Harness::new(config, reference, candidate)?;

    let seed = cli.seed.unwrap_or_else(rand::random);
    info!(seed, "initial state seed");
    if !cli.silent {
        terminal::info(&format!("seed {seed}"));
    }
    let initial = harness.initial_state(&mut StdRng::seed_from_u64(seed));

    let stdout = io::stdout();
    let report = harness.run(initial, &mut stdout.lock())?;
    Ok(report)
}

fn summarize(cli: &Cli, report: &RunReport) {
    if cli.silent {
        return;
    }
    match &report.outcome {
        RunOutcome::AllPassed => {
            debug_assert_eq!(report.exit_code(), EXIT_SUCCESS);
            terminal::success(&format!("{} cases passed", report.passed));
        }
        RunOutcome::Failed { mnemonic, report: diff, .. } => {
            debug_assert_eq!(report.exit_code(), EXIT_FAILURE);
            terminal::error(&format!(
                "{mnemonic}: {} field(s) differ after {} passing case(s)",
                diff.len(),
                report.passed
            ));
        }
        RunOutcome::Aborted { mnemonic, fault, .. } => {
            debug_assert_eq!(report.exit_code(), EXIT_FAILURE);
            terminal::warning(&format!("{mnemonic}: aborted, {} ({})", fault, fault.kind()));
        }
    }
}
