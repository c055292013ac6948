//! The Decoy Command-Line Interface.
//!
//! Loads scenario files, runs them through the library and reports the outcomes.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, DecoyArgs};
use crate::cli::output::Printer;
use crate::scenario::{self, check_scenario, run_file, Scenario};

pub mod args;
pub mod output;

/// The main entry point for the CLI. Exits with status 1 when any scenario fails.
pub fn run() {
    let args = DecoyArgs::parse();
    init_tracing(args.verbose);

    let mut printer = Printer::new(args.format, args.color.choice());
    match args.command {
        Command::Run { file } => run_files(&mut printer, &[file]),
        Command::Test { path } => match scenario::discover(&path) {
            Ok(files) => run_files(&mut printer, &files),
            Err(e) => printer.load_error(&path, e),
        },
        Command::Check { file } => check_file(&mut printer, &file),
    }

    if !printer.finish() {
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    // A subscriber may already be installed when the CLI is driven in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_files(printer: &mut Printer, files: &[PathBuf]) {
    for file in files {
        match run_file(file) {
            Ok(outcome) => printer.outcome(outcome),
            Err(e) => printer.load_error(file, e),
        }
    }
}

fn check_file(printer: &mut Printer, file: &Path) {
    match Scenario::load(file) {
        Ok(scenario) => {
            let mut outcome = check_scenario(&scenario);
            outcome.file = Some(file.display().to_string());
            printer.outcome(outcome);
        }
        Err(e) => printer.load_error(file, e),
    }
}
