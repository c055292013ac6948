//! Defines the command-line arguments and subcommands for the Decoy CLI.
//!
//! Uses the `clap` derive API; formatting and color flags are global so they may appear
//! before or after the subcommand.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use termcolor::ColorChoice;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "decoy",
    version,
    about = "Runs expectation scenarios against strict and lenient surrogates."
)]
pub struct DecoyArgs {
    #[command(subcommand)]
    pub command: Command,

    /// How results are printed.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Log matching decisions (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// When to color the output.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    pub color: ColorMode,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one scenario file.
    Run {
        /// The scenario file (YAML or JSON).
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Discover and run all scenario files in a directory.
    Test {
        /// The directory containing scenario files.
        #[arg(default_value = "scenarios")]
        path: PathBuf,
    },
    /// Parse a scenario and arm its expectations without making any call.
    Check {
        /// The scenario file (YAML or JSON).
        #[arg(required = true)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn choice(self) -> ColorChoice {
        match self {
            ColorMode::Auto => ColorChoice::Auto,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        }
    }
}
