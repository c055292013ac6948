//! Handles all user-facing output for the CLI.
//!
//! Text mode prints one colored PASS/FAIL line per scenario, followed by a `miette`
//! report on stderr for each failure. JSON mode buffers the outcomes and prints a single
//! summary document when the run finishes.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::cli::args::OutputFormat;
use crate::scenario::ScenarioOutcome;
use crate::DecoyError;

#[derive(Debug, Default, Serialize)]
struct Summary {
    passed: usize,
    failed: usize,
    scenarios: Vec<ScenarioOutcome>,
}

pub struct Printer {
    format: OutputFormat,
    stdout: StandardStream,
    summary: Summary,
}

impl Printer {
    pub fn new(format: OutputFormat, color: ColorChoice) -> Self {
        Self {
            format,
            stdout: StandardStream::stdout(color),
            summary: Summary::default(),
        }
    }

    /// Records one judged scenario.
    pub fn outcome(&mut self, mut outcome: ScenarioOutcome) {
        if outcome.passed {
            self.summary.passed += 1;
        } else {
            self.summary.failed += 1;
        }
        if self.format == OutputFormat::Json {
            self.summary.scenarios.push(outcome);
            return;
        }

        let label = outcome.file.as_deref().map_or_else(
            || outcome.name.clone(),
            |file| format!("{} ({file})", outcome.name),
        );
        if outcome.passed {
            self.badge("PASS", Color::Green);
            let _ = writeln!(self.stdout, " {label}");
            return;
        }
        self.badge("FAIL", Color::Red);
        let _ = writeln!(self.stdout, " {label}");
        match outcome.error.take() {
            Some(error) => print_error(error),
            None => {
                if let Some(message) = &outcome.message {
                    let _ = writeln!(self.stdout, "    {message}");
                }
            }
        }
    }

    /// Records a scenario file that could not be loaded.
    pub fn load_error(&mut self, path: &Path, error: DecoyError) {
        self.outcome(ScenarioOutcome {
            name: path.display().to_string(),
            file: None,
            passed: false,
            message: Some(error.to_string()),
            report: None,
            error: Some(error),
        });
    }

    /// Prints the summary and returns whether every scenario passed.
    pub fn finish(mut self) -> bool {
        let ok = self.summary.failed == 0;
        match self.format {
            OutputFormat::Json => match serde_json::to_string_pretty(&self.summary) {
                Ok(json) => {
                    let _ = writeln!(self.stdout, "{json}");
                }
                Err(e) => eprintln!("failed to encode results: {e}"),
            },
            OutputFormat::Text => {
                let total = self.summary.passed + self.summary.failed;
                let color = if ok { Color::Green } else { Color::Red };
                let _ = writeln!(self.stdout);
                let _ = self
                    .stdout
                    .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
                let _ = writeln!(
                    self.stdout,
                    "{} passed, {} failed ({} total)",
                    self.summary.passed, self.summary.failed, total
                );
                let _ = self.stdout.reset();
            }
        }
        ok
    }

    fn badge(&mut self, text: &str, color: Color) {
        let _ = self
            .stdout
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        let _ = write!(self.stdout, "{text}");
        let _ = self.stdout.reset();
    }
}

/// Renders an error as a `miette` report on stderr.
pub fn print_error(error: DecoyError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
