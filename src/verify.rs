//! # Verification
//!
//! Aggregates a surrogate's queues into a [`VerificationReport`]: every mandatory
//! expectation whose minimum cardinality was not reached, plus the calls that matched
//! nothing. Building a report never touches the queues, so verifying twice without
//! intervening calls yields the same report.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expectation::{ExpectationQueue, Repeat};
use crate::{err_ctx, DecoyError};

/// One expectation whose minimum cardinality was not met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetExpectation {
    /// `Owner.Method`
    pub target: String,
    /// Per-argument constraint descriptions.
    pub arguments: Vec<String>,
    pub expected: Repeat,
    pub actual: usize,
}

impl fmt::Display for UnmetExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}); Expected {}, Actual #{}.",
            self.target,
            self.arguments.join(", "),
            self.expected,
            self.actual
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationReport {
    pub surrogate: String,
    pub unmet: Vec<UnmetExpectation>,
    /// Formatted calls that matched no expectation.
    pub unexpected: Vec<String>,
}

impl VerificationReport {
    /// True when every mandatory expectation was satisfied.
    pub fn expectations_met(&self) -> bool {
        self.unmet.is_empty()
    }

    /// True when expectations were met and no call went unmatched.
    pub fn is_clean(&self) -> bool {
        self.unmet.is_empty() && self.unexpected.is_empty()
    }

    /// Converts a failing report into a violation. `include_unexpected` selects the
    /// stricter check that also fails on unmatched calls.
    pub fn into_result(self, include_unexpected: bool) -> Result<(), DecoyError> {
        let failed = if include_unexpected {
            !self.is_clean()
        } else {
            !self.expectations_met()
        };
        if !failed {
            return Ok(());
        }
        let help = format!(
            "{} expectation(s) unmet, {} unexpected call(s)",
            self.unmet.len(),
            self.unexpected.len()
        );
        let mut lines: Vec<String> = self.unmet.iter().map(ToString::to_string).collect();
        if include_unexpected {
            lines.extend(
                self.unexpected
                    .iter()
                    .map(|call| format!("{call} Expected #0, Actual #1.")),
            );
        }
        Err(err_ctx!(Violation, lines.join("\n"), self.surrogate, help))
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "{}: all expectations met", self.surrogate);
        }
        writeln!(f, "{}:", self.surrogate)?;
        for unmet in &self.unmet {
            writeln!(f, "  unmet: {unmet}")?;
        }
        for call in &self.unexpected {
            writeln!(f, "  unexpected: {call}")?;
        }
        Ok(())
    }
}

/// Scans every queue of a surrogate. Optional (stub) expectations are never unmet.
pub fn verify<'q>(
    surrogate: &str,
    queues: impl IntoIterator<Item = &'q ExpectationQueue>,
    unexpected: &[String],
) -> VerificationReport {
    let unmet: Vec<UnmetExpectation> = queues
        .into_iter()
        .flat_map(ExpectationQueue::iter)
        .filter(|e| e.is_mandatory() && !e.is_satisfied())
        .map(|e| UnmetExpectation {
            target: e.method().target(),
            arguments: e.args().iter().map(ToString::to_string).collect(),
            expected: e.repeat(),
            actual: e.consumed(),
        })
        .collect();
    debug!(
        surrogate,
        unmet = unmet.len(),
        unexpected = unexpected.len(),
        "verified surrogate"
    );
    VerificationReport {
        surrogate: surrogate.to_string(),
        unmet,
        unexpected: unexpected.to_vec(),
    }
}
