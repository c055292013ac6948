//! # Scenario Files
//!
//! A scenario is a data-driven test of the matching engine: it declares one surrogate,
//! the methods it stands in for, the expectations to arm, the calls to make and the
//! outcome to assert. Scenarios are YAML or JSON documents, picked by file extension.
//!
//! ```yaml
//! name: three args pass
//! surrogate: { name: IDemo, mode: strict }
//! methods:
//!   - name: VoidThreeArgs
//!     params: [{name: a, kind: i32}, {name: b, kind: text}, {name: c, kind: f32}]
//! expectations:
//!   - method: VoidThreeArgs
//!     args: [anything, {contains: eine}, {less_than: 2.5}]
//! calls:
//!   - method: VoidThreeArgs
//!     args: [3, Steinegger, 2.4]
//! outcome: pass
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::diagnostics::{to_error_source, Span};
use crate::expectation::Repeat;
use crate::method::{MethodSig, Param};
use crate::surrogate::Mode;
use crate::value::ValueKind;
use crate::DecoyError;

pub mod literal;
pub mod runner;

pub use runner::{check_scenario, run_file, run_scenario, ScenarioOutcome};

/// Free-form literal as written in the scenario file.
pub type Literal = serde_json::Value;

// ============================================================================
// DOCUMENT MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    pub surrogate: SurrogateDef,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub expectations: Vec<ExpectationDef>,
    #[serde(default)]
    pub calls: Vec<CallDef>,
    #[serde(default)]
    pub verify: VerifyMode,
    #[serde(default)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurrogateDef {
    pub name: String,
    #[serde(default)]
    pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default = "unit_kind")]
    pub returns: ValueKind,
}

fn unit_kind() -> ValueKind {
    ValueKind::Unit
}

impl MethodDef {
    pub fn signature(&self, owner: &str) -> MethodSig {
        self.params
            .iter()
            .fold(MethodSig::new(owner, &self.name), |sig, p| {
                sig.with_param(p.name.clone(), p.kind, p.mode)
            })
            .returns(self.returns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationKind {
    #[default]
    Expect,
    Stub,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationDef {
    pub method: String,
    #[serde(default)]
    pub kind: ExpectationKind,
    /// One spec per parameter: a constraint, `{out: v}`, `{ref: {prior, value}}`,
    /// `{literal: v}` or a bare literal.
    #[serde(default)]
    pub args: Vec<Literal>,
    #[serde(default)]
    pub repeat: Option<Repeat>,
    #[serde(default, deserialize_with = "present")]
    pub returns: Option<Literal>,
    #[serde(default)]
    pub raises: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallDef {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Literal>,
    /// Expected return value; `null` asserts a nil return.
    #[serde(default, deserialize_with = "present")]
    pub returns: Option<Literal>,
    /// Expected final values of writable slots, keyed by zero-based argument position.
    #[serde(default)]
    pub writes: std::collections::BTreeMap<usize, Literal>,
}

// A field written as `null` is present, unlike a missing one.
fn present<'de, D>(deserializer: D) -> Result<Option<Literal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Literal::deserialize(deserializer).map(Some)
}

/// Which verification runs after the calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMode {
    /// Mandatory expectations only.
    #[default]
    Expectations,
    /// Expectations, and no unexpected calls.
    All,
    /// No verification.
    Skip,
}

/// The asserted result of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "OutcomeRepr", into = "OutcomeRepr")]
pub enum Outcome {
    #[default]
    Pass,
    /// Fails with a diagnostic containing this text.
    Fail(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OutcomeRepr {
    Word(String),
    Fail { fail: String },
}

impl TryFrom<OutcomeRepr> for Outcome {
    type Error = String;

    fn try_from(repr: OutcomeRepr) -> Result<Self, Self::Error> {
        match repr {
            OutcomeRepr::Word(word) if word == "pass" => Ok(Outcome::Pass),
            OutcomeRepr::Word(word) => Err(format!(
                "unknown outcome '{word}', expected 'pass' or {{fail: \"...\"}}"
            )),
            OutcomeRepr::Fail { fail } => Ok(Outcome::Fail(fail)),
        }
    }
}

impl From<Outcome> for OutcomeRepr {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Pass => OutcomeRepr::Word("pass".into()),
            Outcome::Fail(fail) => OutcomeRepr::Fail { fail },
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// `.json` files are JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Scenario, DecoyError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            DecoyError::scenario(
                format!("failed to read '{}': {}", path.display(), e),
                Some(Box::new(e)),
            )
        })?;
        Scenario::parse(&text, &path.display().to_string(), Format::from_path(path))
    }

    /// Parses a scenario document. `name` labels the source in diagnostics.
    pub fn parse(text: &str, name: &str, format: Format) -> Result<Scenario, DecoyError> {
        match format {
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| {
                let offset = e.location().map_or(0, |l| l.index());
                let message = format!("invalid scenario: {e}");
                DecoyError::scenario_at(
                    message,
                    to_error_source(name, text),
                    span_at(text, offset),
                    Some(Box::new(e)),
                )
            }),
            Format::Json => serde_json::from_str(text).map_err(|e| {
                let offset = offset_of(text, e.line(), e.column());
                let message = format!("invalid scenario: {e}");
                DecoyError::scenario_at(
                    message,
                    to_error_source(name, text),
                    span_at(text, offset),
                    Some(Box::new(e)),
                )
            }),
        }
    }
}

// One-byte span clamped inside the source.
fn span_at(text: &str, offset: usize) -> Span {
    let start = offset.min(text.len().saturating_sub(1));
    Span {
        start,
        end: (start + 1).min(text.len()),
    }
}

// serde_json reports 1-based lines and columns.
fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let preceding: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    preceding + column.saturating_sub(1)
}

// ============================================================================
// DISCOVERY
// ============================================================================

fn is_scenario_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

/// Recursively finds scenario files under `root`, sorted for a deterministic run order.
pub fn discover(root: impl AsRef<Path>) -> Result<Vec<PathBuf>, DecoyError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            DecoyError::scenario(format!("failed to walk directory: {e}"), Some(Box::new(e)))
        })?;
        if entry.file_type().is_file() && is_scenario_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
