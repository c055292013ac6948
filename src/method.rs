//! Method signatures and call formatting.
//!
//! A [`MethodSig`] describes one method of the surrogated interface: its owner, its name,
//! its ordered parameter slots (each with a declared [`ValueKind`] and a [`PassingMode`])
//! and its return kind. Expectations are keyed by [`MethodKey`], which includes the
//! parameter kinds and modes and the return kind, so that overloads sharing a name never
//! collide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{SlotType, Value, ValueKind};

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassingMode {
    /// Read by the callee only; matched against a constraint.
    #[default]
    ByValue,
    /// Matched against its prior value, then written back.
    #[serde(alias = "ref")]
    ByReference,
    /// Never read; only written back.
    #[serde(alias = "out")]
    Output,
}

impl PassingMode {
    /// Whether the engine writes into this slot after a match.
    pub fn writes_back(self) -> bool {
        !matches!(self, PassingMode::ByValue)
    }

    pub fn slot_name(self) -> &'static str {
        match self {
            PassingMode::ByValue => "value",
            PassingMode::ByReference => "reference",
            PassingMode::Output => "output",
        }
    }
}

/// One formal parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub kind: ValueKind,
    #[serde(default)]
    pub mode: PassingMode,
}

/// The signature of a surrogated method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSig {
    owner: String,
    name: String,
    params: Vec<Param>,
    returns: ValueKind,
}

/// Identity of a method: owner, name, and the kind and mode of each parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    owner: String,
    name: String,
    shape: Vec<(ValueKind, PassingMode)>,
    returns: ValueKind,
}

impl MethodSig {
    /// Starts a signature with no parameters returning `unit`.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            params: Vec::new(),
            returns: ValueKind::Unit,
        }
    }

    pub fn param(self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.with_param(name, kind, PassingMode::ByValue)
    }

    /// Adds a by-value parameter whose kind is derived from a Rust type.
    pub fn param_of<T: SlotType>(self, name: impl Into<String>) -> Self {
        self.param(name, T::KIND)
    }

    pub fn reference(self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.with_param(name, kind, PassingMode::ByReference)
    }

    pub fn output(self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.with_param(name, kind, PassingMode::Output)
    }

    pub fn with_param(mut self, name: impl Into<String>, kind: ValueKind, mode: PassingMode) -> Self {
        self.params.push(Param {
            name: name.into(),
            kind,
            mode,
        });
        self
    }

    pub fn returns(mut self, kind: ValueKind) -> Self {
        self.returns = kind;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn return_kind(&self) -> ValueKind {
        self.returns
    }

    pub fn key(&self) -> MethodKey {
        MethodKey {
            owner: self.owner.clone(),
            name: self.name.clone(),
            shape: self.params.iter().map(|p| (p.kind, p.mode)).collect(),
            returns: self.returns,
        }
    }

    /// `Owner.Name`, used as the target of diagnostics.
    pub fn target(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match p.mode {
                PassingMode::ByValue => format!("{}: {}", p.name, p.kind),
                PassingMode::ByReference => format!("ref {}: {}", p.name, p.kind),
                PassingMode::Output => format!("out {}: {}", p.name, p.kind),
            })
            .collect();
        write!(f, "{}({})", self.target(), params.join(", "))?;
        if self.returns != ValueKind::Unit {
            write!(f, " -> {}", self.returns)?;
        }
        Ok(())
    }
}

// ============================================================================
// CALL FORMATTING
// ============================================================================

/// Formats an actual call as `Owner.Name("abcd", 4);`. Parameters without a supplied
/// argument print as `missing parameter`.
pub fn format_call(method: &MethodSig, args: &[Value]) -> String {
    let parts: Vec<String> = (0..method.arity().max(args.len()))
        .map(|i| {
            args.get(i)
                .map_or_else(|| "missing parameter".to_string(), Value::describe)
        })
        .collect();
    format!("{}({});", method.target(), parts.join(", "))
}

/// Formats an expectation as `Owner.Name(desc, desc);` from per-argument descriptions.
pub fn format_expected(method: &MethodSig, descriptions: &[String]) -> String {
    format!("{}({});", method.target(), descriptions.join(", "))
}
