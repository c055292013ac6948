//!
//! ****************************************************************************************
//! ** ERROR CONSTRUCTION RULES FOR Decoy Error Macros (`err_msg!`, `err_ctx!`)           **
//! ****************************************************************************************
//!
//! # Overview
//!
//! This module defines the unified, `miette`-based diagnostic system for the Decoy engine.
//! Every failure produced while configuring a surrogate, invoking it, verifying it, or
//! running a scenario file is represented by [`DecoyError`].
//!
//! # Error Classes
//!
//! - **Configuration** errors are raised synchronously while expectations are being set
//!   up (arity, passing mode, kind mismatch, invalid patterns). They are never deferred to
//!   call time or verification time.
//! - **Violation** errors are raised by verification, or at call time by a strict
//!   surrogate facing a call that matches no expectation.
//! - **Raised** errors are failures a test author configured with `raises`.
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for message-only errors.**
//!   - `err_msg!(Configuration, "expected {} arguments", 3)`
//!
//! - **Use `err_ctx!` when a method target or help text is available.**
//!   - `err_ctx!(Violation, message, target)`
//!   - `err_ctx!(Configuration, message, target, help)`
//!
//! - **Scenario file errors carry a `NamedSource` and a `Span`** so that miette can
//!   point at the offending line. Build them with [`DecoyError::scenario_at`].
//!
//! ****************************************************************************************

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Type aliases for clarity and brevity
pub type SourceArc = Arc<NamedSource<String>>;

/// A byte range inside a scenario source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Type-safe error classification enum that corresponds to DecoyError variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Setup-time errors: arity, passing mode, kind mismatch, misuse of builders
    Configuration,
    /// Unmet cardinality, or unexpected calls on a strict surrogate
    Violation,
    /// A failure configured by the test author
    Raised,
    /// Injected value could not be written into caller storage
    Conversion,
    /// Broken interception wrapper
    Internal,
    /// Scenario file loading and parsing
    Scenario,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Configuration => "Configuration",
            ErrorType::Violation => "Violation",
            ErrorType::Raised => "Raised",
            ErrorType::Conversion => "Conversion",
            ErrorType::Internal => "Internal",
            ErrorType::Scenario => "Scenario",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The method being configured or invoked, formatted as `Owner.Method`.
    pub target: Option<String>,
    /// An optional help message.
    pub help: Option<String>,
    /// The scenario source this error points into (if any).
    pub source: Option<SourceArc>,
    /// The span inside `source` (if any).
    pub span: Option<Span>,
}

impl ErrorContext {
    /// Returns an empty error context.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a context naming the method target.
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Creates a context with a target and a help message.
    pub fn with_help(target: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            help: Some(help.into()),
            ..Self::default()
        }
    }
}

/// Unified error type for all Decoy failure modes.
#[derive(Debug, Error)]
pub enum DecoyError {
    #[error("Configuration error: {message}")]
    Configuration { message: String, ctx: ErrorContext },
    #[error("Expectation violation: {message}")]
    Violation { message: String, ctx: ErrorContext },
    #[error("{message}")]
    Raised { message: String, ctx: ErrorContext },
    #[error("Conversion error: {message}")]
    Conversion { message: String, ctx: ErrorContext },
    #[error("Internal error: {message}")]
    Internal { message: String, ctx: ErrorContext },
    #[error("Scenario error: {message}")]
    Scenario {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl DecoyError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            DecoyError::Configuration { ctx, .. } => ctx,
            DecoyError::Violation { ctx, .. } => ctx,
            DecoyError::Raised { ctx, .. } => ctx,
            DecoyError::Conversion { ctx, .. } => ctx,
            DecoyError::Internal { ctx, .. } => ctx,
            DecoyError::Scenario { ctx, .. } => ctx,
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            DecoyError::Configuration { .. } => ErrorType::Configuration,
            DecoyError::Violation { .. } => ErrorType::Violation,
            DecoyError::Raised { .. } => ErrorType::Raised,
            DecoyError::Conversion { .. } => ErrorType::Conversion,
            DecoyError::Internal { .. } => ErrorType::Internal,
            DecoyError::Scenario { .. } => ErrorType::Scenario,
        }
    }

    /// The bare message, without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            DecoyError::Configuration { message, .. }
            | DecoyError::Violation { message, .. }
            | DecoyError::Raised { message, .. }
            | DecoyError::Conversion { message, .. }
            | DecoyError::Internal { message, .. }
            | DecoyError::Scenario { message, .. } => message,
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.get_ctx().target.as_deref()
    }

    pub fn is_configuration(&self) -> bool {
        self.error_type() == ErrorType::Configuration
    }

    pub fn is_violation(&self) -> bool {
        self.error_type() == ErrorType::Violation
    }

    /// Builds a scenario error that has no location, such as an unreadable file.
    pub fn scenario(
        message: impl Into<String>,
        cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        DecoyError::Scenario {
            message: message.into(),
            ctx: ErrorContext::none(),
            source: cause,
        }
    }

    /// Builds a scenario error pointing at a location inside a scenario file.
    pub fn scenario_at(
        message: impl Into<String>,
        source: SourceArc,
        span: Span,
        cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        DecoyError::Scenario {
            message: message.into(),
            ctx: ErrorContext {
                source: Some(source),
                span: Some(span),
                ..ErrorContext::default()
            },
            source: cause,
        }
    }
}

impl Diagnostic for DecoyError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self.error_type() {
            ErrorType::Configuration => "decoy::configuration",
            ErrorType::Violation => "decoy::violation",
            ErrorType::Raised => "decoy::raised",
            ErrorType::Conversion => "decoy::conversion",
            ErrorType::Internal => "decoy::internal",
            ErrorType::Scenario => "decoy::scenario",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        let span = ctx.span?;
        ctx.source.as_ref()?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(self.message().to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Converts a source string into an `Arc<NamedSource<String>>` for use in error contexts.
pub fn to_error_source(name: impl AsRef<str>, source: impl AsRef<str>) -> SourceArc {
    Arc::new(NamedSource::new(
        name.as_ref().to_string(),
        source.as_ref().to_string(),
    ))
}

/// Constructs a DecoyError variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    // Message with format arguments
    ($variant:ident, $msg:expr, $($arg:expr),+ $(,)?) => {
        $crate::DecoyError::$variant {
            message: format!($msg, $($arg),+),
            ctx: $crate::ErrorContext::none(),
        }
    };
    // Message only
    ($variant:ident, $msg:expr) => {
        $crate::DecoyError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::ErrorContext::none(),
        }
    };
}

/// Constructs a DecoyError variant with a message and a method target, optionally with help.
#[macro_export]
macro_rules! err_ctx {
    // Message, target, help
    ($variant:ident, $msg:expr, $target:expr, $help:expr) => {
        $crate::DecoyError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_help($target.to_string(), format!("{}", $help)),
        }
    };
    // Message, target
    ($variant:ident, $msg:expr, $target:expr) => {
        $crate::DecoyError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_target($target.to_string()),
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn test_help_and_code_render() {
        let err = err_ctx!(
            Configuration,
            "expected 3 arguments, got 2",
            "IDemo.VoidThreeArgs",
            "supply one argument spec per parameter"
        );
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("decoy::configuration"));
        assert!(output.contains("expected 3 arguments, got 2"));
        assert!(output.contains("supply one argument spec per parameter"));
    }

    #[test]
    fn test_scenario_error_labels_source() {
        let src = to_error_source("broken.yaml", "name: x\nmethods: [\n");
        let err = DecoyError::scenario_at(
            "unterminated sequence",
            src,
            Span { start: 8, end: 17 },
            None,
        );
        assert_eq!(err.error_type(), ErrorType::Scenario);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("broken.yaml"));
        assert!(output.contains("unterminated sequence"));
    }

    #[test]
    fn test_message_accessor_strips_prefix() {
        let err = err_msg!(Violation, "{} calls missing", 2);
        assert_eq!(err.message(), "2 calls missing");
        assert_eq!(err.to_string(), "Expectation violation: 2 calls missing");
        assert!(err.is_violation());
        assert!(err.target().is_none());
    }
}
