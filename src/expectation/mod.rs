//! # Expectations
//!
//! An [`Expectation`] is one recorded, matchable expected call: the target method, one
//! [`BoundArg`] per parameter, a cardinality ([`Repeat`]), the number of calls consumed so
//! far and the [`Response`] to deliver.
//!
//! ## Lifecycle
//!
//! - **Armed** when pushed onto its method's [`ExpectationQueue`]
//! - **Satisfied** once `consumed >= repeat.min`
//! - **Exhausted** once `consumed` reaches `repeat.max`; exhausted expectations are skipped
//!   by the matcher, so further calls fall through to later expectations

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::binder::BoundArg;
use crate::method::{format_expected, MethodSig};
use crate::value::Value;
use crate::{err_msg, DecoyError};

pub mod queue;

pub use queue::ExpectationQueue;

// ============================================================================
// CARDINALITY
// ============================================================================

/// How many matching calls an expectation accepts. `max == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repeat {
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
}

impl Repeat {
    pub const fn times(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn once() -> Self {
        Self::times(1)
    }

    pub const fn twice() -> Self {
        Self::times(2)
    }

    pub const fn never() -> Self {
        Self::times(0)
    }

    pub const fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    pub const fn at_most(n: usize) -> Self {
        Self { min: 0, max: Some(n) }
    }

    /// Any number of times, including zero.
    pub const fn any() -> Self {
        Self { min: 0, max: None }
    }

    pub fn between(min: usize, max: usize) -> Result<Self, DecoyError> {
        Self { min, max: Some(max) }.validated()
    }

    /// Rejects ranges whose minimum exceeds their maximum.
    pub fn validated(self) -> Result<Self, DecoyError> {
        match self.max {
            Some(max) if self.min > max => Err(err_msg!(
                Configuration,
                "invalid repeat range: minimum {} exceeds maximum {}",
                self.min,
                max
            )),
            _ => Ok(self),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.max == Some(self.min)
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "#{max}"),
            Some(max) => write!(f, "#({}-{})", self.min, max),
            None => write!(f, "at least #{}", self.min),
        }
    }
}

// ============================================================================
// RESPONSES
// ============================================================================

/// Read/write view over a live call, handed to `does` callbacks.
pub struct MethodInvocation<'m> {
    method: &'m MethodSig,
    arguments: Vec<Value>,
    return_value: Value,
}

impl<'m> MethodInvocation<'m> {
    pub(crate) fn new(method: &'m MethodSig, arguments: Vec<Value>, return_value: Value) -> Self {
        Self {
            method,
            arguments,
            return_value,
        }
    }

    pub fn method(&self) -> &MethodSig {
        self.method
    }

    /// The call's arguments. Reference and output positions already hold the values the
    /// expectation injects.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Mutable access to the arguments; reference and output positions are written back
    /// to the caller after the callback returns.
    pub fn arguments_mut(&mut self) -> &mut [Value] {
        &mut self.arguments
    }

    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    pub fn set_return_value(&mut self, value: impl Into<Value>) {
        self.return_value = value.into();
    }

    pub(crate) fn into_parts(self) -> (Vec<Value>, Value) {
        (self.arguments, self.return_value)
    }
}

pub type Callback = dyn Fn(&mut MethodInvocation<'_>);

/// What a matched call produces.
#[derive(Clone, Default)]
pub enum Response {
    /// The default value of the method's return kind.
    #[default]
    Default,
    Return(Value),
    /// Fails the call with this message.
    Raise(String),
    /// Runs a callback over the live invocation; its return value is the result.
    Invoke(Rc<Callback>),
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Default => write!(f, "Default"),
            Response::Return(v) => f.debug_tuple("Return").field(v).finish(),
            Response::Raise(m) => f.debug_tuple("Raise").field(m).finish(),
            Response::Invoke(_) => write!(f, "Invoke(<callback>)"),
        }
    }
}

// ============================================================================
// EXPECTATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct Expectation {
    method: MethodSig,
    args: Vec<BoundArg>,
    repeat: Repeat,
    consumed: usize,
    response: Response,
    mandatory: bool,
}

impl Expectation {
    /// Creates an expectation. Mandatory expectations (`expect`) default to "at least
    /// once"; optional ones (`stub`) to "any number of times" and are never reported as
    /// unmet.
    pub fn new(method: MethodSig, args: Vec<BoundArg>, mandatory: bool) -> Self {
        let repeat = if mandatory {
            Repeat::at_least(1)
        } else {
            Repeat::any()
        };
        Self {
            method,
            args,
            repeat,
            consumed: 0,
            response: Response::Default,
            mandatory,
        }
    }

    pub fn method(&self) -> &MethodSig {
        &self.method
    }

    pub fn args(&self) -> &[BoundArg] {
        &self.args
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: Repeat) {
        self.repeat = repeat;
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Whether every slot accepts the corresponding actual argument.
    pub fn matches(&self, actual: &[Value]) -> bool {
        self.args.len() == actual.len()
            && self
                .args
                .iter()
                .zip(actual)
                .all(|(arg, value)| arg.matches(value))
    }

    /// Counts one matching call and hands back the response to deliver.
    pub fn consume(&mut self) -> Response {
        self.consumed += 1;
        self.response.clone()
    }

    /// Takes back one consumed call that could not be delivered.
    pub(crate) fn release(&mut self) {
        self.consumed = self.consumed.saturating_sub(1);
    }

    pub fn is_satisfied(&self) -> bool {
        self.consumed >= self.repeat.min
    }

    pub fn is_exhausted(&self) -> bool {
        self.repeat.max == Some(self.consumed)
    }

    /// `Owner.Name(desc, ...);` with one constraint description per argument.
    pub fn description(&self) -> String {
        let descriptions: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        format_expected(&self.method, &descriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{bind, Arg};
    use crate::value::ValueKind;

    fn string_arg() -> MethodSig {
        MethodSig::new("IDemo", "VoidStringArg").param("s", ValueKind::Text)
    }

    fn expectation(mandatory: bool) -> Expectation {
        let m = string_arg();
        let args = bind(&m, vec![Arg::<String>::text().contains("World")]).unwrap();
        Expectation::new(m, args, mandatory)
    }

    #[test]
    fn exact_cardinality_satisfies_and_exhausts_together() {
        let mut e = expectation(true);
        e.set_repeat(Repeat::times(3));
        for _ in 0..2 {
            e.consume();
            assert!(!e.is_satisfied());
            assert!(!e.is_exhausted());
        }
        e.consume();
        assert!(e.is_satisfied());
        assert!(e.is_exhausted());
    }

    #[test]
    fn defaults_depend_on_mandatory() {
        assert_eq!(expectation(true).repeat(), Repeat::at_least(1));
        assert!(!expectation(true).is_satisfied());
        assert!(expectation(false).is_satisfied());
        assert!(!expectation(false).is_exhausted());
    }

    #[test]
    fn description_lists_argument_constraints() {
        assert_eq!(
            expectation(true).description(),
            r#"IDemo.VoidStringArg(contains "World");"#
        );
    }

    #[test]
    fn repeat_ranges() {
        assert!(Repeat::between(3, 1).is_err());
        assert_eq!(Repeat::between(1, 3).unwrap().to_string(), "#(1-3)");
        assert_eq!(Repeat::times(2).to_string(), "#2");
        assert_eq!(Repeat::at_least(1).to_string(), "at least #1");
        assert!(Repeat::never().is_exact());
    }
}
