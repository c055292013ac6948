//! # Surrogates
//!
//! A [`Surrogate`] stands in for one interface. It owns one [`ExpectationQueue`] per
//! method, arms expectations through [`Surrogate::expect`] and [`Surrogate::stub`], and
//! answers intercepted calls through [`Surrogate::invoke`].
//!
//! ## Modes
//!
//! - **Strict**: a call that matches no expectation fails immediately with a violation.
//! - **Lenient**: the call is logged as unexpected and answered with the return kind's
//!   default value. `verify` ignores the log; `verify_all` fails on it.
//!
//! State lives in a `RefCell`, so handles, verification and invocations all work through
//! shared references. No borrow is held while a `does` callback or an `Is::matching`
//! predicate runs, so either may call back into its own surrogate.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binder::{bind, ArgSpec};
use crate::expectation::{Expectation, ExpectationQueue, MethodInvocation, Repeat, Response};
use crate::method::{format_call, MethodKey, MethodSig};
use crate::value::{numeric, Value};
use crate::verify::{self, VerificationReport};
use crate::{err_ctx, DecoyError, ErrorType};

pub mod call;

pub use call::Call;
use call::{SlotWriter, WritableSlot};

// ============================================================================
// OPTIONS
// ============================================================================

/// How unmatched calls are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Strict,
    Lenient,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Strict => write!(f, "strict"),
            Mode::Lenient => write!(f, "lenient"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurrogateOptions {
    #[serde(default)]
    pub mode: Mode,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Default)]
struct MockState {
    queues: Vec<ExpectationQueue>,
    index: HashMap<MethodKey, usize>,
    unexpected: Vec<String>,
}

impl MockState {
    fn queue_for(&mut self, method: &MethodSig) -> usize {
        let key = method.key();
        if let Some(&position) = self.index.get(&key) {
            return position;
        }
        self.queues.push(ExpectationQueue::new(method.clone()));
        let position = self.queues.len() - 1;
        self.index.insert(key, position);
        position
    }

    fn queue(&self, method: &MethodSig) -> Option<&ExpectationQueue> {
        self.index.get(&method.key()).map(|&i| &self.queues[i])
    }
}

// ============================================================================
// SURROGATE
// ============================================================================

pub struct Surrogate {
    name: String,
    options: SurrogateOptions,
    state: RefCell<MockState>,
}

impl Surrogate {
    pub fn strict(name: impl Into<String>) -> Self {
        Self::with_options(name, SurrogateOptions { mode: Mode::Strict })
    }

    pub fn lenient(name: impl Into<String>) -> Self {
        Self::with_options(name, SurrogateOptions { mode: Mode::Lenient })
    }

    pub fn with_options(name: impl Into<String>, options: SurrogateOptions) -> Self {
        Self {
            name: name.into(),
            options,
            state: RefCell::new(MockState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.options.mode
    }

    /// Arms a mandatory expectation: reported as unmet until called at least once
    /// (or as many times as its cardinality demands).
    pub fn expect(
        &self,
        method: &MethodSig,
        specs: impl IntoIterator<Item = ArgSpec>,
    ) -> Result<ExpectationHandle<'_>, DecoyError> {
        self.arm(method, specs.into_iter().collect(), true)
    }

    /// Arms an optional expectation, matched any number of times and never unmet.
    pub fn stub(
        &self,
        method: &MethodSig,
        specs: impl IntoIterator<Item = ArgSpec>,
    ) -> Result<ExpectationHandle<'_>, DecoyError> {
        self.arm(method, specs.into_iter().collect(), false)
    }

    fn arm(
        &self,
        method: &MethodSig,
        specs: Vec<ArgSpec>,
        mandatory: bool,
    ) -> Result<ExpectationHandle<'_>, DecoyError> {
        let args = bind(method, specs)?;
        let expectation = Expectation::new(method.clone(), args, mandatory);
        debug!(
            surrogate = %self.name,
            expectation = %expectation.description(),
            mandatory,
            "armed expectation"
        );
        let mut state = self.state.borrow_mut();
        let queue = state.queue_for(method);
        let index = state.queues[queue].push(expectation);
        Ok(ExpectationHandle {
            surrogate: self,
            queue,
            index,
        })
    }

    /// Answers an intercepted call.
    ///
    /// A call counts against its expectation only once it has been delivered: when the
    /// callback's return value or a written-back slot cannot be converted, the consumed
    /// count is rolled back and no caller storage is modified.
    pub fn invoke(&self, method: &MethodSig, call: Call<'_>) -> Result<Value, DecoyError> {
        let (args, mut writers) = call.into_parts();
        if args.len() != method.arity() {
            return Err(err_ctx!(
                Internal,
                format!(
                    "{} declares {} parameter(s) but the intercepted call carried {}",
                    method.target(),
                    method.arity(),
                    args.len()
                ),
                method.target(),
                "the delegation wrapper must forward every parameter exactly once"
            ));
        }

        let Some(selected) = self.select(method, &args) else {
            return self.unexpected(method, &args);
        };

        let mut arguments = args;
        for (slot, value) in arguments.iter_mut().zip(selected.injected) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        match deliver(method, selected.response, arguments, &mut writers) {
            Err(e) if e.error_type() != ErrorType::Raised => {
                self.state.borrow_mut().queues[selected.queue]
                    .at_mut(selected.index)
                    .release();
                debug!(
                    surrogate = %self.name,
                    target = %method.target(),
                    error = %e,
                    "call not delivered, expectation released"
                );
                Err(e)
            }
            delivered => delivered,
        }
    }

    // Constraints are evaluated against a snapshot of the queue, with no borrow held, so
    // that custom predicates may call back into the surrogate.
    fn select(&self, method: &MethodSig, args: &[Value]) -> Option<Selected> {
        loop {
            let (queue, snapshot) = {
                let state = self.state.borrow();
                let queue = *state.index.get(&method.key())?;
                (queue, state.queues[queue].clone())
            };
            let index = snapshot.select(args)?;

            let mut state = self.state.borrow_mut();
            let expectation = state.queues[queue].at_mut(index);
            // A re-entrant predicate may have used up the last allowed call.
            if expectation.is_exhausted() {
                continue;
            }
            let response = expectation.consume();
            let injected = expectation
                .args()
                .iter()
                .map(|a| a.injected().cloned())
                .collect();
            debug!(
                surrogate = %self.name,
                call = %format_call(method, args),
                expectation = %expectation.description(),
                consumed = expectation.consumed(),
                "matched expectation"
            );
            return Some(Selected {
                queue,
                index,
                response,
                injected,
            });
        }
    }

    fn unexpected(&self, method: &MethodSig, args: &[Value]) -> Result<Value, DecoyError> {
        let call = format_call(method, args);
        let snapshot = self.state.borrow().queue(method).cloned();
        let exhausted = snapshot.and_then(|q| {
            q.exhausted_match(args)
                .map(|e| (e.repeat(), e.consumed()))
        });
        self.state.borrow_mut().unexpected.push(call.clone());

        match self.options.mode {
            Mode::Strict => {
                let message = match exhausted {
                    Some((repeat, consumed)) => {
                        format!("{call} Expected {repeat}, Actual #{}.", consumed + 1)
                    }
                    None => format!("{call} Expected #0, Actual #1."),
                };
                debug!(surrogate = %self.name, %call, "rejected unexpected call");
                Err(err_ctx!(Violation, message, self.name))
            }
            Mode::Lenient => {
                warn!(surrogate = %self.name, %call, "unexpected call answered with default");
                Ok(method.return_kind().default_value())
            }
        }
    }

    /// The current verification report, without failing.
    pub fn report(&self) -> VerificationReport {
        let state = self.state.borrow();
        verify::verify(&self.name, &state.queues, &state.unexpected)
    }

    /// Fails when any mandatory expectation is below its minimum cardinality.
    pub fn verify(&self) -> Result<(), DecoyError> {
        self.report().into_result(false)
    }

    /// Like [`Surrogate::verify`], and also fails when calls went unmatched.
    pub fn verify_all(&self) -> Result<(), DecoyError> {
        self.report().into_result(true)
    }

    /// Formatted calls that matched no expectation, oldest first.
    pub fn unexpected_calls(&self) -> Vec<String> {
        self.state.borrow().unexpected.clone()
    }

    /// Number of expectations armed for `method`.
    pub fn expectation_count(&self, method: &MethodSig) -> usize {
        self.state
            .borrow()
            .queue(method)
            .map_or(0, ExpectationQueue::len)
    }
}

impl fmt::Debug for Surrogate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surrogate")
            .field("name", &self.name)
            .field("mode", &self.options.mode)
            .finish_non_exhaustive()
    }
}

/// What `select` took from the matched expectation.
struct Selected {
    queue: usize,
    index: usize,
    response: Response,
    injected: Vec<Option<Value>>,
}

fn deliver(
    method: &MethodSig,
    response: Response,
    arguments: Vec<Value>,
    writers: &mut [Option<SlotWriter<'_>>],
) -> Result<Value, DecoyError> {
    let (arguments, result) = match response {
        Response::Default => (arguments, method.return_kind().default_value()),
        Response::Return(value) => (arguments, value),
        Response::Raise(message) => {
            return Err(err_ctx!(Raised, message, method.target()));
        }
        Response::Invoke(callback) => {
            let mut invocation =
                MethodInvocation::new(method, arguments, method.return_kind().default_value());
            callback(&mut invocation);
            let (arguments, returned) = invocation.into_parts();
            let returned = numeric::coerce(method.return_kind(), &returned).ok_or_else(|| {
                err_ctx!(
                    Conversion,
                    format!(
                        "callback returned {} ({}) from a method declared to return {}",
                        returned.describe(),
                        returned.type_name(),
                        method.return_kind()
                    ),
                    method.target()
                )
            })?;
            (arguments, returned)
        }
    };

    write_back(method, writers, arguments)?;
    Ok(result)
}

// Every writable slot is staged before any is committed.
fn write_back(
    method: &MethodSig,
    writers: &mut [Option<SlotWriter<'_>>],
    arguments: Vec<Value>,
) -> Result<(), DecoyError> {
    for (index, (param, value)) in method.params().iter().zip(arguments).enumerate() {
        if !param.mode.writes_back() {
            continue;
        }
        let writer = writers.get_mut(index).and_then(Option::as_mut).ok_or_else(|| {
            err_ctx!(
                Internal,
                format!(
                    "no writer supplied for {} parameter #{} ({})",
                    param.mode.slot_name(),
                    index + 1,
                    param.name
                ),
                method.target(),
                "forward reference and output parameters with Call::reference or Call::out"
            )
        })?;
        writer.stage(value)?;
    }
    for writer in writers.iter_mut().flatten() {
        writer.commit();
    }
    Ok(())
}

// ============================================================================
// HANDLES
// ============================================================================

/// Configures an armed expectation. Every method takes and returns the handle so
/// configuration reads as one chain.
pub struct ExpectationHandle<'s> {
    surrogate: &'s Surrogate,
    queue: usize,
    index: usize,
}

impl<'s> ExpectationHandle<'s> {
    fn with<R>(&self, f: impl FnOnce(&mut Expectation) -> R) -> R {
        let mut state = self.surrogate.state.borrow_mut();
        f(state.queues[self.queue].at_mut(self.index))
    }

    /// Returns `value`, converted to the method's return kind.
    pub fn returns(self, value: impl Into<Value>) -> Result<Self, DecoyError> {
        let value = value.into();
        self.with(|e| {
            let kind = e.method().return_kind();
            let coerced = numeric::coerce(kind, &value).ok_or_else(|| {
                err_ctx!(
                    Configuration,
                    format!(
                        "cannot return {} ({}) from a method declared to return {}",
                        value.describe(),
                        value.type_name(),
                        kind
                    ),
                    e.method().target()
                )
            })?;
            e.set_response(Response::Return(coerced));
            Ok(())
        })?;
        Ok(self)
    }

    /// Fails matching calls with `message`.
    pub fn raises(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.with(|e| e.set_response(Response::Raise(message)));
        self
    }

    /// Runs `callback` over each matching call.
    pub fn does(self, callback: impl Fn(&mut MethodInvocation<'_>) + 'static) -> Self {
        self.with(|e| e.set_response(Response::Invoke(Rc::new(callback))));
        self
    }

    pub fn repeat(self, repeat: Repeat) -> Result<Self, DecoyError> {
        let repeat = repeat.validated()?;
        self.with(|e| e.set_repeat(repeat));
        Ok(self)
    }

    pub fn times(self, n: usize) -> Self {
        self.with(|e| e.set_repeat(Repeat::times(n)));
        self
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn twice(self) -> Self {
        self.times(2)
    }

    pub fn never(self) -> Self {
        self.times(0)
    }

    pub fn at_least(self, n: usize) -> Self {
        self.with(|e| e.set_repeat(Repeat::at_least(n)));
        self
    }

    pub fn at_most(self, n: usize) -> Self {
        self.with(|e| e.set_repeat(Repeat::at_most(n)));
        self
    }

    pub fn any_number_of_times(self) -> Self {
        self.with(|e| e.set_repeat(Repeat::any()));
        self
    }

    /// Calls matched so far.
    pub fn consumed(&self) -> usize {
        self.with(|e| e.consumed())
    }

    pub fn is_satisfied(&self) -> bool {
        self.with(|e| e.is_satisfied())
    }

    pub fn description(&self) -> String {
        self.with(|e| e.description())
    }
}

impl fmt::Debug for ExpectationHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectationHandle")
            .field("surrogate", &self.surrogate.name)
            .field("expectation", &self.description())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arg;
    use crate::value::ValueKind;

    fn string_arg_string() -> MethodSig {
        MethodSig::new("IDemo", "StringArgString")
            .param("s", ValueKind::Text)
            .returns(ValueKind::Text)
    }

    #[test]
    fn strict_rejects_unmatched_call() {
        let demo = Surrogate::strict("demo");
        let m = string_arg_string();
        demo.expect(&m, [Arg::<String>::is().equal("a")]).unwrap();
        let err = demo.invoke(&m, Call::new().arg("b")).unwrap_err();
        assert!(err.is_violation());
        assert_eq!(
            err.message(),
            r#"IDemo.StringArgString("b"); Expected #0, Actual #1."#
        );
    }

    #[test]
    fn exhausted_expectation_reports_actual_count() {
        let demo = Surrogate::strict("demo");
        let m = string_arg_string();
        demo.expect(&m, [Arg::<String>::is().anything()])
            .unwrap()
            .once();
        demo.invoke(&m, Call::new().arg("a")).unwrap();
        let err = demo.invoke(&m, Call::new().arg("a")).unwrap_err();
        assert_eq!(
            err.message(),
            r#"IDemo.StringArgString("a"); Expected #1, Actual #2."#
        );
    }

    #[test]
    fn lenient_returns_default_and_logs() {
        let demo = Surrogate::lenient("demo");
        let m = string_arg_string();
        assert_eq!(demo.invoke(&m, Call::new().arg("x")).unwrap(), Value::Nil);
        assert_eq!(demo.unexpected_calls(), vec![r#"IDemo.StringArgString("x");"#]);
        assert!(demo.verify().is_ok());
        assert!(demo.verify_all().is_err());
    }

    #[test]
    fn returns_is_checked_against_return_kind() {
        let demo = Surrogate::strict("demo");
        let m = string_arg_string();
        let err = demo
            .expect(&m, [Arg::<String>::is().anything()])
            .unwrap()
            .returns(5)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn raises_fails_the_call() {
        let demo = Surrogate::strict("demo");
        let m = string_arg_string();
        demo.expect(&m, [Arg::<String>::is().anything()])
            .unwrap()
            .raises("boom");
        let err = demo.invoke(&m, Call::new().arg("x")).unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Raised);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn arity_mismatch_is_internal() {
        let demo = Surrogate::strict("demo");
        let err = demo.invoke(&string_arg_string(), Call::new()).unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Internal);
    }

    #[test]
    fn callback_may_reenter_the_surrogate() {
        let demo = Rc::new(Surrogate::lenient("demo"));
        let m = string_arg_string();
        let inner = Rc::clone(&demo);
        let inner_method = m.clone();
        demo.stub(&m, [Arg::<String>::is().equal("outer")])
            .unwrap()
            .does(move |call| {
                let nested = inner
                    .invoke(&inner_method, Call::new().arg("inner"))
                    .unwrap_or_default();
                call.set_return_value(format!("nested={nested}"));
            });
        let result = demo.invoke(&m, Call::new().arg("outer")).unwrap();
        assert_eq!(result, Value::from("nested=null"));
    }

    fn two_outputs() -> MethodSig {
        MethodSig::new("IDemo", "Two")
            .output("a", ValueKind::I32)
            .output("b", ValueKind::I32)
    }

    #[test]
    fn failed_write_back_is_not_counted_and_writes_nothing() {
        let demo = Surrogate::strict("demo");
        let m = two_outputs();
        let handle = demo
            .expect(&m, [Arg::<i32>::out(3), Arg::<i32>::out(300)])
            .unwrap()
            .once();

        let mut a = 0i32;
        let mut narrow = 0u8;
        let err = demo
            .invoke(&m, Call::new().out(&mut a).out(&mut narrow))
            .unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Conversion);
        assert_eq!((a, narrow), (0, 0));
        assert_eq!(handle.consumed(), 0);

        let mut b = 0i32;
        demo.invoke(&m, Call::new().out(&mut a).out(&mut b)).unwrap();
        assert_eq!((a, b), (3, 300));
        assert!(demo.verify().is_ok());
    }

    #[test]
    fn callback_conversion_failure_releases_the_expectation() {
        let demo = Surrogate::strict("demo");
        let m = string_arg_string();
        let handle = demo
            .expect(&m, [Arg::<String>::is().anything()])
            .unwrap()
            .does(|call| call.set_return_value(1i32));
        let err = demo.invoke(&m, Call::new().arg("x")).unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Conversion);
        assert_eq!(handle.consumed(), 0);
    }

    #[test]
    fn signatures_differing_in_return_kind_do_not_share_a_queue() {
        let demo = Surrogate::strict("demo");
        let as_text = MethodSig::new("IDemo", "G")
            .param("id", ValueKind::I32)
            .returns(ValueKind::Text);
        let as_int = as_text.clone().returns(ValueKind::I32);
        demo.stub(&as_text, [Arg::<i32>::is().anything()])
            .unwrap()
            .returns("t")
            .unwrap();

        assert_eq!(
            demo.invoke(&as_text, Call::new().arg(1i32)).unwrap(),
            Value::from("t")
        );
        let err = demo.invoke(&as_int, Call::new().arg(1i32)).unwrap_err();
        assert!(err.is_violation());
    }

    thread_local! {
        static REENTERED: Surrogate = Surrogate::lenient("demo");
    }

    #[test]
    fn predicate_may_reenter_the_surrogate() {
        let m = string_arg_string();
        let nested_method = MethodSig::new("IDemo", "VoidNoArgs");
        let accepts_after_nested_call = crate::constraint::Is::matching(
            "accepted after a nested call",
            move |_| {
                REENTERED.with(|inner| {
                    let nested = inner.invoke(&nested_method, Call::new());
                    nested.is_ok() && inner.report().expectations_met()
                })
            },
        );

        REENTERED.with(|demo| {
            demo.stub(&m, [Arg::<String>::matches(accepts_after_nested_call)])
                .unwrap()
                .returns("matched")
                .unwrap();

            let result = demo.invoke(&m, Call::new().arg("x")).unwrap();
            assert_eq!(result, Value::from("matched"));
            assert_eq!(demo.unexpected_calls(), vec!["IDemo.VoidNoArgs();"]);
        });
    }
}
