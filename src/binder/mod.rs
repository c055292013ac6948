//! # Argument Binding
//!
//! Turns the argument specs supplied to `expect`/`stub` into one [`BoundArg`] per
//! parameter slot of the target method. Binding is pure validation plus construction and
//! is the only place where malformed setups are detected, so every failure here is a
//! configuration error raised before the surrogate is ever exercised.
//!
//! Validation order:
//!
//! 1. literals mixed with constraints (the literals do not count as constraints);
//! 2. argument count against the method's arity;
//! 3. passing mode of each position (value, reference, output);
//! 4. kind compatibility of `Arg<T>` hints, and coercion of injected values into the
//!    slot's declared kind.

use std::fmt;

use crate::constraint::Constraint;
use crate::method::{MethodSig, Param, PassingMode};
use crate::value::{numeric, Value, ValueKind};
use crate::{err_ctx, DecoyError};

pub mod arg;

pub use arg::{Arg, BuilderNamespace, IsBuilder, ListBuilder, TextBuilder};

// ============================================================================
// SUPPLIED SPECS
// ============================================================================

/// What the caller supplied for one parameter position.
#[derive(Debug, Clone)]
pub enum SpecKind {
    /// A constraint for a by-value slot.
    Constraint(Constraint),
    /// A bare literal; only valid when every position is a literal.
    Literal(Value),
    /// Value injected into an output slot.
    Output(Value),
    /// Prior-value constraint (anything when absent) and value injected into a
    /// by-reference slot.
    Reference {
        prior: Option<Constraint>,
        value: Value,
    },
}

/// One supplied argument spec, with the kind hint of the `Arg<T>` factory that built it.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    spec: SpecKind,
    hint: ValueKind,
}

impl ArgSpec {
    pub fn new(spec: SpecKind, hint: ValueKind) -> Self {
        Self { spec, hint }
    }

    pub fn constraint(constraint: Constraint) -> Self {
        Self::new(SpecKind::Constraint(constraint), ValueKind::Any)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        let hint = value.kind();
        Self::new(SpecKind::Literal(value), hint)
    }

    pub fn output(value: impl Into<Value>) -> Self {
        Self::new(SpecKind::Output(value.into()), ValueKind::Any)
    }

    pub fn reference(prior: Option<Constraint>, value: impl Into<Value>) -> Self {
        Self::new(
            SpecKind::Reference {
                prior,
                value: value.into(),
            },
            ValueKind::Any,
        )
    }

    pub fn spec(&self) -> &SpecKind {
        &self.spec
    }

    pub fn hint(&self) -> ValueKind {
        self.hint
    }

    fn supplied_slot(&self) -> &'static str {
        match self.spec {
            SpecKind::Constraint(_) => "constraint",
            SpecKind::Literal(_) => "literal",
            SpecKind::Output(_) => "output slot",
            SpecKind::Reference { .. } => "reference slot",
        }
    }
}

impl From<Constraint> for ArgSpec {
    fn from(constraint: Constraint) -> Self {
        ArgSpec::constraint(constraint)
    }
}

// ============================================================================
// BOUND ARGUMENTS
// ============================================================================

/// How a bound slot participates in matching and write-back.
#[derive(Debug, Clone)]
pub enum Matcher {
    Value(Constraint),
    Reference { prior: Constraint, inject: Value },
    Output { inject: Value },
}

/// A spec bound to a parameter slot. `kind` is the slot's declared kind and is the kind
/// every comparison runs under.
#[derive(Debug, Clone)]
pub struct BoundArg {
    pub kind: ValueKind,
    pub mode: PassingMode,
    pub matcher: Matcher,
}

impl BoundArg {
    /// Whether `actual` satisfies this slot. Output slots never look at the caller's value.
    pub fn matches(&self, actual: &Value) -> bool {
        match &self.matcher {
            Matcher::Value(constraint) => constraint.evaluate_as(self.kind, actual),
            Matcher::Reference { prior, .. } => prior.evaluate_as(self.kind, actual),
            Matcher::Output { .. } => true,
        }
    }

    /// The value written back into caller storage, for reference and output slots.
    pub fn injected(&self) -> Option<&Value> {
        match &self.matcher {
            Matcher::Value(_) => None,
            Matcher::Reference { inject, .. } | Matcher::Output { inject } => Some(inject),
        }
    }
}

impl fmt::Display for BoundArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Matcher::Value(constraint) => write!(f, "{constraint}"),
            Matcher::Reference { prior, inject } => {
                write!(f, "ref {prior} => {}", inject.describe())
            }
            Matcher::Output { inject } => write!(f, "out {}", inject.describe()),
        }
    }
}

// ============================================================================
// BINDING
// ============================================================================

/// Binds `specs` to the parameter slots of `method`.
pub fn bind(method: &MethodSig, specs: Vec<ArgSpec>) -> Result<Vec<BoundArg>, DecoyError> {
    let target = method.target();
    let literals = specs
        .iter()
        .filter(|s| matches!(s.spec, SpecKind::Literal(_)))
        .count();

    if literals > 0 && literals < specs.len() {
        let constraints = specs.len() - literals;
        return Err(err_ctx!(
            Configuration,
            format!(
                "when using argument constraints, all arguments must be constraints: {} expects {} argument(s), but {} constraint(s) were supplied",
                target,
                method.arity(),
                constraints
            ),
            target,
            "wrap literal arguments with Arg::<T>::is().equal(..)"
        ));
    }

    if specs.len() != method.arity() {
        let direction = if specs.len() < method.arity() {
            "too few"
        } else {
            "too many"
        };
        return Err(err_ctx!(
            Configuration,
            format!(
                "{} expects {} argument(s), but {} were supplied ({})",
                target,
                method.arity(),
                specs.len(),
                direction
            ),
            target
        ));
    }

    specs
        .into_iter()
        .zip(method.params())
        .enumerate()
        .map(|(index, (spec, param))| bind_one(&target, index, spec, param))
        .collect()
}

fn bind_one(
    target: &str,
    index: usize,
    spec: ArgSpec,
    param: &Param,
) -> Result<BoundArg, DecoyError> {
    let position = format!("argument #{} ({})", index + 1, param.name);

    let expected_shape = match (param.mode, &spec.spec) {
        (PassingMode::ByValue, SpecKind::Constraint(_) | SpecKind::Literal(_)) => None,
        (PassingMode::ByReference, SpecKind::Reference { .. }) => None,
        (PassingMode::Output, SpecKind::Output(_)) => None,
        (mode, _) => Some(mode.slot_name()),
    };
    if let Some(expected) = expected_shape {
        return Err(err_ctx!(
            Configuration,
            format!(
                "{}: {} supplied where {} slot expected",
                position,
                spec.supplied_slot(),
                expected
            ),
            target,
            help_for(param.mode)
        ));
    }

    if !spec.hint.is_compatible_with(param.kind) {
        return Err(err_ctx!(
            Configuration,
            format!(
                "{}: argument typed as {} cannot bind to a parameter declared as {}",
                position, spec.hint, param.kind
            ),
            target
        ));
    }

    let matcher = match spec.spec {
        SpecKind::Constraint(constraint) => Matcher::Value(constraint),
        SpecKind::Literal(value) => Matcher::Value(Constraint::Equal(value)),
        SpecKind::Output(value) => Matcher::Output {
            inject: coerce_injected(target, &position, param.kind, value)?,
        },
        SpecKind::Reference { prior, value } => Matcher::Reference {
            prior: prior.unwrap_or(Constraint::Anything),
            inject: coerce_injected(target, &position, param.kind, value)?,
        },
    };

    check_operands(target, &position, param.kind, &matcher)?;

    Ok(BoundArg {
        kind: param.kind,
        mode: param.mode,
        matcher,
    })
}

// An operand that cannot be compared in the slot at all (a float against an integer
// slot) would make the expectation unmatchable.
fn check_operands(
    target: &str,
    position: &str,
    kind: ValueKind,
    matcher: &Matcher,
) -> Result<(), DecoyError> {
    let constraint = match matcher {
        Matcher::Value(constraint) | Matcher::Reference { prior: constraint, .. } => constraint,
        Matcher::Output { .. } => return Ok(()),
    };
    match constraint
        .comparison_operands()
        .into_iter()
        .find(|v| numeric::canonicalize(kind, v).is_none())
    {
        Some(operand) => Err(err_ctx!(
            Configuration,
            format!(
                "{}: {} ({}) can never be compared with a slot declared as {}",
                position,
                operand.describe(),
                operand.type_name(),
                kind
            ),
            target,
            "use an operand of the slot's own kind"
        )),
        None => Ok(()),
    }
}

fn coerce_injected(
    target: &str,
    position: &str,
    kind: ValueKind,
    value: Value,
) -> Result<Value, DecoyError> {
    numeric::coerce(kind, &value).ok_or_else(|| {
        err_ctx!(
            Configuration,
            format!(
                "{}: cannot inject {} ({}) into a slot declared as {}",
                position,
                value.describe(),
                value.type_name(),
                kind
            ),
            target
        )
    })
}

fn help_for(mode: PassingMode) -> &'static str {
    match mode {
        PassingMode::ByValue => "use a constraint such as Arg::<T>::is().anything() for value parameters",
        PassingMode::ByReference => "use Arg::<T>::reference(prior, value) for reference parameters",
        PassingMode::Output => "use Arg::<T>::out(value) for output parameters",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Is, Text};

    fn void_three_args() -> MethodSig {
        MethodSig::new("IDemo", "VoidThreeArgs")
            .param("a", ValueKind::I32)
            .param("b", ValueKind::Text)
            .param("c", ValueKind::F32)
    }

    #[test]
    fn all_literals_become_equality() {
        let bound = bind(
            &void_three_args(),
            vec![
                ArgSpec::literal(1),
                ArgSpec::literal("x"),
                ArgSpec::literal(2.5f32),
            ],
        )
        .unwrap();
        assert_eq!(bound.len(), 3);
        assert!(bound[0].matches(&Value::I32(1)));
        assert!(!bound[0].matches(&Value::I32(2)));
    }

    #[test]
    fn mixed_literals_are_rejected() {
        let err = bind(
            &void_three_args(),
            vec![
                Is::equal(4).into(),
                Text::contains("World").into(),
                ArgSpec::literal(3.14f32),
            ],
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message().contains("2 constraint(s)"));
    }

    #[test]
    fn bound_kind_is_the_declared_slot_kind() {
        let m = MethodSig::new("ITestService", "GetUser")
            .param("id", ValueKind::I64)
            .returns(ValueKind::Text);
        let bound = bind(&m, vec![Arg::<i64>::is().equal(1i32)]).unwrap();
        assert_eq!(bound[0].kind, ValueKind::I64);
        assert!(bound[0].matches(&Value::I64(1)));
        assert!(!bound[0].matches(&Value::I64(0)));
    }

    #[test]
    fn incompatible_hint_is_rejected() {
        let m = MethodSig::new("IDemo", "VoidStringArg").param("s", ValueKind::Text);
        let err = bind(&m, vec![Arg::<i32>::is().equal(1)]).unwrap_err();
        assert!(err.message().contains("typed as i32"));
    }

    #[test]
    fn injected_values_are_coerced_to_slot_kind() {
        let m = MethodSig::new("ITest", "Out").output("i", ValueKind::I64);
        let bound = bind(&m, vec![Arg::<i64>::out(3i32)]).unwrap();
        assert_eq!(bound[0].injected(), Some(&Value::I64(3)));
        assert_eq!(bound[0].to_string(), "out 3");

        let err = bind(&m, vec![Arg::<Value>::out("three")]).unwrap_err();
        assert!(err.message().contains("cannot inject"));
    }

    #[test]
    fn float_operand_for_integer_slot_is_rejected() {
        let m = MethodSig::new("ITestService", "GetUser")
            .param("id", ValueKind::I64)
            .returns(ValueKind::Text);
        let err = bind(&m, vec![Arg::<i64>::is().less_than(2.5)]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message().contains("2.5 (F64) can never be compared with a slot declared as i64"));

        let nested = Is::greater_than(0) & !Is::equal(1.5);
        assert!(bind(&m, vec![Arg::<i64>::matches(nested)]).is_err());

        assert!(bind(&m, vec![Arg::<i64>::is().less_than(3)]).is_ok());
    }

    #[test]
    fn float_operand_for_float_slot_is_accepted() {
        let m = MethodSig::new("IDemo", "Scale").param("factor", ValueKind::F64);
        assert!(bind(&m, vec![Arg::<f64>::is().less_than(2)]).is_ok());
        assert!(bind(&m, vec![Arg::<f64>::is().less_than(2.5)]).is_ok());
    }
}
