//! The typed `Arg<T>` factory.
//!
//! `Arg::<i64>::is().equal(1)` reads the way the setup is meant: "an `i64` argument equal
//! to 1". The type parameter only contributes a kind hint, checked against the slot at
//! bind time; comparisons always run under the slot's declared kind.

use std::marker::PhantomData;

use crate::binder::{ArgSpec, SpecKind};
use crate::constraint::{Constraint, Is, List, Text};
use crate::value::{SlotType, Value, ValueKind};
use crate::{err_msg, DecoyError};

/// Factory for argument specs typed by the parameter's Rust type.
pub struct Arg<T>(PhantomData<T>);

impl<T: SlotType> Arg<T> {
    /// Equality and ordering comparators.
    pub fn is() -> IsBuilder<T> {
        IsBuilder(PhantomData)
    }

    /// Text predicates.
    pub fn text() -> TextBuilder {
        TextBuilder { hint: T::KIND }
    }

    /// Collection predicates.
    pub fn list() -> ListBuilder<T> {
        ListBuilder(PhantomData)
    }

    /// Uses an arbitrary (possibly composite) constraint.
    pub fn matches(constraint: Constraint) -> ArgSpec {
        ArgSpec::new(SpecKind::Constraint(constraint), T::KIND)
    }

    /// A bare literal. Only valid when every argument of the call is a literal.
    pub fn literal(value: impl Into<Value>) -> ArgSpec {
        ArgSpec::new(SpecKind::Literal(value.into()), T::KIND)
    }

    /// Injects `value` into an output parameter.
    pub fn out(value: impl Into<Value>) -> ArgSpec {
        ArgSpec::new(SpecKind::Output(value.into()), T::KIND)
    }

    /// Matches a reference parameter's prior value against `prior`, then injects `value`.
    pub fn reference(prior: Constraint, value: impl Into<Value>) -> ArgSpec {
        ArgSpec::new(
            SpecKind::Reference {
                prior: Some(prior),
                value: value.into(),
            },
            T::KIND,
        )
    }

    /// Injects `value` into a reference parameter whatever its prior value.
    pub fn reference_any(value: impl Into<Value>) -> ArgSpec {
        ArgSpec::new(
            SpecKind::Reference {
                prior: None,
                value: value.into(),
            },
            T::KIND,
        )
    }
}

// ============================================================================
// NAMESPACE GUARD
// ============================================================================

/// Shared behaviour of the builder namespaces.
///
/// A namespace is not a constraint. Comparing one against a value almost always means a
/// concrete comparator was forgotten (`Arg::<T>::is().equals(x)` instead of
/// `.equal(x)`), so `equals` always fails with a configuration error.
pub trait BuilderNamespace {
    const NAME: &'static str;
    const COMPARATOR: &'static str;

    fn equals<U>(&self, _other: U) -> Result<bool, DecoyError> {
        Err(err_msg!(
            Configuration,
            "{}::equals() is not a constraint; use {} to build an equality constraint",
            Self::NAME,
            Self::COMPARATOR
        ))
    }
}

// ============================================================================
// IS
// ============================================================================

pub struct IsBuilder<T>(PhantomData<T>);

impl<T: SlotType> IsBuilder<T> {
    fn spec(&self, constraint: Constraint) -> ArgSpec {
        ArgSpec::new(SpecKind::Constraint(constraint), T::KIND)
    }

    pub fn anything(&self) -> ArgSpec {
        self.spec(Is::anything())
    }

    pub fn not_null(&self) -> ArgSpec {
        self.spec(Is::not_null())
    }

    pub fn null(&self) -> ArgSpec {
        self.spec(Is::null())
    }

    pub fn equal(&self, expected: impl Into<Value>) -> ArgSpec {
        self.spec(Is::equal(expected))
    }

    pub fn not_equal(&self, expected: impl Into<Value>) -> ArgSpec {
        self.spec(Is::not_equal(expected))
    }

    pub fn greater_than(&self, bound: impl Into<Value>) -> ArgSpec {
        self.spec(Is::greater_than(bound))
    }

    pub fn greater_than_or_equal(&self, bound: impl Into<Value>) -> ArgSpec {
        self.spec(Is::greater_than_or_equal(bound))
    }

    pub fn less_than(&self, bound: impl Into<Value>) -> ArgSpec {
        self.spec(Is::less_than(bound))
    }

    pub fn less_than_or_equal(&self, bound: impl Into<Value>) -> ArgSpec {
        self.spec(Is::less_than_or_equal(bound))
    }

    pub fn of_kind(&self, kind: ValueKind) -> ArgSpec {
        self.spec(Is::of_kind(kind))
    }

    pub fn matching(
        &self,
        description: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> ArgSpec {
        self.spec(Is::matching(description, test))
    }
}

impl<T> BuilderNamespace for IsBuilder<T> {
    const NAME: &'static str = "Is";
    const COMPARATOR: &'static str = "Is::equal(..)";
}

// ============================================================================
// TEXT
// ============================================================================

pub struct TextBuilder {
    hint: ValueKind,
}

impl TextBuilder {
    fn spec(&self, constraint: Constraint) -> ArgSpec {
        ArgSpec::new(SpecKind::Constraint(constraint), self.hint)
    }

    pub fn contains(&self, part: impl Into<String>) -> ArgSpec {
        self.spec(Text::contains(part))
    }

    pub fn starts_with(&self, prefix: impl Into<String>) -> ArgSpec {
        self.spec(Text::starts_with(prefix))
    }

    pub fn ends_with(&self, suffix: impl Into<String>) -> ArgSpec {
        self.spec(Text::ends_with(suffix))
    }

    pub fn equal(&self, expected: impl Into<String>) -> ArgSpec {
        self.spec(Text::equal(expected))
    }

    pub fn like(&self, pattern: &str) -> Result<ArgSpec, DecoyError> {
        Text::like(pattern).map(|c| self.spec(c))
    }

    pub fn length(&self, length: Constraint) -> ArgSpec {
        self.spec(Text::length(length))
    }
}

impl BuilderNamespace for TextBuilder {
    const NAME: &'static str = "Text";
    const COMPARATOR: &'static str = "Text::equal(..)";
}

// ============================================================================
// LIST
// ============================================================================

pub struct ListBuilder<T>(PhantomData<T>);

impl<T: SlotType> ListBuilder<T> {
    fn spec(&self, constraint: Constraint) -> ArgSpec {
        ArgSpec::new(SpecKind::Constraint(constraint), T::KIND)
    }

    pub fn count(&self, count: Constraint) -> ArgSpec {
        self.spec(List::count(count))
    }

    pub fn is_in(&self, element: impl Into<Value>) -> ArgSpec {
        self.spec(List::is_in(element))
    }

    pub fn one_of<V: Into<Value>>(&self, candidates: Vec<V>) -> ArgSpec {
        self.spec(List::one_of(candidates))
    }

    pub fn contains_all<V: Into<Value>>(&self, required: Vec<V>) -> ArgSpec {
        self.spec(List::contains_all(required))
    }

    pub fn element(&self, index: usize, element: Constraint) -> ArgSpec {
        self.spec(List::element(index, element))
    }

    pub fn equal<V: Into<Value>>(&self, expected: Vec<V>) -> ArgSpec {
        self.spec(List::equal(expected))
    }
}

impl<T> BuilderNamespace for ListBuilder<T> {
    const NAME: &'static str = "List";
    const COMPARATOR: &'static str = "List::equal(..)";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_equals_throws() {
        let err = Arg::<Value>::is().equals(Value::Nil).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message().contains("Is::equal(..)"));
    }

    #[test]
    fn list_equals_throws() {
        assert!(Arg::<Value>::list().equals(()).is_err());
    }

    #[test]
    fn text_equals_throws() {
        assert!(Arg::<String>::text().equals(Is::anything()).is_err());
    }

    #[test]
    fn hints_follow_the_type_parameter() {
        assert_eq!(Arg::<i64>::is().equal(1).hint(), ValueKind::I64);
        assert_eq!(Arg::<&str>::text().contains("x").hint(), ValueKind::Text);
        assert_eq!(Arg::<Vec<String>>::list().is_in("x").hint(), ValueKind::List);
    }
}
