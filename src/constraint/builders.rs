//! Constraint builder namespaces.
//!
//! - **`Is`**: identity, equality and ordering comparators
//! - **`Text`**: predicates over text arguments
//! - **`List`**: predicates over list arguments
//!
//! Every builder returns a fresh, immutable [`Constraint`]; there is no shared registry to
//! reset between tests.

use std::sync::Arc;

use regex::Regex;

use super::{CollectionPredicate, Constraint, Predicate, TextPredicate};
use crate::value::{Value, ValueKind};
use crate::{err_msg, DecoyError};

// ============================================================================
// IS
// ============================================================================

/// Equality and ordering comparators.
pub struct Is;

impl Is {
    pub fn anything() -> Constraint {
        Constraint::Anything
    }

    pub fn not_null() -> Constraint {
        Constraint::NotNull
    }

    pub fn null() -> Constraint {
        Constraint::Equal(Value::Nil)
    }

    pub fn equal(expected: impl Into<Value>) -> Constraint {
        Constraint::Equal(expected.into())
    }

    pub fn not_equal(expected: impl Into<Value>) -> Constraint {
        Constraint::NotEqual(expected.into())
    }

    pub fn greater_than(bound: impl Into<Value>) -> Constraint {
        Constraint::GreaterThan(bound.into())
    }

    pub fn greater_than_or_equal(bound: impl Into<Value>) -> Constraint {
        Constraint::GreaterThanOrEqual(bound.into())
    }

    pub fn less_than(bound: impl Into<Value>) -> Constraint {
        Constraint::LessThan(bound.into())
    }

    pub fn less_than_or_equal(bound: impl Into<Value>) -> Constraint {
        Constraint::LessThanOrEqual(bound.into())
    }

    /// Matches values carrying exactly `kind` (`any` matches every non-null value).
    pub fn of_kind(kind: ValueKind) -> Constraint {
        Constraint::OfKind(kind)
    }

    /// Wraps an arbitrary predicate; `description` is what verification failures print.
    pub fn matching(
        description: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Constraint {
        Constraint::Predicate(Predicate::new(description, test))
    }
}

// ============================================================================
// TEXT
// ============================================================================

/// Predicates over text arguments. Non-text arguments never match.
pub struct Text;

impl Text {
    pub fn contains(part: impl Into<String>) -> Constraint {
        Constraint::Text(TextPredicate::Contains(part.into()))
    }

    pub fn starts_with(prefix: impl Into<String>) -> Constraint {
        Constraint::Text(TextPredicate::StartsWith(prefix.into()))
    }

    pub fn ends_with(suffix: impl Into<String>) -> Constraint {
        Constraint::Text(TextPredicate::EndsWith(suffix.into()))
    }

    pub fn equal(expected: impl Into<String>) -> Constraint {
        Constraint::Text(TextPredicate::Equal(expected.into()))
    }

    /// Regular-expression match. The pattern is compiled immediately, so a malformed
    /// pattern surfaces as a configuration error at setup time.
    pub fn like(pattern: &str) -> Result<Constraint, DecoyError> {
        let re = Regex::new(pattern).map_err(|e| {
            err_msg!(Configuration, "invalid text pattern {:?}: {}", pattern, e)
        })?;
        Ok(Constraint::Text(TextPredicate::Like(re)))
    }

    /// Applies `length` to the number of characters in the text.
    pub fn length(length: Constraint) -> Constraint {
        Constraint::Text(TextPredicate::Length(Arc::new(length)))
    }
}

// ============================================================================
// LIST
// ============================================================================

/// Predicates over list arguments. Non-list arguments never match (except `count`, which
/// also counts map entries).
pub struct List;

impl List {
    pub fn count(count: Constraint) -> Constraint {
        Constraint::Collection(CollectionPredicate::Count(Arc::new(count)))
    }

    /// The argument list contains `element`.
    pub fn is_in(element: impl Into<Value>) -> Constraint {
        Constraint::Collection(CollectionPredicate::ContainsElement(element.into()))
    }

    /// The argument itself is one of `candidates`.
    pub fn one_of<T: Into<Value>>(candidates: Vec<T>) -> Constraint {
        Constraint::Collection(CollectionPredicate::OneOf(
            candidates.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn contains_all<T: Into<Value>>(required: Vec<T>) -> Constraint {
        Constraint::Collection(CollectionPredicate::ContainsAll(
            required.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn element(index: usize, element: Constraint) -> Constraint {
        Constraint::Collection(CollectionPredicate::Element(index, Arc::new(element)))
    }

    /// Element-wise equality with `expected`.
    pub fn equal<T: Into<Value>>(expected: Vec<T>) -> Constraint {
        Constraint::Equal(Value::from(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_compiles_eagerly() {
        let c = Text::like("^St.*er$").unwrap();
        assert!(c.evaluate(&Value::from("Steinegger")));
        assert_eq!(c.describe(), r#"like "^St.*er$""#);
        let err = Text::like("(unclosed").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn list_equal_is_element_wise() {
        let c = List::equal(vec![1i32, 2]);
        assert!(c.evaluate(&Value::from(vec![1i64, 2])));
        assert!(!c.evaluate(&Value::from(vec![1i64, 2, 3])));
    }
}
