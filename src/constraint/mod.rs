//! # Argument Constraints
//!
//! A [`Constraint`] is an immutable predicate over one argument value, together with the
//! description that is printed when an expectation goes unmet. Constraints are built with
//! the [`Is`], [`Text`] and [`List`] namespaces and composed with `and`/`or`/`negate`
//! (or the `&`, `|` and `!` operators).
//!
//! ## Evaluation
//!
//! - **Slot-driven comparisons**: equality and ordering delegate to
//!   [`numeric`](crate::value::numeric), keyed on the declared kind of the slot the
//!   constraint is bound to, never on the literal's own type.
//! - **Short-circuiting**: composites evaluate children left to right and stop as soon as
//!   the outcome is known.
//! - **Type mismatches are non-matches**: a text predicate applied to a number is simply
//!   `false`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::value::{numeric, Value, ValueKind};

pub mod builders;

pub use builders::{Is, List, Text};

// ============================================================================
// CORE TYPES
// ============================================================================

/// A composable predicate over a single argument value.
#[derive(Clone)]
pub enum Constraint {
    Anything,
    NotNull,
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    OfKind(ValueKind),
    Text(TextPredicate),
    Collection(CollectionPredicate),
    Predicate(Predicate),
    And(Arc<Constraint>, Arc<Constraint>),
    Or(Arc<Constraint>, Arc<Constraint>),
    Not(Arc<Constraint>),
}

/// Predicates over text arguments.
#[derive(Debug, Clone)]
pub enum TextPredicate {
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Equal(String),
    Like(Regex),
    Length(Arc<Constraint>),
}

/// Predicates over list (and map) arguments.
#[derive(Debug, Clone)]
pub enum CollectionPredicate {
    Count(Arc<Constraint>),
    ContainsElement(Value),
    OneOf(Vec<Value>),
    ContainsAll(Vec<Value>),
    Element(usize, Arc<Constraint>),
}

pub type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A user-supplied predicate with its own description.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    test: Arc<PredicateFn>,
}

impl Predicate {
    pub fn new(
        description: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

impl Constraint {
    /// The operands of the equality and ordering comparisons in this tree, including those
    /// under `and`/`or`/`not`.
    pub fn comparison_operands(&self) -> Vec<&Value> {
        match self {
            Constraint::Equal(v)
            | Constraint::NotEqual(v)
            | Constraint::GreaterThan(v)
            | Constraint::GreaterThanOrEqual(v)
            | Constraint::LessThan(v)
            | Constraint::LessThanOrEqual(v) => vec![v],
            Constraint::And(l, r) | Constraint::Or(l, r) => {
                let mut operands = l.comparison_operands();
                operands.extend(r.comparison_operands());
                operands
            }
            Constraint::Not(inner) => inner.comparison_operands(),
            _ => Vec::new(),
        }
    }

    /// Evaluates the constraint with `any` as the comparison kind.
    pub fn evaluate(&self, value: &Value) -> bool {
        self.evaluate_as(ValueKind::Any, value)
    }

    /// Evaluates the constraint as bound to a slot declared as `kind`.
    pub fn evaluate_as(&self, kind: ValueKind, value: &Value) -> bool {
        match self {
            Constraint::Anything => true,
            Constraint::NotNull => !value.is_nil(),
            Constraint::Equal(expected) => numeric::equivalent(kind, value, expected),
            Constraint::NotEqual(expected) => !numeric::equivalent(kind, value, expected),
            Constraint::GreaterThan(bound) => {
                ordered(kind, value, bound, |o| o == Ordering::Greater)
            }
            Constraint::GreaterThanOrEqual(bound) => {
                ordered(kind, value, bound, |o| o != Ordering::Less)
            }
            Constraint::LessThan(bound) => ordered(kind, value, bound, |o| o == Ordering::Less),
            Constraint::LessThanOrEqual(bound) => {
                ordered(kind, value, bound, |o| o != Ordering::Greater)
            }
            Constraint::OfKind(expected) => match expected {
                ValueKind::Any => !value.is_nil(),
                other => value.kind() == *other,
            },
            Constraint::Text(predicate) => value
                .as_text()
                .is_some_and(|text| predicate.evaluate(text)),
            Constraint::Collection(predicate) => predicate.evaluate(value),
            Constraint::Predicate(predicate) => (predicate.test)(value),
            Constraint::And(left, right) => {
                left.evaluate_as(kind, value) && right.evaluate_as(kind, value)
            }
            Constraint::Or(left, right) => {
                left.evaluate_as(kind, value) || right.evaluate_as(kind, value)
            }
            Constraint::Not(inner) => !inner.evaluate_as(kind, value),
        }
    }

    /// The human-readable description used in verification failures.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    pub fn and(self, other: Constraint) -> Constraint {
        Constraint::And(Arc::new(self), Arc::new(other))
    }

    pub fn or(self, other: Constraint) -> Constraint {
        Constraint::Or(Arc::new(self), Arc::new(other))
    }

    pub fn negate(self) -> Constraint {
        Constraint::Not(Arc::new(self))
    }

    fn is_composite(&self) -> bool {
        matches!(self, Constraint::And(..) | Constraint::Or(..))
    }
}

// Shared template for the four ordering comparators.
fn ordered(kind: ValueKind, value: &Value, bound: &Value, accept: fn(Ordering) -> bool) -> bool {
    numeric::compare(kind, value, bound).is_some_and(accept)
}

impl TextPredicate {
    fn evaluate(&self, text: &str) -> bool {
        match self {
            TextPredicate::Contains(part) => text.contains(part.as_str()),
            TextPredicate::StartsWith(prefix) => text.starts_with(prefix.as_str()),
            TextPredicate::EndsWith(suffix) => text.ends_with(suffix.as_str()),
            TextPredicate::Equal(expected) => text == expected,
            TextPredicate::Like(pattern) => pattern.is_match(text),
            TextPredicate::Length(inner) => inner.evaluate(&Value::from(text.chars().count())),
        }
    }
}

impl CollectionPredicate {
    fn evaluate(&self, value: &Value) -> bool {
        match self {
            CollectionPredicate::Count(inner) => value
                .collection_len()
                .is_some_and(|len| inner.evaluate(&Value::from(len))),
            CollectionPredicate::ContainsElement(element) => value
                .as_list()
                .is_some_and(|items| contains(items, element)),
            CollectionPredicate::OneOf(candidates) => contains(candidates, value),
            CollectionPredicate::ContainsAll(required) => value
                .as_list()
                .is_some_and(|items| required.iter().all(|r| contains(items, r))),
            CollectionPredicate::Element(index, inner) => value
                .as_list()
                .and_then(|items| items.get(*index))
                .is_some_and(|item| inner.evaluate(item)),
        }
    }
}

fn contains(items: &[Value], needle: &Value) -> bool {
    items
        .iter()
        .any(|item| numeric::equivalent(ValueKind::Any, item, needle))
}

// ============================================================================
// COMPOSITION OPERATORS
// ============================================================================

impl std::ops::BitAnd for Constraint {
    type Output = Constraint;

    fn bitand(self, rhs: Constraint) -> Constraint {
        self.and(rhs)
    }
}

impl std::ops::BitOr for Constraint {
    type Output = Constraint;

    fn bitor(self, rhs: Constraint) -> Constraint {
        self.or(rhs)
    }
}

impl std::ops::Not for Constraint {
    type Output = Constraint;

    fn not(self) -> Constraint {
        self.negate()
    }
}

// ============================================================================
// DESCRIPTIONS
// ============================================================================

struct Operand<'a>(&'a Constraint);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_composite() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn describe_all(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(Value::describe).collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Anything => write!(f, "anything"),
            Constraint::NotNull => write!(f, "not equal to null"),
            Constraint::Equal(v) => write!(f, "equal to {}", v.describe()),
            Constraint::NotEqual(v) => write!(f, "not equal to {}", v.describe()),
            Constraint::GreaterThan(v) => write!(f, "greater than {}", v.describe()),
            Constraint::GreaterThanOrEqual(v) => {
                write!(f, "greater than or equal to {}", v.describe())
            }
            Constraint::LessThan(v) => write!(f, "less than {}", v.describe()),
            Constraint::LessThanOrEqual(v) => write!(f, "less than or equal to {}", v.describe()),
            Constraint::OfKind(kind) => write!(f, "of kind {kind}"),
            Constraint::Text(predicate) => write!(f, "{predicate}"),
            Constraint::Collection(predicate) => write!(f, "{predicate}"),
            Constraint::Predicate(predicate) => write!(f, "{}", predicate.description),
            Constraint::And(l, r) => write!(f, "{} and {}", Operand(l), Operand(r)),
            Constraint::Or(l, r) => write!(f, "{} or {}", Operand(l), Operand(r)),
            Constraint::Not(inner) => write!(f, "not {}", Operand(inner)),
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint({self})")
    }
}

impl fmt::Display for TextPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextPredicate::Contains(s) => write!(f, "contains {s:?}"),
            TextPredicate::StartsWith(s) => write!(f, "starts with {s:?}"),
            TextPredicate::EndsWith(s) => write!(f, "ends with {s:?}"),
            TextPredicate::Equal(s) => write!(f, "equal to text {s:?}"),
            TextPredicate::Like(re) => write!(f, "like {:?}", re.as_str()),
            TextPredicate::Length(inner) => write!(f, "text length {}", Operand(inner)),
        }
    }
}

impl fmt::Display for CollectionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionPredicate::Count(inner) => write!(f, "collection count {}", Operand(inner)),
            CollectionPredicate::ContainsElement(v) => write!(f, "list contains {}", v.describe()),
            CollectionPredicate::OneOf(vs) => write!(f, "one of {}", describe_all(vs)),
            CollectionPredicate::ContainsAll(vs) => write!(f, "contains all {}", describe_all(vs)),
            CollectionPredicate::Element(i, inner) => {
                write!(f, "element at {i} {}", Operand(inner))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use super::*;

    #[test]
    fn or_composite_matches_either_side() {
        let c = Is::equal("hallo") | Text::ends_with("b");
        assert!(c.evaluate(&Value::from("hallo")));
        assert!(c.evaluate(&Value::from("ab")));
        assert!(!c.evaluate(&Value::from("ba")));
        assert_eq!(c.describe(), r#"equal to "hallo" or ends with "b""#);
    }

    #[test]
    fn nested_composites_are_parenthesized() {
        let c = !(Is::greater_than(1) & Is::less_than(5)) | Is::equal(3);
        assert_eq!(
            c.describe(),
            "not (greater than 1 and less than 5) or equal to 3"
        );
        assert!(c.evaluate(&Value::I32(3)));
        assert!(c.evaluate(&Value::I32(9)));
        assert!(!c.evaluate(&Value::I32(2)));
    }

    #[test]
    fn composites_short_circuit_left_to_right() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let counting = Is::matching("counted", |_| {
            CALLS.fetch_add(1, AtomicOrdering::SeqCst);
            true
        });
        let and = Is::equal(1).and(counting.clone());
        assert!(!and.evaluate(&Value::I32(2)));
        let or = Is::equal(1).or(counting);
        assert!(or.evaluate(&Value::I32(1)));
        assert_eq!(CALLS.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn ordering_uses_slot_kind() {
        let c = Is::less_than(2.5);
        assert!(c.evaluate_as(ValueKind::F32, &Value::F32(2.4)));
        assert!(!c.evaluate_as(ValueKind::F32, &Value::F32(2.6)));
        assert!(Is::greater_than(1).evaluate_as(ValueKind::I64, &Value::I64(2)));
        assert!(!Is::greater_than(1).evaluate_as(ValueKind::I64, &Value::I64(1)));
    }

    #[test]
    fn text_predicates_reject_non_text() {
        assert!(Text::contains("eine").evaluate(&Value::from("Steinegger")));
        assert!(!Text::contains("1").evaluate(&Value::I32(1)));
        assert!(Text::length(Is::equal(3)).evaluate(&Value::from("abc")));
        assert_eq!(
            Text::length(Is::equal(3)).describe(),
            "text length equal to 3"
        );
    }

    #[test]
    fn collection_predicates() {
        let list = Value::from(vec!["1", "2", "4", "5"]);
        assert!(List::count(Is::greater_than(3)).evaluate(&list));
        assert!(!List::is_in("hello").evaluate(&list));
        assert!(List::is_in("4").evaluate(&list));
        assert!(List::contains_all(vec!["1", "5"]).evaluate(&list));
        assert!(List::element(0, Is::equal("1")).evaluate(&list));
        assert!(List::one_of(vec![1i32, 2, 3]).evaluate(&Value::I64(2)));
        assert_eq!(
            List::count(Is::greater_than(3)).describe(),
            "collection count greater than 3"
        );
    }

    #[test]
    fn not_null_and_anything() {
        assert!(Is::not_null().evaluate(&Value::from("x")));
        assert!(!Is::not_null().evaluate(&Value::Nil));
        assert!(Is::anything().evaluate(&Value::Nil));
        assert_eq!(Is::not_null().describe(), "not equal to null");
    }
}
