//! Conversion of scenario literals into values, argument specs and constraints.
//!
//! Literals are converted with the declared kind of the slot they end up in, so `2.4`
//! written for an `f32` parameter becomes an `f32` and `"x"` for a `char` parameter
//! becomes a `char`. Values that do not fit the slot are kept as written and left for
//! the binder or the matcher to reject.

use serde_json::Value as Json;

use crate::binder::{ArgSpec, SpecKind};
use crate::constraint::{Constraint, Is, List, Text};
use crate::method::Param;
use crate::value::{numeric, Value, ValueKind};
use crate::DecoyError;

fn invalid(message: impl Into<String>) -> DecoyError {
    DecoyError::scenario(message, None)
}

/// Converts a literal by its own shape.
pub fn to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::I64(i)
            } else if let Some(u) = n.as_u64() {
                Value::U64(u)
            } else {
                n.as_f64().map_or(Value::Nil, Value::F64)
            }
        }
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(to_value).collect()),
        Json::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), to_value(v)))
                .collect(),
        ),
    }
}

/// Converts a literal into the representation of a slot declared as `kind`.
pub fn literal(json: &Json, kind: ValueKind) -> Value {
    let value = to_value(json);
    if kind == ValueKind::Char {
        if let Value::Text(s) = &value {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Value::Char(c);
            }
        }
    }
    numeric::coerce(kind, &value).unwrap_or(value)
}

// ============================================================================
// ARGUMENT SPECS
// ============================================================================

/// Builds the spec for one expectation argument bound for `param`.
pub fn arg_spec(json: &Json, param: &Param) -> Result<ArgSpec, DecoyError> {
    match json {
        Json::String(word) if unit_constraint(word).is_some() => {
            constraint(json, param.kind).map(ArgSpec::constraint)
        }
        Json::Object(map) if map.len() == 1 => {
            let Some((key, body)) = map.iter().next() else {
                return Err(invalid("empty argument spec"));
            };
            match key.as_str() {
                "out" => Ok(ArgSpec::output(literal(body, param.kind))),
                "ref" => reference(body, param.kind),
                "literal" => Ok(ArgSpec::literal(literal(body, param.kind))),
                _ => constraint(json, param.kind).map(ArgSpec::constraint),
            }
        }
        other => Ok(ArgSpec::literal(literal(other, param.kind))),
    }
}

fn reference(body: &Json, kind: ValueKind) -> Result<ArgSpec, DecoyError> {
    let Json::Object(fields) = body else {
        return Err(invalid("'ref' takes {prior: <constraint>, value: <literal>}"));
    };
    let value = fields
        .get("value")
        .ok_or_else(|| invalid("'ref' is missing its injected 'value'"))?;
    let prior = fields
        .get("prior")
        .map(|p| constraint(p, kind))
        .transpose()?;
    Ok(ArgSpec::new(
        SpecKind::Reference {
            prior,
            value: literal(value, kind),
        },
        ValueKind::Any,
    ))
}

// ============================================================================
// CONSTRAINTS
// ============================================================================

static NO_BODY: Json = Json::Null;

fn unit_constraint(word: &str) -> Option<Constraint> {
    match word {
        "anything" => Some(Is::anything()),
        "not_null" => Some(Is::not_null()),
        "null" => Some(Is::null()),
        _ => None,
    }
}

/// Parses a constraint written as a bare word (`anything`) or a single-key map
/// (`{greater_than: 3}`, `{and: [..]}`).
pub fn constraint(json: &Json, kind: ValueKind) -> Result<Constraint, DecoyError> {
    let (key, body) = match json {
        Json::String(word) => (word.as_str(), &NO_BODY),
        Json::Object(map) => match (map.len(), map.iter().next()) {
            (1, Some((key, body))) => (key.as_str(), body),
            _ => return Err(invalid(format!("a constraint must have exactly one key: {json}"))),
        },
        other => return Err(invalid(format!("expected a constraint, found {other}"))),
    };

    if let Some(unit) = unit_constraint(key) {
        return Ok(unit);
    }

    let built = match key {
        "equal" => Is::equal(literal(body, kind)),
        "not_equal" => Is::not_equal(literal(body, kind)),
        "greater_than" => Is::greater_than(literal(body, kind)),
        "greater_than_or_equal" => Is::greater_than_or_equal(literal(body, kind)),
        "less_than" => Is::less_than(literal(body, kind)),
        "less_than_or_equal" => Is::less_than_or_equal(literal(body, kind)),
        "of_kind" => Is::of_kind(
            serde_json::from_value(body.clone())
                .map_err(|e| invalid(format!("unknown kind {body}: {e}")))?,
        ),
        "contains" => Text::contains(text(key, body)?),
        "starts_with" => Text::starts_with(text(key, body)?),
        "ends_with" => Text::ends_with(text(key, body)?),
        "text_equal" => Text::equal(text(key, body)?),
        "like" => Text::like(&text(key, body)?)?,
        "length" => Text::length(constraint(body, ValueKind::U64)?),
        "count" => List::count(constraint(body, ValueKind::U64)?),
        "is_in" => List::is_in(to_value(body)),
        "one_of" => List::one_of(items(key, body, kind)?),
        "contains_all" => List::contains_all(items(key, body, ValueKind::Any)?),
        "list_equal" => List::equal(items(key, body, ValueKind::Any)?),
        "element" => element(body)?,
        "and" => fold(key, body, kind, Constraint::and)?,
        "or" => fold(key, body, kind, Constraint::or)?,
        "not" => constraint(body, kind)?.negate(),
        other => return Err(invalid(format!("unknown constraint '{other}'"))),
    };
    Ok(built)
}

fn text(key: &str, body: &Json) -> Result<String, DecoyError> {
    body.as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("'{key}' takes a string, found {body}")))
}

fn items(key: &str, body: &Json, kind: ValueKind) -> Result<Vec<Value>, DecoyError> {
    body.as_array()
        .map(|items| items.iter().map(|item| literal(item, kind)).collect())
        .ok_or_else(|| invalid(format!("'{key}' takes a list, found {body}")))
}

fn element(body: &Json) -> Result<Constraint, DecoyError> {
    let index = body
        .get("index")
        .and_then(Json::as_u64)
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| invalid("'element' takes {index: <n>, matches: <constraint>}"))?;
    let inner = body
        .get("matches")
        .ok_or_else(|| invalid("'element' is missing 'matches'"))?;
    Ok(List::element(index, constraint(inner, ValueKind::Any)?))
}

fn fold(
    key: &str,
    body: &Json,
    kind: ValueKind,
    join: fn(Constraint, Constraint) -> Constraint,
) -> Result<Constraint, DecoyError> {
    let parts = body
        .as_array()
        .ok_or_else(|| invalid(format!("'{key}' takes a list of constraints")))?;
    let mut parsed = parts.iter().map(|part| constraint(part, kind));
    let first = parsed
        .next()
        .ok_or_else(|| invalid(format!("'{key}' needs at least one constraint")))??;
    parsed.try_fold(first, |acc, next| -> Result<Constraint, DecoyError> {
        Ok(join(acc, next?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literals_take_the_slot_representation() {
        assert_eq!(literal(&json!(2.4), ValueKind::F32), Value::F32(2.4));
        assert_eq!(literal(&json!(3), ValueKind::I32), Value::I32(3));
        assert_eq!(literal(&json!("x"), ValueKind::Char), Value::Char('x'));
        assert_eq!(literal(&json!("xy"), ValueKind::I32), Value::from("xy"));
    }

    #[test]
    fn composite_constraints_parse() {
        let c = constraint(
            &json!({"or": [{"less_than": 1}, {"and": [{"greater_than": 5}, {"not": {"equal": 7}}]}]}),
            ValueKind::I32,
        )
        .unwrap();
        assert!(c.evaluate_as(ValueKind::I32, &Value::I32(0)));
        assert!(c.evaluate_as(ValueKind::I32, &Value::I32(6)));
        assert!(!c.evaluate_as(ValueKind::I32, &Value::I32(7)));
        assert!(!c.evaluate_as(ValueKind::I32, &Value::I32(3)));
    }

    #[test]
    fn argument_specs_by_shape() {
        let param = Param {
            name: "i".into(),
            kind: ValueKind::I32,
            mode: crate::method::PassingMode::Output,
        };
        let out = arg_spec(&json!({"out": 3}), &param).unwrap();
        assert!(matches!(out.spec(), SpecKind::Output(Value::I32(3))));

        let reference = arg_spec(&json!({"ref": {"prior": {"equal": 2}, "value": 7}}), &param)
            .unwrap();
        assert!(matches!(
            reference.spec(),
            SpecKind::Reference { prior: Some(_), value: Value::I32(7) }
        ));

        let bare = arg_spec(&json!(4), &param).unwrap();
        assert!(matches!(bare.spec(), SpecKind::Literal(Value::I32(4))));

        let any = arg_spec(&json!("anything"), &param).unwrap();
        assert!(matches!(any.spec(), SpecKind::Constraint(Constraint::Anything)));
    }

    #[test]
    fn malformed_constraints_are_reported() {
        assert!(constraint(&json!({"frobnicate": 1}), ValueKind::Any).is_err());
        assert!(constraint(&json!({"and": []}), ValueKind::Any).is_err());
        assert!(constraint(&json!({"like": "("}), ValueKind::Text)
            .unwrap_err()
            .is_configuration());
    }
}
