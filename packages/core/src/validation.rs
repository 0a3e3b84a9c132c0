use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::types::{FieldSet, ScalarType};

/// Native representation of an entity, request body, or collection filter.
pub type Entity = Map<String, Value>;

/// Errors returned when a value does not conform to a [`FieldSet`], or a
/// route name is unusable as a URL path segment.
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("body must be a JSON object")]
    NotAnObject,

    #[error("unknown field {0:?}")]
    UnknownField(String),

    #[error("missing field {0:?}")]
    MissingField(String),

    #[error("field {field:?} must be a {expected}")]
    WrongType { field: String, expected: ScalarType },

    #[error("query parameter {field:?} must be a number, got {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("route name {0:?} must be a non-numeric path segment of [A-Za-z0-9_-]")]
    InvalidRouteName(String),
}

/// Whether every declared field must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// Creation bodies: every declared field is required.
    Full,
    /// Partial-update bodies: any subset of the declared fields.
    Partial,
}

fn matches_scalar(value: &Value, expected: ScalarType) -> bool {
    match expected {
        ScalarType::String => value.is_string(),
        ScalarType::Number => value.is_number(),
    }
}

/// Check a request body against a [`FieldSet`] and return it as an [`Entity`].
///
/// Every key must be declared with a matching scalar type. With
/// [`Completeness::Full`] every declared field must also be present.
pub fn validate_body(
    fields: &FieldSet,
    body: Value,
    completeness: Completeness,
) -> Result<Entity, ValueError> {
    let Value::Object(body) = body else {
        return Err(ValueError::NotAnObject);
    };

    for (key, value) in &body {
        let expected = fields
            .get(key)
            .ok_or_else(|| ValueError::UnknownField(key.clone()))?;
        if !matches_scalar(value, *expected) {
            return Err(ValueError::WrongType {
                field: key.clone(),
                expected: *expected,
            });
        }
    }

    if completeness == Completeness::Full {
        if let Some(missing) = fields.keys().find(|k| !body.contains_key(*k)) {
            return Err(ValueError::MissingField(missing.clone()));
        }
    }

    Ok(body)
}

/// Turn raw query-string parameters into the filter entity handed to
/// `getCollection`.
///
/// Undeclared keys are dropped. `number` fields are parsed as an integer
/// first, then as a float.
pub fn coerce_query(
    fields: &FieldSet,
    raw: &BTreeMap<String, String>,
) -> Result<Entity, ValueError> {
    let mut out = Entity::new();
    for (key, expected) in fields {
        let Some(text) = raw.get(key) else {
            continue;
        };
        let value = match expected {
            ScalarType::String => Value::String(text.clone()),
            ScalarType::Number => parse_number(text).ok_or_else(|| ValueError::InvalidNumber {
                field: key.clone(),
                value: text.clone(),
            })?,
        };
        out.insert(key.clone(), value);
    }
    Ok(out)
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Render a filter entity back into query-string form. Inverse of
/// [`coerce_query`] for well-typed input.
pub fn query_strings(filter: &Entity) -> BTreeMap<String, String> {
    filter
        .iter()
        .filter_map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k.clone(), text))
        })
        .collect()
}

static ROUTE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// Check that a route name is usable as the first URL path segment.
///
/// All-digit names are rejected so that `/{route}` can never be confused with
/// the id segment of an entity path.
pub fn validate_route_name(route: &str) -> Result<(), ValueError> {
    if !ROUTE_NAME.is_match(route) || route.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValueError::InvalidRouteName(route.to_string()));
    }
    Ok(())
}
