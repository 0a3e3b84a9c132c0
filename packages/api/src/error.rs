//! Error shapes: the body the server sends and the value callers receive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of every non-success response produced by the dispatcher or the HTTP
/// binding.
///
/// ```json
/// { "err": "Entity not found" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub err: String,
}

impl ErrorBody {
    pub fn new(err: impl Into<String>) -> Self {
        Self { err: err.into() }
    }
}

/// The error value surfaced to client callers: the server's message plus the
/// HTTP status it arrived with.
///
/// ```json
/// { "err": "Entity not found", "code": 404 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub err: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(err: impl Into<String>, code: u16) -> Self {
        Self {
            err: err.into(),
            code,
        }
    }

    pub fn entity_not_found() -> Self {
        Self::new(messages::ENTITY_NOT_FOUND, 404)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.err, self.code)
    }
}

/// `true` if `value` has the `{err: string, code: number}` error shape.
pub fn is_error(value: &Value) -> bool {
    value.get("err").is_some_and(Value::is_string) && value.get("code").is_some_and(Value::is_u64)
}

/// Messages carried in [`ErrorBody::err`].
pub mod messages {
    pub const BODY_MISSING: &str = "body missing";
    pub const ENTITY_NOT_FOUND: &str = "Entity not found";
    pub const NO_MATCHING_ROUTE: &str = "no matching route";
    pub const INTERNAL_ERROR: &str = "internal error";
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn recognises_error_shape() {
        assert!(is_error(&json!({"err": "Entity not found", "code": 404})));
        assert!(is_error(
            &serde_json::to_value(ErrorResponse::entity_not_found()).unwrap()
        ));
    }

    #[test]
    fn entities_are_not_errors() {
        assert!(!is_error(&json!({"id": 1, "name": "dfg"})));
        assert!(!is_error(&json!({"err": "no code"})));
        assert!(!is_error(&json!({"err": 1, "code": 404})));
        assert!(!is_error(&json!([1, 2])));
    }
}
