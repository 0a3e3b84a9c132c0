//! The normalized response and the dispatcher's outcome.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{messages, ErrorBody, ErrorResponse};

/// A transport-independent response. `body` is `Value::Null` when there is
/// nothing to send (204).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    #[serde(default)]
    pub body: Value,
}

impl Response {
    pub fn new(status_code: u16, body: Value) -> Self {
        Self { status_code, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn created(body: Value) -> Self {
        Self::new(201, body)
    }

    pub fn no_content() -> Self {
        Self::new(204, Value::Null)
    }

    /// A response whose body is `{ "err": message }`.
    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        let body = serde_json::to_value(ErrorBody::new(message)).unwrap_or(Value::Null);
        Self::new(status_code, body)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(400, message)
    }

    pub fn entity_not_found() -> Self {
        Self::error(404, messages::ENTITY_NOT_FOUND)
    }

    /// What an owner further down the chain answers for a request this layer
    /// did not match.
    pub fn unmatched() -> Self {
        Self::error(404, messages::NO_MATCHING_ROUTE)
    }

    pub fn internal_error() -> Self {
        Self::error(500, messages::INTERNAL_ERROR)
    }

    /// The `err` message, if the body has one.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("err").and_then(Value::as_str)
    }

    /// Convert a non-success response into the caller-facing error value.
    /// Returns `None` when the body carries no `err` message.
    pub fn to_error(&self) -> Option<ErrorResponse> {
        self.error_message()
            .map(|err| ErrorResponse::new(err, self.status_code))
    }
}

/// Result of dispatching a [`crate::Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The request addressed a registered route and declared capability.
    Handled(Response),
    /// No route, method, or capability matched; the request belongs to
    /// whatever handles requests after this layer.
    Unmatched,
}

impl Outcome {
    pub fn is_unmatched(&self) -> bool {
        matches!(self, Outcome::Unmatched)
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Handled(resp) => Some(resp),
            Outcome::Unmatched => None,
        }
    }

    /// The response, with `Unmatched` replaced by [`Response::unmatched`].
    pub fn or_unmatched(self) -> Response {
        match self {
            Outcome::Handled(resp) => resp,
            Outcome::Unmatched => Response::unmatched(),
        }
    }
}
