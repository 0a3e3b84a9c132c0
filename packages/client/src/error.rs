//! Errors surfaced by client calls.

use enapi::Capability;
use enapi_api::ErrorResponse;
use serde_json::Value;

/// Why a client call did not produce its success value.
///
/// Server-side outcomes such as "Entity not found" arrive as
/// [`ClientError::Api`], carrying the `{err, code}` shape; the rest are
/// failures to talk to or understand the server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error body.
    #[error("{0}")]
    Api(ErrorResponse),

    /// A status other than the capability's success status, without an
    /// error body.
    #[error("unexpected status {status}")]
    UnexpectedStatus { status: u16, body: Value },

    /// The HTTP request or response failed.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The success body did not have the expected shape.
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The route does not exist or does not declare the capability.
    #[error("route {route:?} does not declare {capability}")]
    Undeclared {
        route: String,
        capability: Capability,
    },
}

impl ClientError {
    /// The HTTP status this error arrived with, if it came from a response.
    pub fn code(&self) -> Option<u16> {
        match self {
            ClientError::Api(e) => Some(e.code),
            ClientError::UnexpectedStatus { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Decode(_) | ClientError::Undeclared { .. } => None,
        }
    }

    /// The server's `{err, code}` value, for API errors.
    pub fn api_error(&self) -> Option<&ErrorResponse> {
        match self {
            ClientError::Api(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(404)
    }
}
