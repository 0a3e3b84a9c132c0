//! Error types for registry assembly, capability implementations, and
//! dispatch.
//!
//! Business-level outcomes (not found, missing body) are not errors here;
//! they are ordinary responses. These types cover the failures the core does
//! not recover from.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use enapi::{Capability, CapabilitySet, ValueError};
use enapi_api::{messages, ErrorBody};

/// An implementation whose capabilities differ from its schema's.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("implementation is missing {missing} and has undeclared {extra}")]
pub struct CapabilityMismatch {
    pub missing: CapabilitySet,
    pub extra: CapabilitySet,
}

/// Rejected while assembling a [`crate::Registry`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("route {route:?}: {source}")]
    CapabilityMismatch {
        route: String,
        #[source]
        source: CapabilityMismatch,
    },

    #[error("route {0:?} is registered twice")]
    DuplicateRoute(String),

    #[error(transparent)]
    InvalidRoute(#[from] ValueError),
}

/// Failure inside a capability implementation.
///
/// "Not found" is never an error: implementations report it with `None` or
/// `false`.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The implementation was asked for a capability it does not provide.
    #[error("capability {0} is not implemented")]
    Unsupported(Capability),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An unexpected error in the backing store.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A request could not be completed. Scoped to the single request being
/// handled.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{capability} on route {route:?} failed: {source}")]
    Handler {
        route: String,
        capability: Capability,
        #[source]
        source: HandlerError,
    },
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        tracing::error!("{self}");
        let body = ErrorBody::new(messages::INTERNAL_ERROR);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
