//! How a [`crate::Client`] reaches the dispatcher.
//!
//! | Type | Hop |
//! |------|-----|
//! | [`RemoteTransport`] | HTTP to a server built with `enapi_server::build_router` |
//! | `LocalTransport` | Direct call into an in-process `Dispatcher` (feature `local`) |
//!
//! Both hand back the same [`Response`] for the same request, so a test
//! suite can run against either.

#[cfg(feature = "local")]
mod local;
mod remote;

#[cfg(feature = "local")]
pub use local::LocalTransport;
pub use remote::RemoteTransport;

use async_trait::async_trait;
use enapi_api::{Request, Response};

use crate::error::ClientError;

/// Carries one normalized request to the dispatcher and its response back.
///
/// One request per call; no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, ClientError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        (**self).send(request).await
    }
}
