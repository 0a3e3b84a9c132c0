use std::sync::Arc;

use async_trait::async_trait;
use enapi_api::{Request, Response};
use enapi_server::{Dispatcher, Registry};

use super::Transport;
use crate::error::ClientError;

/// Calls the dispatcher in-process.
///
/// Answers exactly as the HTTP binding does: `Unmatched` becomes
/// 404 `{"err": "no matching route"}` and an implementation failure becomes
/// 500 `{"err": "internal error"}`.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    dispatcher: Arc<Dispatcher>,
}

impl LocalTransport {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn from_registry(registry: Registry) -> Self {
        Self::new(Arc::new(Dispatcher::new(registry)))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        match self.dispatcher.handle(request).await {
            Ok(outcome) => Ok(outcome.or_unmatched()),
            Err(e) => {
                tracing::error!("{e}");
                Ok(Response::internal_error())
            }
        }
    }
}
