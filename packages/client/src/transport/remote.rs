use async_trait::async_trait;
use enapi_api::{Method, Request, Response};
use serde_json::Value;

use super::Transport;
use crate::error::ClientError;

/// Sends requests over HTTP with `reqwest`.
///
/// The path is appended to `base_url` with each segment percent-encoded;
/// `query_params` go in the query string and the body is sent as JSON.
#[derive(Debug, Clone)]
pub struct RemoteTransport {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteTransport {
    /// A transport with a default `reqwest::Client`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// A transport using a pre-configured client (timeouts, headers, ...).
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        let encoded: Vec<_> = path.split('/').map(urlencoding::encode).collect();
        format!("{}{}", self.base_url, encoded.join("/"))
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for RemoteTransport {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let url = self.url(&request.path);
        tracing::debug!(method = %request.method, url = %url, "sending request");

        let mut req = self.http.request(http_method(request.method), &url);
        if let Some(query) = request.query_params.as_ref().filter(|q| !q.is_empty()) {
            req = req.query(query);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(body) => body,
                Err(e) if status.is_success() => return Err(ClientError::Decode(e)),
                // A foreign error page; the status alone is reported.
                Err(_) => Value::Null,
            }
        };
        Ok(Response::new(status.as_u16(), body))
    }
}
