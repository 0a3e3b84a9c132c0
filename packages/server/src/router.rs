//! Binds the [`Dispatcher`] to axum.
//!
//! The dispatcher runs as middleware in front of whatever router it wraps.
//! Requests it owns are answered directly; everything else, including any
//! method or capability a schema does not declare, reaches the wrapped
//! router untouched. [`build_router`] wraps an empty router whose fallback
//! answers 404 `{"err": "no matching route"}`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use enapi_api::{Method, Outcome};
use http_body_util::LengthLimitError;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    body_limit: usize,
}

/// Build the complete application router: the OpenAPI document at
/// `config.docs_path`, every registered resource, and a 404 fallback.
pub fn build_router(dispatcher: Arc<Dispatcher>, config: &ServerConfig) -> Router {
    wrap_router(Router::new().fallback(unmatched), dispatcher, config)
}

/// Put the dispatcher and the OpenAPI document in front of an existing
/// router, which keeps every request the dispatcher does not own.
///
/// # Panics
///
/// `app` must not already route `config.docs_path`; axum panics on the
/// overlapping route. [`ServerConfig::from_lookup`] guarantees the path
/// itself is a literal one.
pub fn wrap_router(app: Router, dispatcher: Arc<Dispatcher>, config: &ServerConfig) -> Router {
    let docs = Arc::new(dispatcher.registry().document(&config.doc_info()));
    let state = AppState {
        dispatcher,
        body_limit: config.body_limit,
    };

    app.route(
        &config.docs_path,
        get(move || {
            let docs = Arc::clone(&docs);
            async move { Json(docs.as_ref().clone()) }
        }),
    )
    .layer(middleware::from_fn_with_state(state, dispatch_middleware))
    .layer(TraceLayer::new_for_http())
}

async fn unmatched() -> Response {
    into_http(enapi_api::Response::unmatched())
}

async fn dispatch_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Ok(method) = req.method().as_str().parse::<Method>() else {
        return next.run(req).await;
    };
    let path = req.uri().path().to_string();
    if !state.dispatcher.owns(method, &path) {
        return next.run(req).await;
    }

    let query = match Query::<BTreeMap<String, String>>::try_from_uri(req.uri()) {
        Ok(Query(query)) => query,
        Err(e) => return into_http(enapi_api::Response::bad_request(e.body_text())),
    };

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, state.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => return body_read_failure(e),
    };
    let body = match parse_body(&bytes) {
        Ok(body) => body,
        Err(e) => {
            return into_http(enapi_api::Response::bad_request(format!(
                "invalid JSON body: {e}"
            )))
        }
    };

    let mut request = enapi_api::Request::new(method, path).with_query(query);
    request.body = body;

    match state.dispatcher.handle(request).await {
        Ok(Outcome::Handled(resp)) => into_http(resp),
        Ok(Outcome::Unmatched) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Err(e) => e.into_response(),
    }
}

/// Over the limit is 413; any other read failure is the client's fault too.
fn body_read_failure(err: axum::Error) -> Response {
    let err = err.into_inner();
    if err.is::<LengthLimitError>() {
        return into_http(enapi_api::Response::error(
            StatusCode::PAYLOAD_TOO_LARGE.as_u16(),
            "request body too large",
        ));
    }
    tracing::debug!("failed to read request body: {err}");
    into_http(enapi_api::Response::bad_request(format!(
        "failed to read request body: {err}"
    )))
}

/// An empty body is an absent one.
fn parse_body(bytes: &Bytes) -> Result<Option<Value>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some)
}

/// 204 goes out without a body; everything else as JSON.
fn into_http(resp: enapi_api::Response) -> Response {
    let status =
        StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::NO_CONTENT || resp.body.is_null() {
        status.into_response()
    } else {
        (status, Json(resp.body)).into_response()
    }
}
