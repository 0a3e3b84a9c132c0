//! Shared helpers for the enapi conformance suite.
//!
//! Provides [`spawn_server`], which binds a `TcpListener` on an ephemeral
//! port and serves a registry over real HTTP, and the matching client
//! constructors for both transports, so each scenario can run against the
//! network path and the in-process path with equivalent backing state.

use std::sync::Arc;

use enapi_client::{Client, LocalTransport, RemoteTransport};
use enapi_server::{build_router, demo, Dispatcher, Registry, ServerConfig};

/// Start an ephemeral in-process server for `registry` and return
/// `(base_url, dispatcher)`.
///
/// The server runs in a background `tokio` task bound to an OS-assigned port
/// on `127.0.0.1`. The returned `String` is the base URL, e.g.
/// `http://127.0.0.1:51234`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the server fails.
pub async fn spawn_server(registry: Registry) -> (String, Arc<Dispatcher>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let config = ServerConfig {
        bind_addr: addr,
        api_base: base_url.clone(),
        title: "conformance".into(),
        ..ServerConfig::default()
    };
    let dispatcher = Arc::new(Dispatcher::new(registry));
    let router = build_router(Arc::clone(&dispatcher), &config);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    (base_url, dispatcher)
}

/// A server with the demo resources in memory.
pub async fn spawn_demo_server() -> (String, Arc<Dispatcher>) {
    spawn_server(demo::registry(None).expect("demo registry")).await
}

/// A remote client for the server at `base_url`, using the schemas
/// `dispatcher` serves.
pub fn remote_client(base_url: &str, dispatcher: &Dispatcher) -> Client<RemoteTransport> {
    Client::remote(base_url, dispatcher.registry().schema_map())
}

/// An in-process client over a fresh demo registry.
pub fn local_demo_client() -> Client<LocalTransport> {
    Client::local(LocalTransport::from_registry(
        demo::registry(None).expect("demo registry"),
    ))
}
