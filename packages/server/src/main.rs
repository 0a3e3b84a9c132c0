//! `enapi-server`: serves the demo resources over HTTP.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory store on the default port:
//! enapi-server
//!
//! # Persistent SQLite store:
//! ENAPI_DB=./data.db enapi-server
//!
//! # Custom bind address and document title:
//! ENAPI_BIND=127.0.0.1:8080 ENAPI_TITLE="Shop" enapi-server
//! ```
//!
//! # Environment variables
//!
//! See [`enapi_server::ServerConfig`] for the full list.

use std::process::ExitCode;
use std::sync::Arc;

use enapi_server::{build_router, demo, Dispatcher, ServerConfig, SqliteStore};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enapi_server=info,tower_http=debug".into()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    let store = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            let store = SqliteStore::open(path)
                .map_err(|e| format!("failed to open SQLite database at {path}: {e}"))?;
            Some(store)
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            None
        }
    };

    let registry = demo::registry(store.as_ref())?;
    for (route, endpoint) in registry.iter() {
        tracing::info!("resource /{route}: {}", endpoint.capabilities());
    }

    let app = build_router(Arc::new(Dispatcher::new(registry)), &config);

    tracing::info!("listening on {} (docs at {})", config.bind_addr, config.docs_path);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", config.bind_addr))?;

    axum::serve(listener, app).await?;
    Ok(())
}
