//! Public surface for the `enapi-server` crate.
//!
//! Exposes the endpoint registry, the request dispatcher, and the axum
//! binding so that external crates (the client's local transport, the
//! conformance suite) can serve resources in-process.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`registry`] | Route name → schema + checked implementation |
//! | [`handler`] | The [`ResourceHandler`] seam and closure-built [`FnResource`] |
//! | [`dispatcher`] | Normalized request → capability → normalized response |
//! | [`router`] | axum middleware, fallback, and OpenAPI route |
//! | [`storage`] | Reference in-memory and SQLite implementations |
//! | [`demo`] | The resources the `enapi-server` binary serves |

pub mod config;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;
pub mod router;
pub mod storage;

pub use config::{ConfigError, ServerConfig};
pub use dispatcher::Dispatcher;
pub use error::{CapabilityMismatch, DispatchError, HandlerError, RegistryError};
pub use handler::{FnResource, HandlerResult, ResourceHandler};
pub use registry::{Endpoint, Registry, RegistryBuilder};
pub use router::{build_router, wrap_router};
pub use storage::{
    memory::MemoryResource,
    sqlite::{SqliteResource, SqliteStore},
    CollectionFilter, MatchAll, PrefixFilter,
};
