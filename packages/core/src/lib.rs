//! Declarative contract layer for resource-oriented HTTP APIs.
//!
//! One [`ResourceSchema`] per resource decides which CRUD-style capabilities
//! exist for it. This crate holds the parts of that contract that need no
//! runtime: the schema model, the capability derivation shared by every
//! consumer, value validation, and the OpenAPI projection. The dispatcher and
//! HTTP binding live in `enapi-server`; the client facade in `enapi-client`.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | [`ScalarType`], [`FieldSet`], [`ResourceSchema`] and its builder |
//! | [`capability`] | [`Capability`], [`CapabilitySet`], [`derive_capabilities`] |
//! | [`validation`] | Body and query checking against a [`FieldSet`], route-name rules |
//! | [`openapi`] | OpenAPI 3.0 document projected from schemas |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use enapi::{derive_capabilities, fields, Capability, ResourceSchema, ScalarType};
//!
//! let schema = ResourceSchema::builder(fields([
//!     ("id", ScalarType::Number),
//!     ("name", ScalarType::String),
//! ]))
//! .post_body(fields([("name", ScalarType::String)]))
//! .build()?;
//!
//! let caps = derive_capabilities(&schema);
//! assert!(caps.contains(Capability::Post));
//! assert!(!caps.contains(Capability::Delete));
//! ```

pub mod capability;
pub mod openapi;
pub mod types;
pub mod validation;

pub use capability::{derive_capabilities, Capability, CapabilitySet};
pub use openapi::DocInfo;
pub use types::{fields, FieldSet, ResourceSchema, ScalarType, SchemaBuilder, SchemaError};
pub use validation::{
    coerce_query, query_strings, validate_body, validate_route_name, Completeness, Entity,
    ValueError,
};
