//! The resources served by the `enapi-server` binary.
//!
//! | Route | Capabilities | Implementation |
//! |-------|--------------|----------------|
//! | `foo` | all five | [`MemoryResource`] or [`SqliteResource`] |
//! | `detail` | `get`, `getCollection` | [`FnResource`] computing entities on the fly |
//!
//! [`SqliteResource`]: crate::storage::sqlite::SqliteResource

use enapi::{fields, Entity, ResourceSchema, ScalarType, SchemaError};
use serde_json::{json, Value};

use crate::error::RegistryError;
use crate::handler::FnResource;
use crate::registry::Registry;
use crate::storage::memory::MemoryResource;
use crate::storage::sqlite::SqliteStore;

/// Failure assembling the demo registry.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// `{id, name}` with every capability; `name` filters by prefix.
pub fn foo_schema() -> Result<ResourceSchema, SchemaError> {
    let name = fields([("name", ScalarType::String)]);
    ResourceSchema::builder(fields([
        ("id", ScalarType::Number),
        ("name", ScalarType::String),
    ]))
    .post_body(name.clone())
    .patch_body(name.clone())
    .remove()
    .collection_query(name)
    .build()
}

/// Read-only `{id, name}` listed by `season`.
pub fn detail_schema() -> Result<ResourceSchema, SchemaError> {
    ResourceSchema::builder(fields([
        ("id", ScalarType::Number),
        ("name", ScalarType::String),
    ]))
    .collection_query(fields([("season", ScalarType::Number)]))
    .build()
}

fn entity(value: Value) -> Entity {
    match value {
        Value::Object(map) => map,
        _ => Entity::new(),
    }
}

/// `get(id)` is `{id, name: "avc{id}"}`; `getCollection({season})` is a
/// single entity named after the season.
pub fn detail_resource() -> FnResource {
    FnResource::new(|id| {
        let name = format!("avc{id}");
        std::future::ready(Ok(Some(entity(json!({"id": id, "name": name})))))
    })
    .with_get_collection(|filter: Entity| async move {
        let name = match filter.get("season") {
            Some(season) => format!("avc{season}"),
            None => "avc".to_string(),
        };
        Ok(vec![entity(json!({"id": 7, "name": name}))])
    })
}

/// Both demo resources, with `foo` in `store` when one is given and in
/// memory otherwise.
pub fn registry(store: Option<&SqliteStore>) -> Result<Registry, DemoError> {
    let foo = foo_schema()?;
    let builder = match store {
        Some(store) => {
            let resource = store.resource("foo", &foo);
            Registry::builder().resource("foo", foo, resource)?
        }
        None => {
            let resource = MemoryResource::for_schema(&foo);
            Registry::builder().resource("foo", foo, resource)?
        }
    };
    Ok(builder
        .resource("detail", detail_schema()?, detail_resource())?
        .build())
}
