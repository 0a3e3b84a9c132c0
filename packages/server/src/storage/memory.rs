//! In-memory resource store.
//!
//! Entities live in a [`BTreeMap`] behind a [`RwLock`] and are lost when the
//! process exits. The identifier counter sits under the same lock as the map,
//! so assignment is atomic with insertion.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use enapi::{derive_capabilities, CapabilitySet, Entity, ResourceSchema};

use super::{merge, with_id, CollectionFilter, PrefixFilter};
use crate::handler::{HandlerResult, ResourceHandler};

struct Inner {
    last_id: u64,
    entities: BTreeMap<u64, Entity>,
}

/// Thread-safe, in-memory implementation of [`ResourceHandler`].
///
/// Provides exactly the capabilities of the schema it was built for.
/// Collections are returned in identifier order.
pub struct MemoryResource {
    capabilities: CapabilitySet,
    filter: Box<dyn CollectionFilter>,
    inner: RwLock<Inner>,
}

impl MemoryResource {
    /// A store for `schema` using [`PrefixFilter`] for collections.
    pub fn for_schema(schema: &ResourceSchema) -> Self {
        Self {
            capabilities: derive_capabilities(schema),
            filter: Box::new(PrefixFilter),
            inner: RwLock::new(Inner {
                last_id: 0,
                entities: BTreeMap::new(),
            }),
        }
    }

    /// Replace the collection filter policy.
    pub fn with_filter(mut self, filter: impl CollectionFilter) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResourceHandler for MemoryResource {
    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    async fn get(&self, id: u64) -> HandlerResult<Option<Entity>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.entities.get(&id).cloned())
    }

    async fn post(&self, body: Entity) -> HandlerResult<Entity> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.last_id += 1;
        let id = inner.last_id;
        let entity = with_id(body, id);
        inner.entities.insert(id, entity.clone());
        Ok(entity)
    }

    async fn patch(&self, id: u64, body: Entity) -> HandlerResult<Option<Entity>> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.entities.get_mut(&id).map(|entity| {
            merge(entity, body);
            entity.clone()
        }))
    }

    async fn delete(&self, id: u64) -> HandlerResult<bool> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.entities.remove(&id).is_some())
    }

    async fn get_collection(&self, filter: Entity) -> HandlerResult<Vec<Entity>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .entities
            .values()
            .filter(|e| self.filter.matches(e, &filter))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use enapi::{fields, Capability, ScalarType};
    use serde_json::json;

    use super::*;
    use crate::storage::MatchAll;

    fn schema() -> ResourceSchema {
        let name = fields([("name", ScalarType::String)]);
        ResourceSchema::builder(fields([
            ("id", ScalarType::Number),
            ("name", ScalarType::String),
        ]))
        .post_body(name.clone())
        .collection_query(name)
        .build()
        .unwrap()
    }

    fn body(name: &str) -> Entity {
        json!({ "name": name }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn capabilities_mirror_schema() {
        let store = MemoryResource::for_schema(&schema());
        let caps = store.capabilities();
        assert!(caps.contains(Capability::Post));
        assert!(!caps.contains(Capability::Delete));
    }

    #[tokio::test]
    async fn ids_are_never_reused() {
        let store = MemoryResource::for_schema(&schema());
        store.post(body("a")).await.unwrap();
        let second = store.post(body("b")).await.unwrap();
        assert_eq!(second["id"], 2);
        assert!(store.delete(2).await.unwrap());
        let third = store.post(body("c")).await.unwrap();
        assert_eq!(third["id"], 3);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn delete_unknown_is_false() {
        let store = MemoryResource::for_schema(&schema());
        assert!(!store.delete(1).await.unwrap());
    }

    #[tokio::test]
    async fn patch_unknown_is_none() {
        let store = MemoryResource::for_schema(&schema());
        assert!(store.patch(5, body("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filter_policy_is_pluggable() {
        let store = MemoryResource::for_schema(&schema()).with_filter(MatchAll);
        store.post(body("dfg")).await.unwrap();
        store.post(body("hij")).await.unwrap();
        let all = store.get_collection(body("zzz")).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_posts_get_distinct_ids() {
        let store = Arc::new(MemoryResource::for_schema(&schema()));
        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.post(body(&format!("n{i}"))).await.unwrap()
            }));
        }
        let mut ids = Vec::new();
        for t in tasks {
            ids.push(t.await.unwrap()["id"].as_u64().unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 32);
        assert_eq!(
            store.get_collection(Entity::new()).await.unwrap().len(),
            32
        );
    }
}
