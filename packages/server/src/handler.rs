//! The capability implementation seam.
//!
//! A [`ResourceHandler`] realises the capabilities a resource's schema
//! declares. Implementations are opaque to the core: identifier assignment,
//! locking, and filtering policy are theirs to decide.
//!
//! [`FnResource`] builds a handler from closures. Its capability set is
//! exactly the set of closures supplied, so a schema/closure mismatch is
//! caught when the [`crate::Endpoint`] is built.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use enapi::{Capability, CapabilitySet, Entity};

use crate::error::HandlerError;

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Capability implementation for one resource.
///
/// `capabilities` must report exactly the methods the implementation
/// provides. Methods outside that set keep their default body and are never
/// called by the dispatcher.
#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    fn capabilities(&self) -> CapabilitySet;

    /// Fetch one entity. `None` means not found.
    async fn get(&self, id: u64) -> HandlerResult<Option<Entity>>;

    /// Create an entity from a validated body and return it with its
    /// assigned identifier.
    async fn post(&self, _body: Entity) -> HandlerResult<Entity> {
        Err(HandlerError::Unsupported(Capability::Post))
    }

    /// Overwrite the fields present in `body`. `None` means not found.
    async fn patch(&self, _id: u64, _body: Entity) -> HandlerResult<Option<Entity>> {
        Err(HandlerError::Unsupported(Capability::Patch))
    }

    /// Remove an entity. Returns `false` when nothing had that id.
    async fn delete(&self, _id: u64) -> HandlerResult<bool> {
        Err(HandlerError::Unsupported(Capability::Delete))
    }

    /// List entities matching `filter`. Order is the implementation's choice.
    async fn get_collection(&self, _filter: Entity) -> HandlerResult<Vec<Entity>> {
        Err(HandlerError::Unsupported(Capability::GetCollection))
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = HandlerResult<T>> + Send>>;

type GetFn = Arc<dyn Fn(u64) -> BoxFuture<Option<Entity>> + Send + Sync>;
type PostFn = Arc<dyn Fn(Entity) -> BoxFuture<Entity> + Send + Sync>;
type PatchFn = Arc<dyn Fn(u64, Entity) -> BoxFuture<Option<Entity>> + Send + Sync>;
type DeleteFn = Arc<dyn Fn(u64) -> BoxFuture<bool> + Send + Sync>;
type CollectionFn = Arc<dyn Fn(Entity) -> BoxFuture<Vec<Entity>> + Send + Sync>;

/// A [`ResourceHandler`] assembled from closures.
///
/// Closures return futures; a synchronous implementation wraps its value in
/// [`std::future::ready`]. Once boxed the two are indistinguishable.
///
/// ```rust,ignore
/// let detail = FnResource::new(|id| std::future::ready(Ok(Some(lookup(id)))))
///     .with_get_collection(|filter| async move { Ok(search(filter).await) });
/// ```
#[derive(Clone)]
pub struct FnResource {
    get: GetFn,
    post: Option<PostFn>,
    patch: Option<PatchFn>,
    delete: Option<DeleteFn>,
    get_collection: Option<CollectionFn>,
}

impl FnResource {
    pub fn new<F, Fut>(get: F) -> Self
    where
        F: Fn(u64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<Entity>>> + Send + 'static,
    {
        Self {
            get: Arc::new(move |id| Box::pin(get(id))),
            post: None,
            patch: None,
            delete: None,
            get_collection: None,
        }
    }

    pub fn with_post<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Entity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Entity>> + Send + 'static,
    {
        self.post = Some(Arc::new(move |body| Box::pin(f(body))));
        self
    }

    pub fn with_patch<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(u64, Entity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<Entity>>> + Send + 'static,
    {
        self.patch = Some(Arc::new(move |id, body| Box::pin(f(id, body))));
        self
    }

    pub fn with_delete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(u64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<bool>> + Send + 'static,
    {
        self.delete = Some(Arc::new(move |id| Box::pin(f(id))));
        self
    }

    pub fn with_get_collection<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Entity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Vec<Entity>>> + Send + 'static,
    {
        self.get_collection = Some(Arc::new(move |filter| Box::pin(f(filter))));
        self
    }
}

#[async_trait]
impl ResourceHandler for FnResource {
    fn capabilities(&self) -> CapabilitySet {
        let mut set = CapabilitySet::empty().with(Capability::Get);
        if self.post.is_some() {
            set.insert(Capability::Post);
        }
        if self.patch.is_some() {
            set.insert(Capability::Patch);
        }
        if self.delete.is_some() {
            set.insert(Capability::Delete);
        }
        if self.get_collection.is_some() {
            set.insert(Capability::GetCollection);
        }
        set
    }

    async fn get(&self, id: u64) -> HandlerResult<Option<Entity>> {
        (self.get)(id).await
    }

    async fn post(&self, body: Entity) -> HandlerResult<Entity> {
        match &self.post {
            Some(f) => f(body).await,
            None => Err(HandlerError::Unsupported(Capability::Post)),
        }
    }

    async fn patch(&self, id: u64, body: Entity) -> HandlerResult<Option<Entity>> {
        match &self.patch {
            Some(f) => f(id, body).await,
            None => Err(HandlerError::Unsupported(Capability::Patch)),
        }
    }

    async fn delete(&self, id: u64) -> HandlerResult<bool> {
        match &self.delete {
            Some(f) => f(id).await,
            None => Err(HandlerError::Unsupported(Capability::Delete)),
        }
    }

    async fn get_collection(&self, filter: Entity) -> HandlerResult<Vec<Entity>> {
        match &self.get_collection {
            Some(f) => f(filter).await,
            None => Err(HandlerError::Unsupported(Capability::GetCollection)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entity(value: serde_json::Value) -> Entity {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn capabilities_follow_supplied_closures() {
        let handler = FnResource::new(|_| std::future::ready(Ok(None)))
            .with_delete(|_| async { Ok(true) });
        let caps = handler.capabilities();
        assert!(caps.contains(Capability::Get));
        assert!(caps.contains(Capability::Delete));
        assert!(!caps.contains(Capability::Post));
        assert_eq!(caps.len(), 2);
    }

    #[tokio::test]
    async fn sync_and_async_closures_behave_alike() {
        let sync = FnResource::new(|id| {
            std::future::ready(Ok(Some(entity(json!({"id": id, "name": "avc"})))))
        });
        let asynchronous = FnResource::new(|id| async move {
            tokio::task::yield_now().await;
            Ok(Some(entity(json!({"id": id, "name": "avc"}))))
        });
        assert_eq!(
            sync.get(7).await.unwrap(),
            asynchronous.get(7).await.unwrap()
        );
    }

    #[tokio::test]
    async fn undeclared_capability_reports_unsupported() {
        let handler = FnResource::new(|_| std::future::ready(Ok(None)));
        let err = handler.post(Entity::new()).await.unwrap_err();
        assert!(matches!(err, HandlerError::Unsupported(Capability::Post)));
    }

    #[tokio::test]
    async fn builder_closures_are_reached_through_the_trait() {
        let handler = FnResource::new(|_| std::future::ready(Ok(None)))
            .with_post(|mut body: Entity| async move {
                body.insert("id".into(), json!(1));
                Ok(body)
            });
        let created = handler.post(entity(json!({"name": "dfg"}))).await.unwrap();
        assert_eq!(created, entity(json!({"id": 1, "name": "dfg"})));
    }
}
