//! The per-resource, per-capability client surface.
//!
//! A [`Client`] derives each resource's capability set once, from the same
//! schemas the server registered. Asking for a capability the schema does
//! not declare yields `None`: there is no operation value to call.

use std::collections::BTreeMap;

use enapi::{derive_capabilities, query_strings, Capability, CapabilitySet, Entity, ResourceSchema};
use enapi_api::{Method, Request, Response};
use serde_json::Value;

use crate::error::ClientError;
#[cfg(feature = "local")]
use crate::transport::LocalTransport;
use crate::transport::{RemoteTransport, Transport};

#[derive(Debug, Clone)]
struct ResourceEntry {
    schema: ResourceSchema,
    capabilities: CapabilitySet,
}

/// Typed-by-schema access to every resource behind one transport.
#[derive(Debug, Clone)]
pub struct Client<T> {
    transport: T,
    resources: BTreeMap<String, ResourceEntry>,
}

impl<T: Transport> Client<T> {
    pub fn new<I, S>(transport: T, schemas: I) -> Self
    where
        I: IntoIterator<Item = (S, ResourceSchema)>,
        S: Into<String>,
    {
        let resources = schemas
            .into_iter()
            .map(|(route, schema)| {
                let capabilities = derive_capabilities(&schema);
                (
                    route.into(),
                    ResourceEntry {
                        schema,
                        capabilities,
                    },
                )
            })
            .collect();
        Self {
            transport,
            resources,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn schema(&self, route: &str) -> Option<&ResourceSchema> {
        self.resources.get(route).map(|r| &r.schema)
    }

    pub fn capabilities(&self, route: &str) -> Option<CapabilitySet> {
        self.resources.get(route).map(|r| r.capabilities)
    }

    /// Routes whose schema declares `capability`.
    pub fn routes_with(&self, capability: Capability) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, r)| r.capabilities.contains(capability))
            .map(|(route, _)| route.as_str())
            .collect()
    }

    fn op(&self, route: &str, capability: Capability) -> Option<Op<'_, T>> {
        let (route, entry) = self.resources.get_key_value(route)?;
        entry.capabilities.contains(capability).then_some(Op {
            transport: &self.transport,
            route,
            capability,
        })
    }

    /// `get` on `route`, present for every registered route.
    pub fn get(&self, route: &str) -> Option<GetOp<'_, T>> {
        self.op(route, Capability::Get).map(GetOp)
    }

    /// `post` on `route`, present iff the schema has `postBody`.
    pub fn post(&self, route: &str) -> Option<PostOp<'_, T>> {
        self.op(route, Capability::Post).map(PostOp)
    }

    /// `patch` on `route`, present iff the schema has `patchBody`.
    pub fn patch(&self, route: &str) -> Option<PatchOp<'_, T>> {
        self.op(route, Capability::Patch).map(PatchOp)
    }

    /// `delete` on `route`, present iff the schema has `remove`.
    pub fn delete(&self, route: &str) -> Option<DeleteOp<'_, T>> {
        self.op(route, Capability::Delete).map(DeleteOp)
    }

    /// `getCollection` on `route`, present iff the schema has
    /// `collectionQueryParams`.
    pub fn get_collection(&self, route: &str) -> Option<CollectionOp<'_, T>> {
        self.op(route, Capability::GetCollection).map(CollectionOp)
    }

    /// Like [`Client::get`] etc., but an undeclared capability is an error.
    pub(crate) fn require(&self, route: &str, capability: Capability) -> Result<Op<'_, T>, ClientError> {
        self.op(route, capability).ok_or_else(|| ClientError::Undeclared {
            route: route.to_string(),
            capability,
        })
    }
}

impl Client<RemoteTransport> {
    /// A client for a server at `base_url` serving `schemas`.
    pub fn remote<I, S>(base_url: impl Into<String>, schemas: I) -> Self
    where
        I: IntoIterator<Item = (S, ResourceSchema)>,
        S: Into<String>,
    {
        Self::new(RemoteTransport::new(base_url), schemas)
    }
}

#[cfg(feature = "local")]
impl Client<LocalTransport> {
    /// An in-process client for every resource `transport`'s registry holds.
    pub fn local(transport: LocalTransport) -> Self {
        let schemas = transport.dispatcher().registry().schema_map();
        Self::new(transport, schemas)
    }
}

/// One declared capability of one route.
#[derive(Debug)]
pub(crate) struct Op<'c, T> {
    transport: &'c T,
    route: &'c str,
    capability: Capability,
}

impl<T: Transport> Op<'_, T> {
    async fn call(&self, request: Request) -> Result<Value, ClientError> {
        let resp = self.transport.send(request).await?;
        expect_status(self.capability, resp)
    }

    pub(crate) async fn get(&self, id: u64) -> Result<Entity, ClientError> {
        let body = self
            .call(Request::new(Method::Get, Request::entity_path(self.route, id)))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    pub(crate) async fn post(&self, body: Value) -> Result<Entity, ClientError> {
        let body = self
            .call(Request::new(Method::Post, Request::collection_path(self.route)).with_body(body))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    pub(crate) async fn patch(&self, id: u64, body: Value) -> Result<Entity, ClientError> {
        let body = self
            .call(Request::new(Method::Patch, Request::entity_path(self.route, id)).with_body(body))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    pub(crate) async fn delete(&self, id: u64) -> Result<(), ClientError> {
        self.call(Request::new(Method::Delete, Request::entity_path(self.route, id)))
            .await?;
        Ok(())
    }

    pub(crate) async fn list(&self, filter: &Entity) -> Result<Vec<Entity>, ClientError> {
        let request = Request::new(Method::Get, Request::collection_path(self.route))
            .with_query(query_strings(filter));
        Ok(serde_json::from_value(self.call(request).await?)?)
    }
}

/// The success body when the status is the capability's success status;
/// otherwise the `{err, code}` error.
pub(crate) fn expect_status(capability: Capability, resp: Response) -> Result<Value, ClientError> {
    if resp.status_code == capability.success_status() {
        return Ok(resp.body);
    }
    match resp.to_error() {
        Some(e) => Err(ClientError::Api(e)),
        None => Err(ClientError::UnexpectedStatus {
            status: resp.status_code,
            body: resp.body,
        }),
    }
}

/// Fetch one entity by id.
pub struct GetOp<'c, T>(Op<'c, T>);

impl<T: Transport> GetOp<'_, T> {
    pub async fn send(&self, id: u64) -> Result<Entity, ClientError> {
        self.0.get(id).await
    }
}

/// Create an entity; the result carries its assigned id.
pub struct PostOp<'c, T>(Op<'c, T>);

impl<T: Transport> PostOp<'_, T> {
    pub async fn send(&self, body: Value) -> Result<Entity, ClientError> {
        self.0.post(body).await
    }
}

/// Overwrite some fields of an entity.
pub struct PatchOp<'c, T>(Op<'c, T>);

impl<T: Transport> PatchOp<'_, T> {
    pub async fn send(&self, id: u64, body: Value) -> Result<Entity, ClientError> {
        self.0.patch(id, body).await
    }
}

/// Remove an entity.
pub struct DeleteOp<'c, T>(Op<'c, T>);

impl<T: Transport> DeleteOp<'_, T> {
    pub async fn send(&self, id: u64) -> Result<(), ClientError> {
        self.0.delete(id).await
    }
}

/// List entities matching a filter whose keys are the declared query
/// fields.
pub struct CollectionOp<'c, T>(Op<'c, T>);

impl<T: Transport> CollectionOp<'_, T> {
    pub async fn send(&self, filter: &Entity) -> Result<Vec<Entity>, ClientError> {
        self.0.list(filter).await
    }
}
