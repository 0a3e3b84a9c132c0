//! Compile-time projection of a resource's capabilities.
//!
//! Describe a resource with [`Resource`] and opt into each further
//! capability by implementing its trait; [`TypedResource`] only has the
//! methods whose traits are implemented. A type without [`Remove`] has no
//! `delete` to call.
//!
//! The runtime capability set stays authoritative: every method goes through
//! the client's per-route lookup and reports [`ClientError::Undeclared`] when
//! the schema the client holds disagrees with the trait implementations.
//!
//! ```rust,ignore
//! struct Foo;
//!
//! impl Resource for Foo {
//!     const ROUTE: &'static str = "foo";
//!     type Entity = FooEntity;
//! }
//! impl Create for Foo {
//!     type Body = NewFoo;
//! }
//!
//! let foo = client.typed::<Foo>();
//! let created = foo.post(&NewFoo { name: "dfg".into() }).await?;
//! ```

use std::marker::PhantomData;

use enapi::{Capability, Entity};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::error::ClientError;
use crate::transport::Transport;

/// A resource every route has: `get`.
pub trait Resource {
    const ROUTE: &'static str;
    type Entity: DeserializeOwned;
}

pub trait Create: Resource {
    type Body: Serialize;
}

pub trait Update: Resource {
    /// Usually a struct of `Option`s with `skip_serializing_if`.
    type Body: Serialize;
}

pub trait Remove: Resource {}

pub trait List: Resource {
    /// `None` fields are left out of the query.
    type Query: Serialize;
}

/// Typed view of one resource behind a [`Client`].
pub struct TypedResource<'c, R, T> {
    client: &'c Client<T>,
    _resource: PhantomData<fn() -> R>,
}

impl<T: Transport> Client<T> {
    /// The typed view of `R`.
    pub fn typed<R: Resource>(&self) -> TypedResource<'_, R, T> {
        TypedResource {
            client: self,
            _resource: PhantomData,
        }
    }
}

fn decode<D: DeserializeOwned>(entity: Entity) -> Result<D, ClientError> {
    Ok(serde_json::from_value(Value::Object(entity))?)
}

impl<R: Resource, T: Transport> TypedResource<'_, R, T> {
    pub async fn get(&self, id: u64) -> Result<R::Entity, ClientError> {
        let op = self.client.require(R::ROUTE, Capability::Get)?;
        decode(op.get(id).await?)
    }
}

impl<R: Create, T: Transport> TypedResource<'_, R, T> {
    pub async fn post(&self, body: &R::Body) -> Result<R::Entity, ClientError> {
        let op = self.client.require(R::ROUTE, Capability::Post)?;
        decode(op.post(serde_json::to_value(body)?).await?)
    }
}

impl<R: Update, T: Transport> TypedResource<'_, R, T> {
    pub async fn patch(&self, id: u64, body: &R::Body) -> Result<R::Entity, ClientError> {
        let op = self.client.require(R::ROUTE, Capability::Patch)?;
        decode(op.patch(id, serde_json::to_value(body)?).await?)
    }
}

impl<R: Remove, T: Transport> TypedResource<'_, R, T> {
    pub async fn delete(&self, id: u64) -> Result<(), ClientError> {
        let op = self.client.require(R::ROUTE, Capability::Delete)?;
        op.delete(id).await
    }
}

impl<R: List, T: Transport> TypedResource<'_, R, T> {
    pub async fn list(&self, query: &R::Query) -> Result<Vec<R::Entity>, ClientError> {
        let op = self.client.require(R::ROUTE, Capability::GetCollection)?;
        let filter = match serde_json::to_value(query)? {
            Value::Object(map) => map,
            _ => Entity::new(),
        };
        op.list(&filter).await?.into_iter().map(decode).collect()
    }
}
