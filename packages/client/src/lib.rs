//! Client facade for enapi resources.
//!
//! A [`Client`] exposes, per registered route, exactly the capabilities its
//! schema declares, over either transport:
//!
//! | Transport | Use |
//! |-----------|-----|
//! | [`RemoteTransport`] | A server reached over HTTP |
//! | `LocalTransport` | An in-process dispatcher; needs the `local` feature |
//!
//! Error outcomes come back as [`ClientError`]; server-reported ones carry
//! the `{err, code}` shape as an [`enapi_api::ErrorResponse`].
//!
//! ```rust,ignore
//! let client = Client::remote("http://localhost:3000", schemas);
//! if let Some(delete) = client.delete("foo") {
//!     delete.send(2).await?;
//! }
//! ```

pub mod client;
pub mod error;
pub mod transport;
pub mod typed;

pub use client::{Client, CollectionOp, DeleteOp, GetOp, PatchOp, PostOp};
pub use error::ClientError;
#[cfg(feature = "local")]
pub use transport::LocalTransport;
pub use transport::{RemoteTransport, Transport};
pub use typed::{Create, List, Remove, Resource, TypedResource, Update};
