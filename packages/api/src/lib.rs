//! Normalized request and response types for the enapi contract layer.
//!
//! The dispatcher consumes a transport-independent [`Request`] and produces
//! an [`Outcome`]: either a [`Response`] or `Unmatched`, the signal that this
//! layer does not own the request. Both the HTTP binding and the in-process
//! client transport speak these types, which is what keeps their observable
//! behaviour identical.
//!
//! # Routes
//!
//! | Method | Path | Capability | Success |
//! |--------|------|------------|---------|
//! | GET | `/{route}/{id}` | `get` | 200 entity |
//! | PATCH | `/{route}/{id}` | `patch` | 200 entity |
//! | DELETE | `/{route}/{id}` | `delete` | 204 empty |
//! | GET | `/{route}` | `getCollection` | 200 array |
//! | POST | `/{route}` | `post` | 201 entity |

pub mod error;
pub mod request;
pub mod response;

pub use error::{is_error, messages, ErrorBody, ErrorResponse};
pub use request::{Method, Request};
pub use response::{Outcome, Response};
