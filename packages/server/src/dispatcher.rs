//! Request dispatcher: normalized request → capability invocation →
//! normalized response.
//!
//! # Routing
//!
//! Two path shapes, checked in this order:
//!
//! 1. Entity route `/{route}/{id}`: `GET` → `get`, `PATCH` → `patch`,
//!    `DELETE` → `delete`.
//! 2. Collection route `/{route}` (trailing slash allowed): `GET` →
//!    `getCollection`, `POST` → `post`.
//!
//! A segment only counts as a route when it is registered, so an unknown
//! first segment can never be read as some other resource's id. Anything
//! that does not resolve to a registered route, a routed method, and a
//! declared capability is [`Outcome::Unmatched`].
//!
//! The dispatcher holds no state beyond the immutable registry and takes no
//! locks; consistency of concurrent calls is the implementation's business.

use std::sync::{Arc, LazyLock};

use enapi::{coerce_query, validate_body, Capability, Completeness, Entity};
use enapi_api::{messages, Method, Outcome, Request, Response};
use regex::Regex;
use serde_json::Value;

use crate::error::{DispatchError, HandlerError};
use crate::registry::{Endpoint, Registry};

static ENTITY_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([^/]+)/([0-9]+)$").expect("invalid entity route regex"));

static COLLECTION_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([^/]+)/?$").expect("invalid collection route regex"));

/// Where a path points once matched against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target<'a> {
    Entity { route: &'a str, id: u64 },
    Collection { route: &'a str },
}

/// A request resolved to one capability of one registered endpoint.
struct Resolved<'r> {
    route: &'r str,
    endpoint: &'r Endpoint,
    capability: Capability,
    id: Option<u64>,
}

/// Routes normalized requests to the registry's capability implementations.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: impl Into<Arc<Registry>>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn match_path<'p>(&self, path: &'p str) -> Option<Target<'p>> {
        if let Some(caps) = ENTITY_ROUTE.captures(path) {
            let route = caps.get(1)?.as_str();
            if self.registry.contains(route) {
                // Digits beyond u64 are not an id.
                if let Ok(id) = caps[2].parse::<u64>() {
                    return Some(Target::Entity { route, id });
                }
            }
        }
        let caps = COLLECTION_ROUTE.captures(path)?;
        let route = caps.get(1)?.as_str();
        self.registry
            .contains(route)
            .then_some(Target::Collection { route })
    }

    fn resolve<'r>(&'r self, method: Method, path: &str) -> Option<Resolved<'r>> {
        let target = self.match_path(path)?;
        let (route, capability, id) = match (method, target) {
            (Method::Get, Target::Entity { route, id }) => (route, Capability::Get, Some(id)),
            (Method::Patch, Target::Entity { route, id }) => (route, Capability::Patch, Some(id)),
            (Method::Delete, Target::Entity { route, id }) => (route, Capability::Delete, Some(id)),
            (Method::Get, Target::Collection { route }) => (route, Capability::GetCollection, None),
            (Method::Post, Target::Collection { route }) => (route, Capability::Post, None),
            _ => return None,
        };
        let (route, endpoint) = self.registry.entry(route)?;
        endpoint
            .capabilities()
            .contains(capability)
            .then_some(Resolved {
                route,
                endpoint,
                capability,
                id,
            })
    }

    /// Whether [`Dispatcher::handle`] would dispatch this method and path
    /// rather than answer [`Outcome::Unmatched`]. Lets a transport leave the
    /// request body untouched for requests it passes on.
    pub fn owns(&self, method: Method, path: &str) -> bool {
        self.resolve(method, path).is_some()
    }

    /// Handle one request.
    ///
    /// Returns `Ok(Outcome::Unmatched)` when this layer does not own the
    /// request, `Ok(Outcome::Handled(_))` for every business outcome
    /// (including 400 and 404), and `Err` only when the capability
    /// implementation itself failed.
    pub async fn handle(&self, request: Request) -> Result<Outcome, DispatchError> {
        let Some(resolved) = self.resolve(request.method, &request.path) else {
            tracing::debug!(method = %request.method, path = %request.path, "unmatched");
            return Ok(Outcome::Unmatched);
        };

        let route = resolved.route;
        let capability = resolved.capability;
        let response = self
            .invoke(resolved, request)
            .await
            .map_err(|source| DispatchError::Handler {
                route: route.to_string(),
                capability,
                source,
            })?;

        tracing::debug!(
            route,
            capability = %capability,
            status = response.status_code,
            "dispatched"
        );
        Ok(Outcome::Handled(response))
    }

    async fn invoke(&self, resolved: Resolved<'_>, request: Request) -> Result<Response, HandlerError> {
        let Resolved {
            endpoint,
            capability,
            id,
            ..
        } = resolved;
        let schema = endpoint.schema();
        let handler = endpoint.handler();
        let id = id.unwrap_or_default();

        let response = match capability {
            Capability::Get => found_or_404(handler.get(id).await?),

            Capability::Post => {
                let fields = schema.post_body().ok_or(HandlerError::Unsupported(capability))?;
                let body = match checked_body(fields, request.body, Completeness::Full) {
                    Ok(body) => body,
                    Err(resp) => return Ok(resp),
                };
                Response::created(Value::Object(handler.post(body).await?))
            }

            Capability::Patch => {
                let fields = schema.patch_body().ok_or(HandlerError::Unsupported(capability))?;
                let body = match checked_body(fields, request.body, Completeness::Partial) {
                    Ok(body) => body,
                    Err(resp) => return Ok(resp),
                };
                found_or_404(handler.patch(id, body).await?)
            }

            Capability::Delete => {
                if handler.delete(id).await? {
                    Response::no_content()
                } else {
                    Response::entity_not_found()
                }
            }

            Capability::GetCollection => {
                let fields = schema
                    .collection_query_params()
                    .ok_or(HandlerError::Unsupported(capability))?;
                let raw = request.query_params.unwrap_or_default();
                let filter = match coerce_query(fields, &raw) {
                    Ok(filter) => filter,
                    Err(e) => return Ok(Response::bad_request(e.to_string())),
                };
                let items = handler.get_collection(filter).await?;
                Response::ok(Value::Array(items.into_iter().map(Value::Object).collect()))
            }
        };
        Ok(response)
    }
}

fn found_or_404(entity: Option<Entity>) -> Response {
    match entity {
        Some(entity) => Response::ok(Value::Object(entity)),
        None => Response::entity_not_found(),
    }
}

/// Validate a post/patch body, or produce the 400 response to send instead.
fn checked_body(
    fields: &enapi::FieldSet,
    body: Option<Value>,
    completeness: Completeness,
) -> Result<Entity, Response> {
    let body = body.ok_or_else(|| Response::bad_request(messages::BODY_MISSING))?;
    validate_body(fields, body, completeness).map_err(|e| Response::bad_request(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use enapi::{fields, ResourceSchema, ScalarType};
    use serde_json::json;

    use super::*;
    use crate::handler::FnResource;
    use crate::storage::memory::MemoryResource;

    fn foo_schema() -> ResourceSchema {
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
        .unwrap()
    }

    fn readonly_schema() -> ResourceSchema {
        ResourceSchema::builder(fields([("name", ScalarType::String)]))
            .build()
            .unwrap()
    }

    fn dispatcher() -> Dispatcher {
        let registry = Registry::builder()
            .resource("foo", foo_schema(), MemoryResource::for_schema(&foo_schema()))
            .unwrap()
            .resource(
                "detail",
                readonly_schema(),
                FnResource::new(|id| {
                    std::future::ready(Ok((id == 7).then(|| {
                        json!({"name": "seven"}).as_object().cloned().unwrap_or_default()
                    })))
                }),
            )
            .unwrap()
            .build();
        Dispatcher::new(registry)
    }

    async fn send(d: &Dispatcher, request: Request) -> Response {
        match d.handle(request).await.unwrap() {
            Outcome::Handled(resp) => resp,
            Outcome::Unmatched => panic!("request was unmatched"),
        }
    }

    fn post(path: &str, body: Value) -> Request {
        Request::new(Method::Post, path).with_body(body)
    }

    #[tokio::test]
    async fn post_then_get_round_trip() {
        let d = dispatcher();
        let created = send(&d, post("/foo", json!({"name": "dfg"}))).await;
        assert_eq!(created.status_code, 201);
        assert_eq!(created.body, json!({"id": 1, "name": "dfg"}));

        let fetched = send(&d, Request::new(Method::Get, "/foo/1")).await;
        assert_eq!(fetched.status_code, 200);
        assert_eq!(fetched.body, created.body);
    }

    #[tokio::test]
    async fn trailing_slash_on_collection() {
        let d = dispatcher();
        let created = send(&d, post("/foo/", json!({"name": "a"}))).await;
        assert_eq!(created.status_code, 201);
        let listed = send(&d, Request::new(Method::Get, "/foo/")).await;
        assert_eq!(listed.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_body_is_400_not_unmatched() {
        let d = dispatcher();
        let resp = send(&d, Request::new(Method::Post, "/foo")).await;
        assert_eq!(resp.status_code, 400);
        assert_eq!(resp.body, json!({"err": "body missing"}));

        let resp = send(&d, Request::new(Method::Patch, "/foo/1")).await;
        assert_eq!(resp.status_code, 400);
    }

    #[tokio::test]
    async fn malformed_bodies_are_400() {
        let d = dispatcher();
        let resp = send(&d, post("/foo", json!({"name": 5}))).await;
        assert_eq!(resp.status_code, 400);
        let resp = send(&d, post("/foo", json!({}))).await;
        assert_eq!(resp.status_code, 400);
        let resp = send(&d, post("/foo", json!("dfg"))).await;
        assert_eq!(resp.status_code, 400);
    }

    #[tokio::test]
    async fn unknown_id_is_business_not_found() {
        let d = dispatcher();
        for req in [
            Request::new(Method::Get, "/foo/9999999"),
            Request::new(Method::Patch, "/foo/9999999").with_body(json!({"name": "x"})),
            Request::new(Method::Delete, "/foo/9999999"),
        ] {
            let resp = send(&d, req).await;
            assert_eq!(resp.status_code, 404);
            assert_eq!(resp.body, json!({"err": "Entity not found"}));
        }
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let d = dispatcher();
        send(&d, post("/foo", json!({"name": "nnn"}))).await;
        let deleted = send(&d, Request::new(Method::Delete, "/foo/1")).await;
        assert_eq!(deleted.status_code, 204);
        assert_eq!(deleted.body, Value::Null);
        let resp = send(&d, Request::new(Method::Get, "/foo/1")).await;
        assert_eq!(resp.status_code, 404);
    }

    #[tokio::test]
    async fn patch_merges_fields() {
        let d = dispatcher();
        send(&d, post("/foo", json!({"name": "dfg"}))).await;
        let patched = send(
            &d,
            Request::new(Method::Patch, "/foo/1").with_body(json!({"name": "new"})),
        )
        .await;
        assert_eq!(patched.status_code, 200);
        assert_eq!(patched.body, json!({"id": 1, "name": "new"}));

        let unchanged = send(
            &d,
            Request::new(Method::Patch, "/foo/1").with_body(json!({})),
        )
        .await;
        assert_eq!(unchanged.body, json!({"id": 1, "name": "new"}));
    }

    #[tokio::test]
    async fn empty_collection_is_success() {
        let d = dispatcher();
        let resp = send(
            &d,
            Request::new(Method::Get, "/foo")
                .with_query(BTreeMap::from([("name".into(), "zzz".into())])),
        )
        .await;
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, json!([]));
    }

    #[tokio::test]
    async fn undeclared_capabilities_are_unmatched() {
        let d = dispatcher();
        for req in [
            Request::new(Method::Delete, "/detail/7"),
            Request::new(Method::Patch, "/detail/7").with_body(json!({"name": "x"})),
            Request::new(Method::Get, "/detail"),
            post("/detail", json!({"name": "x"})),
        ] {
            assert!(d.handle(req).await.unwrap().is_unmatched());
        }
        let resp = send(&d, Request::new(Method::Get, "/detail/7")).await;
        assert_eq!(resp.body, json!({"name": "seven"}));
    }

    #[tokio::test]
    async fn unknown_routes_and_shapes_are_unmatched() {
        let d = dispatcher();
        for req in [
            Request::new(Method::Get, "/bar/1"),
            Request::new(Method::Get, "/bar"),
            Request::new(Method::Get, "/foo/abc"),
            Request::new(Method::Get, "/foo/1/extra"),
            Request::new(Method::Get, "/"),
            Request::new(Method::Post, "/foo/1"),
            Request::new(Method::Delete, "/foo"),
            Request::new(Method::Get, "/foo/99999999999999999999999"),
        ] {
            assert!(d.handle(req).await.unwrap().is_unmatched());
        }
    }

    #[test]
    fn owns_mirrors_routing() {
        let d = dispatcher();
        assert!(d.owns(Method::Get, "/foo"));
        assert!(d.owns(Method::Delete, "/foo/3"));
        assert!(d.owns(Method::Get, "/detail/3"));
        assert!(!d.owns(Method::Delete, "/detail/3"));
        assert!(!d.owns(Method::Get, "/bar"));
    }

    #[tokio::test]
    async fn implementation_failure_is_a_dispatch_error() {
        let registry = Registry::builder()
            .resource(
                "broken",
                readonly_schema(),
                FnResource::new(|_| {
                    std::future::ready(Err(HandlerError::Internal("disk on fire".into())))
                }),
            )
            .unwrap()
            .build();
        let d = Dispatcher::new(registry);
        let err = d
            .handle(Request::new(Method::Get, "/broken/1"))
            .await
            .unwrap_err();
        let DispatchError::Handler {
            route, capability, ..
        } = err;
        assert_eq!(route, "broken");
        assert_eq!(capability, Capability::Get);
    }

    #[tokio::test]
    async fn invalid_number_filter_is_400() {
        let schema = ResourceSchema::builder(fields([("season", ScalarType::Number)]))
            .collection_query(fields([("season", ScalarType::Number)]))
            .build()
            .unwrap();
        let registry = Registry::builder()
            .resource("season", schema.clone(), MemoryResource::for_schema(&schema))
            .unwrap()
            .build();
        let d = Dispatcher::new(registry);
        let resp = send(
            &d,
            Request::new(Method::Get, "/season")
                .with_query(BTreeMap::from([("season".into(), "spring".into())])),
        )
        .await;
        assert_eq!(resp.status_code, 400);
    }
}
