//! The endpoint registry: route name → (schema, implementation).
//!
//! Assembled once at startup through [`RegistryBuilder`] and read-only
//! afterwards. Every endpoint is checked on construction: its
//! implementation must provide exactly the capabilities its schema declares.

use std::collections::BTreeMap;
use std::sync::Arc;

use enapi::{derive_capabilities, validate_route_name, CapabilitySet, DocInfo, ResourceSchema};
use serde_json::Value;

use crate::error::{CapabilityMismatch, RegistryError};
use crate::handler::ResourceHandler;

/// A schema paired with the implementation that realises it.
#[derive(Clone)]
pub struct Endpoint {
    schema: ResourceSchema,
    capabilities: CapabilitySet,
    handler: Arc<dyn ResourceHandler>,
}

impl Endpoint {
    /// Pair `schema` with `handler`, rejecting any capability mismatch.
    pub fn new(
        schema: ResourceSchema,
        handler: impl ResourceHandler,
    ) -> Result<Self, CapabilityMismatch> {
        Self::from_arc(schema, Arc::new(handler))
    }

    /// Like [`Endpoint::new`] for an implementation that is already shared.
    pub fn from_arc(
        schema: ResourceSchema,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<Self, CapabilityMismatch> {
        let capabilities = derive_capabilities(&schema);
        let provided = handler.capabilities();
        if provided != capabilities {
            return Err(CapabilityMismatch {
                missing: capabilities.difference(provided),
                extra: provided.difference(capabilities),
            });
        }
        Ok(Self {
            schema,
            capabilities,
            handler,
        })
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// The capability set derived from the schema, computed once.
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn handler(&self) -> &dyn ResourceHandler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("schema", &self.schema)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Immutable route → [`Endpoint`] mapping.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    endpoints: BTreeMap<String, Endpoint>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, route: &str) -> Option<&Endpoint> {
        self.endpoints.get(route)
    }

    /// The registered route name alongside its endpoint.
    pub fn entry(&self, route: &str) -> Option<(&str, &Endpoint)> {
        self.endpoints
            .get_key_value(route)
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, route: &str) -> bool {
        self.endpoints.contains_key(route)
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Endpoint)> {
        self.endpoints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Schemas only; what the documentation projector and remote clients
    /// are allowed to see.
    pub fn schemas(&self) -> impl Iterator<Item = (&str, &ResourceSchema)> {
        self.iter().map(|(route, ep)| (route, ep.schema()))
    }

    /// Owned copy of the route → schema map, suitable for handing to a
    /// client.
    pub fn schema_map(&self) -> BTreeMap<String, ResourceSchema> {
        self.schemas()
            .map(|(route, schema)| (route.to_string(), schema.clone()))
            .collect()
    }

    /// The OpenAPI document for this registry.
    pub fn document(&self, info: &DocInfo) -> Value {
        enapi::openapi::document(self.schemas(), info)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Collects endpoints, rejecting malformed and duplicate route names.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    endpoints: BTreeMap<String, Endpoint>,
}

impl RegistryBuilder {
    /// Register `handler` under `route` as the implementation of `schema`.
    pub fn resource(
        self,
        route: impl Into<String>,
        schema: ResourceSchema,
        handler: impl ResourceHandler,
    ) -> Result<Self, RegistryError> {
        let route = route.into();
        match Endpoint::new(schema, handler) {
            Ok(endpoint) => self.endpoint(route, endpoint),
            Err(source) => Err(RegistryError::CapabilityMismatch { route, source }),
        }
    }

    /// Register an already-checked [`Endpoint`] under `route`.
    pub fn endpoint(
        mut self,
        route: impl Into<String>,
        endpoint: Endpoint,
    ) -> Result<Self, RegistryError> {
        let route = route.into();
        validate_route_name(&route)?;
        if self.endpoints.contains_key(&route) {
            return Err(RegistryError::DuplicateRoute(route));
        }
        tracing::debug!(route = %route, capabilities = %endpoint.capabilities(), "registered endpoint");
        self.endpoints.insert(route, endpoint);
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            endpoints: self.endpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use enapi::{fields, Capability, ScalarType};

    use super::*;
    use crate::handler::FnResource;

    fn get_only() -> ResourceSchema {
        ResourceSchema::builder(fields([("id", ScalarType::Number)]))
            .build()
            .unwrap()
    }

    fn removable() -> ResourceSchema {
        ResourceSchema::builder(fields([("id", ScalarType::Number)]))
            .remove()
            .build()
            .unwrap()
    }

    fn getter() -> FnResource {
        FnResource::new(|_| std::future::ready(Ok(None)))
    }

    #[test]
    fn matching_implementation_accepted() {
        let ep = Endpoint::new(removable(), getter().with_delete(|_| async { Ok(false) })).unwrap();
        assert!(ep.capabilities().contains(Capability::Delete));
    }

    #[test]
    fn missing_capability_rejected_with_route_name() {
        let err = Registry::builder()
            .resource("foo", removable(), getter())
            .unwrap_err();
        match err {
            RegistryError::CapabilityMismatch { route, source } => {
                assert_eq!(route, "foo");
                assert!(source.missing.contains(Capability::Delete));
                assert!(source.extra.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extra_capability_rejected() {
        let err = Endpoint::new(get_only(), getter().with_delete(|_| async { Ok(true) })).unwrap_err();
        assert!(err.extra.contains(Capability::Delete));
        assert!(err.missing.is_empty());
    }

    #[test]
    fn duplicate_and_invalid_routes_rejected() {
        let err = Registry::builder()
            .resource("foo", get_only(), getter())
            .unwrap()
            .resource("foo", get_only(), getter())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRoute(r) if r == "foo"));

        let err = Registry::builder()
            .resource("42", get_only(), getter())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidRoute(_)));
    }

    #[test]
    fn schema_views() {
        let registry = Registry::builder()
            .resource("b", get_only(), getter())
            .unwrap()
            .resource("a", removable(), getter().with_delete(|_| async { Ok(true) }))
            .unwrap()
            .build();
        assert_eq!(registry.routes().collect::<Vec<_>>(), vec!["a", "b"]);
        let map = registry.schema_map();
        assert_eq!(map["a"], removable());
        let doc = registry.document(&DocInfo::default());
        assert!(doc["paths"]["/a/{id}"].get("delete").is_some());
        assert!(doc["paths"]["/b/{id}"].get("delete").is_none());
    }
}
