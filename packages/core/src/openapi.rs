//! OpenAPI 3.0 projection of a set of resource schemas.
//!
//! This is a pure function of the schemas: it never sees an implementation.
//! Paths and methods are emitted through [`derive_capabilities`], so the
//! document can only describe operations the dispatcher will actually route.
//!
//! For a route `foo` the document contains:
//!
//! | Path | Methods |
//! |------|---------|
//! | `/foo/{id}` | `get`, plus `patch` / `delete` when declared |
//! | `/foo` | `get` when `collectionQueryParams` is declared, `post` when `postBody` is declared |
//!
//! and one component schema per (route, capability) pair named
//! `{route}_{capability}`: the body shape for `post` and `patch`, the query
//! shape for `getCollection`, and the entity shape for `get`, which every
//! entity-returning response references. `delete` takes and returns nothing,
//! so it has no component.

use serde_json::{json, Map, Value};

use crate::capability::{derive_capabilities, Capability};
use crate::types::{FieldSet, ResourceSchema, ScalarType};

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocInfo {
    pub title: String,
    pub version: String,
    /// Base URL advertised in `servers`.
    pub server_url: String,
}

impl Default for DocInfo {
    fn default() -> Self {
        Self {
            title: "My Api".into(),
            version: "0.0.0".into(),
            server_url: "http://localhost:3000".into(),
        }
    }
}

fn scalar_schema(t: ScalarType) -> Value {
    match t {
        ScalarType::String => json!({ "type": "string" }),
        ScalarType::Number => json!({ "type": "integer", "format": "int64" }),
    }
}

fn object_schema(fields: &FieldSet) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|(name, t)| (name.clone(), scalar_schema(*t)))
        .collect();
    json!({ "type": "object", "properties": properties })
}

fn schema_name(route: &str, capability: Capability) -> String {
    format!("{route}_{}", capability.as_str())
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "description": "resource identifier",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

/// Accumulates component schemas while paths are being built.
struct Projector {
    schemas: Map<String, Value>,
}

impl Projector {
    fn register(&mut self, route: &str, capability: Capability, fields: &FieldSet) -> Value {
        let name = schema_name(route, capability);
        self.schemas.insert(name.clone(), object_schema(fields));
        schema_ref(&name)
    }

    fn operation(
        &mut self,
        route: &str,
        capability: Capability,
        schema: &ResourceSchema,
    ) -> Value {
        let mut op = Map::new();
        op.insert("tags".into(), json!([route]));
        op.insert(
            "summary".into(),
            json!(format!("{} {route} resource", capability.as_str())),
        );
        op.insert(
            "operationId".into(),
            json!(format!("{}_{route}", capability.as_str())),
        );

        let mut parameters = Vec::new();
        if capability.is_entity_scoped() {
            parameters.push(id_parameter());
        }
        if capability == Capability::GetCollection {
            if let Some(query) = schema.collection_query_params() {
                self.register(route, capability, query);
                for (name, t) in query {
                    parameters.push(json!({
                        "name": name,
                        "in": "query",
                        "required": false,
                        "schema": scalar_schema(*t),
                    }));
                }
            }
        }
        if !parameters.is_empty() {
            op.insert("parameters".into(), Value::Array(parameters));
        }

        let body_fields = match capability {
            Capability::Post => schema.post_body(),
            Capability::Patch => schema.patch_body(),
            _ => None,
        };
        if let Some(fields) = body_fields {
            let body_ref = self.register(route, capability, fields);
            op.insert(
                "requestBody".into(),
                json!({ "required": true, "content": json_content(body_ref) }),
            );
        }

        let mut responses = Map::new();
        let status = capability.success_status().to_string();
        match capability {
            Capability::Delete => {
                responses.insert(status, json!({ "description": "Successful operation" }));
            }
            Capability::GetCollection => {
                let item = self.register(route, Capability::Get, schema.get_result());
                responses.insert(
                    status,
                    json!({
                        "description": "Successful operation",
                        "content": json_content(json!({ "type": "array", "items": item })),
                    }),
                );
            }
            Capability::Get | Capability::Post | Capability::Patch => {
                let result = self.register(route, Capability::Get, schema.get_result());
                responses.insert(
                    status,
                    json!({ "description": "Successful operation", "content": json_content(result) }),
                );
            }
        }
        if body_fields.is_some() || capability == Capability::GetCollection {
            responses.insert("400".into(), json!({ "description": "invalid request" }));
        }
        if capability.is_entity_scoped() {
            responses.insert("404".into(), json!({ "description": "not found" }));
        }
        op.insert("responses".into(), Value::Object(responses));

        Value::Object(op)
    }
}

fn method_name(capability: Capability) -> &'static str {
    match capability {
        Capability::Get | Capability::GetCollection => "get",
        Capability::Post => "post",
        Capability::Patch => "patch",
        Capability::Delete => "delete",
    }
}

/// Project an OpenAPI 3.0 document from `(route, schema)` pairs.
pub fn document<'a, I>(schemas: I, info: &DocInfo) -> Value
where
    I: IntoIterator<Item = (&'a str, &'a ResourceSchema)>,
{
    let mut projector = Projector {
        schemas: Map::new(),
    };
    let mut paths = Map::new();

    for (route, schema) in schemas {
        let mut entity_path = Map::new();
        let mut collection_path = Map::new();

        for capability in derive_capabilities(schema).iter() {
            let op = projector.operation(route, capability, schema);
            let target = if capability.is_entity_scoped() {
                &mut entity_path
            } else {
                &mut collection_path
            };
            target.insert(method_name(capability).into(), op);
        }

        paths.insert(format!("/{route}/{{id}}"), Value::Object(entity_path));
        if !collection_path.is_empty() {
            paths.insert(format!("/{route}"), Value::Object(collection_path));
        }
    }

    json!({
        "openapi": "3.0.3",
        "servers": [{ "url": info.server_url }],
        "info": { "title": info.title, "version": info.version },
        "paths": paths,
        "components": {
            "schemas": projector.schemas,
            "requestBodies": {},
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fields;

    fn foo() -> ResourceSchema {
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

    fn detail() -> ResourceSchema {
        ResourceSchema::builder(fields([("name", ScalarType::String)]))
            .build()
            .unwrap()
    }

    #[test]
    fn full_resource_emits_every_method() {
        let foo = foo();
        let doc = document([("foo", &foo)], &DocInfo::default());
        let entity = &doc["paths"]["/foo/{id}"];
        assert!(entity.get("get").is_some());
        assert!(entity.get("patch").is_some());
        assert!(entity.get("delete").is_some());
        let collection = &doc["paths"]["/foo"];
        assert!(collection.get("get").is_some());
        assert!(collection.get("post").is_some());
    }

    #[test]
    fn get_only_resource_has_no_collection_path() {
        let detail = detail();
        let doc = document([("detail", &detail)], &DocInfo::default());
        let entity = doc["paths"]["/detail/{id}"].as_object().unwrap();
        assert_eq!(entity.keys().collect::<Vec<_>>(), vec!["get"]);
        assert!(doc["paths"].get("/detail").is_none());
        let schemas = doc["components"]["schemas"].as_object().unwrap();
        assert_eq!(schemas.keys().collect::<Vec<_>>(), vec!["detail_get"]);
    }

    #[test]
    fn component_schemas_named_by_route_and_capability() {
        let foo = foo();
        let doc = document([("foo", &foo)], &DocInfo::default());
        let schemas = doc["components"]["schemas"].as_object().unwrap();
        let mut names: Vec<_> = schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["foo_get", "foo_getCollection", "foo_patch", "foo_post"]
        );
        assert_eq!(
            schemas["foo_getCollection"]["properties"]["name"],
            json!({"type": "string"})
        );
        assert_eq!(
            schemas["foo_get"]["properties"]["id"],
            json!({"type": "integer", "format": "int64"})
        );
        assert_eq!(
            schemas["foo_post"]["properties"]["name"],
            json!({"type": "string"})
        );
        assert_eq!(
            doc["paths"]["/foo"]["post"]["requestBody"]["content"]["application/json"]["schema"]
                ["$ref"],
            "#/components/schemas/foo_post"
        );
    }

    #[test]
    fn collection_query_parameters_listed() {
        let foo = foo();
        let doc = document([("foo", &foo)], &DocInfo::default());
        let params = doc["paths"]["/foo"]["get"]["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0]["name"], "name");
        assert_eq!(params[0]["in"], "query");
    }

    #[test]
    fn header_carries_doc_info() {
        let info = DocInfo {
            title: "Fixtures".into(),
            version: "1.2.3".into(),
            server_url: "https://api.example.com".into(),
        };
        let doc = document(std::iter::empty(), &info);
        assert_eq!(doc["openapi"], "3.0.3");
        assert_eq!(doc["info"]["title"], "Fixtures");
        assert_eq!(doc["servers"][0]["url"], "https://api.example.com");
    }
}
