//! Schema model: scalar field types, field sets, and the per-resource schema.
//!
//! A [`ResourceSchema`] is the single declaration from which every other part
//! of the system derives its view of a resource. The optional fields double as
//! capability toggles: declaring `postBody` enables creation, `patchBody`
//! enables partial update, `remove` enables deletion, and
//! `collectionQueryParams` enables collection listing.
//!
//! On the wire a schema is the camelCase JSON object
//!
//! ```json
//! {
//!   "getResult": { "id": "number", "name": "string" },
//!   "postBody": { "name": "string" },
//!   "remove": true
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The scalar vocabulary usable in request and response shapes.
///
/// Serialises as a lowercase string (`"string"` or `"number"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::String => write!(f, "string"),
            ScalarType::Number => write!(f, "number"),
        }
    }
}

/// Field name → scalar type. Ordered so that every consumer sees the same
/// field order.
pub type FieldSet = BTreeMap<String, ScalarType>;

/// Build a [`FieldSet`] from `(name, type)` pairs.
///
/// ```rust,ignore
/// let fields = fields([("id", ScalarType::Number), ("name", ScalarType::String)]);
/// ```
pub fn fields<I, K>(pairs: I) -> FieldSet
where
    I: IntoIterator<Item = (K, ScalarType)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, t)| (k.into(), t)).collect()
}

/// Errors raised when a schema would leave a capability half declared.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{0} must declare at least one field when present")]
    EmptyFieldSet(&'static str),

    #[error("{0} contains an empty field name")]
    EmptyFieldName(&'static str),
}

/// The declaration of one resource: what it returns and which optional
/// capabilities it supports.
///
/// Immutable once built. Construct with [`ResourceSchema::builder`] or by
/// deserialising JSON; both paths enforce [`ResourceSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema", into = "RawSchema")]
pub struct ResourceSchema {
    get_result: FieldSet,
    post_body: Option<FieldSet>,
    patch_body: Option<FieldSet>,
    remove: bool,
    collection_query_params: Option<FieldSet>,
}

impl ResourceSchema {
    /// Start a schema whose single-entity and collection results have the
    /// shape `get_result`.
    pub fn builder(get_result: FieldSet) -> SchemaBuilder {
        SchemaBuilder {
            schema: ResourceSchema {
                get_result,
                post_body: None,
                patch_body: None,
                remove: false,
                collection_query_params: None,
            },
        }
    }

    /// Shape returned by `get` and by each element of `getCollection`.
    pub fn get_result(&self) -> &FieldSet {
        &self.get_result
    }

    /// Accepted body for `post`, if creation is declared.
    pub fn post_body(&self) -> Option<&FieldSet> {
        self.post_body.as_ref()
    }

    /// Accepted body for `patch`, if partial update is declared.
    pub fn patch_body(&self) -> Option<&FieldSet> {
        self.patch_body.as_ref()
    }

    /// `true` when deletion is declared.
    pub fn remove(&self) -> bool {
        self.remove
    }

    /// Accepted filter parameters for `getCollection`, if listing is declared.
    pub fn collection_query_params(&self) -> Option<&FieldSet> {
        self.collection_query_params.as_ref()
    }

    /// Check that no capability is half declared: each present field set must
    /// be non-empty and must not contain an empty field name.
    pub fn validate(&self) -> Result<(), SchemaError> {
        check_fields("getResult", Some(&self.get_result))?;
        check_fields("postBody", self.post_body.as_ref())?;
        check_fields("patchBody", self.patch_body.as_ref())?;
        check_fields("collectionQueryParams", self.collection_query_params.as_ref())?;
        Ok(())
    }
}

fn check_fields(name: &'static str, fields: Option<&FieldSet>) -> Result<(), SchemaError> {
    let Some(fields) = fields else {
        return Ok(());
    };
    if fields.is_empty() {
        return Err(SchemaError::EmptyFieldSet(name));
    }
    if fields.keys().any(|k| k.is_empty()) {
        return Err(SchemaError::EmptyFieldName(name));
    }
    Ok(())
}

/// Builder for [`ResourceSchema`]. Each method switches one optional
/// capability on.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    schema: ResourceSchema,
}

impl SchemaBuilder {
    /// Enable creation with the given body shape.
    pub fn post_body(mut self, body: FieldSet) -> Self {
        self.schema.post_body = Some(body);
        self
    }

    /// Enable partial update with the given body shape.
    pub fn patch_body(mut self, body: FieldSet) -> Self {
        self.schema.patch_body = Some(body);
        self
    }

    /// Enable deletion.
    pub fn remove(mut self) -> Self {
        self.schema.remove = true;
        self
    }

    /// Enable collection listing with the given filter parameters.
    pub fn collection_query(mut self, params: FieldSet) -> Self {
        self.schema.collection_query_params = Some(params);
        self
    }

    pub fn build(self) -> Result<ResourceSchema, SchemaError> {
        self.schema.validate()?;
        Ok(self.schema)
    }
}

/// Wire representation of [`ResourceSchema`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawSchema {
    get_result: FieldSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    post_body: Option<FieldSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patch_body: Option<FieldSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remove: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collection_query_params: Option<FieldSet>,
}

impl TryFrom<RawSchema> for ResourceSchema {
    type Error = SchemaError;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        let schema = ResourceSchema {
            get_result: raw.get_result,
            post_body: raw.post_body,
            patch_body: raw.patch_body,
            remove: raw.remove.unwrap_or(false),
            collection_query_params: raw.collection_query_params,
        };
        schema.validate()?;
        Ok(schema)
    }
}

impl From<ResourceSchema> for RawSchema {
    fn from(schema: ResourceSchema) -> Self {
        RawSchema {
            get_result: schema.get_result,
            post_body: schema.post_body,
            patch_body: schema.patch_body,
            remove: schema.remove.then_some(true),
            collection_query_params: schema.collection_query_params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo_schema() -> ResourceSchema {
        ResourceSchema::builder(fields([
            ("id", ScalarType::Number),
            ("name", ScalarType::String),
        ]))
        .post_body(fields([("name", ScalarType::String)]))
        .remove()
        .build()
        .unwrap()
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "getResult": {"id": "number", "name": "string"},
            "postBody": {"name": "string"},
            "remove": true
        }"#;
        let schema: ResourceSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema, foo_schema());
    }

    #[test]
    fn remove_false_is_absent() {
        let json = r#"{"getResult": {"id": "number"}, "remove": false}"#;
        let schema: ResourceSchema = serde_json::from_str(json).unwrap();
        assert!(!schema.remove());
        let out = serde_json::to_value(&schema).unwrap();
        assert!(out.get("remove").is_none());
    }

    #[test]
    fn absent_capabilities_are_not_serialised() {
        let schema = ResourceSchema::builder(fields([("id", ScalarType::Number)]))
            .build()
            .unwrap();
        let out = serde_json::to_value(&schema).unwrap();
        assert_eq!(out, serde_json::json!({"getResult": {"id": "number"}}));
    }

    #[test]
    fn empty_field_set_is_half_declared() {
        let err = ResourceSchema::builder(fields([("id", ScalarType::Number)]))
            .patch_body(FieldSet::new())
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::EmptyFieldSet("patchBody"));
    }

    #[test]
    fn empty_get_result_rejected_on_deserialise() {
        let json = r#"{"getResult": {}}"#;
        assert!(serde_json::from_str::<ResourceSchema>(json).is_err());
    }

    #[test]
    fn unknown_scalar_type_rejected() {
        let json = r#"{"getResult": {"id": "boolean"}}"#;
        assert!(serde_json::from_str::<ResourceSchema>(json).is_err());
    }

    #[test]
    fn empty_field_name_rejected() {
        let err = ResourceSchema::builder(fields([("", ScalarType::String)]))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::EmptyFieldName("getResult"));
    }
}
