//! Capability vocabulary and the single derivation function every consumer
//! shares.
//!
//! [`derive_capabilities`] is the only place that decides which operations a
//! [`ResourceSchema`] implies. The registry uses it to check implementation
//! shape, the dispatcher to decide whether a request is owned, the client to
//! decide which operations exist, and the documentation projector to decide
//! which paths and methods to emit.

use serde::{Deserialize, Serialize};

use crate::types::ResourceSchema;

/// One operation a resource may support.
///
/// Serialises as the camelCase name used on the wire and in documentation
/// (`"get"`, `"post"`, `"patch"`, `"delete"`, `"getCollection"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Get,
    Post,
    Patch,
    Delete,
    GetCollection,
}

impl Capability {
    /// Every capability, in canonical order.
    pub const ALL: [Capability; 5] = [
        Capability::Get,
        Capability::Post,
        Capability::Patch,
        Capability::Delete,
        Capability::GetCollection,
    ];

    /// The wire name of this capability.
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Get => "get",
            Capability::Post => "post",
            Capability::Patch => "patch",
            Capability::Delete => "delete",
            Capability::GetCollection => "getCollection",
        }
    }

    /// HTTP status a successful invocation responds with.
    pub fn success_status(self) -> u16 {
        match self {
            Capability::Post => 201,
            Capability::Delete => 204,
            Capability::Get | Capability::Patch | Capability::GetCollection => 200,
        }
    }

    /// `true` for capabilities addressed by `/{route}/{id}`.
    pub fn is_entity_scoped(self) -> bool {
        matches!(self, Capability::Get | Capability::Patch | Capability::Delete)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown capability: {s:?}"))
    }
}

/// A set of [`Capability`] values. Small, `Copy`, and iterates in canonical
/// order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn empty() -> Self {
        CapabilitySet(0)
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Capabilities in `self` but not in `other`.
    pub fn difference(self, other: CapabilitySet) -> CapabilitySet {
        CapabilitySet(self.0 & !other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CapabilitySet::empty(), CapabilitySet::with)
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl std::fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(Capability::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Compute the capabilities a schema declares.
///
/// `get` is always present; every other capability is present exactly when
/// its schema field is.
pub fn derive_capabilities(schema: &ResourceSchema) -> CapabilitySet {
    let mut set = CapabilitySet::empty().with(Capability::Get);
    if schema.post_body().is_some() {
        set.insert(Capability::Post);
    }
    if schema.patch_body().is_some() {
        set.insert(Capability::Patch);
    }
    if schema.remove() {
        set.insert(Capability::Delete);
    }
    if schema.collection_query_params().is_some() {
        set.insert(Capability::GetCollection);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{fields, ScalarType};

    fn base() -> crate::types::SchemaBuilder {
        ResourceSchema::builder(fields([("id", ScalarType::Number)]))
    }

    #[test]
    fn get_only() {
        let caps = derive_capabilities(&base().build().unwrap());
        assert_eq!(caps, CapabilitySet::empty().with(Capability::Get));
    }

    #[test]
    fn each_optional_field_toggles_one_capability() {
        let name = fields([("name", ScalarType::String)]);
        let cases = [
            (base().post_body(name.clone()), Capability::Post),
            (base().patch_body(name.clone()), Capability::Patch),
            (base().remove(), Capability::Delete),
            (base().collection_query(name.clone()), Capability::GetCollection),
        ];
        for (builder, expected) in cases {
            let caps = derive_capabilities(&builder.build().unwrap());
            assert_eq!(caps.len(), 2, "{expected}");
            assert!(caps.contains(Capability::Get));
            assert!(caps.contains(expected));
        }
    }

    #[test]
    fn full_schema_and_idempotence() {
        let name = fields([("name", ScalarType::String)]);
        let schema = base()
            .post_body(name.clone())
            .patch_body(name.clone())
            .remove()
            .collection_query(name)
            .build()
            .unwrap();
        let first = derive_capabilities(&schema);
        assert_eq!(first, derive_capabilities(&schema));
        assert_eq!(first.iter().collect::<Vec<_>>(), Capability::ALL.to_vec());
    }

    #[test]
    fn difference_and_display() {
        let all: CapabilitySet = Capability::ALL.into_iter().collect();
        let get = CapabilitySet::empty().with(Capability::Get);
        let rest = all.difference(get);
        assert!(!rest.contains(Capability::Get));
        assert_eq!(rest.len(), 4);
        assert_eq!(get.to_string(), "{get}");
    }

    #[test]
    fn wire_names_round_trip() {
        for c in Capability::ALL {
            assert_eq!(c.as_str().parse::<Capability>().unwrap(), c);
        }
        assert_eq!(
            serde_json::to_value(Capability::GetCollection).unwrap(),
            "getCollection"
        );
    }
}
