//! Reference resource stores.
//!
//! These are example collaborators, not part of the contract layer: any type
//! implementing [`ResourceHandler`](crate::ResourceHandler) is a valid
//! backing store. Both stores assign identifiers from a per-resource counter
//! starting at 1, never reuse an identifier, merge patches field by field,
//! and delegate collection filtering to a [`CollectionFilter`] policy.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryResource`] | Tests, demos, ephemeral servers |
//! | [`SqliteResource`] | Durable single-file storage shared by many resources |
//!
//! [`MemoryResource`]: memory::MemoryResource
//! [`SqliteResource`]: sqlite::SqliteResource

pub mod memory;
pub mod sqlite;

use enapi::Entity;
use serde_json::Value;

/// Field every stored entity carries its identifier in.
pub const ID_FIELD: &str = "id";

/// Decides whether an entity belongs in a `getCollection` result.
///
/// Filter semantics are resource-specific; the core only guarantees that
/// `filter` holds a subset of the declared query fields, already typed.
pub trait CollectionFilter: Send + Sync + 'static {
    fn matches(&self, entity: &Entity, filter: &Entity) -> bool;
}

impl<F> CollectionFilter for F
where
    F: Fn(&Entity, &Entity) -> bool + Send + Sync + 'static,
{
    fn matches(&self, entity: &Entity, filter: &Entity) -> bool {
        self(entity, filter)
    }
}

/// Every string filter value must be a prefix of the entity's field; every
/// number must be equal. An empty string therefore matches any string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixFilter;

impl CollectionFilter for PrefixFilter {
    fn matches(&self, entity: &Entity, filter: &Entity) -> bool {
        filter.iter().all(|(key, wanted)| match (entity.get(key), wanted) {
            (Some(Value::String(have)), Value::String(prefix)) => have.starts_with(prefix.as_str()),
            (Some(have), wanted) => have == wanted,
            (None, _) => false,
        })
    }
}

/// Ignores the filter and returns everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl CollectionFilter for MatchAll {
    fn matches(&self, _entity: &Entity, _filter: &Entity) -> bool {
        true
    }
}

/// Overwrite the fields present in `patch`, leaving the rest. The identifier
/// is never overwritten.
pub(crate) fn merge(target: &mut Entity, patch: Entity) {
    for (key, value) in patch {
        if key != ID_FIELD {
            target.insert(key, value);
        }
    }
}

/// A freshly created entity: the posted fields plus its identifier.
pub(crate) fn with_id(mut body: Entity, id: u64) -> Entity {
    body.insert(ID_FIELD.to_string(), Value::from(id));
    body
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entity(value: Value) -> Entity {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn prefix_filter() {
        let e = entity(json!({"id": 1, "name": "dfg", "season": 3}));
        assert!(PrefixFilter.matches(&e, &entity(json!({"name": ""}))));
        assert!(PrefixFilter.matches(&e, &entity(json!({"name": "d"}))));
        assert!(!PrefixFilter.matches(&e, &entity(json!({"name": "h"}))));
        assert!(PrefixFilter.matches(&e, &entity(json!({"season": 3}))));
        assert!(!PrefixFilter.matches(&e, &entity(json!({"season": 4}))));
        assert!(!PrefixFilter.matches(&e, &entity(json!({"colour": "red"}))));
        assert!(PrefixFilter.matches(&e, &Entity::new()));
    }

    #[test]
    fn closures_are_filters() {
        let odd = |e: &Entity, _: &Entity| e["id"].as_u64().is_some_and(|id| id % 2 == 1);
        assert!(odd.matches(&entity(json!({"id": 3})), &Entity::new()));
        assert!(!odd.matches(&entity(json!({"id": 4})), &Entity::new()));
    }

    #[test]
    fn merge_keeps_unpatched_fields_and_id() {
        let mut e = entity(json!({"id": 1, "name": "dfg", "season": 3}));
        merge(&mut e, entity(json!({"name": "new", "id": 99})));
        assert_eq!(Value::Object(e), json!({"id": 1, "name": "new", "season": 3}));
    }
}
