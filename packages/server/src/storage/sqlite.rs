//! SQLite-backed resource store.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! One database serves any number of resources; rows are keyed by
//! `(route, id)`.
//!
//! # Schema
//!
//! - `entities`: one JSON blob per entity.
//! - `id_sequences`: last identifier handed out per route, so identifiers
//!   are never reused after deletion.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use enapi::{derive_capabilities, CapabilitySet, Entity, ResourceSchema};
use rusqlite::{params, Connection, OptionalExtension};

use super::{merge, with_id, CollectionFilter, PrefixFilter};
use crate::error::HandlerError;
use crate::handler::{HandlerResult, ResourceHandler};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entities (
    route   TEXT    NOT NULL,
    id      INTEGER NOT NULL,
    data    TEXT    NOT NULL,
    PRIMARY KEY (route, id)
);

CREATE TABLE IF NOT EXISTS id_sequences (
    route   TEXT    PRIMARY KEY,
    last_id INTEGER NOT NULL
);
";

fn map_err(e: rusqlite::Error) -> HandlerError {
    HandlerError::Internal(e.to_string())
}

/// Identifiers above `i64::MAX` cannot be stored, so they are never found.
fn sql_id(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

/// A shared SQLite database that hands out per-route [`SqliteResource`]s.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A store for the resource registered as `route`, providing exactly the
    /// capabilities `schema` declares.
    pub fn resource(&self, route: impl Into<String>, schema: &ResourceSchema) -> SqliteResource {
        SqliteResource {
            conn: Arc::clone(&self.conn),
            route: route.into(),
            capabilities: derive_capabilities(schema),
            filter: Box::new(PrefixFilter),
        }
    }
}

/// SQLite-backed implementation of [`ResourceHandler`] for one route.
pub struct SqliteResource {
    conn: Arc<Mutex<Connection>>,
    route: String,
    capabilities: CapabilitySet,
    filter: Box<dyn CollectionFilter>,
}

impl SqliteResource {
    /// Replace the collection filter policy.
    pub fn with_filter(mut self, filter: impl CollectionFilter) -> Self {
        self.filter = Box::new(filter);
        self
    }

    async fn with_conn<T, F>(&self, f: F) -> HandlerResult<T>
    where
        F: FnOnce(&mut Connection, &str) -> HandlerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let route = self.route.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| HandlerError::Internal("connection lock poisoned".into()))?;
            f(&mut conn, &route)
        })
        .await
        .map_err(|e| HandlerError::Internal(format!("task join error: {e}")))?
    }
}

fn load(conn: &Connection, route: &str, id: i64) -> HandlerResult<Option<Entity>> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM entities WHERE route = ?1 AND id = ?2",
            params![route, id],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_err)?;
    Ok(data.map(|d| serde_json::from_str(&d)).transpose()?)
}

#[async_trait]
impl ResourceHandler for SqliteResource {
    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    async fn get(&self, id: u64) -> HandlerResult<Option<Entity>> {
        let Some(id) = sql_id(id) else {
            return Ok(None);
        };
        self.with_conn(move |conn, route| load(conn, route, id)).await
    }

    async fn post(&self, body: Entity) -> HandlerResult<Entity> {
        self.with_conn(move |conn, route| {
            let tx = conn.transaction().map_err(map_err)?;
            tx.execute(
                "INSERT INTO id_sequences (route, last_id) VALUES (?1, 1)
                 ON CONFLICT(route) DO UPDATE SET last_id = last_id + 1",
                params![route],
            )
            .map_err(map_err)?;
            let id: i64 = tx
                .query_row(
                    "SELECT last_id FROM id_sequences WHERE route = ?1",
                    params![route],
                    |row| row.get(0),
                )
                .map_err(map_err)?;
            let id = u64::try_from(id)
                .map_err(|_| HandlerError::Internal(format!("negative id {id} in sequence")))?;

            let entity = with_id(body, id);
            let data = serde_json::to_string(&entity)?;
            tx.execute(
                "INSERT INTO entities (route, id, data) VALUES (?1, ?2, ?3)",
                params![route, id as i64, data],
            )
            .map_err(map_err)?;
            tx.commit().map_err(map_err)?;
            Ok(entity)
        })
        .await
    }

    async fn patch(&self, id: u64, body: Entity) -> HandlerResult<Option<Entity>> {
        let Some(id) = sql_id(id) else {
            return Ok(None);
        };
        self.with_conn(move |conn, route| {
            let tx = conn.transaction().map_err(map_err)?;
            let Some(mut entity) = load(&tx, route, id)? else {
                return Ok(None);
            };
            merge(&mut entity, body);
            let data = serde_json::to_string(&entity)?;
            tx.execute(
                "UPDATE entities SET data = ?3 WHERE route = ?1 AND id = ?2",
                params![route, id, data],
            )
            .map_err(map_err)?;
            tx.commit().map_err(map_err)?;
            Ok(Some(entity))
        })
        .await
    }

    async fn delete(&self, id: u64) -> HandlerResult<bool> {
        let Some(id) = sql_id(id) else {
            return Ok(false);
        };
        self.with_conn(move |conn, route| {
            let removed = conn
                .execute(
                    "DELETE FROM entities WHERE route = ?1 AND id = ?2",
                    params![route, id],
                )
                .map_err(map_err)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn get_collection(&self, filter: Entity) -> HandlerResult<Vec<Entity>> {
        let all = self
            .with_conn(|conn, route| {
                let mut stmt = conn
                    .prepare("SELECT data FROM entities WHERE route = ?1 ORDER BY id")
                    .map_err(map_err)?;
                let rows = stmt
                    .query_map(params![route], |row| row.get::<_, String>(0))
                    .map_err(map_err)?;
                let mut out = Vec::new();
                for data in rows {
                    let data = data.map_err(map_err)?;
                    out.push(serde_json::from_str::<Entity>(&data)?);
                }
                Ok(out)
            })
            .await?;
        Ok(all
            .into_iter()
            .filter(|e| self.filter.matches(e, &filter))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use enapi::{fields, ScalarType};
    use serde_json::json;

    use super::*;

    fn schema() -> ResourceSchema {
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

    fn body(name: &str) -> Entity {
        json!({ "name": name }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn post_get_patch_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let foo = store.resource("foo", &schema());

        let created = foo.post(body("dfg")).await.unwrap();
        assert_eq!(created["id"], 1);

        let patched = foo.patch(1, body("new")).await.unwrap().unwrap();
        assert_eq!(patched["name"], "new");
        assert_eq!(foo.get(1).await.unwrap().unwrap(), patched);

        assert!(foo.delete(1).await.unwrap());
        assert!(!foo.delete(1).await.unwrap());
        assert!(foo.get(1).await.unwrap().is_none());
        assert!(foo.patch(1, body("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_are_per_route_and_never_reused() {
        let store = SqliteStore::open_in_memory().unwrap();
        let foo = store.resource("foo", &schema());
        let bar = store.resource("bar", &schema());

        foo.post(body("a")).await.unwrap();
        foo.post(body("b")).await.unwrap();
        foo.delete(2).await.unwrap();
        assert_eq!(foo.post(body("c")).await.unwrap()["id"], 3);
        assert_eq!(bar.post(body("z")).await.unwrap()["id"], 1);
    }

    #[tokio::test]
    async fn collection_filters_and_orders_by_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let foo = store.resource("foo", &schema());
        for name in ["dfg", "hij", "dzz"] {
            foo.post(body(name)).await.unwrap();
        }
        let d = foo.get_collection(body("d")).await.unwrap();
        let names: Vec<_> = d.iter().map(|e| e["name"].clone()).collect();
        assert_eq!(names, vec![json!("dfg"), json!("dzz")]);
        assert_eq!(foo.get_collection(Entity::new()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn huge_ids_are_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let foo = store.resource("foo", &schema());
        assert!(foo.get(u64::MAX).await.unwrap().is_none());
        assert!(!foo.delete(u64::MAX).await.unwrap());
    }
}
