//! SQLite node store with per-entity FTS5 search.

use super::fts5::{Fts5Manager, Fts5Stats};
use super::{validate_identifier, IndexProvider, IndexRecord, NodeId, SearchIndex};
use crate::config::{IndexConfig, QueryConfig};
use crate::metadata::EntityMetadata;
use crate::{NodemapError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

/// Stores nodes as JSON property bags and indexes them per entity.
pub struct NodeStore {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
    config: IndexConfig,
    /// Entities whose FTS5 table has been ensured on this connection.
    prepared: Mutex<HashSet<String>>,
}

impl NodeStore {
    /// Create or open a node store at the given path.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(db_path, IndexConfig::default())
    }

    /// Create or open a node store with a custom index configuration.
    pub fn with_config(db_path: impl Into<PathBuf>, config: IndexConfig) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| NodemapError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::configure_connection(&conn)?;
        Self::from_connection(conn, Some(db_path), config)
    }

    /// Open a throwaway in-memory store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None, IndexConfig::default())
    }

    fn from_connection(
        conn: Connection,
        db_path: Option<PathBuf>,
        config: IndexConfig,
    ) -> Result<Self> {
        Self::ensure_schema(&conn)?;

        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
            config,
            prepared: Mutex::new(HashSet::new()),
        })
    }

    /// Configure connection with optimal settings.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )?;
        Ok(())
    }

    /// Ensure the base schema exists.
    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity TEXT NOT NULL,
                properties_json TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_entity ON nodes(entity)",
            [],
        )?;
        Ok(())
    }

    /// Get the database path, if the store is file-backed.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| NodemapError::lock_poisoned())
    }

    /// Ensure the FTS5 table of an entity exists, once per store.
    fn prepare(&self, conn: &Connection, metadata: &EntityMetadata) -> Result<()> {
        let mut prepared = self.prepared.lock().map_err(|_| NodemapError::lock_poisoned())?;
        if prepared.contains(metadata.entity_name()) {
            return Ok(());
        }

        Fts5Manager::new(&self.config, metadata)?.ensure_setup(conn)?;
        prepared.insert(metadata.entity_name().to_string());
        Ok(())
    }

    /// Reject properties the entity does not declare.
    fn check_properties(
        metadata: &EntityMetadata,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        for name in properties.keys() {
            if metadata.property(name).is_none() {
                return Err(NodemapError::Validation {
                    field: name.clone(),
                    message: format!("{} does not declare this property", metadata.entity_name()),
                });
            }
        }
        Ok(())
    }

    /// Store a new node of the given entity and index it.
    pub fn insert(
        &self,
        metadata: &EntityMetadata,
        properties: &BTreeMap<String, String>,
    ) -> Result<NodeId> {
        Self::check_properties(metadata, properties)?;

        let conn = self.lock()?;
        self.prepare(&conn, metadata)?;

        let properties_json = serde_json::to_string(properties)?;
        conn.execute(
            "INSERT INTO nodes (entity, properties_json) VALUES (?1, ?2)",
            params![metadata.entity_name(), properties_json],
        )?;
        let id = conn.last_insert_rowid();

        debug!("Inserted {} node {}", metadata.entity_name(), id);
        Ok(id)
    }

    /// Replace the properties of an existing node.
    ///
    /// Returns `false` if no node of the entity has this id.
    pub fn update(
        &self,
        metadata: &EntityMetadata,
        id: NodeId,
        properties: &BTreeMap<String, String>,
    ) -> Result<bool> {
        Self::check_properties(metadata, properties)?;

        let conn = self.lock()?;
        self.prepare(&conn, metadata)?;

        let properties_json = serde_json::to_string(properties)?;
        let rows_affected = conn.execute(
            "UPDATE nodes SET properties_json = ?1 WHERE id = ?2 AND entity = ?3",
            params![properties_json, id, metadata.entity_name()],
        )?;

        if rows_affected > 0 {
            debug!("Updated {} node {}", metadata.entity_name(), id);
        }
        Ok(rows_affected > 0)
    }

    /// Get a node by id, whatever its entity.
    pub fn get(&self, id: NodeId) -> Result<Option<IndexRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, entity, properties_json FROM nodes WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Delete a node by id.
    pub fn delete(&self, id: NodeId) -> Result<bool> {
        let conn = self.lock()?;
        let rows_affected = conn.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;

        if rows_affected > 0 {
            debug!("Deleted node: {}", id);
        }
        Ok(rows_affected > 0)
    }

    /// Rebuild the FTS5 table of an entity from its stored nodes.
    pub fn rebuild(&self, metadata: &EntityMetadata) -> Result<()> {
        let conn = self.lock()?;
        Fts5Manager::new(&self.config, metadata)?.rebuild(&conn)?;
        if let Ok(mut prepared) = self.prepared.lock() {
            prepared.insert(metadata.entity_name().to_string());
        }
        Ok(())
    }

    /// Statistics about the FTS5 table of an entity.
    pub fn stats(&self, metadata: &EntityMetadata) -> Result<Fts5Stats> {
        let conn = self.lock()?;
        Fts5Manager::new(&self.config, metadata)?.get_stats(&conn)
    }

    /// Search index over the nodes of one entity.
    pub fn index(&self, metadata: &EntityMetadata) -> Result<NodeIndex> {
        let conn = self.lock()?;
        self.prepare(&conn, metadata)?;

        let fts = Fts5Manager::new(&self.config, metadata)?;
        Ok(NodeIndex {
            conn: Arc::clone(&self.conn),
            entity: metadata.entity_name().to_string(),
            table_name: fts.has_columns().then(|| fts.table_name().to_string()),
        })
    }
}

impl IndexProvider for NodeStore {
    fn index_for(&self, metadata: &EntityMetadata) -> Result<Arc<dyn SearchIndex>> {
        Ok(Arc::new(self.index(metadata)?))
    }
}

/// Convert a `nodes` row into an index record.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<IndexRecord> {
    let properties_json: String = row.get(2)?;
    let properties = serde_json::from_str(&properties_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(IndexRecord {
        id: row.get(0)?,
        entity: row.get(1)?,
        properties,
    })
}

/// FTS5-backed [`SearchIndex`] for one entity.
pub struct NodeIndex {
    conn: Arc<Mutex<Connection>>,
    entity: String,
    /// `None` when the entity has no indexed properties.
    table_name: Option<String>,
}

impl NodeIndex {
    pub fn entity(&self) -> &str {
        &self.entity
    }

    fn all(&self, conn: &Connection) -> Result<Vec<IndexRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, entity, properties_json FROM nodes WHERE entity = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![self.entity], row_to_record)?;
        collect_rows(rows)
    }
}

/// Collect hits, skipping rows whose stored JSON cannot be decoded.
///
/// Any other error, such as an FTS5 syntax error raised while stepping,
/// fails the whole query.
fn collect_rows(
    rows: impl Iterator<Item = rusqlite::Result<IndexRecord>>,
) -> Result<Vec<IndexRecord>> {
    let mut records = Vec::new();
    for row in rows {
        match row {
            Ok(record) => records.push(record),
            Err(e @ rusqlite::Error::FromSqlConversionFailure(..)) => {
                warn!("Skipping undecodable node row: {}", e)
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(records)
}

impl SearchIndex for NodeIndex {
    fn query(&self, query: &str) -> Result<Vec<IndexRecord>> {
        let start = Instant::now();
        let conn = self.conn.lock().map_err(|_| NodemapError::lock_poisoned())?;

        let records = if query.trim() == QueryConfig::MATCH_ALL_QUERY {
            self.all(&conn)?
        } else {
            let Some(table_name) = &self.table_name else {
                debug!("{} has no full-text table, query {} matches nothing", self.entity, query);
                return Ok(Vec::new());
            };

            let sql = format!(
                "SELECT n.id, n.entity, n.properties_json \
                 FROM {table} JOIN nodes n ON n.id = {table}.rowid \
                 WHERE {table} MATCH ?1 ORDER BY rank",
                table = table_name
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![query], row_to_record)?;
            collect_rows(rows)?
        };

        debug!(
            "Query {} on {} returned {} records in {:.2}ms",
            query,
            self.entity,
            records.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(records)
    }

    fn find_one(&self, property: &str, value: &str) -> Result<Option<IndexRecord>> {
        validate_identifier("property", property)?;

        let conn = self.conn.lock().map_err(|_| NodemapError::lock_poisoned())?;
        let record = conn
            .query_row(
                "SELECT id, entity, properties_json FROM nodes \
                 WHERE entity = ?1 AND json_extract(properties_json, ?2) = ?3 \
                 ORDER BY id LIMIT 1",
                params![self.entity, format!("$.{}", property), value],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityType, PropertyDecl};
    use tempfile::TempDir;

    struct Movie;

    fn movie_meta() -> EntityMetadata {
        EntityMetadata::new(
            EntityType::new::<Movie>("Movie"),
            vec![
                PropertyDecl::indexed("title"),
                PropertyDecl::indexed("category"),
                PropertyDecl::plain("budget"),
            ],
        )
    }

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn seeded_store() -> (NodeStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = NodeStore::new(temp.path().join("db/nodes.db")).unwrap();
        let meta = movie_meta();
        store
            .insert(&meta, &props(&[("title", "Return of the king"), ("category", "long")]))
            .unwrap();
        store
            .insert(&meta, &props(&[("title", "Matrix"), ("category", "scifi")]))
            .unwrap();
        store
            .insert(&meta, &props(&[("title", "The Matrix"), ("category", "scifi")]))
            .unwrap();
        (store, temp)
    }

    #[test]
    fn test_store_creates_parent_dir() {
        let (store, temp) = seeded_store();
        assert!(temp.path().join("db").exists());
        assert_eq!(store.db_path(), Some(temp.path().join("db/nodes.db").as_path()));
    }

    #[test]
    fn test_column_query() {
        let (store, _temp) = seeded_store();
        let index = store.index(&movie_meta()).unwrap();

        let hits = index.query("category:scifi").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|r| r.properties["category"] == "scifi"));

        let hits = index.query("title:Matrix AND category:scifi").unwrap();
        assert_eq!(hits.len(), 2);

        let hits = index.query(r#"title:"the matrix""#).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].properties["title"], "The Matrix");
    }

    #[test]
    fn test_no_hits_is_empty() {
        let (store, _temp) = seeded_store();
        let index = store.index(&movie_meta()).unwrap();
        assert!(index.query("title:Matrix AND category:none").unwrap().is_empty());
        assert!(index.query_one("title:nothing").unwrap().is_none());
    }

    #[test]
    fn test_match_all_in_insert_order() {
        let (store, _temp) = seeded_store();
        let index = store.index(&movie_meta()).unwrap();
        let titles: Vec<_> = index
            .query(QueryConfig::MATCH_ALL_QUERY)
            .unwrap()
            .into_iter()
            .map(|r| r.properties["title"].clone())
            .collect();
        assert_eq!(titles, vec!["Return of the king", "Matrix", "The Matrix"]);
    }

    #[test]
    fn test_malformed_query_is_error() {
        let (store, _temp) = seeded_store();
        let index = store.index(&movie_meta()).unwrap();

        let err = index.query("title:(((").unwrap_err();
        assert!(matches!(err, NodemapError::Database { .. }));
        assert!(!err.is_retryable());
        assert!(index.query("director:Nolan").is_err());
        assert!(index.query("title:*atrix").is_err());
    }

    #[test]
    fn test_corrupt_row_is_skipped() {
        let (store, _temp) = seeded_store();
        store
            .lock()
            .unwrap()
            .execute(
                r#"INSERT INTO nodes (entity, properties_json) VALUES ('Movie', '{"title": 42}')"#,
                [],
            )
            .unwrap();

        let index = store.index(&movie_meta()).unwrap();
        assert_eq!(index.query(QueryConfig::MATCH_ALL_QUERY).unwrap().len(), 3);
    }

    #[test]
    fn test_find_one_exact_value() {
        let (store, _temp) = seeded_store();
        let index = store.index(&movie_meta()).unwrap();

        let hit = index.find_one("title", "Matrix").unwrap().unwrap();
        assert_eq!(hit.properties["category"], "scifi");
        assert!(index.find_one("title", "matrix").unwrap().is_none());
        assert!(index.find_one("bad name", "x").is_err());
    }

    #[test]
    fn test_update_and_delete_resync_index() {
        let (store, _temp) = seeded_store();
        let meta = movie_meta();
        let index = store.index(&meta).unwrap();

        let id = index.find_one("title", "Matrix").unwrap().unwrap().id;
        assert!(store
            .update(&meta, id, &props(&[("title", "Inception"), ("category", "scifi")]))
            .unwrap());
        assert_eq!(index.query("title:Inception").unwrap().len(), 1);

        assert!(store.delete(id).unwrap());
        assert!(index.query("title:Inception").unwrap().is_empty());
        assert!(store.get(id).unwrap().is_none());
        assert!(!store.delete(id).unwrap());
    }

    #[test]
    fn test_undeclared_property_rejected() {
        let store = NodeStore::in_memory().unwrap();
        let err = store
            .insert(&movie_meta(), &props(&[("director", "Nolan")]))
            .unwrap_err();
        assert!(matches!(err, NodemapError::Validation { .. }));
    }

    #[test]
    fn test_rebuild_keeps_rows() {
        let (store, _temp) = seeded_store();
        let meta = movie_meta();
        store.rebuild(&meta).unwrap();
        assert_eq!(store.stats(&meta).unwrap().row_count, 3);
        assert_eq!(store.index(&meta).unwrap().query("category:scifi").unwrap().len(), 2);
    }

    #[test]
    fn test_entity_without_indexed_properties() {
        let store = NodeStore::in_memory().unwrap();
        let meta = EntityMetadata::new(
            EntityType::new::<Movie>("Ledger"),
            vec![PropertyDecl::plain("amount")],
        );
        store.insert(&meta, &props(&[("amount", "3")])).unwrap();

        let index = store.index(&meta).unwrap();
        assert_eq!(index.entity(), "Ledger");
        assert_eq!(index.query(QueryConfig::MATCH_ALL_QUERY).unwrap().len(), 1);
        assert!(index.query("amount:3").unwrap().is_empty());
    }
}
