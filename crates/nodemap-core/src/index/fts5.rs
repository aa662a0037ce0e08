//! FTS5 virtual table setup and management for one entity.
//!
//! Every entity with indexed properties gets its own FTS5 table whose rowid
//! is the node id and whose columns are the indexed properties. Triggers on
//! the `nodes` table keep it in sync.

use super::validate_identifier;
use crate::config::IndexConfig;
use crate::metadata::EntityMetadata;
use crate::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Manager for the FTS5 table of one entity.
pub struct Fts5Manager<'a> {
    config: &'a IndexConfig,
    metadata: &'a EntityMetadata,
    table_name: String,
}

impl<'a> Fts5Manager<'a> {
    /// Create a manager, validating every name that ends up in SQL.
    pub fn new(config: &'a IndexConfig, metadata: &'a EntityMetadata) -> Result<Self> {
        validate_identifier("entity", metadata.entity_name())?;
        for property in metadata.indexed_properties() {
            validate_identifier("property", property.name())?;
        }

        Ok(Self {
            config,
            metadata,
            table_name: config.table_name(metadata.entity_name()),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn columns(&self) -> Vec<&str> {
        self.metadata.indexed_properties().map(|p| p.name()).collect()
    }

    /// Whether the entity has anything to index.
    pub fn has_columns(&self) -> bool {
        self.metadata.indexed_properties().next().is_some()
    }

    /// Check if the FTS5 table exists.
    pub fn table_exists(&self, conn: &Connection) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [&self.table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Check if the FTS5 triggers exist.
    pub fn triggers_exist(&self, conn: &Connection) -> Result<bool> {
        let trigger_name = format!("{}_ai", self.table_name);
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='trigger' AND name=?1",
            [&trigger_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Columns of the existing FTS5 table, in declaration order.
    pub fn table_columns(&self, conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
            .query_map([&self.table_name], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // FTS5 declares hidden columns named after the table and `rank`.
        Ok(names
            .into_iter()
            .filter(|name| name != &self.table_name && name != "rank")
            .collect())
    }

    /// Ensure the FTS5 table and its triggers are set up.
    ///
    /// Entities without indexed properties get no table. A table whose
    /// columns no longer match the indexed properties is rebuilt.
    pub fn ensure_setup(&self, conn: &Connection) -> Result<()> {
        if !self.has_columns() {
            debug!("{} has no indexed properties, skipping FTS5 setup", self.metadata.entity_name());
            return Ok(());
        }

        if !self.table_exists(conn)? {
            self.create_table(conn)?;
            self.populate_from_nodes(conn)?;
        } else if self.table_columns(conn)? != self.columns() {
            info!(
                "Indexed properties of {} changed, rebuilding {}",
                self.metadata.entity_name(),
                self.table_name
            );
            return self.rebuild(conn);
        } else if !self.triggers_exist(conn)? {
            // Table exists but triggers missing - rebuild
            self.populate_from_nodes(conn)?;
        }

        self.create_triggers(conn)?;
        Ok(())
    }

    /// Create the FTS5 virtual table.
    pub fn create_table(&self, conn: &Connection) -> Result<()> {
        let sql = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5({}, tokenize='{}')",
            self.table_name,
            self.columns().join(", "),
            self.config.tokenizer
        );

        conn.execute(&sql, [])?;
        info!("Created FTS5 table: {}", self.table_name);
        Ok(())
    }

    /// `json_extract` expressions for every column, reading from `source`.
    fn extract_list(&self, source: &str) -> String {
        self.columns()
            .iter()
            .map(|column| format!("json_extract({}.properties_json, '$.{}')", source, column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Create triggers to keep the FTS5 table in sync with `nodes`.
    pub fn create_triggers(&self, conn: &Connection) -> Result<()> {
        let table = &self.table_name;
        let entity = self.metadata.entity_name();
        let columns = self.columns().join(", ");

        let insert_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {table}_ai AFTER INSERT ON nodes
             WHEN NEW.entity = '{entity}' BEGIN
                INSERT INTO {table} (rowid, {columns}) VALUES (NEW.id, {values});
            END",
            values = self.extract_list("NEW"),
        );
        conn.execute(&insert_trigger, [])?;

        let update_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {table}_au AFTER UPDATE ON nodes
             WHEN NEW.entity = '{entity}' BEGIN
                DELETE FROM {table} WHERE rowid = OLD.id;
                INSERT INTO {table} (rowid, {columns}) VALUES (NEW.id, {values});
            END",
            values = self.extract_list("NEW"),
        );
        conn.execute(&update_trigger, [])?;

        let delete_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {table}_ad AFTER DELETE ON nodes
             WHEN OLD.entity = '{entity}' BEGIN
                DELETE FROM {table} WHERE rowid = OLD.id;
            END"
        );
        conn.execute(&delete_trigger, [])?;

        debug!("Created FTS5 triggers for {}", table);
        Ok(())
    }

    /// Populate the FTS5 table from existing nodes of the entity.
    pub fn populate_from_nodes(&self, conn: &Connection) -> Result<()> {
        let table = &self.table_name;

        conn.execute_batch(&format!("DELETE FROM {};", table))?;

        let sql = format!(
            "INSERT INTO {} (rowid, {}) SELECT n.id, {} FROM nodes n WHERE n.entity = ?1",
            table,
            self.columns().join(", "),
            self.extract_list("n")
        );
        let inserted = conn.execute(&sql, [self.metadata.entity_name()])?;

        info!("Populated {} from {} nodes", table, inserted);
        Ok(())
    }

    /// Drop and recreate the FTS5 table and triggers.
    pub fn rebuild(&self, conn: &Connection) -> Result<()> {
        conn.execute(&format!("DROP TABLE IF EXISTS {}", self.table_name), [])?;
        for suffix in ["ai", "au", "ad"] {
            conn.execute(
                &format!("DROP TRIGGER IF EXISTS {}_{}", self.table_name, suffix),
                [],
            )?;
        }

        if self.has_columns() {
            self.create_table(conn)?;
            self.create_triggers(conn)?;
            self.populate_from_nodes(conn)?;
        }

        info!("Rebuilt FTS5 index for {}", self.metadata.entity_name());
        Ok(())
    }

    /// Get statistics about the FTS5 table.
    pub fn get_stats(&self, conn: &Connection) -> Result<Fts5Stats> {
        let row_count: usize = if self.table_exists(conn)? {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", self.table_name),
                [],
                |row| row.get(0),
            )?
        } else {
            0
        };

        Ok(Fts5Stats {
            table_name: self.table_name.clone(),
            row_count,
            columns: self.columns().iter().map(|c| c.to_string()).collect(),
        })
    }
}

/// Statistics about an entity's FTS5 table.
#[derive(Debug, Clone)]
pub struct Fts5Stats {
    pub table_name: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityType, PropertyDecl};
    use tempfile::TempDir;

    struct Movie;

    fn create_test_db() -> (Connection, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        conn.execute(
            "CREATE TABLE nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity TEXT NOT NULL,
                properties_json TEXT NOT NULL
            )",
            [],
        )
        .unwrap();
        (conn, temp_dir)
    }

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

    #[test]
    fn test_fts5_setup() {
        let (conn, _temp) = create_test_db();
        let config = IndexConfig::default();
        let meta = movie_meta();
        let manager = Fts5Manager::new(&config, &meta).unwrap();

        assert!(!manager.table_exists(&conn).unwrap());
        manager.ensure_setup(&conn).unwrap();
        assert!(manager.table_exists(&conn).unwrap());
        assert!(manager.triggers_exist(&conn).unwrap());
        assert_eq!(manager.table_name(), "node_index__movie");
        assert_eq!(manager.table_columns(&conn).unwrap(), vec!["title", "category"]);
    }

    #[test]
    fn test_fts5_triggers_follow_entity() {
        let (conn, _temp) = create_test_db();
        let config = IndexConfig::default();
        let meta = movie_meta();
        let manager = Fts5Manager::new(&config, &meta).unwrap();
        manager.ensure_setup(&conn).unwrap();

        conn.execute(
            "INSERT INTO nodes (entity, properties_json) VALUES (?1, ?2)",
            ["Movie", r#"{"title": "Return of the king", "category": "long", "budget": "9"}"#],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO nodes (entity, properties_json) VALUES (?1, ?2)",
            ["Person", r#"{"title": "Sir"}"#],
        )
        .unwrap();

        let stats = manager.get_stats(&conn).unwrap();
        assert_eq!(stats.row_count, 1);
        assert_eq!(stats.columns, vec!["title", "category"]);

        let title: String = conn
            .query_row(
                "SELECT title FROM node_index__movie WHERE node_index__movie MATCH 'king'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(title, "Return of the king");

        conn.execute("DELETE FROM nodes WHERE entity = 'Movie'", []).unwrap();
        assert_eq!(manager.get_stats(&conn).unwrap().row_count, 0);
    }

    #[test]
    fn test_fts5_populates_existing_nodes() {
        let (conn, _temp) = create_test_db();
        conn.execute(
            "INSERT INTO nodes (entity, properties_json) VALUES ('Movie', '{\"title\": \"Matrix\"}')",
            [],
        )
        .unwrap();

        let config = IndexConfig::default();
        let meta = movie_meta();
        let manager = Fts5Manager::new(&config, &meta).unwrap();
        manager.ensure_setup(&conn).unwrap();
        assert_eq!(manager.get_stats(&conn).unwrap().row_count, 1);

        manager.rebuild(&conn).unwrap();
        assert_eq!(manager.get_stats(&conn).unwrap().row_count, 1);
    }

    #[test]
    fn test_changed_indexed_properties_rebuild_table() {
        let (conn, _temp) = create_test_db();
        let config = IndexConfig::default();
        let before = EntityMetadata::new(
            EntityType::new::<Movie>("Movie"),
            vec![PropertyDecl::indexed("title"), PropertyDecl::plain("category")],
        );
        Fts5Manager::new(&config, &before)
            .unwrap()
            .ensure_setup(&conn)
            .unwrap();
        conn.execute(
            "INSERT INTO nodes (entity, properties_json) VALUES (?1, ?2)",
            ["Movie", r#"{"title": "Heat", "category": "crime"}"#],
        )
        .unwrap();

        let after = movie_meta();
        let manager = Fts5Manager::new(&config, &after).unwrap();
        manager.ensure_setup(&conn).unwrap();
        assert_eq!(manager.table_columns(&conn).unwrap(), vec!["title", "category"]);

        let title: String = conn
            .query_row(
                "SELECT title FROM node_index__movie WHERE node_index__movie MATCH 'category:crime'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(title, "Heat");
    }

    #[test]
    fn test_entities_differing_in_case_get_own_tables() {
        let (conn, _temp) = create_test_db();
        let config = IndexConfig::default();
        let upper = movie_meta();
        let lower = EntityMetadata::new(
            EntityType::new::<Movie>("movie"),
            vec![PropertyDecl::indexed("name")],
        );
        let upper_manager = Fts5Manager::new(&config, &upper).unwrap();
        let lower_manager = Fts5Manager::new(&config, &lower).unwrap();
        upper_manager.ensure_setup(&conn).unwrap();
        lower_manager.ensure_setup(&conn).unwrap();
        assert_ne!(upper_manager.table_name(), lower_manager.table_name());

        conn.execute(
            "INSERT INTO nodes (entity, properties_json) VALUES (?1, ?2)",
            ["movie", r#"{"name": "Zed"}"#],
        )
        .unwrap();
        assert_eq!(lower_manager.get_stats(&conn).unwrap().row_count, 1);
        assert_eq!(upper_manager.get_stats(&conn).unwrap().row_count, 0);
    }

    #[test]
    fn test_no_indexed_properties_skips_table() {
        let (conn, _temp) = create_test_db();
        let config = IndexConfig::default();
        let meta = EntityMetadata::new(
            EntityType::new::<Movie>("Movie"),
            vec![PropertyDecl::plain("budget")],
        );
        let manager = Fts5Manager::new(&config, &meta).unwrap();
        manager.ensure_setup(&conn).unwrap();
        assert!(!manager.table_exists(&conn).unwrap());
        assert_eq!(manager.get_stats(&conn).unwrap().row_count, 0);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let config = IndexConfig::default();
        let meta = EntityMetadata::new(
            EntityType::new::<Movie>("Movie"),
            vec![PropertyDecl::indexed("bad name")],
        );
        assert!(Fts5Manager::new(&config, &meta).is_err());
    }
}
