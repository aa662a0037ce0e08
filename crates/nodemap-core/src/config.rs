//! Centralized configuration for nodemap.
//!
//! Query syntax constants, index table settings and schema file conventions.

/// Constants shared by the query compiler and the finder-call parser.
pub struct QueryConfig;

impl QueryConfig {
    /// Separator placed between compiled terms.
    pub const TERM_SEPARATOR: &'static str = " AND ";
    /// Query that selects every node of an entity.
    pub const MATCH_ALL_QUERY: &'static str = "id:*";
    /// Prefix of finder calls returning a collection.
    pub const FIND_BY_PREFIX: &'static str = "findBy";
    /// Prefix of finder calls returning at most one entity.
    pub const FIND_ONE_BY_PREFIX: &'static str = "findOneBy";
}

/// Schema file and database path conventions.
pub struct PathsConfig;

impl PathsConfig {
    pub const SCHEMA_FILE_EXTENSION: &'static str = "json";
    pub const DEFAULT_DATABASE_FILENAME: &'static str = "nodemap.db";
    pub const DEFAULT_SCHEMA_DIR_NAME: &'static str = "schema";
}

/// Configuration for the per-entity FTS5 tables.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Prefix of every FTS5 virtual table; the entity name is appended.
    pub table_prefix: String,
    /// Tokenizer configuration.
    pub tokenizer: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            table_prefix: "node_index".to_string(),
            tokenizer: "unicode61 remove_diacritics 1".to_string(),
        }
    }
}

impl IndexConfig {
    /// Name of the FTS5 table holding the given entity.
    ///
    /// SQLite compares table names case-insensitively, so every upper-case
    /// letter is written as `_` plus its lower-case form and `_` is doubled.
    /// Entity names that differ only in case get distinct tables.
    pub fn table_name(&self, entity_name: &str) -> String {
        let mut name = format!("{}_", self.table_prefix);
        for c in entity_name.chars() {
            if c == '_' {
                name.push_str("__");
            } else if c.is_uppercase() {
                name.push('_');
                name.extend(c.to_lowercase());
            } else {
                name.push(c);
            }
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name() {
        let config = IndexConfig::default();
        assert_eq!(config.table_name("movie"), "node_index_movie");
        assert_eq!(config.table_name("Movie"), "node_index__movie");
        assert_eq!(config.table_name("FindAllUser"), "node_index__find_all_user");
        assert_ne!(config.table_name("a_b"), config.table_name("aB"));
    }
}
