//! Full-text index abstraction and the SQLite FTS5 node store.
//!
//! This module provides:
//! - The [`SearchIndex`] capability the repository executes queries against
//! - [`NodeStore`], a SQLite node table with one FTS5 table per entity
//! - Identifier validation for names spliced into SQL

mod fts5;
mod node_store;

pub use fts5::{Fts5Manager, Fts5Stats};
pub use node_store::{NodeIndex, NodeStore};

use crate::error::{NodemapError, Result};
use crate::metadata::EntityMetadata;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

/// Identity of a stored node.
pub type NodeId = i64;

/// A raw record returned by a search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub id: NodeId,
    pub entity: String,
    pub properties: BTreeMap<String, String>,
}

/// Full-text search over the nodes of one entity.
pub trait SearchIndex: Send + Sync {
    /// Run a compiled query, returning hits in index order.
    fn query(&self, query: &str) -> Result<Vec<IndexRecord>>;

    /// Run a compiled query and keep only the first hit.
    fn query_one(&self, query: &str) -> Result<Option<IndexRecord>> {
        Ok(self.query(query)?.into_iter().next())
    }

    /// Exact lookup of a stored property value.
    ///
    /// A backend capability for callers holding an index directly.
    /// Repository finders always go through [`SearchIndex::query`], so their
    /// matching follows the index's tokenizer rather than byte equality.
    fn find_one(&self, property: &str, value: &str) -> Result<Option<IndexRecord>>;
}

/// Hands out the search index of an entity.
pub trait IndexProvider: Send + Sync {
    fn index_for(&self, metadata: &EntityMetadata) -> Result<Arc<dyn SearchIndex>>;
}

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Names FTS5 reserves for its own hidden columns.
const RESERVED_COLUMNS: &[&str] = &["rank", "rowid"];

/// Check that `name` can be used as an SQL identifier.
pub(crate) fn validate_identifier(field: &str, name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        return Err(NodemapError::Validation {
            field: field.to_string(),
            message: format!("'{}' is not a valid identifier", name),
        });
    }
    if RESERVED_COLUMNS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(NodemapError::Validation {
            field: field.to_string(),
            message: format!("'{}' is reserved by the full-text index", name),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("property", "title").is_ok());
        assert!(validate_identifier("property", "_full_name2").is_ok());
        assert!(validate_identifier("property", "2fast").is_err());
        assert!(validate_identifier("property", "title; DROP TABLE nodes").is_err());
        assert!(validate_identifier("property", "Rank").is_err());
        assert!(validate_identifier("property", "").is_err());
    }
}
