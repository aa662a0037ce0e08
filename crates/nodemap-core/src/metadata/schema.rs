//! JSON schema files as a metadata source.
//!
//! Each `.json` file in the schema directory declares one entity:
//!
//! ```json
//! {
//!   "name": "Movie",
//!   "properties": [
//!     { "name": "title", "indexed": true },
//!     { "name": "budget" }
//!   ]
//! }
//! ```
//!
//! Schema entities hydrate into the generic [`Node`] type.

use super::provider::MetadataProvider;
use super::types::{EntityType, PropertyDecl};
use crate::config::PathsConfig;
use crate::entity::Node;
use crate::error::{NodemapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Contents of one schema file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDecl>,
}

impl EntitySchema {
    /// Entity type under which this schema is registered.
    pub fn entity_type(&self) -> EntityType {
        EntityType::new::<Node>(self.name.clone())
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(NodemapError::Config {
                message: format!("Schema in {} has empty name", path.display()),
            });
        }

        let mut seen = HashSet::new();
        for property in &self.properties {
            if property.name.trim().is_empty() {
                return Err(NodemapError::Config {
                    message: format!("Schema '{}' declares a property with empty name", self.name),
                });
            }
            if !seen.insert(property.name.as_str()) {
                return Err(NodemapError::Config {
                    message: format!(
                        "Schema '{}' declares property '{}' twice",
                        self.name, property.name
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Loads entity schemas from a directory of JSON files.
pub struct SchemaProvider {
    schema_dir: PathBuf,
    schemas: Arc<RwLock<HashMap<String, EntitySchema>>>,
}

impl SchemaProvider {
    /// Create a provider for the given directory and load it.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(schema_dir: impl AsRef<Path>) -> Result<Self> {
        let schema_dir = schema_dir.as_ref().to_path_buf();

        if !schema_dir.exists() {
            std::fs::create_dir_all(&schema_dir).map_err(|e| NodemapError::Io {
                message: format!("Failed to create schema directory: {}", e),
                path: Some(schema_dir.clone()),
                source: Some(e),
            })?;
        }

        let provider = Self {
            schema_dir,
            schemas: Arc::new(RwLock::new(HashMap::new())),
        };
        provider.reload()?;

        Ok(provider)
    }

    /// Reload all schema files from disk.
    ///
    /// Files that fail to parse or validate are skipped with a warning.
    /// Entities already resolved by a [`MetadataStore`](super::MetadataStore)
    /// keep their cached metadata.
    pub fn reload(&self) -> Result<usize> {
        let mut schemas = self
            .schemas
            .write()
            .map_err(|e| NodemapError::Other(format!("Failed to acquire schema lock: {}", e)))?;

        schemas.clear();

        let entries = std::fs::read_dir(&self.schema_dir).map_err(|e| NodemapError::Io {
            message: format!("Failed to read schema directory: {}", e),
            path: Some(self.schema_dir.clone()),
            source: Some(e),
        })?;

        let mut loaded_count = 0;

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();

            if path
                .extension()
                .map(|e| e != PathsConfig::SCHEMA_FILE_EXTENSION)
                .unwrap_or(true)
            {
                continue;
            }

            match Self::load_schema_file(&path) {
                Ok(schema) => {
                    info!("Loaded schema: {} ({} properties)", schema.name, schema.properties.len());
                    schemas.insert(schema.name.clone(), schema);
                    loaded_count += 1;
                }
                Err(e) => {
                    warn!("Failed to load schema from {}: {}", path.display(), e);
                }
            }
        }

        debug!(
            "Loaded {} schemas from {}",
            loaded_count,
            self.schema_dir.display()
        );

        Ok(loaded_count)
    }

    fn load_schema_file(path: &Path) -> Result<EntitySchema> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodemapError::io_with_path(e, path))?;

        let schema: EntitySchema = serde_json::from_str(&content).map_err(|e| NodemapError::Json {
            message: format!("Failed to parse schema from {}: {}", path.display(), e),
            source: Some(e),
        })?;

        schema.validate(path)?;
        Ok(schema)
    }

    /// Get a schema by entity name.
    pub fn get(&self, name: &str) -> Option<EntitySchema> {
        self.schemas
            .read()
            .ok()
            .and_then(|schemas| schemas.get(name).cloned())
    }

    /// Names of all loaded entities, sorted.
    pub fn entity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .read()
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }
}

impl MetadataProvider for SchemaProvider {
    fn introspect(&self, entity_type: &EntityType) -> Result<Vec<PropertyDecl>> {
        if !entity_type.is::<Node>() {
            return Err(NodemapError::metadata(
                entity_type.name(),
                "schema entities hydrate into Node only",
            ));
        }

        self.get(entity_type.name())
            .map(|schema| schema.properties)
            .ok_or_else(|| {
                NodemapError::metadata(
                    entity_type.name(),
                    format!("no schema file in {}", self.schema_dir.display()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_schema(dir: &Path, file: &str, content: &str) {
        std::fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn test_load_schemas() {
        let temp = TempDir::new().unwrap();
        write_schema(
            temp.path(),
            "movie.json",
            r#"{"name": "Movie", "properties": [{"name": "title", "indexed": true}, {"name": "budget"}]}"#,
        );
        write_schema(temp.path(), "notes.txt", "not a schema");

        let provider = SchemaProvider::new(temp.path()).unwrap();
        assert_eq!(provider.entity_names(), vec!["Movie".to_string()]);

        let props = provider
            .introspect(&EntityType::new::<Node>("Movie"))
            .unwrap();
        assert_eq!(
            props,
            vec![PropertyDecl::indexed("title"), PropertyDecl::plain("budget")]
        );
    }

    #[test]
    fn test_invalid_schemas_are_skipped() {
        let temp = TempDir::new().unwrap();
        write_schema(temp.path(), "broken.json", "{ not json");
        write_schema(temp.path(), "empty.json", r#"{"name": " "}"#);
        write_schema(
            temp.path(),
            "dupe.json",
            r#"{"name": "Dupe", "properties": [{"name": "a"}, {"name": "a"}]}"#,
        );

        let provider = SchemaProvider::new(temp.path()).unwrap();
        assert!(provider.entity_names().is_empty());
    }

    #[test]
    fn test_unknown_entity_fails() {
        let temp = TempDir::new().unwrap();
        let provider = SchemaProvider::new(temp.path().join("created")).unwrap();
        assert!(provider.schema_dir().exists());

        let err = provider
            .introspect(&EntityType::new::<Node>("Ghost"))
            .unwrap_err();
        assert!(matches!(err, NodemapError::Metadata { .. }));
    }

    #[test]
    fn test_non_node_type_rejected() {
        let temp = TempDir::new().unwrap();
        write_schema(temp.path(), "movie.json", r#"{"name": "Movie"}"#);
        let provider = SchemaProvider::new(temp.path()).unwrap();

        struct Movie;
        assert!(provider
            .introspect(&EntityType::new::<Movie>("Movie"))
            .is_err());
    }
}
