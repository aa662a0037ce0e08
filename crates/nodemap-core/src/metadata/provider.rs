//! Metadata provider abstraction.

use super::types::{EntityType, PropertyDecl};
use crate::error::{NodemapError, Result};
use std::collections::HashMap;
use std::sync::RwLock;

/// Source of structural metadata for entity types.
///
/// Implementations may read declarative configuration, code-generated tables
/// or anything else that can list an entity's properties.
pub trait MetadataProvider: Send + Sync {
    /// List the declared properties of `entity_type`.
    ///
    /// Fails with [`NodemapError::Metadata`] when the type is unknown.
    fn introspect(&self, entity_type: &EntityType) -> Result<Vec<PropertyDecl>>;
}

/// Provider backed by in-code registrations.
#[derive(Default)]
pub struct StaticMetadataProvider {
    entities: RwLock<HashMap<EntityType, Vec<PropertyDecl>>>,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the properties of an entity type.
    pub fn register(&self, entity_type: EntityType, properties: Vec<PropertyDecl>) -> Result<()> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| NodemapError::Other(format!("Failed to acquire provider lock: {}", e)))?;
        entities.insert(entity_type, properties);
        Ok(())
    }

    /// Builder-style registration.
    pub fn with(self, entity_type: EntityType, properties: Vec<PropertyDecl>) -> Result<Self> {
        self.register(entity_type, properties)?;
        Ok(self)
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn introspect(&self, entity_type: &EntityType) -> Result<Vec<PropertyDecl>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| NodemapError::Other(format!("Failed to acquire provider lock: {}", e)))?;

        entities
            .get(entity_type)
            .cloned()
            .ok_or_else(|| NodemapError::metadata(entity_type.name(), "entity type is not registered"))
    }
}
