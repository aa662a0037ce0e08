//! Process-wide cache of entity metadata.

use super::provider::MetadataProvider;
use super::types::{EntityMetadata, EntityType};
use crate::error::{NodemapError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Resolves and memoizes [`EntityMetadata`] per entity type.
///
/// The first resolution of a type introspects it through the provider while
/// holding the write lock, so concurrent callers for the same type wait for
/// the winner and then share its result. Failures are never cached.
pub struct MetadataStore {
    provider: Arc<dyn MetadataProvider>,
    metas: RwLock<HashMap<EntityType, Arc<EntityMetadata>>>,
}

impl MetadataStore {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            metas: RwLock::new(HashMap::new()),
        }
    }

    /// Get the metadata for `entity_type`, building it on first request.
    pub fn resolve(&self, entity_type: &EntityType) -> Result<Arc<EntityMetadata>> {
        {
            let metas = self
                .metas
                .read()
                .map_err(|e| NodemapError::Other(format!("Failed to acquire metadata lock: {}", e)))?;
            if let Some(meta) = metas.get(entity_type) {
                debug!("Metadata cache hit for {}", entity_type);
                return Ok(Arc::clone(meta));
            }
        }

        let mut metas = self
            .metas
            .write()
            .map_err(|e| NodemapError::Other(format!("Failed to acquire metadata lock: {}", e)))?;

        // Another caller may have built it while we waited for the write lock.
        if let Some(meta) = metas.get(entity_type) {
            return Ok(Arc::clone(meta));
        }

        let declarations = self.provider.introspect(entity_type)?;
        if declarations.is_empty() {
            return Err(NodemapError::metadata(
                entity_type.name(),
                "introspection yielded no properties",
            ));
        }

        let meta = Arc::new(EntityMetadata::new(entity_type.clone(), declarations));
        info!(
            "Built metadata for {} ({} properties, {} indexed)",
            entity_type,
            meta.properties().len(),
            meta.indexed_properties().count()
        );
        metas.insert(entity_type.clone(), Arc::clone(&meta));

        Ok(meta)
    }

    /// Whether metadata for `entity_type` is already cached.
    pub fn is_cached(&self, entity_type: &EntityType) -> bool {
        self.metas
            .read()
            .map(|metas| metas.contains_key(entity_type))
            .unwrap_or(false)
    }

    /// Number of cached entity types.
    pub fn len(&self) -> usize {
        self.metas.read().map(|metas| metas.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
