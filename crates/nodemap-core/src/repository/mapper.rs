//! Entry point that wires metadata, indexes and loading into repositories.

use super::finder::Repository;
use crate::entity::{Entity, EntityLoader};
use crate::index::IndexProvider;
use crate::metadata::{EntityType, MetadataStore};
use crate::naming::{Singularizer, SuffixSingularizer};
use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// Hands out repositories bound to one entity type each.
///
/// Cheap to clone; all clones share the same metadata cache.
#[derive(Clone)]
pub struct Mapper {
    metadata: Arc<MetadataStore>,
    indexes: Arc<dyn IndexProvider>,
    loader: Arc<dyn EntityLoader>,
    singularizer: Arc<dyn Singularizer>,
}

impl Mapper {
    pub fn new(
        metadata: Arc<MetadataStore>,
        indexes: Arc<dyn IndexProvider>,
        loader: Arc<dyn EntityLoader>,
    ) -> Self {
        Self {
            metadata,
            indexes,
            loader,
            singularizer: Arc::new(SuffixSingularizer),
        }
    }

    /// Replace the singularizer used to resolve finder tokens.
    pub fn with_singularizer(mut self, singularizer: Arc<dyn Singularizer>) -> Self {
        self.singularizer = singularizer;
        self
    }

    /// The shared metadata store.
    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }

    /// Repository for `entity_type`, whose entities hydrate into `E`.
    pub fn repository<E: Entity>(&self, entity_type: &EntityType) -> Result<Repository<E>> {
        let metadata = self.metadata.resolve(entity_type)?;
        let index = self.indexes.index_for(&metadata)?;

        debug!("Created repository for {}", entity_type);
        Repository::with_singularizer(
            metadata,
            index,
            Arc::clone(&self.loader),
            Arc::clone(&self.singularizer),
        )
    }
}
