//! Repository facade bound to one entity type.

use crate::config::QueryConfig;
use crate::entity::{Entity, EntityLoader};
use crate::index::{IndexRecord, NodeId, SearchIndex};
use crate::metadata::EntityMetadata;
use crate::naming::{PropertyResolver, Singularizer, SuffixSingularizer};
use crate::query::{compile, Criteria, FinderCall, FinderKind};
use crate::{NodemapError, Result};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a dynamic finder call.
#[derive(Debug, Clone, PartialEq)]
pub enum FinderOutput<E> {
    /// Returned by `findOneBy…` calls.
    One(Option<E>),
    /// Returned by `findBy…` calls.
    Many(Vec<E>),
}

impl<E> FinderOutput<E> {
    /// The single entity of a `findOneBy…` call, or the first of a `findBy…` call.
    pub fn into_one(self) -> Option<E> {
        match self {
            FinderOutput::One(entity) => entity,
            FinderOutput::Many(entities) => entities.into_iter().next(),
        }
    }

    /// All returned entities.
    pub fn into_many(self) -> Vec<E> {
        match self {
            FinderOutput::One(entity) => entity.into_iter().collect(),
            FinderOutput::Many(entities) => entities,
        }
    }
}

/// Finder facade over one entity's index and the entity loader.
///
/// Stateless apart from the collaborators bound at construction.
pub struct Repository<E> {
    metadata: Arc<EntityMetadata>,
    index: Arc<dyn SearchIndex>,
    loader: Arc<dyn EntityLoader>,
    resolver: PropertyResolver<Arc<dyn Singularizer>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    /// Bind a repository to `metadata`, whose entity must hydrate into `E`.
    pub fn new(
        metadata: Arc<EntityMetadata>,
        index: Arc<dyn SearchIndex>,
        loader: Arc<dyn EntityLoader>,
    ) -> Result<Self> {
        Self::with_singularizer(metadata, index, loader, Arc::new(SuffixSingularizer))
    }

    /// Like [`Repository::new`], with a custom finder-token singularizer.
    pub fn with_singularizer(
        metadata: Arc<EntityMetadata>,
        index: Arc<dyn SearchIndex>,
        loader: Arc<dyn EntityLoader>,
        singularizer: Arc<dyn Singularizer>,
    ) -> Result<Self> {
        if !metadata.entity_type().is::<E>() {
            return Err(NodemapError::metadata(
                metadata.entity_name(),
                format!(
                    "entity does not hydrate into {}",
                    std::any::type_name::<E>()
                ),
            ));
        }

        Ok(Self {
            metadata,
            index,
            loader,
            resolver: PropertyResolver::new(singularizer),
            _entity: PhantomData,
        })
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub fn entity_name(&self) -> &str {
        self.metadata.entity_name()
    }

    /// Compile criteria into the query the finders would run.
    pub fn create_query(&self, criteria: &Criteria) -> Result<String> {
        compile(criteria)
    }

    /// Load an entity by id.
    ///
    /// Returns `None` when nothing has this id or when the object found
    /// belongs to another entity type.
    pub fn find(&self, id: NodeId) -> Result<Option<E>> {
        let Some(entity) = self.loader.find_by_id(id)? else {
            return Ok(None);
        };

        if entity.entity_name() != self.entity_name() {
            debug!(
                "Node {} is a {}, not a {}",
                id,
                entity.entity_name(),
                self.entity_name()
            );
            return Ok(None);
        }

        match entity.into_any().downcast::<E>() {
            Ok(entity) => Ok(Some(*entity)),
            Err(_) => {
                warn!(
                    "Node {} of {} did not hydrate into {}",
                    id,
                    self.entity_name(),
                    std::any::type_name::<E>()
                );
                Ok(None)
            }
        }
    }

    /// Every entity of this type, in index order.
    pub fn find_all(&self) -> Result<Vec<E>> {
        let records = self.index.query(QueryConfig::MATCH_ALL_QUERY)?;
        self.hydrate_all(records)
    }

    /// Every entity matching all criteria, in index order.
    pub fn find_by(&self, criteria: &Criteria) -> Result<Vec<E>> {
        let query = self.checked_query(criteria)?;
        let records = self.index.query(&query)?;
        self.hydrate_all(records)
    }

    /// The first entity matching all criteria.
    pub fn find_one_by(&self, criteria: &Criteria) -> Result<Option<E>> {
        let query = self.checked_query(criteria)?;
        self.index
            .query_one(&query)?
            .map(|record| self.hydrate(&record))
            .transpose()
    }

    /// `findBy<Token>(value)`.
    pub fn find_by_property(&self, token: &str, value: &str) -> Result<Vec<E>> {
        let criteria = self.token_criteria(token, value)?;
        self.find_by(&criteria)
    }

    /// `findOneBy<Token>(value)`.
    pub fn find_one_by_property(&self, token: &str, value: &str) -> Result<Option<E>> {
        let criteria = self.token_criteria(token, value)?;
        self.find_one_by(&criteria)
    }

    /// Dispatch a finder by method name, e.g. `call("findOneByTitle", &["Inception"])`.
    ///
    /// The method must be `findBy<Property>` or `findOneBy<Property>` and take
    /// exactly one argument; anything else fails with
    /// [`NodemapError::InvalidDispatch`].
    pub fn call(&self, method: &str, args: &[&str]) -> Result<FinderOutput<E>> {
        let finder = FinderCall::parse(method)?;
        let [value] = args else {
            return Err(NodemapError::InvalidDispatch {
                call: format!("{}({} arguments)", method, args.len()),
            });
        };

        match finder.kind {
            FinderKind::One => self
                .find_one_by_property(&finder.token, value)
                .map(FinderOutput::One),
            FinderKind::Many => self
                .find_by_property(&finder.token, value)
                .map(FinderOutput::Many),
        }
    }

    fn token_criteria(&self, token: &str, value: &str) -> Result<Criteria> {
        let property = self.resolver.resolve(token, &self.metadata)?;
        Ok(Criteria::single(property, value))
    }

    /// Compile criteria after checking every property is indexed.
    fn checked_query(&self, criteria: &Criteria) -> Result<String> {
        for property in criteria.properties() {
            let indexed = self
                .metadata
                .indexed_properties()
                .any(|p| p.name() == property);
            if !indexed {
                return Err(NodemapError::UnindexedProperty {
                    entity: self.entity_name().to_string(),
                    property: property.to_string(),
                    declared: self.metadata.property(property).is_some(),
                });
            }
        }

        compile(criteria)
    }

    fn hydrate_all(&self, records: Vec<IndexRecord>) -> Result<Vec<E>> {
        records.iter().map(|record| self.hydrate(record)).collect()
    }

    fn hydrate(&self, record: &IndexRecord) -> Result<E> {
        let entity = self.loader.load(record)?;
        if entity.entity_name() != self.entity_name() {
            return Err(NodemapError::EntityTypeMismatch {
                expected: self.entity_name().to_string(),
                found: entity.entity_name().to_string(),
            });
        }

        entity
            .into_any()
            .downcast::<E>()
            .map(|entity| *entity)
            .map_err(|_| NodemapError::EntityTypeMismatch {
                expected: std::any::type_name::<E>().to_string(),
                found: record.entity.clone(),
            })
    }
}
