//! Domain entities and their hydration from index records.

use crate::index::{IndexRecord, NodeId, NodeStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A hydrated domain object.
pub trait Entity: Any + Send {
    /// Structural name of the entity this object belongs to.
    fn entity_name(&self) -> &str;

    /// Upcast for downcasting to the concrete type.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

/// Turns raw index records into domain objects.
pub trait EntityLoader: Send + Sync {
    /// Hydrate one index record.
    fn load(&self, record: &IndexRecord) -> Result<Box<dyn Entity>>;

    /// Load any entity by identity, regardless of its type.
    fn find_by_id(&self, id: NodeId) -> Result<Option<Box<dyn Entity>>>;
}

/// Generic entity used for schema-defined types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub entity: String,
    pub properties: BTreeMap<String, String>,
}

impl Node {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }
}

impl From<IndexRecord> for Node {
    fn from(record: IndexRecord) -> Self {
        Self {
            id: record.id,
            entity: record.entity,
            properties: record.properties,
        }
    }
}

impl Entity for Node {
    fn entity_name(&self) -> &str {
        &self.entity
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Loader that hydrates every record into a [`Node`].
pub struct NodeLoader {
    store: Arc<NodeStore>,
}

impl NodeLoader {
    pub fn new(store: Arc<NodeStore>) -> Self {
        Self { store }
    }
}

impl EntityLoader for NodeLoader {
    fn load(&self, record: &IndexRecord) -> Result<Box<dyn Entity>> {
        Ok(Box::new(Node::from(record.clone())))
    }

    fn find_by_id(&self, id: NodeId) -> Result<Option<Box<dyn Entity>>> {
        Ok(self
            .store
            .get(id)?
            .map(|record| Box::new(Node::from(record)) as Box<dyn Entity>))
    }
}
