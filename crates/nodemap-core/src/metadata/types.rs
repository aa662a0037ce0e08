//! Entity identity and structural metadata.

use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;

/// Identity of a mapped entity type.
///
/// Combines the Rust type that entities hydrate into with the structural
/// entity name. Concrete structs use one name per type; the generic
/// [`Node`](crate::entity::Node) type is shared by every schema-defined entity
/// and is told apart by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityType {
    type_id: TypeId,
    name: String,
}

impl EntityType {
    /// Entity type for `T` under the given structural name.
    pub fn new<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: name.into(),
        }
    }

    /// Structural entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether entities of this type hydrate into `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A property declaration as reported by a metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDecl {
    pub name: String,
    #[serde(default)]
    pub indexed: bool,
}

impl PropertyDecl {
    pub fn indexed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexed: true,
        }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexed: false,
        }
    }
}

/// Metadata of one declared property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMetadata {
    name: String,
    indexed: bool,
}

impl PropertyMetadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the property participates in the full-text index.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }
}

impl From<PropertyDecl> for PropertyMetadata {
    fn from(decl: PropertyDecl) -> Self {
        Self {
            name: decl.name,
            indexed: decl.indexed,
        }
    }
}

/// Structural description of a mapped entity. Immutable once built.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    entity_type: EntityType,
    properties: Vec<PropertyMetadata>,
}

impl EntityMetadata {
    /// Build metadata from provider declarations, preserving declaration order.
    ///
    /// Later duplicates of a property name are dropped.
    pub fn new(entity_type: EntityType, declarations: Vec<PropertyDecl>) -> Self {
        let mut properties: Vec<PropertyMetadata> = Vec::with_capacity(declarations.len());
        for decl in declarations {
            if properties.iter().all(|p| p.name != decl.name) {
                properties.push(decl.into());
            }
        }

        Self {
            entity_type,
            properties,
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn entity_name(&self) -> &str {
        self.entity_type.name()
    }

    /// All declared properties in declaration order.
    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    pub fn indexed_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| p.indexed)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }
}
