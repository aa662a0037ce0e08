//! nodemap - object-to-graph mapping with metadata-validated finders.
//!
//! Entity types are described by a [`MetadataProvider`] and cached in a
//! [`MetadataStore`]. A [`Repository`] bound to one entity translates finder
//! calls into full-text queries, runs them against a [`SearchIndex`] and
//! hydrates the hits through an [`EntityLoader`].
//!
//! # Example
//!
//! ```rust,no_run
//! use nodemap::{Mapper, MetadataStore, Node, NodeLoader, NodeStore, SchemaProvider};
//! use std::sync::Arc;
//!
//! fn main() -> nodemap::Result<()> {
//!     let schemas = SchemaProvider::new("schema")?;
//!     let store = Arc::new(NodeStore::new("nodemap.db")?);
//!     let mapper = Mapper::new(
//!         Arc::new(MetadataStore::new(Arc::new(schemas))),
//!         store.clone(),
//!         Arc::new(NodeLoader::new(store)),
//!     );
//!
//!     let movies = mapper.repository::<Node>(&nodemap::EntityType::new::<Node>("Movie"))?;
//!     let inception = movies.call("findOneByTitle", &["Inception"])?.into_one();
//!     println!("{:?}", inception);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod index;
pub mod metadata;
pub mod naming;
pub mod query;
pub mod repository;

// Re-export commonly used types
pub use config::{IndexConfig, QueryConfig};
pub use entity::{Entity, EntityLoader, Node, NodeLoader};
pub use error::{NodemapError, Result};
pub use index::{IndexProvider, IndexRecord, NodeId, NodeStore, SearchIndex};
pub use metadata::{
    EntityMetadata, EntityType, MetadataProvider, MetadataStore, PropertyDecl, SchemaProvider,
    StaticMetadataProvider,
};
pub use naming::{PropertyResolver, Singularizer, SuffixSingularizer};
pub use query::{compile, Criteria, FinderCall, FinderKind};
pub use repository::{FinderOutput, Mapper, Repository};
