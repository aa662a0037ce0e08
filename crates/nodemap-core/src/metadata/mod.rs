//! Entity metadata resolution and caching.
//!
//! This module provides:
//! - Entity identity and property metadata types
//! - The metadata provider abstraction (in-code and JSON schema sources)
//! - A thread-safe metadata store that builds each entity's metadata once

mod provider;
mod schema;
mod store;
mod types;

pub use provider::{MetadataProvider, StaticMetadataProvider};
pub use schema::{EntitySchema, SchemaProvider};
pub use store::MetadataStore;
pub use types::{EntityMetadata, EntityType, PropertyDecl, PropertyMetadata};
