//! Property name resolution for finder tokens.
//!
//! Finder tokens arrive split from a `findBy` / `findOneBy` method name, so
//! they are upper-camel-cased and may be plural (`findByTitles`). Both the
//! token and every declared property are reduced with the same
//! [`Singularizer`] before comparison.

use crate::error::{NodemapError, Result};
use crate::metadata::EntityMetadata;
use std::sync::Arc;
use tracing::debug;

/// Reduces a property name or finder token to its comparison form.
pub trait Singularizer: Send + Sync {
    fn singularize(&self, name: &str) -> String;
}

impl<S: Singularizer + ?Sized> Singularizer for Arc<S> {
    fn singularize(&self, name: &str) -> String {
        (**self).singularize(name)
    }
}

/// Default singularizer: lower-case the first character, then strip one
/// trailing `s`.
///
/// Irregular plurals are not handled: `people` stays `people` and
/// `categories` becomes `categorie`. Callers rely on this exact behavior for
/// property-name collisions, so it is not "fixed" here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixSingularizer;

impl Singularizer for SuffixSingularizer {
    fn singularize(&self, name: &str) -> String {
        let name = lower_first(name);
        match name.strip_suffix('s') {
            Some(stem) => stem.to_string(),
            None => name,
        }
    }
}

/// Lower-case the first character of `name`, leaving the rest untouched.
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Maps finder tokens onto declared, indexed property names.
pub struct PropertyResolver<S = SuffixSingularizer> {
    singularizer: S,
}

impl Default for PropertyResolver<SuffixSingularizer> {
    fn default() -> Self {
        Self::new(SuffixSingularizer)
    }
}

impl<S: Singularizer> PropertyResolver<S> {
    pub fn new(singularizer: S) -> Self {
        Self { singularizer }
    }

    /// Resolve `token` to the declared name of an indexed property.
    ///
    /// The first indexed property (in declaration order) whose singular form
    /// equals the token's singular form wins. Fails with
    /// [`NodemapError::UnindexedProperty`] when nothing matches; `declared`
    /// on the error is set when a non-indexed property would have matched.
    pub fn resolve(&self, token: &str, metadata: &EntityMetadata) -> Result<String> {
        let wanted = self.singularizer.singularize(token.trim());

        if !wanted.is_empty() {
            for property in metadata.indexed_properties() {
                if self.singularizer.singularize(property.name()) == wanted {
                    debug!(
                        "Resolved finder token {} to {}.{}",
                        token,
                        metadata.entity_name(),
                        property.name()
                    );
                    return Ok(property.name().to_string());
                }
            }
        }

        let declared = !wanted.is_empty()
            && metadata
                .properties()
                .iter()
                .any(|p| self.singularizer.singularize(p.name()) == wanted);

        Err(NodemapError::UnindexedProperty {
            entity: metadata.entity_name().to_string(),
            property: if wanted.is_empty() {
                token.to_string()
            } else {
                wanted
            },
            declared,
        })
    }
}
