//! Full-text query compilation.
//!
//! Each criteria entry becomes a `property:value` term and the terms are
//! joined with `AND`:
//! - `{fullname: "chris", lastname: "lord"}` → `fullname:chris AND lastname:lord`
//! - `{fullname: "angus young"}` → `fullname:"angus young"`
//! - `{title: "(+*am* Of +*hron*)"}` → `title:(+*am* Of +*hron*)`
//!
//! Values without whitespace and parenthesized groups pass through untouched,
//! so callers can embed wildcards and boolean groups directly. Quote
//! characters inside a quoted phrase are not escaped.

use super::criteria::Criteria;
use crate::config::QueryConfig;
use crate::error::{NodemapError, Result};
use tracing::debug;

/// Whether `value` is a parenthesized boolean group such as `(+a* Of +b*)`.
fn is_group(value: &str) -> bool {
    let value = value.trim();
    value.len() >= 2 && value.starts_with('(') && value.ends_with(')')
}

/// Build a single `property:value` term.
///
/// Values containing whitespace are quoted as a phrase unless they are a
/// parenthesized group.
pub fn build_term(property: &str, value: &str) -> String {
    if value.trim().contains(char::is_whitespace) && !is_group(value) {
        format!("{}:\"{}\"", property, value)
    } else {
        format!("{}:{}", property, value)
    }
}

/// Compile criteria into one query string, in criteria order.
///
/// Fails with [`NodemapError::EmptyCriteria`] when there are no terms.
pub fn compile(criteria: &Criteria) -> Result<String> {
    if criteria.is_empty() {
        return Err(NodemapError::EmptyCriteria);
    }

    let query = criteria
        .iter()
        .map(|(property, value)| build_term(property, value))
        .collect::<Vec<_>>()
        .join(QueryConfig::TERM_SEPARATOR);

    debug!("Compiled query: {}", query);
    Ok(query)
}
