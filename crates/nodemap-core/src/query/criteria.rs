//! Ordered property → value criteria.

use serde::{Deserialize, Serialize};

/// An ordered mapping from property name to search value.
///
/// Insertion order is kept because it decides the order of terms in the
/// compiled query. Re-inserting an existing property replaces its value in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    entries: Vec<(String, String)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria with a single entry.
    pub fn single(property: impl Into<String>, value: impl Into<String>) -> Self {
        let mut criteria = Self::new();
        criteria.insert(property, value);
        criteria
    }

    /// Insert a term, replacing the value if the property is already present.
    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<String>) {
        let property = property.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(p, _)| *p == property) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((property, value)),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(property, value);
        self
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v.as_str()))
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut criteria = Self::new();
        for (property, value) in iter {
            criteria.insert(property, value);
        }
        criteria
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Criteria {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let criteria = Criteria::from([("lastname", "lord"), ("fullname", "chris")]);
        let props: Vec<_> = criteria.properties().collect();
        assert_eq!(props, vec!["lastname", "fullname"]);
    }

    #[test]
    fn test_reinsert_replaces_in_place() {
        let criteria = Criteria::new()
            .with("fullname", "chris")
            .with("lastname", "lord")
            .with("fullname", "angus");

        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria.get("fullname"), Some("angus"));
        assert_eq!(criteria.iter().next(), Some(("fullname", "angus")));
    }
}
