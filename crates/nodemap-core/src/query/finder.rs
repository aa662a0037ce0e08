//! Parser for dynamic finder method names.
//!
//! Grammar: `("findOneBy" | "findBy") PropertyToken`, where the token is
//! non-empty. Anything else is rejected.

use crate::config::QueryConfig;
use crate::error::{NodemapError, Result};

/// What a finder call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinderKind {
    /// `findOneBy…`: at most one entity.
    One,
    /// `findBy…`: every matching entity.
    Many,
}

/// A parsed `findBy<Property>` / `findOneBy<Property>` call name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderCall {
    pub kind: FinderKind,
    /// Property token as written after the prefix, e.g. `Title`.
    pub token: String,
}

impl FinderCall {
    /// Parse a method name into a finder call.
    pub fn parse(method: &str) -> Result<Self> {
        let (kind, token) = if let Some(token) = method.strip_prefix(QueryConfig::FIND_ONE_BY_PREFIX) {
            (FinderKind::One, token)
        } else if let Some(token) = method.strip_prefix(QueryConfig::FIND_BY_PREFIX) {
            (FinderKind::Many, token)
        } else {
            return Err(NodemapError::InvalidDispatch {
                call: method.to_string(),
            });
        };

        if token.is_empty() {
            return Err(NodemapError::InvalidDispatch {
                call: method.to_string(),
            });
        }

        Ok(Self {
            kind,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_find_one_by() {
        let call = FinderCall::parse("findOneByTitle").unwrap();
        assert_eq!(call.kind, FinderKind::One);
        assert_eq!(call.token, "Title");
    }

    #[test]
    fn test_parse_find_by() {
        let call = FinderCall::parse("findByTitles").unwrap();
        assert_eq!(call.kind, FinderKind::Many);
        assert_eq!(call.token, "Titles");
    }

    #[test]
    fn test_parse_rejects_unknown_prefix() {
        for method in ["findSomething", "find", "getByTitle", "FindByTitle", ""] {
            let err = FinderCall::parse(method).unwrap_err();
            assert!(
                matches!(err, NodemapError::InvalidDispatch { ref call } if call == method),
                "{method} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_missing_token() {
        assert!(FinderCall::parse("findBy").is_err());
        assert!(FinderCall::parse("findOneBy").is_err());
    }
}
