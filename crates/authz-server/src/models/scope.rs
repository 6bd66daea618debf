//! Space-delimited scope sets (RFC 6749 §3.3).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered set of scope tokens.
///
/// Ordering is lexical so the space-joined form is stable across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    /// Parse a space-delimited scope string. Repeated and empty tokens are
    /// collapsed.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(raw.split(' ').filter(|s| !s.is_empty()).map(str::to_owned).collect())
    }

    /// Returns true when no scope is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of scope tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if `scope` is a member.
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// Returns true if every token in `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Tokens of `self` that are missing from `allowed`.
    pub fn not_in<'a>(&'a self, allowed: &'a Self) -> impl Iterator<Item = &'a str> + 'a {
        self.0.difference(&allowed.0).map(String::as_str)
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(scope)?;
            first = false;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).filter(|s: &String| !s.is_empty()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collapses_whitespace() {
        let scopes = ScopeSet::parse("  read  write read ");
        assert_eq!(scopes.len(), 2);
        assert!(scopes.contains("read"));
        assert!(scopes.contains("write"));
    }

    #[test]
    fn test_display_is_space_joined_and_sorted() {
        let scopes = ScopeSet::parse("write read");
        assert_eq!(scopes.to_string(), "read write");
        assert_eq!(ScopeSet::default().to_string(), "");
    }

    #[test]
    fn test_subset_and_difference() {
        let allowed: ScopeSet = ["read", "write"].into_iter().collect();
        let requested = ScopeSet::parse("read admin");
        assert!(!requested.is_subset(&allowed));
        assert_eq!(requested.not_in(&allowed).collect::<Vec<_>>(), vec!["admin"]);
        assert!(ScopeSet::parse("read").is_subset(&allowed));
        assert!(ScopeSet::default().is_subset(&allowed));
    }

    #[test]
    fn test_serde_as_list() {
        let scopes = ScopeSet::parse("b a");
        let json = serde_json::to_value(&scopes).unwrap();
        assert_eq!(json, serde_json::json!(["a", "b"]));
    }
}
