//! Key filter rules
//!
//! A [`KeyFilter`] decides whether a mapping key (or a query parameter name)
//! holds sensitive data. Rules are either exact names or regular
//! expressions searched against the whole key.

use regex::Regex;
use std::fmt::{self, Display, Formatter};

/// Replacement for redacted values
pub const FILTERED: &str = "[FILTERED]";

/// Exact-name or pattern rule matched against keys
#[derive(Debug, Clone)]
pub enum KeyFilter {
    /// Key must equal this string
    Exact(String),
    /// Pattern must be found somewhere in the key
    Pattern(Regex),
}

impl KeyFilter {
    /// Exact-name rule
    #[inline]
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    /// Compile a pattern rule
    ///
    /// # Errors
    /// Returns error if the pattern is not a valid regex
    pub fn pattern(pattern: &str) -> Result<Self, FilterError> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|source| FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Parse a rule from text: `/regex/` is a pattern, anything else an exact name
    ///
    /// # Errors
    /// Returns error if a `/regex/` rule does not compile
    pub fn parse(rule: &str) -> Result<Self, FilterError> {
        match rule.strip_prefix('/').and_then(|s| s.strip_suffix('/')) {
            Some(pattern) if !pattern.is_empty() => Self::pattern(pattern),
            _ => Ok(Self::exact(rule)),
        }
    }

    /// Check whether `key` is covered by this rule
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Exact(name) => name == key,
            Self::Pattern(regex) => regex.is_match(key),
        }
    }
}

/// Check `key` against a list of rules
#[must_use]
pub fn any_match(filters: &[KeyFilter], key: &str) -> bool {
    filters.iter().any(|f| f.matches(key))
}

impl PartialEq for KeyFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for KeyFilter {}

impl Display for KeyFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl From<&str> for KeyFilter {
    fn from(name: &str) -> Self {
        Self::exact(name)
    }
}

impl From<String> for KeyFilter {
    fn from(name: String) -> Self {
        Self::Exact(name)
    }
}

impl From<Regex> for KeyFilter {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

/// Errors building filter rules
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// Regex failed to compile
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_requires_full_equality() {
        let filter = KeyFilter::exact("abc");
        assert!(filter.matches("abc"));
        assert!(!filter.matches("something_with_abc"));
    }

    #[test]
    fn pattern_searches_key() {
        let filter = KeyFilter::pattern("private").unwrap();
        assert!(filter.matches("private_param"));
        assert!(filter.matches("is_private"));

        let anchored = KeyFilter::pattern("^foo_.*$").unwrap();
        assert!(anchored.matches("foo_param"));
        assert!(!anchored.matches("not_foo_param"));
    }

    #[test]
    fn parse_slash_syntax() {
        assert_eq!(KeyFilter::parse("/^x/").unwrap(), KeyFilter::pattern("^x").unwrap());
        assert_eq!(KeyFilter::parse("password").unwrap(), KeyFilter::exact("password"));
        assert_eq!(KeyFilter::parse("/").unwrap(), KeyFilter::exact("/"));
        assert!(KeyFilter::parse("/(/").is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let filter = KeyFilter::pattern("a+b").unwrap();
        assert_eq!(filter.to_string(), "/a+b/");
        assert_eq!(KeyFilter::parse(&filter.to_string()).unwrap(), filter);
    }

    #[test]
    fn invalid_pattern_error_message() {
        let err = KeyFilter::pattern("[").unwrap_err();
        assert!(err.to_string().starts_with("invalid filter pattern '['"));
    }
}
