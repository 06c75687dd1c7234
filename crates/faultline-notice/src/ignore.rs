//! Ignore engine
//!
//! Decides whether a built notice should be suppressed. Evaluation order,
//! first match wins:
//! 1. ignore entries (name, pattern or type) against the error class
//! 2. predicate filters against the whole notice
//! 3. user-agent rules against `cgi_data["HTTP_USER_AGENT"]`

use crate::config::Configuration;
use crate::exception::ErrorType;
use crate::notice::Notice;
use faultline_sanitize::{any_match, FilterError, KeyFilter};
use regex::Regex;
use std::fmt::{self, Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Framework-noise error classes ignored by default
pub const DEFAULT_IGNORED: &[&str] = &[
    "ActiveRecord::RecordNotFound",
    "AbstractController::ActionNotFound",
    "ActionController::RoutingError",
    "ActionController::InvalidAuthenticityToken",
    "CGI::Session::CookieStore::TamperedWithCookie",
    "ActionController::UnknownAction",
];

/// CGI variable holding the client's user agent
pub const USER_AGENT_KEY: &str = "HTTP_USER_AGENT";

/// One ignore-list entry
#[derive(Debug, Clone)]
pub enum IgnoreEntry {
    /// Class name: equal to the error class, or naming an ancestor of the exception
    Name(String),
    /// Pattern searched in the error class
    Pattern(Regex),
    /// Class reference: the exception is this type or descends from it
    Type(ErrorType),
}

impl IgnoreEntry {
    /// Name entry
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Compile a pattern entry
    ///
    /// # Errors
    /// Returns error if the pattern is not a valid regex
    pub fn pattern(pattern: &str) -> Result<Self, FilterError> {
        match KeyFilter::pattern(pattern)? {
            KeyFilter::Pattern(regex) => Ok(Self::Pattern(regex)),
            KeyFilter::Exact(name) => Ok(Self::Name(name)),
        }
    }

    /// Type entry for the Rust type `E`
    #[must_use]
    pub fn of<E: 'static>() -> Self {
        Self::Type(ErrorType::of::<E>())
    }

    /// Parse text: `/regex/` is a pattern, anything else a name
    ///
    /// # Errors
    /// Returns error if a `/regex/` entry does not compile
    pub fn parse(rule: &str) -> Result<Self, FilterError> {
        Ok(match KeyFilter::parse(rule)? {
            KeyFilter::Exact(name) => Self::Name(name),
            KeyFilter::Pattern(regex) => Self::Pattern(regex),
        })
    }

    /// Check this entry against an error class and the exception's lineage
    ///
    /// `lineage` is empty when the notice was built without an exception.
    #[must_use]
    pub fn matches(&self, error_class: &str, lineage: &[ErrorType]) -> bool {
        match self {
            Self::Name(name) => name == error_class || lineage.iter().any(|t| t.name() == name),
            Self::Pattern(regex) => regex.is_match(error_class),
            Self::Type(kind) => {
                if lineage.is_empty() {
                    kind.name() == error_class
                } else {
                    lineage.iter().any(|t| t.same_as(kind))
                }
            }
        }
    }
}

impl PartialEq for IgnoreEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Name(a), Self::Name(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            (Self::Type(a), Self::Type(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for IgnoreEntry {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for IgnoreEntry {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Regex> for IgnoreEntry {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

impl From<ErrorType> for IgnoreEntry {
    fn from(kind: ErrorType) -> Self {
        Self::Type(kind)
    }
}

/// Default ignore list
#[must_use]
pub fn default_ignore() -> Vec<IgnoreEntry> {
    DEFAULT_IGNORED.iter().map(|name| IgnoreEntry::from(*name)).collect()
}

/// Predicate deciding whether a built notice is ignored
pub trait IgnoreFilter: Send + Sync {
    /// Return `true` to suppress the notice
    fn ignore(&self, notice: &Notice) -> bool;
}

impl<F> IgnoreFilter for F
where
    F: Fn(&Notice) -> bool + Send + Sync,
{
    fn ignore(&self, notice: &Notice) -> bool {
        self(notice)
    }
}

/// Reference-counted predicate, as stored in configuration
pub type SharedIgnoreFilter = Arc<dyn IgnoreFilter>;

/// Borrowed view of every ignore rule
#[derive(Clone, Copy, Default)]
pub struct IgnoreRules<'a> {
    entries: &'a [IgnoreEntry],
    filters: &'a [SharedIgnoreFilter],
    user_agents: &'a [KeyFilter],
}

impl<'a> IgnoreRules<'a> {
    /// Rules from entries and predicates
    #[inline]
    #[must_use]
    pub fn new(entries: &'a [IgnoreEntry], filters: &'a [SharedIgnoreFilter]) -> Self {
        Self {
            entries,
            filters,
            user_agents: &[],
        }
    }

    /// With user-agent rules
    #[inline]
    #[must_use]
    pub fn with_user_agents(mut self, user_agents: &'a [KeyFilter]) -> Self {
        self.user_agents = user_agents;
        self
    }

    /// Rules configured on `config`
    #[must_use]
    pub fn from_config(config: &'a Configuration) -> Self {
        Self::new(&config.ignore, &config.ignore_by_filters).with_user_agents(&config.ignore_user_agent)
    }
}

impl Debug for IgnoreRules<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("entries", &self.entries)
            .field("filters", &self.filters.len())
            .field("user_agents", &self.user_agents)
            .finish()
    }
}

/// Decide whether `notice` should be suppressed
#[must_use]
pub fn should_ignore(notice: &Notice, rules: &IgnoreRules<'_>) -> bool {
    if let Some(entry) = rules
        .entries
        .iter()
        .find(|e| e.matches(&notice.error_class, notice.lineage()))
    {
        tracing::debug!(error_class = %notice.error_class, ?entry, "notice ignored by class");
        return true;
    }

    for filter in rules.filters {
        match catch_unwind(AssertUnwindSafe(|| filter.ignore(notice))) {
            Ok(true) => {
                tracing::debug!(error_class = %notice.error_class, "notice ignored by filter");
                return true;
            }
            Ok(false) => {}
            Err(_) => tracing::warn!(error_class = %notice.error_class, "ignore filter panicked"),
        }
    }

    if let Some(agent) = notice.cgi_data.get(USER_AGENT_KEY).and_then(|v| v.as_str()) {
        if any_match(rules.user_agents, agent) {
            tracing::debug!(user_agent = agent, "notice ignored by user agent");
            return true;
        }
    }

    false
}
