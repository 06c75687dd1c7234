//! Line rewrite filters
//!
//! Filters run in registration order over every parsed frame. Each one may
//! rewrite the frame or return `None` to drop it from the backtrace.

use crate::line::BacktraceLine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Label substituted for the project root
pub const PROJECT_ROOT_LABEL: &str = "[PROJECT_ROOT]";

/// Label substituted for dependency source roots
pub const DEPENDENCY_ROOT_LABEL: &str = "[DEPENDENCY_ROOT]";

/// Rewrite or drop a parsed frame
pub trait LineFilter: Send + Sync {
    /// Return the (possibly rewritten) frame, or `None` to drop it
    fn apply(&self, line: BacktraceLine) -> Option<BacktraceLine>;
}

impl<F> LineFilter for F
where
    F: Fn(BacktraceLine) -> Option<BacktraceLine> + Send + Sync,
{
    fn apply(&self, line: BacktraceLine) -> Option<BacktraceLine> {
        self(line)
    }
}

/// Reference-counted filter, as stored in configuration
pub type SharedLineFilter = Arc<dyn LineFilter>;

/// Replace a leading path prefix with a label
#[derive(Debug, Clone)]
pub struct PathPrefixFilter {
    prefix: String,
    label: String,
}

impl PathPrefixFilter {
    /// Create a filter; trailing separators on `prefix` are ignored
    pub fn new(prefix: impl AsRef<str>, label: impl Into<String>) -> Self {
        Self {
            prefix: prefix.as_ref().trim_end_matches(['/', '\\']).to_string(),
            label: label.into(),
        }
    }

    /// Project-root substitution
    pub fn project_root(root: impl AsRef<str>) -> Self {
        Self::new(root, PROJECT_ROOT_LABEL)
    }

    /// Dependency-root substitution
    pub fn dependency_root(root: impl AsRef<str>) -> Self {
        Self::new(root, DEPENDENCY_ROOT_LABEL)
    }

    fn rewrite(&self, file: &str) -> Option<String> {
        if self.prefix.is_empty() {
            return None;
        }
        let rest = file.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with(['/', '\\']) {
            Some(format!("{}{rest}", self.label))
        } else {
            None
        }
    }
}

impl LineFilter for PathPrefixFilter {
    fn apply(&self, mut line: BacktraceLine) -> Option<BacktraceLine> {
        if let Some(rewritten) = line.file.as_deref().and_then(|f| self.rewrite(f)) {
            line.file = Some(rewritten);
        }
        Some(line)
    }
}

/// Strip a leading `./` from file paths
#[derive(Debug, Clone, Copy, Default)]
pub struct StripCurrentDir;

impl LineFilter for StripCurrentDir {
    fn apply(&self, mut line: BacktraceLine) -> Option<BacktraceLine> {
        if let Some(stripped) = line.file.as_deref().and_then(|f| f.strip_prefix("./")) {
            line.file = Some(stripped.to_string());
        }
        Some(line)
    }
}

/// Drop frames whose file matches a pattern
#[derive(Debug, Clone)]
pub struct DropFiles(Regex);

impl DropFiles {
    /// Drop frames whose file matches `regex`
    #[inline]
    #[must_use]
    pub fn new(regex: Regex) -> Self {
        Self(regex)
    }
}

impl LineFilter for DropFiles {
    fn apply(&self, line: BacktraceLine) -> Option<BacktraceLine> {
        match &line.file {
            Some(file) if self.0.is_match(file) => None,
            _ => Some(line),
        }
    }
}

#[allow(clippy::expect_used)]
static OWN_SOURCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"faultline-(?:backtrace|sanitize|notice)(?:-[0-9][^/\\]*)?[/\\]src[/\\]")
        .expect("own-sources pattern is valid")
});

/// Drop frames that originate in the notifier's own crates
#[must_use]
pub fn own_frames_filter() -> DropFiles {
    DropFiles::new(OWN_SOURCES.clone())
}

/// Built-in filter chain
///
/// Order: project root, `./` strip, dependency roots, own frames.
#[must_use]
pub fn default_filters(project_root: Option<&str>, dependency_roots: &[String]) -> Vec<SharedLineFilter> {
    let mut filters: Vec<SharedLineFilter> = Vec::with_capacity(dependency_roots.len() + 3);
    if let Some(root) = project_root.filter(|r| !r.trim().is_empty()) {
        filters.push(Arc::new(PathPrefixFilter::project_root(root)));
    }
    filters.push(Arc::new(StripCurrentDir));
    for root in dependency_roots {
        filters.push(Arc::new(PathPrefixFilter::dependency_root(root)));
    }
    filters.push(Arc::new(own_frames_filter()));
    filters
}
