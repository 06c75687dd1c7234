//! Notifier configuration
//!
//! [`Configuration`] is built once per process and read by every notice
//! build. [`FileSettings`] is its data-only subset, loadable from TOML.

use crate::delivery::{DeliveryGateway, Dispatch, SharedGateway};
use crate::error::ConfigError;
use crate::fingerprint::Fingerprint;
use crate::ignore::{default_ignore, IgnoreEntry, IgnoreFilter, SharedIgnoreFilter};
use crate::notice::Notice;
use faultline_backtrace::{
    own_frames_filter, BacktraceLine, LineFilter, PathPrefixFilter, SharedLineFilter, StripCurrentDir,
};
use faultline_sanitize::{KeyFilter, DEFAULT_MAX_DEPTH};
use serde::Deserialize;
use std::fmt::{self, Debug, Formatter};
use std::path::Path;
use std::sync::Arc;

/// Notifier name reported in every notice
pub const NOTIFIER_NAME: &str = "faultline";
/// Project URL reported in every notice
pub const NOTIFIER_URL: &str = "https://github.com/example/faultline";
/// Default error message byte limit
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024;
/// Default source extract radius
pub const DEFAULT_SOURCE_EXTRACT_RADIUS: usize = 2;
/// Parameter names filtered by default
pub const DEFAULT_PARAMS_FILTERS: &[&str] = &["password", "password_confirmation"];

/// Hook run on the fully built notice before serialization
pub type PostBuildHook = dyn Fn(&mut Notice) + Send + Sync;

/// One entry in the backtrace filter chain
///
/// Built-in entries are resolved against the configuration when a notice is
/// built, so later changes to the project root still apply.
#[derive(Clone)]
pub enum BacktraceFilter {
    /// Replace the project root with `[PROJECT_ROOT]`
    ProjectRoot,
    /// Strip a leading `./`
    StripCurrentDir,
    /// Replace each dependency root with `[DEPENDENCY_ROOT]`
    DependencyRoots,
    /// Drop frames from the notifier's own crates
    OwnFrames,
    /// User-supplied filter
    Custom(SharedLineFilter),
}

impl Debug for BacktraceFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectRoot => f.write_str("ProjectRoot"),
            Self::StripCurrentDir => f.write_str("StripCurrentDir"),
            Self::DependencyRoots => f.write_str("DependencyRoots"),
            Self::OwnFrames => f.write_str("OwnFrames"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Built-in backtrace filter chain
#[must_use]
pub fn default_backtrace_filters() -> Vec<BacktraceFilter> {
    vec![
        BacktraceFilter::ProjectRoot,
        BacktraceFilter::StripCurrentDir,
        BacktraceFilter::DependencyRoots,
        BacktraceFilter::OwnFrames,
    ]
}

/// Notifier configuration
#[derive(Clone)]
pub struct Configuration {
    /// Project API key
    pub api_key: Option<String>,
    /// Application root; frames under it are application frames
    pub project_root: Option<String>,
    /// Deployment environment
    pub environment_name: Option<String>,
    /// Reporting host
    pub hostname: String,
    /// Notifier name
    pub notifier_name: String,
    /// Notifier version
    pub notifier_version: String,
    /// Notifier project URL
    pub notifier_url: String,
    /// Keys whose values are redacted
    pub params_filters: Vec<KeyFilter>,
    /// Backtrace filter chain
    pub backtrace_filters: Vec<BacktraceFilter>,
    /// Paths replaced by `[DEPENDENCY_ROOT]`
    pub dependency_roots: Vec<String>,
    /// Ignore list
    pub ignore: Vec<IgnoreEntry>,
    /// Ignore predicates
    pub ignore_by_filters: Vec<SharedIgnoreFilter>,
    /// Ignored user agents
    pub ignore_user_agent: Vec<KeyFilter>,
    /// Lines on each side of the application frame in the source extract
    pub source_extract_radius: usize,
    /// Whether session data is reported
    pub send_request_session: bool,
    /// Error message byte limit
    pub max_error_message_bytes: usize,
    /// Sanitizer nesting limit
    pub max_depth: usize,
    /// Environments where notices are not delivered
    pub development_environments: Vec<String>,
    /// Fingerprint source
    pub fingerprint: Option<Fingerprint>,
    /// Post-build hook
    pub notice_post_build: Option<Arc<PostBuildHook>>,
    /// Delivery gateway
    pub sender: Option<SharedGateway>,
    /// Dispatch policy for delivery
    pub dispatch: Dispatch,
    /// Verbose logging of delivered payloads
    pub debug: bool,
}

impl Configuration {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// With project root
    #[inline]
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<String>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// With environment name
    #[inline]
    #[must_use]
    pub fn with_environment_name(mut self, name: impl Into<String>) -> Self {
        self.environment_name = Some(name.into());
        self
    }

    /// With hostname
    #[inline]
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// With params filters, replacing the defaults
    #[must_use]
    pub fn with_params_filters<I, F>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<KeyFilter>,
    {
        self.params_filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// With source extract radius
    #[inline]
    #[must_use]
    pub fn with_source_extract_radius(mut self, radius: usize) -> Self {
        self.source_extract_radius = radius;
        self
    }

    /// With session reporting toggled
    #[inline]
    #[must_use]
    pub fn with_send_request_session(mut self, send: bool) -> Self {
        self.send_request_session = send;
        self
    }

    /// With fingerprint source
    #[inline]
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<Fingerprint>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// With post-build hook
    #[must_use]
    pub fn with_notice_post_build<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Notice) + Send + Sync + 'static,
    {
        self.notice_post_build = Some(Arc::new(hook));
        self
    }

    /// With delivery gateway
    #[must_use]
    pub fn with_sender(mut self, sender: impl DeliveryGateway + 'static) -> Self {
        self.sender = Some(Arc::new(sender));
        self
    }

    /// With dispatch policy
    #[inline]
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// With debug logging
    #[inline]
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replace the ignore list
    pub fn ignore_only<I, E>(&mut self, entries: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<IgnoreEntry>,
    {
        self.ignore = entries.into_iter().map(Into::into).collect();
    }

    /// Replace the ignored user agents
    pub fn ignore_user_agent_only<I, F>(&mut self, agents: I)
    where
        I: IntoIterator<Item = F>,
        F: Into<KeyFilter>,
    {
        self.ignore_user_agent = agents.into_iter().map(Into::into).collect();
    }

    /// Append a backtrace filter
    pub fn filter_backtrace<F>(&mut self, filter: F)
    where
        F: Fn(BacktraceLine) -> Option<BacktraceLine> + Send + Sync + 'static,
    {
        self.backtrace_filters.push(BacktraceFilter::Custom(Arc::new(filter)));
    }

    /// Append an ignore predicate
    pub fn ignore_by_filter<F>(&mut self, filter: F)
    where
        F: IgnoreFilter + 'static,
    {
        self.ignore_by_filters.push(Arc::new(filter));
    }

    /// Check if notices should be delivered from this environment
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.environment_name
            .as_ref()
            .map_or(true, |env| !self.development_environments.contains(env))
    }

    /// Resolve the backtrace filter chain against `project_root`
    #[must_use]
    pub fn line_filters(&self, project_root: Option<&str>) -> Vec<SharedLineFilter> {
        let mut out: Vec<SharedLineFilter> = Vec::with_capacity(self.backtrace_filters.len());
        for filter in &self.backtrace_filters {
            match filter {
                BacktraceFilter::ProjectRoot => {
                    if let Some(root) = project_root.filter(|r| !r.trim().is_empty()) {
                        out.push(Arc::new(PathPrefixFilter::project_root(root)));
                    }
                }
                BacktraceFilter::StripCurrentDir => out.push(Arc::new(StripCurrentDir)),
                BacktraceFilter::DependencyRoots => {
                    for root in &self.dependency_roots {
                        out.push(Arc::new(PathPrefixFilter::dependency_root(root)));
                    }
                }
                BacktraceFilter::OwnFrames => out.push(Arc::new(own_frames_filter())),
                BacktraceFilter::Custom(custom) => out.push(Arc::new(GuardedLineFilter(custom.clone()))),
            }
        }
        out
    }

    /// Apply file settings; lists in `settings` replace the current ones
    ///
    /// # Errors
    /// Returns error if a `/regex/` filter or ignore entry does not compile
    pub fn apply_settings(&mut self, settings: FileSettings) -> Result<(), ConfigError> {
        let FileSettings {
            api_key,
            project_root,
            environment_name,
            hostname,
            params_filters,
            dependency_roots,
            ignore,
            ignore_user_agent,
            source_extract_radius,
            send_request_session,
            max_error_message_bytes,
            max_depth,
            development_environments,
            fingerprint,
            debug,
        } = settings;

        if let Some(filters) = params_filters {
            self.params_filters = parse_filters(&filters)?;
        }
        if let Some(agents) = ignore_user_agent {
            self.ignore_user_agent = parse_filters(&agents)?;
        }
        if let Some(entries) = ignore {
            self.ignore = entries
                .iter()
                .map(|e| IgnoreEntry::parse(e))
                .collect::<Result<_, _>>()?;
        }

        self.api_key = api_key.or(self.api_key.take());
        self.project_root = project_root.or(self.project_root.take());
        self.environment_name = environment_name.or(self.environment_name.take());
        if let Some(hostname) = hostname {
            self.hostname = hostname;
        }
        if let Some(roots) = dependency_roots {
            self.dependency_roots = roots;
        }
        if let Some(radius) = source_extract_radius {
            self.source_extract_radius = radius;
        }
        if let Some(send) = send_request_session {
            self.send_request_session = send;
        }
        if let Some(limit) = max_error_message_bytes {
            self.max_error_message_bytes = limit;
        }
        if let Some(depth) = max_depth {
            self.max_depth = depth;
        }
        if let Some(envs) = development_environments {
            self.development_environments = envs;
        }
        if let Some(fingerprint) = fingerprint {
            self.fingerprint = Some(Fingerprint::Static(fingerprint));
        }
        if let Some(debug) = debug {
            self.debug = debug;
        }

        tracing::debug!(
            environment = ?self.environment_name,
            ignore = self.ignore.len(),
            params_filters = self.params_filters.len(),
            "applied file settings"
        );
        Ok(())
    }

    /// Default configuration with `settings` applied
    ///
    /// # Errors
    /// Returns error if a `/regex/` filter or ignore entry does not compile
    pub fn from_settings(settings: FileSettings) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_settings(settings)?;
        Ok(config)
    }
}

fn parse_filters(specs: &[String]) -> Result<Vec<KeyFilter>, ConfigError> {
    specs
        .iter()
        .map(|s| KeyFilter::parse(s).map_err(ConfigError::from))
        .collect()
}

/// Custom line filter whose panics drop nothing and rewrite nothing
struct GuardedLineFilter(SharedLineFilter);

impl LineFilter for GuardedLineFilter {
    fn apply(&self, line: BacktraceLine) -> Option<BacktraceLine> {
        let fallback = line.clone();
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.0.apply(line))).unwrap_or_else(|_| {
            tracing::warn!("backtrace filter panicked, keeping frame unchanged");
            Some(fallback)
        })
    }
}

fn default_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_key: None,
            project_root: None,
            environment_name: None,
            hostname: default_hostname(),
            notifier_name: NOTIFIER_NAME.to_string(),
            notifier_version: crate::VERSION.to_string(),
            notifier_url: NOTIFIER_URL.to_string(),
            params_filters: DEFAULT_PARAMS_FILTERS.iter().map(|f| KeyFilter::exact(*f)).collect(),
            backtrace_filters: default_backtrace_filters(),
            dependency_roots: Vec::new(),
            ignore: default_ignore(),
            ignore_by_filters: Vec::new(),
            ignore_user_agent: Vec::new(),
            source_extract_radius: DEFAULT_SOURCE_EXTRACT_RADIUS,
            send_request_session: true,
            max_error_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
            development_environments: vec!["development".to_string(), "test".to_string()],
            fingerprint: None,
            notice_post_build: None,
            sender: None,
            dispatch: Dispatch::default(),
            debug: false,
        }
    }
}

impl Debug for Configuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("project_root", &self.project_root)
            .field("environment_name", &self.environment_name)
            .field("hostname", &self.hostname)
            .field("params_filters", &self.params_filters)
            .field("backtrace_filters", &self.backtrace_filters)
            .field("ignore", &self.ignore)
            .field("ignore_by_filters", &self.ignore_by_filters.len())
            .field("ignore_user_agent", &self.ignore_user_agent)
            .field("source_extract_radius", &self.source_extract_radius)
            .field("send_request_session", &self.send_request_session)
            .field("fingerprint", &self.fingerprint)
            .field("notice_post_build", &self.notice_post_build.is_some())
            .field("sender", &self.sender.is_some())
            .field("dispatch", &self.dispatch)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

/// Data-only configuration, as read from a settings file
///
/// List values replace the configuration's lists. Filter, user-agent and
/// ignore strings use `/regex/` for patterns and plain text for exact names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub api_key: Option<String>,
    pub project_root: Option<String>,
    pub environment_name: Option<String>,
    pub hostname: Option<String>,
    pub params_filters: Option<Vec<String>>,
    pub dependency_roots: Option<Vec<String>>,
    pub ignore: Option<Vec<String>>,
    pub ignore_user_agent: Option<Vec<String>>,
    pub source_extract_radius: Option<usize>,
    pub send_request_session: Option<bool>,
    pub max_error_message_bytes: Option<usize>,
    pub max_depth: Option<usize>,
    pub development_environments: Option<Vec<String>>,
    pub fingerprint: Option<String>,
    pub debug: Option<bool>,
}

impl FileSettings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this schema
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&text)
    }
}
