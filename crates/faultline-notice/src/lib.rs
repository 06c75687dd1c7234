//! Faultline Notice
//!
//! Builds sanitized, bounded error reports from heterogeneous inputs and
//! hands them to a delivery gateway.
//!
//! # Core Concepts
//!
//! - [`NoticeInput`]: explicit attributes, an [`Exception`], a [`RequestAdapter`], a [`RequestEnv`]
//! - [`Assembler`]: resolves every field by precedence and runs the backtrace parser and sanitizer
//! - [`Notice`]: the normalized report and its JSON payload
//! - [`should_ignore`]: class, pattern, type, predicate and user-agent rules
//! - [`DeliveryGateway`] / [`Dispatch`]: transport capability and where it runs
//! - [`Notifier`]: build, ignore, environment check and deliver in one call
//!
//! # Example
//!
//! ```rust
//! use faultline_notice::{build, Configuration, Exception, NoticeInput};
//!
//! let config = Configuration::default().with_api_key("abc123");
//! let input = NoticeInput::from_exception(Exception::new("RuntimeError", "boom"))
//!     .with_url("https://example.com/?password=hunter2");
//! let notice = build(&input, &config);
//! assert_eq!(notice.error_message, "RuntimeError: boom");
//! assert_eq!(notice.url.as_deref(), Some("https://example.com/?password=[FILTERED]"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod assembler;
mod config;
mod context;
mod delivery;
mod env;
mod error;
mod exception;
mod fingerprint;
mod ignore;
mod input;
mod notice;
mod notifier;
mod request;

pub use assembler::{build, truncate_utf8, Assembler, DEFAULT_ERROR_CLASS, DEFAULT_ERROR_MESSAGE};
pub use config::{
    default_backtrace_filters, BacktraceFilter, Configuration, FileSettings, PostBuildHook,
    DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_PARAMS_FILTERS, DEFAULT_SOURCE_EXTRACT_RADIUS, NOTIFIER_NAME,
    NOTIFIER_URL,
};
pub use context::ContextStore;
pub use delivery::{dispatch, DeliveryGateway, DeliveryOutcome, Dispatch, SharedGateway};
pub use env::{RequestEnv, INPUT_KEY, PARAMETERS_KEY, SESSION_KEY, URL_SCHEME_KEY};
pub use error::{AdapterError, ConfigError, DeliveryError};
pub use exception::{short_type_name, ErrorType, Exception};
pub use fingerprint::{digest, Fingerprint, FingerprintFn};
pub use ignore::{
    default_ignore, should_ignore, IgnoreEntry, IgnoreFilter, IgnoreRules, SharedIgnoreFilter,
    DEFAULT_IGNORED, USER_AGENT_KEY,
};
pub use input::{Attributes, NoticeInput};
pub use notice::{Notice, NotifierInfo, LANGUAGE};
pub use notifier::Notifier;
pub use request::{RequestAdapter, RequestSnapshot};

pub use faultline_backtrace as backtrace;
pub use faultline_sanitize as sanitize;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
