//! Error types for Faultline Notice
//!
//! Errors only appear at the edges of the pipeline:
//! - loading configuration files
//! - request adapters that fail to produce parameters
//! - handing a payload to the delivery gateway
//!
//! Building a notice and deciding whether to ignore it never fail.

use faultline_sanitize::FilterError;
use std::path::PathBuf;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Settings file could not be read
    #[error("failed to read settings file '{}': {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for this schema
    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// A `/regex/` filter or ignore entry does not compile
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] FilterError),
}

impl ConfigError {
    /// Create an I/O error for `path`
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Request adapter errors
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A query string or form body contains a malformed escape
    #[error("invalid %-encoding in '{0}'")]
    InvalidEncoding(String),

    /// Adapter-specific failure
    #[error("{0}")]
    Custom(String),
}

impl AdapterError {
    /// Create an adapter-specific error
    #[inline]
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The gateway reported a transport failure
    #[error("transport failed: {0}")]
    Transport(String),

    /// The payload could not be handed to a background context
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

impl DeliveryError {
    /// Create a transport error
    #[inline]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Check if a retry by the gateway could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_lower_case() {
        assert_eq!(DeliveryError::transport("503").to_string(), "transport failed: 503");
        assert_eq!(
            AdapterError::InvalidEncoding("baz%".into()).to_string(),
            "invalid %-encoding in 'baz%'"
        );
    }

    #[test]
    fn filter_errors_convert() {
        let err: ConfigError = faultline_sanitize::KeyFilter::pattern("(").unwrap_err().into();
        assert!(matches!(err, ConfigError::InvalidPattern(_)));
        assert!(err.to_string().starts_with("invalid pattern:"));
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(DeliveryError::transport("503").is_retryable());
        assert!(!DeliveryError::Dispatch("no runtime".into()).is_retryable());
    }
}
