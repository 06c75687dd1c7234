//! Framework request adapters

use crate::error::AdapterError;
use faultline_sanitize::Data;

/// Read-only view of a framework request
///
/// Implemented by web-framework integrations; the assembler only reads
/// from it.
pub trait RequestAdapter: Send + Sync {
    /// Parsed request parameters
    ///
    /// # Errors
    /// Returns error if the framework's parameter parser fails
    fn parameters(&self) -> Result<Data, AdapterError>;

    /// Protocol, with or without the `://` suffix
    fn protocol(&self) -> Option<String>;

    /// Host, optionally with port
    fn host(&self) -> Option<String>;

    /// Path and query string
    fn request_uri(&self) -> Option<String>;

    /// Session data
    fn session(&self) -> Data {
        Data::Null
    }

    /// Request environment
    fn env(&self) -> Data {
        Data::Null
    }

    /// Full request URL, when protocol and host are known
    fn url(&self) -> Option<String> {
        let protocol = self.protocol()?;
        let host = self.host()?;
        let separator = if protocol.ends_with("://") { "" } else { "://" };
        let uri = self.request_uri().unwrap_or_default();
        Some(format!("{protocol}{separator}{host}{uri}"))
    }
}

/// Plain-data request adapter
#[derive(Debug, Clone, Default)]
pub struct RequestSnapshot {
    /// Parsed parameters
    pub parameters: Data,
    /// Protocol
    pub protocol: Option<String>,
    /// Host
    pub host: Option<String>,
    /// Path and query
    pub request_uri: Option<String>,
    /// Session data
    pub session: Data,
    /// Environment
    pub env: Data,
}

impl RequestSnapshot {
    /// Create an empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With parameters
    #[inline]
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<Data>) -> Self {
        self.parameters = parameters.into();
        self
    }

    /// With protocol, host and request URI
    #[must_use]
    pub fn with_location(
        mut self,
        protocol: impl Into<String>,
        host: impl Into<String>,
        request_uri: impl Into<String>,
    ) -> Self {
        self.protocol = Some(protocol.into());
        self.host = Some(host.into());
        self.request_uri = Some(request_uri.into());
        self
    }

    /// With session data
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: impl Into<Data>) -> Self {
        self.session = session.into();
        self
    }

    /// With environment
    #[inline]
    #[must_use]
    pub fn with_env(mut self, env: impl Into<Data>) -> Self {
        self.env = env.into();
        self
    }
}

impl RequestAdapter for RequestSnapshot {
    fn parameters(&self) -> Result<Data, AdapterError> {
        Ok(self.parameters.clone())
    }

    fn protocol(&self) -> Option<String> {
        self.protocol.clone()
    }

    fn host(&self) -> Option<String> {
        self.host.clone()
    }

    fn request_uri(&self) -> Option<String> {
        self.request_uri.clone()
    }

    fn session(&self) -> Data {
        self.session.clone()
    }

    fn env(&self) -> Data {
        self.env.clone()
    }
}
