//! Notice inputs
//!
//! [`NoticeInput`] gathers every source a notice can be built from. Each
//! source is optional; the assembler resolves conflicts in a fixed order:
//! explicit attributes, then the exception, then the request adapter, then
//! the raw environment, then configuration defaults.

use crate::env::RequestEnv;
use crate::exception::Exception;
use crate::fingerprint::Fingerprint;
use crate::request::RequestAdapter;
use faultline_sanitize::Data;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Explicitly supplied notice fields
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pub error_class: Option<String>,
    pub error_message: Option<String>,
    pub backtrace: Option<Vec<String>>,
    pub component: Option<String>,
    pub action: Option<String>,
    pub url: Option<String>,
    pub parameters: Option<Data>,
    /// Session, possibly wrapped as `{"data": ...}`
    pub session: Option<Data>,
    /// Session data, used as is
    pub session_data: Option<Data>,
    pub cgi_data: Option<Data>,
    pub context: Option<Data>,
    pub fingerprint: Option<Fingerprint>,
    pub project_root: Option<String>,
    pub environment_name: Option<String>,
    pub hostname: Option<String>,
    pub source_extract_radius: Option<usize>,
}

/// Everything a notice is built from
#[derive(Clone, Default)]
pub struct NoticeInput {
    /// Explicit fields
    pub attributes: Attributes,
    /// Captured exception
    pub exception: Option<Exception>,
    /// Framework request
    pub request: Option<Arc<dyn RequestAdapter>>,
    /// Raw request environment
    pub env: Option<RequestEnv>,
}

impl NoticeInput {
    /// Empty input
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Input for a captured exception
    #[must_use]
    pub fn from_exception(exception: Exception) -> Self {
        Self::new().with_exception(exception)
    }

    /// Input for a Rust error value
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self::from_exception(Exception::from_error(error))
    }

    /// With exception
    #[inline]
    #[must_use]
    pub fn with_exception(mut self, exception: Exception) -> Self {
        self.exception = Some(exception);
        self
    }

    /// With framework request
    #[must_use]
    pub fn with_request(mut self, request: impl RequestAdapter + 'static) -> Self {
        self.request = Some(Arc::new(request));
        self
    }

    /// With raw request environment
    #[inline]
    #[must_use]
    pub fn with_env(mut self, env: RequestEnv) -> Self {
        self.env = Some(env);
        self
    }

    /// With error class
    #[inline]
    #[must_use]
    pub fn with_error_class(mut self, class: impl Into<String>) -> Self {
        self.attributes.error_class = Some(class.into());
        self
    }

    /// With error message
    #[inline]
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.attributes.error_message = Some(message.into());
        self
    }

    /// With raw backtrace lines
    #[must_use]
    pub fn with_backtrace<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.backtrace = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    /// With component
    #[inline]
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.attributes.component = Some(component.into());
        self
    }

    /// Alias for [`NoticeInput::with_component`]
    #[inline]
    #[must_use]
    pub fn with_controller(self, controller: impl Into<String>) -> Self {
        self.with_component(controller)
    }

    /// With action
    #[inline]
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.attributes.action = Some(action.into());
        self
    }

    /// With URL
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.attributes.url = Some(url.into());
        self
    }

    /// With parameters
    #[inline]
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<Data>) -> Self {
        self.attributes.parameters = Some(parameters.into());
        self
    }

    /// With session; a `{"data": ...}` wrapper is unwrapped
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: impl Into<Data>) -> Self {
        self.attributes.session = Some(session.into());
        self
    }

    /// With session data, used as is
    #[inline]
    #[must_use]
    pub fn with_session_data(mut self, data: impl Into<Data>) -> Self {
        self.attributes.session_data = Some(data.into());
        self
    }

    /// With CGI data
    #[inline]
    #[must_use]
    pub fn with_cgi_data(mut self, data: impl Into<Data>) -> Self {
        self.attributes.cgi_data = Some(data.into());
        self
    }

    /// With per-report context
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: impl Into<Data>) -> Self {
        self.attributes.context = Some(context.into());
        self
    }

    /// With fingerprint source, overriding the configured one
    #[inline]
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<Fingerprint>) -> Self {
        self.attributes.fingerprint = Some(fingerprint.into());
        self
    }

    /// With project root
    #[inline]
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<String>) -> Self {
        self.attributes.project_root = Some(root.into());
        self
    }

    /// With environment name
    #[inline]
    #[must_use]
    pub fn with_environment_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.environment_name = Some(name.into());
        self
    }

    /// With hostname
    #[inline]
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.attributes.hostname = Some(hostname.into());
        self
    }

    /// With source extract radius
    #[inline]
    #[must_use]
    pub fn with_source_extract_radius(mut self, radius: usize) -> Self {
        self.attributes.source_extract_radius = Some(radius);
        self
    }
}

impl Debug for NoticeInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoticeInput")
            .field("attributes", &self.attributes)
            .field("exception", &self.exception)
            .field("request", &self.request.is_some())
            .field("env", &self.env)
            .finish()
    }
}

impl From<Exception> for NoticeInput {
    fn from(exception: Exception) -> Self {
        Self::from_exception(exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_sets_component() {
        let input = NoticeInput::new().with_controller("users_controller");
        assert_eq!(input.attributes.component.as_deref(), Some("users_controller"));
    }

    #[test]
    fn builders_fill_attributes() {
        let input = NoticeInput::new()
            .with_error_class("MyClass")
            .with_backtrace(["a.rb:1"])
            .with_source_extract_radius(3);
        assert_eq!(input.attributes.error_class.as_deref(), Some("MyClass"));
        assert_eq!(input.attributes.backtrace.as_ref().map(Vec::len), Some(1));
        assert_eq!(input.attributes.source_extract_radius, Some(3));
    }
}
