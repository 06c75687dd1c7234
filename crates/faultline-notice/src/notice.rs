//! The normalized error report

use crate::config::Configuration;
use crate::delivery::{dispatch, DeliveryOutcome};
use crate::exception::ErrorType;
use crate::ignore::{should_ignore, IgnoreRules};
use faultline_backtrace::{Backtrace, SourceExtract};
use serde::Serialize;
use serde_json::Value;

/// Language reported in the notifier block
pub const LANGUAGE: &str = "rust";

/// Notifier identity carried by every notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifierInfo {
    /// Notifier name
    pub name: String,
    /// Notifier version
    pub version: String,
    /// Notifier project URL
    pub url: String,
}

/// One built, sanitized error report
///
/// Built by [`crate::build`]; the post-build hook may rewrite any public
/// field before serialization.
#[derive(Debug, Clone)]
pub struct Notice {
    /// Project API key
    pub api_key: Option<String>,
    /// Error class name
    pub error_class: String,
    /// Error message, bounded in bytes
    pub error_message: String,
    /// Filtered backtrace
    pub backtrace: Backtrace,
    /// Source around the application frame
    pub source_extract: Option<SourceExtract>,
    /// Application root
    pub project_root: Option<String>,
    /// Deployment environment
    pub environment_name: Option<String>,
    /// Reporting host
    pub hostname: String,
    /// Component (controller) that handled the request
    pub component: Option<String>,
    /// Action within the component
    pub action: Option<String>,
    /// Request URL, with filtered query parameters redacted
    pub url: Option<String>,
    /// Sanitized request parameters
    pub parameters: Value,
    /// Sanitized session data; `None` when session reporting is disabled
    pub session_data: Option<Value>,
    /// Sanitized CGI data
    pub cgi_data: Value,
    /// Merged context; `None` when empty
    pub context: Option<Value>,
    /// SHA-1 hex digest of the fingerprint
    pub fingerprint: Option<String>,
    /// Notifier identity
    pub notifier: NotifierInfo,
    pub(crate) lineage: Vec<ErrorType>,
}

#[derive(Serialize)]
struct Payload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
    notifier: NotifierPayload<'a>,
    error: ErrorPayload<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<RequestPayload<'a>>,
    server: ServerPayload<'a>,
}

#[derive(Serialize)]
struct NotifierPayload<'a> {
    name: &'a str,
    url: &'a str,
    version: &'a str,
    language: &'static str,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    class: &'a str,
    message: &'a str,
    backtrace: &'a Backtrace,
    source: Option<&'a SourceExtract>,
    fingerprint: Option<&'a str>,
}

#[derive(Serialize)]
struct RequestPayload<'a> {
    url: Option<&'a str>,
    component: Option<&'a str>,
    action: Option<&'a str>,
    params: &'a Value,
    session: Option<&'a Value>,
    cgi_data: &'a Value,
    context: Option<&'a Value>,
}

#[derive(Serialize)]
struct ServerPayload<'a> {
    project_root: Option<&'a str>,
    environment_name: Option<&'a str>,
    hostname: &'a str,
}

/// Check for null, an empty string, or an empty container
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

impl Notice {
    /// Alias for [`Notice::component`]
    #[inline]
    #[must_use]
    pub fn controller(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// Exception class and its ancestors; empty without an exception
    #[inline]
    #[must_use]
    pub fn lineage(&self) -> &[ErrorType] {
        &self.lineage
    }

    /// Check if any request field carries data
    #[must_use]
    pub fn has_request_data(&self) -> bool {
        self.url.as_deref().is_some_and(|s| !s.is_empty())
            || self.component.as_deref().is_some_and(|s| !s.is_empty())
            || self.action.as_deref().is_some_and(|s| !s.is_empty())
            || !is_empty_value(&self.parameters)
            || !is_empty_value(&self.cgi_data)
            || self.session_data.as_ref().is_some_and(|v| !is_empty_value(v))
            || self.context.as_ref().is_some_and(|v| !is_empty_value(v))
    }

    /// Check the configured ignore rules
    #[must_use]
    pub fn ignore(&self, config: &Configuration) -> bool {
        should_ignore(self, &IgnoreRules::from_config(config))
    }

    fn payload(&self) -> Payload<'_> {
        let request = self.has_request_data().then(|| RequestPayload {
            url: self.url.as_deref(),
            component: self.component.as_deref(),
            action: self.action.as_deref(),
            params: &self.parameters,
            session: self.session_data.as_ref(),
            cgi_data: &self.cgi_data,
            context: self.context.as_ref(),
        });
        Payload {
            api_key: self.api_key.as_deref(),
            notifier: NotifierPayload {
                name: &self.notifier.name,
                url: &self.notifier.url,
                version: &self.notifier.version,
                language: LANGUAGE,
            },
            error: ErrorPayload {
                class: &self.error_class,
                message: &self.error_message,
                backtrace: &self.backtrace,
                source: self.source_extract.as_ref(),
                fingerprint: self.fingerprint.as_deref(),
            },
            request,
            server: ServerPayload {
                project_root: self.project_root.as_deref(),
                environment_name: self.environment_name.as_deref(),
                hostname: &self.hostname,
            },
        }
    }

    /// Structured form of the wire payload
    ///
    /// The `request` block is omitted when no request field carries data.
    #[must_use]
    pub fn as_json(&self) -> Value {
        serde_json::to_value(self.payload()).unwrap_or(Value::Null)
    }

    /// Serialized wire payload
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.payload()).unwrap_or_default()
    }

    /// Hand the serialized notice to the configured gateway
    ///
    /// Returns [`DeliveryOutcome::NotConfigured`] when no gateway is set.
    #[must_use]
    pub fn deliver(&self, config: &Configuration) -> DeliveryOutcome {
        let Some(sender) = config.sender.clone() else {
            tracing::debug!(error_class = %self.error_class, "no delivery gateway configured, dropping notice");
            return DeliveryOutcome::NotConfigured;
        };
        let payload = self.to_json();
        if config.debug {
            tracing::debug!(%payload, "delivering notice");
        } else {
            tracing::info!(error_class = %self.error_class, bytes = payload.len(), "delivering notice");
        }
        dispatch(sender, payload, &config.dispatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> Notice {
        Notice {
            api_key: None,
            error_class: "RuntimeError".into(),
            error_message: "RuntimeError: boom".into(),
            backtrace: Backtrace::default(),
            source_extract: None,
            project_root: None,
            environment_name: None,
            hostname: "web-1".into(),
            component: None,
            action: None,
            url: None,
            parameters: Value::Object(serde_json::Map::new()),
            session_data: Some(Value::Object(serde_json::Map::new())),
            cgi_data: Value::Object(serde_json::Map::new()),
            context: None,
            fingerprint: None,
            notifier: NotifierInfo {
                name: "faultline".into(),
                version: "0.1.0".into(),
                url: "https://example.invalid".into(),
            },
            lineage: Vec::new(),
        }
    }

    #[test]
    fn empty_request_is_omitted() {
        let json = notice().as_json();
        assert!(json.get("request").is_none());
        assert_eq!(json["error"]["class"], "RuntimeError");
        assert_eq!(json["notifier"]["language"], LANGUAGE);
        assert!(json["error"]["fingerprint"].is_null());
    }

    #[test]
    fn any_request_field_includes_block() {
        let mut n = notice();
        n.action = Some("value".into());
        let json = n.as_json();
        assert_eq!(json["request"]["action"], "value");
        assert!(json["request"]["url"].is_null());
    }

    #[test]
    fn to_json_matches_as_json() {
        let n = notice();
        let parsed: Value = serde_json::from_str(&n.to_json()).unwrap();
        assert_eq!(parsed, n.as_json());
        assert_eq!(n.to_json(), n.to_json());
    }

    #[test]
    fn deliver_without_gateway_reports_not_configured() {
        let config = Configuration::default();
        assert!(matches!(notice().deliver(&config), DeliveryOutcome::NotConfigured));
    }

    #[test]
    fn controller_aliases_component() {
        let mut n = notice();
        n.component = Some("users_controller".into());
        assert_eq!(n.controller(), Some("users_controller"));
    }

    #[test]
    fn empty_values() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&serde_json::json!({})));
        assert!(!is_empty_value(&serde_json::json!(false)));
    }
}
