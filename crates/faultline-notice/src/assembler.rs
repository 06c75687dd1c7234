//! Notice assembly
//!
//! Every field is resolved by an ordered chain of sources, highest
//! precedence first:
//! 1. explicit attributes
//! 2. the exception
//! 3. the request adapter, then the raw environment
//! 4. configuration defaults
//!
//! Assembly is total. Malformed inputs degrade into placeholders (unknown
//! frames, stringified values, an unfiltered URL, an error-description
//! parameter map) and user callbacks that panic are contained.

use crate::config::Configuration;
use crate::context::ContextStore;
use crate::env::RequestEnv;
use crate::error::AdapterError;
use crate::exception::Exception;
use crate::fingerprint::digest;
use crate::input::NoticeInput;
use crate::notice::{Notice, NotifierInfo};
use crate::request::RequestAdapter;
use faultline_backtrace::{caller_lines, resolve_path, Backtrace, SourceExtract};
use faultline_sanitize::{filter_url, Data, Sanitizer};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Error class used when neither an explicit class nor an exception is given
pub const DEFAULT_ERROR_CLASS: &str = "Notice";

/// Error message used when neither an explicit message nor an exception is given
pub const DEFAULT_ERROR_MESSAGE: &str = "Notification";

/// Builds notices against one configuration and, optionally, a context store
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'a> {
    config: &'a Configuration,
    context: Option<&'a ContextStore>,
}

impl<'a> Assembler<'a> {
    /// Assembler without process context
    #[inline]
    #[must_use]
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            context: None,
        }
    }

    /// With process context merged into every notice
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: &'a ContextStore) -> Self {
        self.context = Some(context);
        self
    }

    /// Build a notice from `input`
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn build(&self, input: &NoticeInput) -> Notice {
        let config = self.config;
        let attrs = &input.attributes;
        let exception = input.exception.as_ref();
        let request = input.request.as_deref();
        let env = input.env.as_ref();
        let sanitizer = Sanitizer::new(&config.params_filters).with_max_depth(config.max_depth);

        let project_root = attrs.project_root.clone().or_else(|| config.project_root.clone());

        let error_class = attrs
            .error_class
            .clone()
            .or_else(|| exception.map(|e| e.class_name.clone()))
            .unwrap_or_else(|| DEFAULT_ERROR_CLASS.to_string());

        let error_message = attrs
            .error_message
            .clone()
            .or_else(|| exception.map(Exception::summary))
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
        let error_message = truncate_utf8(&error_message, config.max_error_message_bytes);

        let raw_backtrace = attrs
            .backtrace
            .clone()
            .or_else(|| exception.and_then(|e| e.backtrace.clone()))
            .unwrap_or_else(caller_lines);
        let backtrace = Backtrace::parse(&raw_backtrace, &config.line_filters(project_root.as_deref()));

        let raw_parameters = attrs
            .parameters
            .clone()
            .or_else(|| {
                request
                    .map(|r| parameters_or_error(r.parameters()))
                    .filter(|d| !d.is_blank())
            })
            .or_else(|| env.map(|e| parameters_or_error(e.parameters())));
        let parameters = raw_parameters
            .as_ref()
            .map_or_else(empty_object, |p| object_or_empty(sanitizer.sanitize(p)));

        let component = attrs
            .component
            .clone()
            .or_else(|| string_param(&parameters, "controller"));
        let action = attrs
            .action
            .clone()
            .or_else(|| string_param(&parameters, "action"));

        let url = attrs
            .url
            .clone()
            .or_else(|| request.and_then(|r| r.url()))
            .or_else(|| env.and_then(RequestEnv::url))
            .map(|u| filter_url(&u, &config.params_filters));

        let session_data = config
            .send_request_session
            .then(|| resolve_session(attrs.session_data.as_ref(), attrs.session.as_ref(), request, env))
            .map(|raw| {
                raw.as_ref()
                    .map_or_else(empty_object, |s| object_or_empty(sanitizer.sanitize(s)))
            });

        let raw_cgi = attrs
            .cgi_data
            .clone()
            .or_else(|| request.map(|r| r.env()).filter(|d| !d.is_blank()))
            .or_else(|| env.map(RequestEnv::cgi_data));
        let cgi_data = raw_cgi
            .as_ref()
            .map_or_else(empty_object, |c| object_or_empty(sanitizer.sanitize_cgi(c)));

        let context = self.merge_context(attrs.context.as_ref());

        let radius = attrs.source_extract_radius.unwrap_or(config.source_extract_radius);
        let source_extract = exception
            .and_then(|e| e.source_extract.as_deref())
            .map(SourceExtract::parse_rendered)
            .filter(|extract| !extract.is_empty())
            .or_else(|| file_extract(&backtrace, project_root.as_deref(), radius));

        let mut notice = Notice {
            api_key: config.api_key.clone(),
            error_class,
            error_message,
            backtrace,
            source_extract,
            project_root,
            environment_name: attrs
                .environment_name
                .clone()
                .or_else(|| config.environment_name.clone()),
            hostname: attrs.hostname.clone().unwrap_or_else(|| config.hostname.clone()),
            component,
            action,
            url,
            parameters,
            session_data,
            cgi_data,
            context,
            fingerprint: None,
            notifier: NotifierInfo {
                name: config.notifier_name.clone(),
                version: config.notifier_version.clone(),
                url: config.notifier_url.clone(),
            },
            lineage: exception.map(|e| e.lineage.clone()).unwrap_or_default(),
        };

        notice.fingerprint = attrs
            .fingerprint
            .as_ref()
            .or(config.fingerprint.as_ref())
            .and_then(|f| f.resolve(&notice))
            .map(|raw| digest(&raw));

        if let Some(hook) = &config.notice_post_build {
            if catch_unwind(AssertUnwindSafe(|| hook(&mut notice))).is_err() {
                tracing::warn!(error_class = %notice.error_class, "notice post-build hook panicked");
            }
        }

        tracing::debug!(
            error_class = %notice.error_class,
            frames = notice.backtrace.len(),
            has_request = notice.has_request_data(),
            "notice built"
        );
        notice
    }

    fn merge_context(&self, per_report: Option<&Data>) -> Option<Value> {
        let mut merged: IndexMap<String, Data> = IndexMap::new();
        if let Some(store) = self.context {
            merged.extend(store.snapshot());
        }
        if let Some(context) = per_report {
            match context.to_pairs() {
                Some(pairs) => merged.extend(pairs),
                None => tracing::debug!("per-report context is not a mapping, skipping"),
            }
        }
        if merged.is_empty() {
            return None;
        }
        // Context is reported as given; only parameter-like data is redacted.
        Some(
            Sanitizer::new(&[])
                .with_max_depth(self.config.max_depth)
                .sanitize(&Data::from_pairs(merged)),
        )
    }
}

/// Build a notice from `input` without process context
#[must_use]
pub fn build(input: &NoticeInput, config: &Configuration) -> Notice {
    Assembler::new(config).build(input)
}

/// Truncate `text` to at most `max_bytes` without splitting a character
#[must_use]
pub fn truncate_utf8(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

fn parameters_or_error(result: Result<Data, AdapterError>) -> Data {
    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to parse request parameters");
        Data::from_pairs([("error", format!("Failed to parse request parameters -- {err}"))])
    })
}

fn resolve_session(
    session_data: Option<&Data>,
    session: Option<&Data>,
    request: Option<&dyn RequestAdapter>,
    env: Option<&RequestEnv>,
) -> Option<Data> {
    session_data
        .cloned()
        .or_else(|| session.map(unwrap_session))
        .or_else(|| {
            request
                .map(|r| unwrap_session(&r.session()))
                .filter(|d| !d.is_blank())
        })
        .or_else(|| env.and_then(RequestEnv::session).map(|s| unwrap_session(&s)))
}

/// Unwrap the `{"data": {...}}` session form
fn unwrap_session(session: &Data) -> Data {
    match session.get("data") {
        Some(inner @ (Data::Map(_) | Data::Shared(_) | Data::Object(_))) => inner.clone(),
        _ => session.clone(),
    }
}

fn string_param(parameters: &Value, key: &str) -> Option<String> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn object_or_empty(value: Value) -> Value {
    if value.is_null() {
        empty_object()
    } else {
        value
    }
}

fn file_extract(backtrace: &Backtrace, project_root: Option<&str>, radius: usize) -> Option<SourceExtract> {
    let line = backtrace.extract_line(project_root)?;
    let file = line.file.as_deref()?;
    let number = line.line_number()?;
    SourceExtract::read(resolve_path(file, project_root), number, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use crate::request::RequestSnapshot;
    use faultline_sanitize::RECURSION_HALTED;
    use serde_json::json;

    fn configure() -> Configuration {
        Configuration::default().with_api_key("abc123def456")
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_utf8("abc", 10), "abc");
        assert_eq!(truncate_utf8(&"a".repeat(2000), 1024).len(), 1024);
        // 'é' is two bytes; a cut at byte 3 would split the second one.
        assert_eq!(truncate_utf8("éé", 3), "é");
    }

    #[test]
    fn sensible_defaults_without_exception() {
        let input = NoticeInput::new().with_backtrace([
            "app/models/user.rb:13:in `magic'",
            "app/controllers/users_controller.rb:8:in `index'",
        ]);
        let notice = build(&input, &configure());
        assert_eq!(notice.error_class, DEFAULT_ERROR_CLASS);
        assert_eq!(notice.error_message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(notice.backtrace.len(), 2);
        assert_eq!(notice.parameters, json!({}));
        assert_eq!(notice.session_data, Some(json!({})));
        assert!(notice.context.is_none());
        assert!(notice.fingerprint.is_none());
    }

    #[test]
    fn explicit_attributes_beat_exception() {
        let input = NoticeInput::from_exception(Exception::new("RuntimeError", "Not very helpful"))
            .with_error_class("MyClass")
            .with_error_message("Something very specific went wrong.");
        let notice = build(&input, &configure());
        assert_eq!(notice.error_class, "MyClass");
        assert_eq!(notice.error_message, "Something very specific went wrong.");
    }

    #[test]
    fn exception_supplies_class_and_summary() {
        let input = NoticeInput::from_exception(Exception::new("StandardError", "error"));
        let notice = build(&input, &configure());
        assert_eq!(notice.error_class, "StandardError");
        assert_eq!(notice.error_message, "StandardError: error");
    }

    #[test]
    fn message_is_trimmed_to_limit() {
        let message = "asdfghjkl".repeat(200);
        let input = NoticeInput::from_exception(Exception::new("StandardError", message));
        let notice = build(&input, &configure());
        assert_eq!(notice.error_message.len(), 1024);
    }

    #[test]
    fn request_adapter_fills_request_fields() {
        let request = RequestSnapshot::new()
            .with_parameters(Data::from_pairs([("one", "two")]))
            .with_location("http", "some.host", "/some/uri")
            .with_session(Data::from_pairs([("a", "b")]))
            .with_env(Data::from_pairs([("three", "four")]));
        let notice = build(&NoticeInput::new().with_request(request), &configure());
        assert_eq!(notice.url.as_deref(), Some("http://some.host/some/uri"));
        assert_eq!(notice.parameters, json!({"one": "two"}));
        assert_eq!(notice.session_data, Some(json!({"a": "b"})));
        assert_eq!(notice.cgi_data, json!({"three": "four"}));
    }

    #[test]
    fn failing_adapter_gives_error_parameters() {
        struct Exploding;
        impl RequestAdapter for Exploding {
            fn parameters(&self) -> Result<Data, AdapterError> {
                Err(AdapterError::custom("parser exploded"))
            }
            fn protocol(&self) -> Option<String> {
                None
            }
            fn host(&self) -> Option<String> {
                None
            }
            fn request_uri(&self) -> Option<String> {
                None
            }
        }
        let notice = build(&NoticeInput::new().with_request(Exploding), &configure());
        assert_eq!(
            notice.parameters,
            json!({"error": "Failed to parse request parameters -- parser exploded"})
        );
        assert!(notice.url.is_none());
    }

    #[test]
    fn session_wrapper_is_unwrapped() {
        let data = Data::from_pairs([("one", "two")]);
        let input = NoticeInput::new().with_session(Data::from_pairs([("data", data)]));
        let notice = build(&input, &configure());
        assert_eq!(notice.session_data, Some(json!({"one": "two"})));
    }

    #[test]
    fn session_disabled_forces_none() {
        let config = configure().with_send_request_session(false);
        let input = NoticeInput::new().with_session_data(Data::from_pairs([("foo", "bar")]));
        assert!(build(&input, &config).session_data.is_none());
    }

    #[test]
    fn component_and_action_from_parameters() {
        let params = Data::from_pairs([("controller", "users"), ("action", "index"), ("id", "7")]);
        let notice = build(&NoticeInput::new().with_parameters(params), &configure());
        assert_eq!(notice.controller(), Some("users"));
        assert_eq!(notice.action.as_deref(), Some("index"));
    }

    #[test]
    fn context_merges_store_and_report() {
        let store = ContextStore::new();
        store.merge([("one", "two"), ("foo", "bar")]);
        let input = NoticeInput::new().with_context(Data::from_pairs([("three", "four"), ("foo", "baz")]));
        let config = configure();
        let notice = Assembler::new(&config).with_context(&store).build(&input);
        assert_eq!(
            notice.context,
            Some(json!({"one": "two", "foo": "baz", "three": "four"}))
        );
    }

    #[test]
    fn falsey_context_values_survive() {
        let store = ContextStore::new();
        store.merge([("debuga", true), ("debugb", false)]);
        let config = configure();
        let notice = Assembler::new(&config).with_context(&store).build(&NoticeInput::new());
        assert_eq!(notice.context, Some(json!({"debuga": true, "debugb": false})));
    }

    #[test]
    fn fingerprint_is_hashed() {
        let notice = build(&NoticeInput::new().with_fingerprint("foo"), &configure());
        assert_eq!(
            notice.fingerprint.as_deref(),
            Some("0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33")
        );

        let config = configure().with_fingerprint(Fingerprint::computed(|_| Some("foo".into())));
        let notice = build(&NoticeInput::new(), &config);
        assert_eq!(
            notice.fingerprint.as_deref(),
            Some("0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33")
        );
    }

    #[test]
    fn fingerprint_callback_sees_notice() {
        let config = configure().with_fingerprint(Fingerprint::computed(|n| Some(n.error_class.clone())));
        let notice = build(&NoticeInput::new().with_error_class("foo"), &config);
        assert_eq!(notice.fingerprint, Some(digest("foo")));
    }

    #[test]
    fn post_build_hook_rewrites_notice() {
        let config = configure().with_notice_post_build(|n| {
            if n.error_class == "StandardError" {
                n.error_message.clear();
            }
        });
        let input = NoticeInput::from_exception(Exception::new("StandardError", "error"));
        assert_eq!(build(&input, &config).error_message, "");
    }

    #[test]
    fn panicking_hook_still_yields_notice() {
        let config = configure().with_notice_post_build(|_| panic!("hook failed"));
        let notice = build(&NoticeInput::new().with_error_class("X"), &config);
        assert_eq!(notice.error_class, "X");
    }

    #[test]
    fn self_referencing_parameters_are_halted() {
        let params = faultline_sanitize::SharedData::new(Data::from_pairs([("a", "a")]));
        params.insert("hash", params.clone());
        let notice = build(&NoticeInput::new().with_parameters(params), &configure());
        assert_eq!(notice.parameters["hash"], RECURSION_HALTED);
    }

    #[test]
    fn self_referencing_shared_context_is_halted() {
        let node = faultline_sanitize::SharedData::new(Data::map());
        node.insert("me", node.clone());
        let notice = build(&NoticeInput::new().with_context(Data::Shared(node)), &configure());
        assert_eq!(notice.context, Some(json!({"me": {"me": RECURSION_HALTED}})));
    }

    #[test]
    fn adapter_without_parameters_defers_to_env() {
        let request = RequestSnapshot::new().with_location("http", "some.host", "/");
        let env = RequestEnv::new().with("QUERY_STRING", "foo=bar");
        let notice = build(&NoticeInput::new().with_request(request).with_env(env), &configure());
        assert_eq!(notice.parameters, json!({"foo": "bar"}));
        assert_eq!(notice.url.as_deref(), Some("http://some.host/"));
    }

    #[test]
    fn rendered_extract_takes_precedence() {
        let exception = Exception::new("ActionView::Template::Error", "boom")
            .with_source_extract("      1:   <%= current_user.name %>\n      2: </div>\n");
        let notice = build(&NoticeInput::from_exception(exception), &configure());
        let extract = notice.source_extract.unwrap();
        assert_eq!(extract.get("1"), Some("  <%= current_user.name %>"));
        assert_eq!(extract.get("2"), Some("</div>"));
    }

    #[test]
    fn missing_backtrace_falls_back_to_caller() {
        let notice = build(&NoticeInput::from_exception(Exception::new("E", "m")), &configure());
        assert!(notice.backtrace.lines().iter().all(|l| {
            l.file.as_deref().map_or(true, |f| !f.contains("faultline-notice/src/"))
        }));
    }

    #[test]
    fn per_report_overrides() {
        let input = NoticeInput::new()
            .with_hostname("asdf")
            .with_environment_name("development")
            .with_project_root("/path/to/project");
        let notice = build(&input, &configure());
        assert_eq!(notice.hostname, "asdf");
        assert_eq!(notice.environment_name.as_deref(), Some("development"));
        assert_eq!(notice.project_root.as_deref(), Some("/path/to/project"));
    }
}
