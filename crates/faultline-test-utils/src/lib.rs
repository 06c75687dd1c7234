//! Testing utilities for the Faultline workspace
//!
//! Shared fixtures, recording gateways and tracing setup.

#![allow(missing_docs)]

use faultline_notice::{
    Configuration, DeliveryError, DeliveryGateway, Exception, RequestEnv, RequestSnapshot, INPUT_KEY,
    URL_SCHEME_KEY,
};
use faultline_sanitize::Data;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// API key used by [`configure`]
pub const TEST_API_KEY: &str = "abc123def456";

/// Configuration with a test API key and otherwise default settings
pub fn configure() -> Configuration {
    Configuration::default().with_api_key(TEST_API_KEY)
}

/// Framework request carrying one of every request field
pub fn stub_request() -> RequestSnapshot {
    RequestSnapshot::new()
        .with_parameters(Data::from_pairs([("one", "two")]))
        .with_location("http", "some.host", "/some/uri")
        .with_session(Data::from_pairs([("a", "b")]))
        .with_env(Data::from_pairs([("three", "four")]))
}

/// Request environment for `url`, shaped like a server-built CGI mapping
///
/// Query and path are split out; `SERVER_PORT` is set from the URL or the
/// scheme's default.
pub fn mock_env_for(url: &str) -> RequestEnv {
    let (scheme, rest) = url.split_once("://").unwrap_or(("http", url));
    let (authority, path_and_query) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, "/"),
    };
    let (path, query) = path_and_query.split_once('?').unwrap_or((path_and_query, ""));
    let (host, port) = match authority.split_once(':') {
        Some((h, p)) => (h, p.to_string()),
        None if scheme == "https" => (authority, "443".to_string()),
        None => (authority, "80".to_string()),
    };

    RequestEnv::new()
        .with("REQUEST_METHOD", "GET")
        .with("SERVER_NAME", host)
        .with("SERVER_PORT", port)
        .with("QUERY_STRING", query)
        .with("PATH_INFO", path)
        .with("SCRIPT_NAME", "")
        .with(URL_SCHEME_KEY, scheme)
        .with(INPUT_KEY, "")
}

/// Exception with a short application backtrace
pub fn build_exception() -> Exception {
    Exception::new("RuntimeError", "Test exception").with_backtrace(backtrace_array())
}

/// Raw backtrace lines in the interpreted-frame shape
pub fn backtrace_array() -> Vec<String> {
    vec![
        "my/file/backtrace:3".to_string(),
        "test/faultline/rack_test.rb:2:in `build_exception'".to_string(),
        "test/faultline/rack_test.rb:52:in `test_delivers_exception'".to_string(),
        "/usr/lib/ruby/gems/1.8/gems/mocha-0.9.5/lib/mocha/integration/test_unit.rb:18:in `run'".to_string(),
    ]
}

/// Gateway that keeps every payload it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingGateway {
    payloads: Arc<Mutex<Vec<String>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the received payloads
    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().clone()
    }

    /// Number of received payloads
    pub fn count(&self) -> usize {
        self.payloads.lock().len()
    }

    /// Wait on a runtime until `expected` payloads arrived or `timeout` passed
    pub async fn wait_for(&self, expected: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.count() < expected {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    /// Blocking variant of [`RecordingGateway::wait_for`]
    pub fn wait_for_blocking(&self, expected: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.count() < expected {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }
}

impl DeliveryGateway for RecordingGateway {
    fn deliver_serialized(&self, payload: &str) -> Result<(), DeliveryError> {
        self.payloads.lock().push(payload.to_string());
        Ok(())
    }
}

/// Gateway that rejects every payload
#[derive(Debug, Clone, Default)]
pub struct FailingGateway {
    attempts: Arc<Mutex<usize>>,
}

impl FailingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of delivery attempts seen
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl DeliveryGateway for FailingGateway {
    fn deliver_serialized(&self, _payload: &str) -> Result<(), DeliveryError> {
        *self.attempts.lock() += 1;
        Err(DeliveryError::transport("connection refused"))
    }
}

/// Install a test subscriber honoring `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
