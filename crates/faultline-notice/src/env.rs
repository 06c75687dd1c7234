//! Raw request environment
//!
//! A flat, string-keyed mapping of CGI-style variables, optionally holding
//! framework-parsed parameters and the session under well-known keys.

use crate::error::AdapterError;
use faultline_sanitize::Data;
use indexmap::IndexMap;

/// Framework-parsed parameters
pub const PARAMETERS_KEY: &str = "action_dispatch.request.parameters";
/// Session mapping
pub const SESSION_KEY: &str = "rack.session";
/// Request body
pub const INPUT_KEY: &str = "rack.input";
/// URL scheme
pub const URL_SCHEME_KEY: &str = "rack.url_scheme";

const STRUCTURED_KEYS: &[&str] = &[PARAMETERS_KEY, SESSION_KEY, INPUT_KEY];

/// Request environment mapping
#[derive(Debug, Clone, Default)]
pub struct RequestEnv {
    vars: IndexMap<String, Data>,
}

impl RequestEnv {
    /// Create an empty environment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Data>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Set a variable
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Data>) {
        self.vars.insert(key.into(), value.into());
    }

    /// With a variable set
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Data>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a variable
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Data> {
        self.vars.get(key)
    }

    /// Look up a non-empty string variable
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Data::as_str).filter(|s| !s.is_empty())
    }

    /// Check if no variables are set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Reconstruct the request URL
    ///
    /// Needs `HTTP_HOST` or `SERVER_NAME`; the port is omitted when it is the
    /// scheme's default.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        let scheme = self.scheme();
        let authority = match self.get_str("HTTP_HOST") {
            Some(host) => host.to_string(),
            None => {
                let name = self.get_str("SERVER_NAME")?;
                match self.get_str("SERVER_PORT") {
                    Some(port) if !is_default_port(scheme, port) => format!("{name}:{port}"),
                    _ => name.to_string(),
                }
            }
        };

        let mut url = format!("{scheme}://{authority}");
        url.push_str(self.get_str("SCRIPT_NAME").unwrap_or_default());
        url.push_str(self.get_str("PATH_INFO").unwrap_or_default());
        if let Some(query) = self.get_str("QUERY_STRING") {
            url.push('?');
            url.push_str(query);
        }
        Some(url)
    }

    fn scheme(&self) -> &str {
        if let Some(scheme) = self.get_str(URL_SCHEME_KEY) {
            scheme
        } else if self.get_str("HTTPS").is_some_and(|v| v.eq_ignore_ascii_case("on")) {
            "https"
        } else {
            "http"
        }
    }

    /// Request parameters
    ///
    /// Framework-parsed parameters win; otherwise the query string and a
    /// form-encoded body are decoded, body values overriding query values.
    ///
    /// # Errors
    /// Returns error if the query string or body has a malformed escape
    pub fn parameters(&self) -> Result<Data, AdapterError> {
        if let Some(parsed) = self.get(PARAMETERS_KEY) {
            return Ok(parsed.clone());
        }

        let mut params: IndexMap<String, Data> = IndexMap::new();
        if let Some(query) = self.get_str("QUERY_STRING") {
            for (k, v) in parse_form(query)? {
                params.insert(k, Data::Str(v));
            }
        }
        if let Some(body) = self.form_body() {
            for (k, v) in parse_form(body)? {
                params.insert(k, Data::Str(v));
            }
        }
        Ok(Data::from_pairs(params))
    }

    fn form_body(&self) -> Option<&str> {
        let form_typed = self.get_str("CONTENT_TYPE").map_or(true, |ct| {
            ct.starts_with("application/x-www-form-urlencoded") || ct.starts_with("multipart/form-data")
        });
        if form_typed {
            self.get_str(INPUT_KEY)
        } else {
            None
        }
    }

    /// Session mapping, if present
    #[must_use]
    pub fn session(&self) -> Option<Data> {
        self.get(SESSION_KEY).cloned()
    }

    /// Environment minus the structured sub-keys
    #[must_use]
    pub fn cgi_data(&self) -> Data {
        Data::Map(
            self.vars
                .iter()
                .filter(|(k, _)| !STRUCTURED_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl From<RequestEnv> for Data {
    fn from(env: RequestEnv) -> Self {
        Data::from_pairs(env.vars)
    }
}

fn is_default_port(scheme: &str, port: &str) -> bool {
    matches!((scheme, port), ("http", "80") | ("https", "443"))
}

/// Strict `application/x-www-form-urlencoded` decoding
fn parse_form(input: &str) -> Result<Vec<(String, String)>, AdapterError> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode_component(key)?, decode_component(value)?))
        })
        .collect()
}

fn decode_component(raw: &str) -> Result<String, AdapterError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hi = bytes.get(i + 1).and_then(|b| char::from(*b).to_digit(16));
                let lo = bytes.get(i + 2).and_then(|b| char::from(*b).to_digit(16));
                match (hi, lo) {
                    #[allow(clippy::cast_possible_truncation)]
                    (Some(hi), Some(lo)) => out.push((hi * 16 + lo) as u8),
                    _ => return Err(AdapterError::InvalidEncoding(raw.to_string())),
                }
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}
