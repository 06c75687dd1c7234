//! Recursive value sanitizer
//!
//! Converts [`Data`] into a JSON value that is always serializable:
//! - shared nodes and host objects already on the current path are replaced
//!   by [`RECURSION_HALTED`] instead of being walked again
//! - containers nested deeper than the configured limit become [`DEPTH_EXCEEDED`]
//! - host objects are converted through [`Inspect`](crate::Inspect) or rendered as strings
//! - values under keys matched by a [`KeyFilter`] become [`FILTERED`]
//!
//! The output never shares structure with the input.

use crate::data::{object_identity, Conversion, Data};
use crate::filter::{any_match, KeyFilter, FILTERED};
use serde_json::{Map, Number, Value};

/// Marker emitted at a cyclic position
pub const RECURSION_HALTED: &str = "[possible infinite recursion halted]";

/// Marker emitted for containers past the depth limit
pub const DEPTH_EXCEEDED: &str = "[max depth exceeded]";

/// Default nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// CGI key that is dropped before filtering
pub const FORM_VARS_KEY: &str = "rack.request.form_vars";

/// Sanitizer bound to a filter set and depth limit
#[derive(Debug, Clone, Copy)]
pub struct Sanitizer<'a> {
    filters: &'a [KeyFilter],
    max_depth: usize,
}

impl<'a> Sanitizer<'a> {
    /// Create a sanitizer with the default depth limit
    #[inline]
    #[must_use]
    pub fn new(filters: &'a [KeyFilter]) -> Self {
        Self {
            filters,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the depth limit
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sanitize an arbitrary value
    #[must_use]
    pub fn sanitize(&self, value: &Data) -> Value {
        let mut path = Vec::new();
        self.walk(value, 0, &mut path, None)
    }

    /// Sanitize CGI-style data, dropping [`FORM_VARS_KEY`] from the top-level mapping
    #[must_use]
    pub fn sanitize_cgi(&self, value: &Data) -> Value {
        let mut path = Vec::new();
        self.walk(value, 0, &mut path, Some(FORM_VARS_KEY))
    }

    fn walk(&self, value: &Data, depth: usize, path: &mut Vec<usize>, drop_key: Option<&str>) -> Value {
        match value {
            Data::Null => Value::Null,
            Data::Bool(b) => Value::Bool(*b),
            Data::Int(i) => Value::from(*i),
            Data::Float(x) => Number::from_f64(*x)
                .map_or_else(|| Value::String(x.to_string()), Value::Number),
            Data::Str(s) => Value::String(s.clone()),
            Data::Seq(items) => self.sequence(items, depth, path),
            Data::Map(pairs) => self.mapping(pairs, depth, path, drop_key),
            Data::Shared(node) => {
                let id = node.identity();
                if path.contains(&id) {
                    return Value::String(RECURSION_HALTED.to_string());
                }
                path.push(id);
                let out = {
                    let guard = node.read();
                    self.walk(&guard, depth, path, drop_key)
                };
                path.pop();
                out
            }
            Data::Object(object) => {
                let id = object_identity(object);
                if path.contains(&id) {
                    return Value::String(RECURSION_HALTED.to_string());
                }
                match object.convert() {
                    Conversion::Mapping(pairs) => {
                        path.push(id);
                        let out = self.mapping(&pairs, depth, path, drop_key);
                        path.pop();
                        out
                    }
                    Conversion::Sequence(items) => {
                        path.push(id);
                        let out = self.sequence(&items, depth, path);
                        path.pop();
                        out
                    }
                    Conversion::Opaque => Value::String(object.to_string()),
                }
            }
        }
    }

    fn sequence(&self, items: &[Data], depth: usize, path: &mut Vec<usize>) -> Value {
        if depth > self.max_depth {
            return Value::String(DEPTH_EXCEEDED.to_string());
        }
        Value::Array(
            items
                .iter()
                .map(|item| self.walk(item, depth + 1, path, None))
                .collect(),
        )
    }

    fn mapping(
        &self,
        pairs: &[(String, Data)],
        depth: usize,
        path: &mut Vec<usize>,
        drop_key: Option<&str>,
    ) -> Value {
        if depth > self.max_depth {
            return Value::String(DEPTH_EXCEEDED.to_string());
        }
        let mut out = Map::with_capacity(pairs.len());
        for (key, value) in pairs {
            if drop_key == Some(key.as_str()) {
                continue;
            }
            let clean = self.walk(value, depth + 1, path, None);
            // Mappings under a filtered key keep their shape; their own keys
            // were filtered on the way down. Sequences are redacted whole.
            let clean = if !clean.is_object() && any_match(self.filters, key) {
                Value::String(FILTERED.to_string())
            } else {
                clean
            };
            out.insert(key.clone(), clean);
        }
        Value::Object(out)
    }
}

/// Sanitize `value` with `filters` and a depth limit
#[must_use]
pub fn sanitize(value: &Data, filters: &[KeyFilter], max_depth: usize) -> Value {
    Sanitizer::new(filters).with_max_depth(max_depth).sanitize(value)
}
