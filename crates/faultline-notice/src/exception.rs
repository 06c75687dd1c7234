//! Captured exceptions
//!
//! An [`Exception`] is the notifier's view of an error value: its class
//! name, message, the names of the classes it descends from, and an optional
//! captured trace. Rust errors have no inheritance, so lineage is declared
//! explicitly with [`Exception::with_ancestor`] or
//! [`Exception::with_ancestor_type`].

use std::any::{type_name, TypeId};
use std::fmt::{self, Display, Formatter};

/// Name of an error class, optionally tied to a concrete Rust type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorType {
    name: String,
    type_id: Option<TypeId>,
}

impl ErrorType {
    /// Error class known only by name
    #[inline]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: None,
        }
    }

    /// Error class for the Rust type `E`
    #[must_use]
    pub fn of<E: 'static>() -> Self {
        Self {
            name: short_type_name::<E>(),
            type_id: Some(TypeId::of::<E>()),
        }
    }

    /// Class name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concrete type, if known
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    /// Same class: by type identity when both sides know it, by name otherwise
    #[must_use]
    pub fn same_as(&self, other: &ErrorType) -> bool {
        match (self.type_id, other.type_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.name == other.name,
        }
    }
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Type name without its module path, keeping generic arguments short too
#[must_use]
pub fn short_type_name<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        match ch {
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                out.push_str(last_path_segment(&segment));
                segment.clear();
                out.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    out.push_str(last_path_segment(&segment));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// An error captured for reporting
#[derive(Debug, Clone)]
pub struct Exception {
    /// Runtime class name
    pub class_name: String,
    /// Error message
    pub message: String,
    /// Class and its ancestors, nearest first
    pub lineage: Vec<ErrorType>,
    /// Raw captured frames, if the error carried a trace
    pub backtrace: Option<Vec<String>>,
    /// Pre-rendered source extract (`"  12: text"` lines)
    pub source_extract: Option<String>,
}

impl Exception {
    /// Exception known by class name and message
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Self {
            lineage: vec![ErrorType::named(class_name.clone())],
            class_name,
            message: message.into(),
            backtrace: None,
            source_extract: None,
        }
    }

    /// Capture a Rust error value
    ///
    /// The class name is the short type name of `E`; the message is its
    /// `Display` output.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let kind = ErrorType::of::<E>();
        Self {
            class_name: kind.name().to_string(),
            message: error.to_string(),
            lineage: vec![kind],
            backtrace: None,
            source_extract: None,
        }
    }

    /// With a message
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// With an ancestor class known by name
    #[inline]
    #[must_use]
    pub fn with_ancestor(mut self, name: impl Into<String>) -> Self {
        self.lineage.push(ErrorType::named(name));
        self
    }

    /// With an ancestor class tied to a Rust type
    #[inline]
    #[must_use]
    pub fn with_ancestor_type<E: 'static>(mut self) -> Self {
        self.lineage.push(ErrorType::of::<E>());
        self
    }

    /// With captured frames
    #[must_use]
    pub fn with_backtrace<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backtrace = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    /// With a pre-rendered source extract
    #[inline]
    #[must_use]
    pub fn with_source_extract(mut self, rendered: impl Into<String>) -> Self {
        self.source_extract = Some(rendered.into());
        self
    }

    /// `"Class: message"`
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{}: {}", self.class_name, self.message)
    }
}

impl Display for Exception {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class_name, self.message)
    }
}
