//! Faultline Sanitizer
//!
//! Turns untrusted, arbitrarily nested report data into a bounded,
//! JSON-representable value.
//!
//! # Core Concepts
//!
//! - [`Data`]: raw input values, including cyclic [`SharedData`] nodes and host objects
//! - [`Inspect`]: capability check for host objects (mapping, sequence, or string)
//! - [`KeyFilter`]: exact or pattern rules naming sensitive keys
//! - [`Sanitizer`]: the recursive converter
//! - [`filter_url`]: query-string redaction
//!
//! # Example
//!
//! ```rust
//! use faultline_sanitize::{sanitize, Data, KeyFilter, DEFAULT_MAX_DEPTH};
//!
//! let params = Data::from_pairs([("password", "hunter2"), ("page", "3")]);
//! let clean = sanitize(&params, &[KeyFilter::exact("password")], DEFAULT_MAX_DEPTH);
//! assert_eq!(clean["password"], "[FILTERED]");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod data;
mod filter;
mod redact;
mod sanitizer;

pub use data::{Conversion, Data, Inspect, SharedData};
pub use filter::{any_match, FilterError, KeyFilter, FILTERED};
pub use redact::filter_url;
pub use sanitizer::{
    sanitize, Sanitizer, DEFAULT_MAX_DEPTH, DEPTH_EXCEEDED, FORM_VARS_KEY, RECURSION_HALTED,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
