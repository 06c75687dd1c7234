//! Faultline Backtrace
//!
//! Parses raw stack-frame strings into structured frames and runs them
//! through an ordered chain of rewrite filters.
//!
//! # Core Concepts
//!
//! - [`BacktraceLine`]: one frame (`file`, `number`, `method`), parsed against a fixed pattern set
//! - [`LineFilter`]: rewrites a frame or drops it
//! - [`Backtrace`]: the filtered, order-preserving frame sequence
//! - [`SourceExtract`]: source lines around the application frame
//! - [`caller_lines`]: capture of the current call stack
//!
//! Parsing is total: a line that matches no pattern becomes an "unknown"
//! frame carrying the raw text as its method.
//!
//! # Example
//!
//! ```rust
//! use faultline_backtrace::{default_filters, Backtrace};
//!
//! let filters = default_filters(Some("/srv/app"), &[]);
//! let bt = Backtrace::parse(["/srv/app/src/main.rs:12:in `main'"], &filters);
//! assert_eq!(bt.lines()[0].file.as_deref(), Some("[PROJECT_ROOT]/src/main.rs"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod backtrace;
mod capture;
mod filter;
mod line;
mod source;

pub use crate::backtrace::Backtrace;
pub use capture::caller_lines;
pub use filter::{
    default_filters, own_frames_filter, DropFiles, LineFilter, PathPrefixFilter, SharedLineFilter,
    StripCurrentDir, DEPENDENCY_ROOT_LABEL, PROJECT_ROOT_LABEL,
};
pub use line::{BacktraceLine, FrameShape};
pub use source::{resolve_path, SourceExtract};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
