//! Single stack frame parsing

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Frame shapes recognised by the parser, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameShape {
    /// `path:line:in 'method'` (backtick or quote opening)
    Standard,
    /// `path:line:in method`
    Unquoted,
    /// `at method(path:line)`
    Java,
    /// `path:line` or `path:line:column`
    Bare,
    /// Anything else; the raw text is kept as the method
    Unknown,
}

struct FramePattern {
    shape: FrameShape,
    regex: Regex,
}

#[allow(clippy::expect_used)]
static FRAME_PATTERNS: Lazy<Vec<FramePattern>> = Lazy::new(|| {
    [
        (FrameShape::Standard, r"^(?P<file>.+?):(?P<number>\d+):in [`'](?P<method>.*)'$"),
        (FrameShape::Unquoted, r"^(?P<file>.+?):(?P<number>\d+):in (?P<method>.+)$"),
        (FrameShape::Java, r"^at (?P<method>[^()\s]+)\((?P<file>[^()]+?):(?P<number>\d+)\)$"),
        (FrameShape::Bare, r"^(?P<file>.+?):(?P<number>\d+)(?::\d+)?$"),
    ]
    .into_iter()
    .map(|(shape, pattern)| FramePattern {
        shape,
        regex: Regex::new(pattern).expect("frame pattern is valid"),
    })
    .collect()
});

/// One parsed stack frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BacktraceLine {
    /// Line number, kept as text
    pub number: Option<String>,
    /// Source file path
    pub file: Option<String>,
    /// Method or function name
    pub method: Option<String>,
}

impl BacktraceLine {
    /// Create a frame from its parts
    #[must_use]
    pub fn new(file: Option<&str>, number: Option<&str>, method: Option<&str>) -> Self {
        Self {
            file: file.map(str::to_string),
            number: number.map(str::to_string),
            method: method.map(str::to_string),
        }
    }

    /// Parse one raw frame; never fails
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::parse_with_shape(raw).0
    }

    /// Parse one raw frame and report which shape matched
    #[must_use]
    pub fn parse_with_shape(raw: &str) -> (Self, FrameShape) {
        let text = raw.trim();
        for pattern in FRAME_PATTERNS.iter() {
            if let Some(caps) = pattern.regex.captures(text) {
                let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
                let line = Self {
                    number: group("number"),
                    file: group("file"),
                    method: group("method"),
                };
                return (line, pattern.shape);
            }
        }
        (
            Self {
                number: None,
                file: None,
                method: Some(raw.to_string()),
            },
            FrameShape::Unknown,
        )
    }

    /// Line number as an integer, if it parses
    #[must_use]
    pub fn line_number(&self) -> Option<usize> {
        self.number.as_deref().and_then(|n| n.parse().ok())
    }

    /// Check whether neither file nor number could be recovered
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.file.is_none() && self.number.is_none()
    }
}

impl Display for BacktraceLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (&self.file, &self.number, &self.method) {
            (Some(file), Some(number), Some(method)) => write!(f, "{file}:{number}:in `{method}'"),
            (Some(file), Some(number), None) => write!(f, "{file}:{number}"),
            (Some(file), None, _) => f.write_str(file),
            (None, _, Some(method)) => f.write_str(method),
            (None, _, None) => Ok(()),
        }
    }
}
