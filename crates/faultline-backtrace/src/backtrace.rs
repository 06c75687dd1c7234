//! Parsed backtraces

use crate::filter::{SharedLineFilter, PROJECT_ROOT_LABEL};
use crate::line::BacktraceLine;
use serde::{Deserialize, Serialize};

/// Ordered sequence of parsed frames
///
/// Frames dropped by a filter are never present; surviving frames keep
/// their original relative order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Backtrace {
    lines: Vec<BacktraceLine>,
}

impl Backtrace {
    /// Parse raw frames, running each through `filters` in order
    pub fn parse<I, S>(raw: I, filters: &[SharedLineFilter]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = raw
            .into_iter()
            .filter_map(|raw| {
                let parsed = BacktraceLine::parse(raw.as_ref());
                filters
                    .iter()
                    .try_fold(parsed, |line, filter| filter.apply(line))
            })
            .collect();
        Self { lines }
    }

    /// Wrap already-parsed frames
    #[inline]
    #[must_use]
    pub fn from_lines(lines: Vec<BacktraceLine>) -> Self {
        Self { lines }
    }

    /// Parsed frames
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[BacktraceLine] {
        &self.lines
    }

    /// Number of frames
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if there are no frames
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterate over frames
    pub fn iter(&self) -> std::slice::Iter<'_, BacktraceLine> {
        self.lines.iter()
    }

    /// First frame that lies under the project root
    ///
    /// A frame qualifies when its file was rewritten to `[PROJECT_ROOT]` (or
    /// still starts with the literal root) and is not vendored code.
    #[must_use]
    pub fn application_line(&self, project_root: Option<&str>) -> Option<&BacktraceLine> {
        self.lines
            .iter()
            .find(|line| line.file.as_deref().is_some_and(|f| is_application_file(f, project_root)))
    }

    /// Application frame, or the first frame when none qualifies
    #[must_use]
    pub fn extract_line(&self, project_root: Option<&str>) -> Option<&BacktraceLine> {
        self.application_line(project_root).or_else(|| self.lines.first())
    }
}

fn is_application_file(file: &str, project_root: Option<&str>) -> bool {
    let relative = if let Some(rest) = file.strip_prefix(PROJECT_ROOT_LABEL) {
        rest
    } else if let Some(root) = project_root.filter(|r| !r.is_empty()) {
        match file.strip_prefix(root) {
            Some(rest) => rest,
            None => return false,
        }
    } else {
        return false;
    };
    let relative = relative.trim_start_matches(['/', '\\']);
    !relative.starts_with("vendor")
}

impl<'a> IntoIterator for &'a Backtrace {
    type Item = &'a BacktraceLine;
    type IntoIter = std::slice::Iter<'a, BacktraceLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{default_filters, PathPrefixFilter};
    use std::sync::Arc;

    fn fixture() -> Vec<&'static str> {
        vec![
            "my/file/backtrace:3",
            "test/app/rack_test.rb:2:in `build_exception'",
            "test/app/rack_test.rb:52:in `test_delivers_exception_from_rack'",
            "foo/bar/baz.rb:28:in `run'",
        ]
    }

    #[test]
    fn empty_input_gives_empty_backtrace() {
        let bt = Backtrace::parse(Vec::<String>::new(), &[]);
        assert!(bt.is_empty());
    }

    #[test]
    fn filters_can_drop_lines_and_keep_order() {
        let drop_tests: SharedLineFilter = Arc::new(|line: BacktraceLine| {
            if line.file.as_deref().is_some_and(|f| f.starts_with("test/")) {
                None
            } else {
                Some(line)
            }
        });
        let bt = Backtrace::parse(fixture(), &[drop_tests]);
        let files: Vec<_> = bt.iter().filter_map(|l| l.file.as_deref()).collect();
        assert_eq!(files, vec!["my/file/backtrace", "foo/bar/baz.rb"]);
    }

    #[test]
    fn filters_run_in_registration_order() {
        let first: SharedLineFilter = Arc::new(|mut line: BacktraceLine| {
            line.method = Some("first".into());
            Some(line)
        });
        let second: SharedLineFilter = Arc::new(|mut line: BacktraceLine| {
            line.method = line.method.map(|m| format!("{m}+second"));
            Some(line)
        });
        let bt = Backtrace::parse(["a.rb:1"], &[first, second]);
        assert_eq!(bt.lines()[0].method.as_deref(), Some("first+second"));
    }

    #[test]
    fn application_line_prefers_project_frames() {
        let filters = default_filters(Some("test/app/"), &[]);
        let bt = Backtrace::parse(fixture(), &filters);
        let line = bt.extract_line(Some("test/app/")).unwrap();
        assert_eq!(line.file.as_deref(), Some("[PROJECT_ROOT]/rack_test.rb"));
        assert_eq!(line.number.as_deref(), Some("2"));
    }

    #[test]
    fn extract_line_falls_back_to_first() {
        let bt = Backtrace::parse(fixture(), &[]);
        let line = bt.extract_line(Some("/foo/bar")).unwrap();
        assert_eq!(line.file.as_deref(), Some("my/file/backtrace"));
    }

    #[test]
    fn vendored_frames_are_not_application_frames() {
        let filters: Vec<SharedLineFilter> = vec![Arc::new(PathPrefixFilter::project_root("/app"))];
        let bt = Backtrace::parse(["/app/vendor/lib.rb:1", "/app/src/x.rb:9"], &filters);
        let line = bt.application_line(Some("/app")).unwrap();
        assert_eq!(line.number.as_deref(), Some("9"));
    }

    #[test]
    fn literal_root_counts_without_rewrite() {
        let bt = Backtrace::parse(["/lib/x.rb:1", "/srv/app/y.rb:2"], &[]);
        let line = bt.application_line(Some("/srv/app")).unwrap();
        assert_eq!(line.number.as_deref(), Some("2"));
    }

    #[test]
    fn serializes_as_array() {
        let bt = Backtrace::parse(["a.rb:1:in `x'"], &[]);
        let json = serde_json::to_value(&bt).unwrap();
        assert_eq!(json, serde_json::json!([{"number": "1", "file": "a.rb", "method": "x"}]));
    }
}
