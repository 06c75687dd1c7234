//! Source extracts around a frame

use crate::filter::PROJECT_ROOT_LABEL;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Line number (as text) to source line, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceExtract(IndexMap<String, String>);

impl SourceExtract {
    /// Read `radius` lines on each side of `line` (1-based) from `path`
    ///
    /// Returns `None` when the file cannot be read or the window is empty.
    pub fn read(path: impl AsRef<Path>, line: usize, radius: usize) -> Option<Self> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "source file unreadable, skipping extract");
                return None;
            }
        };

        let first = line.saturating_sub(radius).max(1);
        let last = line.saturating_add(radius);
        let lines: IndexMap<_, _> = contents
            .lines()
            .enumerate()
            .map(|(i, text)| (i + 1, text))
            .skip_while(|(n, _)| *n < first)
            .take_while(|(n, _)| *n <= last)
            .map(|(n, text)| (n.to_string(), text.to_string()))
            .collect();

        if lines.is_empty() {
            tracing::debug!(path = %path.display(), line, "line outside file, skipping extract");
            None
        } else {
            Some(Self(lines))
        }
    }

    /// Parse a pre-rendered extract of `"  12: text"` lines
    ///
    /// Lines without a numeric prefix are skipped. One separator space after
    /// the colon is dropped; the remaining indentation is kept.
    #[must_use]
    pub fn parse_rendered(text: &str) -> Self {
        let lines = text
            .lines()
            .filter_map(|raw| {
                let (number, rest) = raw.split_once(':')?;
                let number = number.trim();
                if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let rest = rest.strip_prefix(' ').unwrap_or(rest);
                Some((number.to_string(), rest.to_string()))
            })
            .collect();
        Self(lines)
    }

    /// Extract entries in file order
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &IndexMap<String, String> {
        &self.0
    }

    /// Source line for a line number
    #[must_use]
    pub fn get(&self, number: &str) -> Option<&str> {
        self.0.get(number).map(String::as_str)
    }

    /// Number of lines in the extract
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the extract has no lines
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Map a (possibly label-rewritten) frame file back to a readable path
#[must_use]
pub fn resolve_path(file: &str, project_root: Option<&str>) -> PathBuf {
    match (file.strip_prefix(PROJECT_ROOT_LABEL), project_root) {
        (Some(rest), Some(root)) => {
            let root = root.trim_end_matches(['/', '\\']);
            PathBuf::from(format!("{root}{rest}"))
        }
        _ => PathBuf::from(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source_file(lines: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 1..=lines {
            writeln!(file, "line {i}").unwrap();
        }
        file
    }

    #[test]
    fn reads_window_around_line() {
        let file = source_file(10);
        let extract = SourceExtract::read(file.path(), 5, 2).unwrap();
        let keys: Vec<_> = extract.lines().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["3", "4", "5", "6", "7"]);
        assert_eq!(extract.get("5"), Some("line 5"));
    }

    #[test]
    fn window_is_clamped_to_file() {
        let file = source_file(3);
        let extract = SourceExtract::read(file.path(), 1, 2).unwrap();
        assert_eq!(extract.len(), 3);
        assert_eq!(extract.get("1"), Some("line 1"));
    }

    #[test]
    fn missing_file_gives_none() {
        assert!(SourceExtract::read("/definitely/not/here.rs", 3, 2).is_none());
    }

    #[test]
    fn line_past_end_gives_none() {
        let file = source_file(3);
        assert!(SourceExtract::read(file.path(), 40, 2).is_none());
    }

    #[test]
    fn parses_rendered_template_extract() {
        let rendered = "      1:   <%= current_user.name %>\n      2: </div>\n      3: \n      4: <div>\n";
        let extract = SourceExtract::parse_rendered(rendered);
        let pairs: Vec<_> = extract.lines().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![("1", "  <%= current_user.name %>"), ("2", "</div>"), ("3", ""), ("4", "<div>")]
        );
    }

    #[test]
    fn resolves_project_root_label() {
        assert_eq!(
            resolve_path("[PROJECT_ROOT]/src/a.rs", Some("/srv/app/")),
            PathBuf::from("/srv/app/src/a.rs")
        );
        assert_eq!(resolve_path("src/a.rs", Some("/srv/app")), PathBuf::from("src/a.rs"));
        assert_eq!(
            resolve_path("[PROJECT_ROOT]/a.rs", None),
            PathBuf::from("[PROJECT_ROOT]/a.rs")
        );
    }
}
