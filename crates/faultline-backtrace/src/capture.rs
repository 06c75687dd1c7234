//! Caller stack capture

/// Symbol prefixes belonging to the capture machinery itself
const SKIPPED_PREFIXES: &[&str] = &["backtrace::", "faultline_backtrace::", "std::backtrace"];

/// Capture the current call stack as raw frame strings
///
/// Frames are rendered as `file:line:in `symbol'` when debug info is
/// available, or as the bare symbol name otherwise. Frames from the capture
/// machinery are skipped.
#[must_use]
pub fn caller_lines() -> Vec<String> {
    let mut lines = Vec::new();
    ::backtrace::trace(|frame| {
        ::backtrace::resolve_frame(frame, |symbol| {
            let Some(name) = symbol.name().map(|n| format!("{n:#}")) else {
                return;
            };
            if SKIPPED_PREFIXES.iter().any(|p| name.starts_with(p)) {
                return;
            }
            let line = match (symbol.filename(), symbol.lineno()) {
                (Some(file), Some(number)) => format!("{}:{number}:in `{name}'", file.display()),
                _ => name,
            };
            lines.push(line);
        });
        true
    });
    lines
}
