//! Browser console capture.
//!
//! The application under test is expected to stay silent at warning level
//! and above; anything louder fails a generation run. Entries are captured
//! in-page by an injected interception script and collected once per
//! session via a JSON round trip, so the collected sequence is finite and
//! consumed by reading it.

use crate::result::ProbeResult;
use serde::Deserialize;
use std::fmt;

/// Console message severity, ordered from quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConsoleSeverity {
    /// console.log, console.debug
    Log,
    /// console.info
    Info,
    /// console.warn
    Warn,
    /// console.error, uncaught errors, unhandled rejections
    Error,
}

impl ConsoleSeverity {
    /// Map a label reported by the capture script to a severity.
    /// Unknown labels are treated as plain logs.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "info" => Self::Info,
            _ => Self::Log,
        }
    }
}

impl fmt::Display for ConsoleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One captured console message.
#[derive(Debug, Clone)]
pub struct ConsoleEntry {
    /// Severity level
    pub severity: ConsoleSeverity,
    /// Message text
    pub text: String,
    /// Source file, when the page reported one
    pub source: Option<String>,
    /// Line number within the source
    pub line: u32,
    /// Milliseconds since page load
    pub timestamp: f64,
}

impl ConsoleEntry {
    /// Create an entry with just a severity and text.
    #[must_use]
    pub fn new(severity: ConsoleSeverity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            source: None,
            line: 0,
            timestamp: 0.0,
        }
    }
}

impl fmt::Display for ConsoleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.text)?;
        if let Some(source) = &self.source {
            write!(f, " ({}:{})", source, self.line)?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    severity: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    timestamp: f64,
}

/// Script injected after every navigation. Wraps the console methods and
/// window error hooks, appending entries to a page-global buffer that
/// [`COLLECT_JS`] later drains.
pub const CAPTURE_JS: &str = r#"
(() => {
    if (window.__nssConsoleLog) { return true; }
    const buffer = [];
    window.__nssConsoleLog = buffer;
    const started = Date.now();
    const record = (severity, args) => {
        buffer.push({
            severity,
            text: args.map(a => {
                try { return typeof a === 'string' ? a : JSON.stringify(a); }
                catch (_) { return String(a); }
            }).join(' '),
            timestamp: Date.now() - started
        });
    };
    for (const level of ['log', 'info', 'warn', 'error']) {
        const original = console[level].bind(console);
        console[level] = (...args) => { record(level, args); original(...args); };
    }
    window.addEventListener('error', e => {
        buffer.push({
            severity: 'error',
            text: 'Uncaught: ' + e.message,
            source: e.filename || null,
            line: e.lineno || 0,
            timestamp: Date.now() - started
        });
    });
    window.addEventListener('unhandledrejection', e => {
        record('error', ['Unhandled rejection: ' + e.reason]);
    });
    return true;
})()
"#;

/// Script that drains the page-global buffer and returns it as JSON.
/// Draining in-page keeps the "read once" semantics even if the caller
/// collects more than once.
pub const COLLECT_JS: &str =
    "(() => { const l = window.__nssConsoleLog || []; window.__nssConsoleLog = []; return JSON.stringify(l); })()";

/// Decode the JSON produced by [`COLLECT_JS`].
pub fn parse_entries(json: &str) -> ProbeResult<Vec<ConsoleEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .map(|r| ConsoleEntry {
            severity: ConsoleSeverity::from_label(&r.severity),
            text: r.text,
            source: r.source,
            line: r.line,
            timestamp: r.timestamp,
        })
        .collect())
}

/// Keep only entries at or above the given severity.
#[must_use]
pub fn at_or_above(entries: Vec<ConsoleEntry>, min: ConsoleSeverity) -> Vec<ConsoleEntry> {
    entries.into_iter().filter(|e| e.severity >= min).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_matches_loudness() {
        assert!(ConsoleSeverity::Log < ConsoleSeverity::Info);
        assert!(ConsoleSeverity::Info < ConsoleSeverity::Warn);
        assert!(ConsoleSeverity::Warn < ConsoleSeverity::Error);
    }

    #[test]
    fn unknown_labels_are_logs() {
        assert_eq!(ConsoleSeverity::from_label("debug"), ConsoleSeverity::Log);
        assert_eq!(ConsoleSeverity::from_label("WARNING"), ConsoleSeverity::Warn);
        assert_eq!(ConsoleSeverity::from_label("Error"), ConsoleSeverity::Error);
    }

    #[test]
    fn parse_entries_decodes_capture_output() {
        let json = r#"[
            {"severity":"warn","text":"slow handler","timestamp":12.5},
            {"severity":"error","text":"Uncaught: boom","source":"app.js","line":7,"timestamp":99.0}
        ]"#;
        let entries = parse_entries(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, ConsoleSeverity::Warn);
        assert_eq!(entries[1].source.as_deref(), Some("app.js"));
        assert_eq!(entries[1].line, 7);
    }

    #[test]
    fn parse_entries_tolerates_missing_fields() {
        let entries = parse_entries(r#"[{}]"#).unwrap();
        assert_eq!(entries[0].severity, ConsoleSeverity::Log);
        assert!(entries[0].text.is_empty());
    }

    #[test]
    fn at_or_above_filters_quiet_entries() {
        let entries = vec![
            ConsoleEntry::new(ConsoleSeverity::Log, "noise"),
            ConsoleEntry::new(ConsoleSeverity::Info, "fyi"),
            ConsoleEntry::new(ConsoleSeverity::Warn, "careful"),
            ConsoleEntry::new(ConsoleSeverity::Error, "boom"),
        ];
        let loud = at_or_above(entries, ConsoleSeverity::Warn);
        assert_eq!(loud.len(), 2);
        assert!(loud.iter().all(|e| e.severity >= ConsoleSeverity::Warn));
    }

    #[test]
    fn display_includes_source_location() {
        let mut entry = ConsoleEntry::new(ConsoleSeverity::Error, "boom");
        entry.source = Some("app.js".to_string());
        entry.line = 42;
        assert_eq!(entry.to_string(), "[error] boom (app.js:42)");
    }
}
