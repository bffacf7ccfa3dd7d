//! Result and error types for the probes.

use crate::console::ConsoleEntry;
use thiserror::Error;

/// Result type for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the application under test.
///
/// Every variant is terminal for the run: probes never retry and never
/// report partial success. Variants carry enough context to reproduce the
/// failure without re-running the loop.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser could not be launched
    #[error("failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation failed
    #[error("navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// JavaScript evaluation in the page failed
    #[error("page evaluation failed: {message}")]
    Evaluation {
        /// Error message
        message: String,
    },

    /// Operation exceeded its configured timeout
    #[error("operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// An expected DOM element is absent
    #[error("no element matches selector {selector:?}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// Deployment address could not be resolved
    #[error("cannot resolve deployment {tag}: {message}")]
    DeploymentUnresolvable {
        /// Symbolic deployment tag
        tag: String,
        /// Error message
        message: String,
    },

    /// Rendered strategy text has no line carrying the URL-hash marker
    #[error("rendered strategy contains no URL-hash line")]
    MissingHashLine,

    /// Rendered strategy text was rejected by the external grammar parser
    #[error("strategy{} could not be parsed: {}\n{}", seed_suffix(.seed), .message, .strategy)]
    GrammarRejected {
        /// Generation seed, when the strategy came from the generator
        seed: Option<String>,
        /// Full rendered strategy text, for reproduction
        strategy: String,
        /// Parser diagnostic
        message: String,
    },

    /// Validation-errors region reported a non-empty error list
    #[error("strategy has validation errors {errors}:\n{strategy}")]
    ValidationErrors {
        /// Raw content of the validation-errors region
        errors: String,
        /// Offending rendered strategy text
        strategy: String,
    },

    /// JSON encode/decode round trip did not reproduce the strategy
    #[error("JSON round trip reported {result:?} instead of success:\n{strategy}")]
    RoundTripMismatch {
        /// Raw content of the round-trip result region
        result: String,
        /// Offending rendered strategy text
        strategy: String,
    },

    /// Restoring a strategy from its URL hash failed
    #[error("restoring strategy from URL failed: {notification}\n{issue_body}")]
    RestorationFailed {
        /// Notification text shown by the application
        notification: String,
        /// Percent-decoded body of the auto-generated issue report
        issue_body: String,
    },

    /// Issue-report URL violates the reporting contract
    #[error("issue-report URL contract violated: {message}")]
    IssueReportContract {
        /// Which clause failed
        message: String,
    },

    /// Mean encoded-strategy length drifted outside the tolerance band
    #[error("mean hash length {mean:.1} outside {center:.0}±{tolerance:.0}")]
    StatisticalDrift {
        /// Observed mean length
        mean: f64,
        /// Configured nominal center
        center: f64,
        /// Configured tolerance
        tolerance: f64,
    },

    /// Browser console produced warning-or-above entries
    #[error(
        "browser console contained {} warning-or-above entries:\n{}",
        .entries.len(),
        format_entries(.entries)
    )]
    ConsoleNoise {
        /// All offending entries, for triage
        entries: Vec<ConsoleEntry>,
    },

    /// External grammar parser could not be invoked at all
    #[error("grammar parser unavailable: {message}")]
    VerifierUnavailable {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn seed_suffix(seed: &Option<String>) -> String {
    seed.as_deref()
        .map(|s| format!(" (seed {s})"))
        .unwrap_or_default()
}

fn format_entries(entries: &[ConsoleEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
