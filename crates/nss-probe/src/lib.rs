//! Browser-driven round-trip compatibility probes for the natural strategy
//! setup web application.
//!
//! The application under test authors an investment strategy in the
//! browser, renders it to text, and encodes it into a URL fragment that
//! must stay decodable across application versions. This crate drives the
//! application through a real Chromium instance and checks both halves of
//! that round trip:
//!
//! ```text
//! ┌───────────────────┐        ┌────────────────────┐
//! │  GeneratorProbe   │        │    CompatProbe     │
//! │  N random         │        │  harvest hash on   │
//! │  strategies on    │        │  legacy build,     │
//! │  current build    │        │  restore on        │
//! │                   │        │  current build     │
//! └─────────┬─────────┘        └───────┬──────┬─────┘
//!           │                          │      │
//!           ▼                          ▼      ▼
//!      StrategySession            StrategySession ×2
//!      (CDP / scripted)                 │
//!           │                           │
//!           └──────────┬────────────────┘
//!                      ▼
//!              StrategyVerifier (external grammar parser)
//! ```
//!
//! Probes are strictly sequential and fail-fast: any structural absence,
//! grammar rejection, restoration failure, consistency violation,
//! statistical drift, or console noise terminates the run. Sessions are
//! closed on every exit path.

#![warn(missing_docs)]

pub mod console;
pub mod deployment;
pub mod issue_report;
pub mod probe;
pub mod progress;
pub mod result;
pub mod session;
pub mod strategy;
#[cfg(not(target_arch = "wasm32"))]
pub mod telemetry;
pub mod verifier;

pub use console::{ConsoleEntry, ConsoleSeverity};
pub use deployment::Deployment;
pub use issue_report::IssueReport;
pub use probe::{
    CompatConfig, CompatProbe, CompatReport, GeneratorConfig, GeneratorProbe, GeneratorReport,
};
pub use progress::{ConsoleProgressBar, NullObserver, ProgressObserver};
pub use result::{ProbeError, ProbeResult};
#[cfg(feature = "browser")]
pub use session::CdpSession;
pub use session::{ScriptedSession, SessionConfig, StrategySession};
pub use strategy::{extract_hash, HashLengthStats, RenderedStrategy, HASH_MARKER};
pub use verifier::{CommandVerifier, FnVerifier, StrategyVerifier, VerifierError};
