//! The two checking procedures built on top of [`StrategySession`].
//!
//! [`GeneratorProbe`] stress-generates randomized strategies against the
//! current build and checks each one for internal consistency;
//! [`CompatProbe`] harvests strategies from legacy builds and checks that
//! the current build still restores and renders them. Both run strictly
//! sequentially, own the sessions they are given for the duration of a run,
//! and close them on every exit path. Every detected anomaly is terminal:
//! no retries, no partial success.
//!
//! [`StrategySession`]: crate::session::StrategySession

pub mod compat;
pub mod generator;

pub use compat::{CompatConfig, CompatProbe, CompatReport};
pub use generator::{GeneratorConfig, GeneratorProbe, GeneratorReport};

use crate::result::ProbeError;
use crate::verifier::VerifierError;

/// Lift a verifier outcome into the probe taxonomy, attaching the
/// reproduction context the parser itself cannot know.
pub(crate) fn grammar_error(
    err: VerifierError,
    seed: Option<String>,
    strategy: String,
) -> ProbeError {
    match err {
        VerifierError::Rejected { message } => ProbeError::GrammarRejected {
            seed,
            strategy,
            message,
        },
        VerifierError::Unavailable { message } => ProbeError::VerifierUnavailable { message },
    }
}
