//! Randomized-strategy soundness checking against the current build.

use crate::console::ConsoleSeverity;
use crate::deployment::Deployment;
use crate::progress::ProgressObserver;
use crate::result::{ProbeError, ProbeResult};
use crate::session::StrategySession;
use crate::strategy::{extract_hash, HashLengthStats};
use crate::verifier::StrategyVerifier;
use tracing::{error, info};

/// Expected content of the validation-errors region for a sound strategy.
pub const NO_VALIDATION_ERRORS: &str = "[]";

/// Expected content of the round-trip result region for a sound strategy.
pub const ROUNDTRIP_OK: &str = "Ok";

/// Configuration of a generation run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Deployment to generate against
    pub deployment: Deployment,
    /// Number of strategies to generate
    pub iterations: usize,
    /// Nominal center of the mean encoded-strategy length
    pub expected_mean_hash_len: f64,
    /// Tolerance around the nominal center
    pub hash_len_tolerance: f64,
}

impl GeneratorConfig {
    /// Defaults: 1000 generations, mean hash length expected within
    /// 2000 ± 100 characters.
    #[must_use]
    pub fn new(deployment: Deployment) -> Self {
        Self {
            deployment,
            iterations: 1000,
            expected_mean_hash_len: 2000.0,
            hash_len_tolerance: 100.0,
        }
    }

    /// Set the number of generations.
    #[must_use]
    pub const fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the expected mean encoded length and its tolerance.
    #[must_use]
    pub const fn hash_len_band(mut self, center: f64, tolerance: f64) -> Self {
        self.expected_mean_hash_len = center;
        self.hash_len_tolerance = tolerance;
        self
    }
}

/// Outcome of a successful generation run.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorReport {
    /// Number of strategies generated and checked
    pub iterations: usize,
    /// Observed mean encoded-strategy length
    pub mean_hash_len: f64,
}

/// Stress-generates randomized strategies and checks each one: the grammar
/// parser must accept the rendered text, the validation-errors region must
/// be empty, the JSON round trip must succeed, and at the end of the run
/// the mean encoded length must sit in its tolerance band and the browser
/// console must have stayed quiet.
#[derive(Debug)]
pub struct GeneratorProbe {
    config: GeneratorConfig,
}

impl GeneratorProbe {
    /// Create a probe with the given configuration.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Run the full generation loop. The session is closed on every exit
    /// path; the first error wins.
    pub async fn run<S, V, O>(
        &self,
        session: &mut S,
        verifier: &V,
        observer: &mut O,
    ) -> ProbeResult<GeneratorReport>
    where
        S: StrategySession,
        V: StrategyVerifier,
        O: ProgressObserver,
    {
        let outcome = self.check(session, verifier, observer).await;
        let closed = session.close().await;
        let report = outcome?;
        closed?;
        Ok(report)
    }

    async fn check<S, V, O>(
        &self,
        session: &mut S,
        verifier: &V,
        observer: &mut O,
    ) -> ProbeResult<GeneratorReport>
    where
        S: StrategySession,
        V: StrategyVerifier,
        O: ProgressObserver,
    {
        info!(
            deployment = %self.config.deployment,
            iterations = self.config.iterations,
            "generating random strategies"
        );
        session.open(&self.config.deployment).await?;

        let mut stats = HashLengthStats::new();
        for i in 1..=self.config.iterations {
            session.next_strategy().await?;
            let strategy = session.rendered_strategy().await?;
            stats.record(extract_hash(&strategy)?.len());

            if let Err(err) = verifier.verify(&strategy).await {
                let seed = session.strategy_seed().await?;
                return Err(super::grammar_error(err, Some(seed), strategy));
            }

            let errors = session.validation_errors().await?;
            if errors != NO_VALIDATION_ERRORS {
                return Err(ProbeError::ValidationErrors { errors, strategy });
            }

            let roundtrip = session.json_roundtrip_result().await?;
            if roundtrip != ROUNDTRIP_OK {
                return Err(ProbeError::RoundTripMismatch {
                    result: roundtrip,
                    strategy,
                });
            }

            observer.on_progress(i, self.config.iterations);
        }

        let mean = stats.assert_within(
            self.config.expected_mean_hash_len,
            self.config.hash_len_tolerance,
        )?;

        let noise = session.console_entries(ConsoleSeverity::Warn).await?;
        if !noise.is_empty() {
            for entry in &noise {
                error!("console: {entry}");
            }
            return Err(ProbeError::ConsoleNoise { entries: noise });
        }

        info!(mean_hash_len = mean, "generation run passed");
        Ok(GeneratorReport {
            iterations: self.config.iterations,
            mean_hash_len: mean,
        })
    }
}
