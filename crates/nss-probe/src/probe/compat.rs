//! Cross-version restorability checking.
//!
//! Strategies authored in an older build must stay restorable by the
//! current build: the URL-hash encoding is the only persistence format the
//! application has, so a hash that no longer decodes silently loses a
//! user's strategy.

use crate::deployment::Deployment;
use crate::issue_report::IssueReport;
use crate::progress::ProgressObserver;
use crate::result::{ProbeError, ProbeResult};
use crate::session::StrategySession;
use crate::strategy::extract_hash;
use crate::verifier::StrategyVerifier;
use tracing::{error, info};

/// Notification prefix the application shows when restoring from the URL
/// hash failed. Locale-specific prose; kept configurable because the
/// application exposes no structured status.
pub const DEFAULT_FAILURE_PREFIX: &str = "Pokus o načtení strategie z URL se nezdařil";

/// Issue-tracker organization the error-reporting link must target.
pub const DEFAULT_ISSUE_ORG: &str = "RoboZonky";

/// Issue-tracker repository the error-reporting link must target.
pub const DEFAULT_ISSUE_REPO: &str = "natural-strategy-setup";

/// Configuration of a compatibility run.
#[derive(Debug, Clone)]
pub struct CompatConfig {
    /// Deployment that must restore the harvested strategies
    pub current: Deployment,
    /// Legacy deployments to harvest strategies from
    pub legacy: Vec<Deployment>,
    /// Strategies to harvest per legacy deployment
    pub iterations: usize,
    /// Notification prefix signalling a failed restoration
    pub failure_prefix: String,
    /// Expected issue-tracker organization
    pub issue_org: String,
    /// Expected issue-tracker repository
    pub issue_repo: String,
}

impl CompatConfig {
    /// Defaults: 200 strategies per legacy deployment, the application's
    /// Czech failure notification, the application's issue tracker.
    #[must_use]
    pub fn new(current: Deployment, legacy: Vec<Deployment>) -> Self {
        Self {
            current,
            legacy,
            iterations: 200,
            failure_prefix: DEFAULT_FAILURE_PREFIX.to_string(),
            issue_org: DEFAULT_ISSUE_ORG.to_string(),
            issue_repo: DEFAULT_ISSUE_REPO.to_string(),
        }
    }

    /// Set the number of strategies harvested per legacy deployment.
    #[must_use]
    pub const fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the failure-notification prefix.
    #[must_use]
    pub fn failure_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.failure_prefix = prefix.into();
        self
    }

    /// Set the expected issue tracker.
    #[must_use]
    pub fn issue_tracker(mut self, org: impl Into<String>, repo: impl Into<String>) -> Self {
        self.issue_org = org.into();
        self.issue_repo = repo.into();
        self
    }
}

/// Outcome of a successful compatibility run.
#[derive(Debug, Clone, Copy)]
pub struct CompatReport {
    /// Legacy deployments checked
    pub deployments: usize,
    /// Strategies successfully restored and re-parsed
    pub restored: usize,
}

/// Harvests strategy hashes from legacy builds and restores each one on the
/// current build.
///
/// Per legacy deployment the loop is: harvest the hash of the currently
/// rendered strategy, open the current build at that hash, read the
/// restoration notification. A failure notification is terminal: the
/// issue-report link is validated and its decoded diagnostic attached to
/// the error. A successful restoration is re-parsed by the grammar parser
/// before the legacy session advances to its next strategy.
#[derive(Debug)]
pub struct CompatProbe {
    config: CompatConfig,
}

impl CompatProbe {
    /// Create a probe with the given configuration.
    #[must_use]
    pub fn new(config: CompatConfig) -> Self {
        Self { config }
    }

    /// Run the full iteration count against every configured legacy
    /// deployment, fail-fast. Both sessions are closed on every exit path;
    /// the first error wins.
    pub async fn run<L, C, V, O>(
        &self,
        legacy: &mut L,
        current: &mut C,
        verifier: &V,
        observer: &mut O,
    ) -> ProbeResult<CompatReport>
    where
        L: StrategySession,
        C: StrategySession,
        V: StrategyVerifier,
        O: ProgressObserver,
    {
        let outcome = self.check_all(legacy, current, verifier, observer).await;
        let legacy_closed = legacy.close().await;
        let current_closed = current.close().await;
        let report = outcome?;
        legacy_closed?;
        current_closed?;
        Ok(report)
    }

    async fn check_all<L, C, V, O>(
        &self,
        legacy: &mut L,
        current: &mut C,
        verifier: &V,
        observer: &mut O,
    ) -> ProbeResult<CompatReport>
    where
        L: StrategySession,
        C: StrategySession,
        V: StrategyVerifier,
        O: ProgressObserver,
    {
        let mut restored = 0;
        for deployment in &self.config.legacy {
            info!(
                legacy = %deployment,
                iterations = self.config.iterations,
                "checking strategy restorability"
            );
            self.check_deployment(deployment, legacy, current, verifier, observer, &mut restored)
                .await?;
        }
        Ok(CompatReport {
            deployments: self.config.legacy.len(),
            restored,
        })
    }

    async fn check_deployment<L, C, V, O>(
        &self,
        deployment: &Deployment,
        legacy: &mut L,
        current: &mut C,
        verifier: &V,
        observer: &mut O,
        restored: &mut usize,
    ) -> ProbeResult<()>
    where
        L: StrategySession,
        C: StrategySession,
        V: StrategyVerifier,
        O: ProgressObserver,
    {
        legacy.open(deployment).await?;

        for i in 1..=self.config.iterations {
            let harvested = legacy.rendered_strategy().await?;
            let hash = extract_hash(&harvested)?;

            current.open_with_hash(&self.config.current, hash).await?;
            let notification = current.restoration_notification().await?;

            if notification.starts_with(&self.config.failure_prefix) {
                let raw = current.error_reporting_url().await?;
                let report =
                    IssueReport::parse(&raw, &self.config.issue_org, &self.config.issue_repo)?;
                error!(
                    legacy = %deployment,
                    "restoration failed; decoded issue body:\n{}",
                    report.body
                );
                return Err(ProbeError::RestorationFailed {
                    notification,
                    issue_body: report.body,
                });
            }

            let restored_text = current.rendered_strategy().await?;
            verifier
                .verify(&restored_text)
                .await
                .map_err(|err| super::grammar_error(err, None, restored_text))?;

            *restored += 1;
            observer.on_progress(i, self.config.iterations);
            legacy.next_strategy().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::progress::NullObserver;
    use crate::session::ScriptedSession;
    use crate::verifier::{FnVerifier, VerifierError};

    const RESTORED_OK: &str = "Strategie byla úspěšně načtena z URL";

    fn accept_all() -> FnVerifier<impl Fn(&str) -> Result<(), VerifierError> + Send + Sync> {
        FnVerifier::new(|_| Ok(()))
    }

    fn legacy_rendered(hash: &str) -> String {
        format!("Robot má udržovat portfolio.\n# dummy#{hash}\n")
    }

    fn config(iterations: usize) -> CompatConfig {
        let current = Deployment::served(3000);
        let legacy =
            Deployment::legacy("v1", "https://janhrcek.cz/nss-strategy-compat/v1/").unwrap();
        CompatConfig::new(current, vec![legacy]).iterations(iterations)
    }

    fn failure_report_url(body: &str) -> String {
        format!(
            "https://github.com/RoboZonky/natural-strategy-setup/issues/new?title=Unable%20to%20restore&body={body}"
        )
    }

    #[tokio::test]
    async fn harvested_strategies_are_restored_and_reparsed() {
        let mut legacy = ScriptedSession::new();
        legacy.push_rendered(legacy_rendered("hashOne"));
        legacy.push_rendered(legacy_rendered("hashTwo"));

        let mut current = ScriptedSession::new();
        for _ in 0..2 {
            current.push_notification(RESTORED_OK);
            current.push_rendered("Robot má investovat.\n# dummy#whatever\n");
        }

        let report = CompatProbe::new(config(2))
            .run(&mut legacy, &mut current, &accept_all(), &mut NullObserver)
            .await
            .unwrap();

        assert_eq!(report.deployments, 1);
        assert_eq!(report.restored, 2);
        assert_eq!(legacy.count_calls("next"), 2);
        assert!(legacy.is_closed());
        assert!(current.is_closed());

        // Restoration goes through a blank page before loading the hash.
        assert_eq!(
            &current.calls[..2],
            &[
                "navigate:about:blank".to_string(),
                "navigate:http://127.0.0.1:3000/index.html#hashOne".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failure_notification_surfaces_decoded_issue_body() {
        let mut legacy = ScriptedSession::new();
        legacy.push_rendered(legacy_rendered("brokenHash"));

        let mut current = ScriptedSession::new();
        current.push_notification(format!("{DEFAULT_FAILURE_PREFIX}."));
        current.push_report_url(failure_report_url("Hash%3A%20brokenHash%0Achyba%20dekódování"));

        let err = CompatProbe::new(config(1))
            .run(&mut legacy, &mut current, &accept_all(), &mut NullObserver)
            .await
            .unwrap_err();

        match err {
            ProbeError::RestorationFailed { issue_body, .. } => {
                assert_eq!(issue_body, "Hash: brokenHash\nchyba dekódování");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(legacy.is_closed());
        assert!(current.is_closed());
    }

    #[tokio::test]
    async fn malformed_issue_url_is_a_contract_violation() {
        let mut legacy = ScriptedSession::new();
        legacy.push_rendered(legacy_rendered("h"));

        let mut current = ScriptedSession::new();
        current.push_notification(DEFAULT_FAILURE_PREFIX);
        current.push_report_url("http://github.com/RoboZonky/natural-strategy-setup/issues/new?title=t&body=b");

        let err = CompatProbe::new(config(1))
            .run(&mut legacy, &mut current, &accept_all(), &mut NullObserver)
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::IssueReportContract { .. }));
    }

    #[tokio::test]
    async fn unparsable_restored_strategy_aborts_without_seed() {
        let mut legacy = ScriptedSession::new();
        legacy.push_rendered(legacy_rendered("h"));

        let mut current = ScriptedSession::new();
        current.push_notification(RESTORED_OK);
        current.push_rendered("restored text the parser hates");

        let verifier = FnVerifier::new(|_: &str| {
            Err(VerifierError::Rejected {
                message: "no viable alternative".to_string(),
            })
        });

        let err = CompatProbe::new(config(1))
            .run(&mut legacy, &mut current, &verifier, &mut NullObserver)
            .await
            .unwrap_err();

        match err {
            ProbeError::GrammarRejected { seed, strategy, .. } => {
                assert!(seed.is_none());
                assert_eq!(strategy, "restored text the parser hates");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn first_failure_stops_the_harvest() {
        let mut legacy = ScriptedSession::new();
        legacy.push_rendered(legacy_rendered("first"));
        legacy.push_rendered(legacy_rendered("second"));

        let mut current = ScriptedSession::new();
        current.push_notification(format!("{DEFAULT_FAILURE_PREFIX}."));
        current.push_report_url(failure_report_url("diagnostika"));

        let result = CompatProbe::new(config(2))
            .run(&mut legacy, &mut current, &accept_all(), &mut NullObserver)
            .await;

        assert!(result.is_err());
        // Only the first hash was ever attempted and the legacy generator
        // never advanced.
        assert_eq!(current.count_calls("navigate:about:blank"), 1);
        assert_eq!(legacy.count_calls("next"), 0);
    }

    #[tokio::test]
    async fn harvest_without_hash_line_aborts() {
        let mut legacy = ScriptedSession::new();
        legacy.push_rendered("rendered text without the marker");
        let mut current = ScriptedSession::new();

        let err = CompatProbe::new(config(1))
            .run(&mut legacy, &mut current, &accept_all(), &mut NullObserver)
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::MissingHashLine));
        assert!(legacy.is_closed());
        assert!(current.is_closed());
    }

    #[tokio::test]
    async fn each_legacy_deployment_runs_independently() {
        let current = Deployment::served(3000);
        let v1 = Deployment::legacy("v1", "https://janhrcek.cz/nss-strategy-compat/v1/").unwrap();
        let v2 = Deployment::legacy("v2", "https://janhrcek.cz/nss-strategy-compat/v2/").unwrap();
        let probe = CompatProbe::new(CompatConfig::new(current, vec![v1, v2]).iterations(1));

        let mut legacy = ScriptedSession::new();
        legacy.push_rendered(legacy_rendered("fromV1"));
        legacy.push_rendered(legacy_rendered("fromV2"));

        let mut current_session = ScriptedSession::new();
        for _ in 0..2 {
            current_session.push_notification(RESTORED_OK);
            current_session.push_rendered(legacy_rendered("restored"));
        }

        let report = probe
            .run(&mut legacy, &mut current_session, &accept_all(), &mut NullObserver)
            .await
            .unwrap();

        assert_eq!(report.deployments, 2);
        assert_eq!(report.restored, 2);
        assert_eq!(
            legacy.count_calls("navigate:https://janhrcek.cz/nss-strategy-compat/"),
            2
        );
    }
}
