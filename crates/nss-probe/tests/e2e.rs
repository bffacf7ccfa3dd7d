//! Probe runs against real deployments.
//!
//! These need a local chromium, a built application, and (for the
//! compatibility run) network access to the hosted legacy builds:
//!
//! ```text
//! cargo test --features browser -- --ignored
//! ```
//!
//! The external grammar parser is invoked as a command taking the rendered
//! strategy on stdin; override it with `NSS_PARSER_CMD`. The current build
//! defaults to `target/testApp.html` and can be overridden with
//! `NSS_APP_HTML`.

#![cfg(feature = "browser")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use nss_probe::probe::compat::{DEFAULT_FAILURE_PREFIX, DEFAULT_ISSUE_ORG, DEFAULT_ISSUE_REPO};
use nss_probe::{
    CdpSession, CommandVerifier, CompatConfig, CompatProbe, ConsoleProgressBar, Deployment,
    GeneratorConfig, GeneratorProbe, IssueReport, SessionConfig, StrategySession,
};

fn parser_command() -> CommandVerifier {
    let program = std::env::var("NSS_PARSER_CMD")
        .unwrap_or_else(|_| "robozonky-strategy-parser".to_string());
    CommandVerifier::new(program, vec![])
}

fn current_build() -> Deployment {
    let path = std::env::var("NSS_APP_HTML").unwrap_or_else(|_| "target/testApp.html".to_string());
    Deployment::current(path).expect("application build not found; compile the app first")
}

#[tokio::test]
#[ignore = "requires chromium and a built application"]
async fn random_strategies_can_be_parsed() {
    nss_probe::telemetry::init();

    let mut session = CdpSession::launch(SessionConfig::new())
        .await
        .expect("browser launch");

    let probe = GeneratorProbe::new(GeneratorConfig::new(current_build()));
    let report = probe
        .run(&mut session, &parser_command(), &mut ConsoleProgressBar::stdout())
        .await
        .expect("generation run");

    println!(
        "\n{} strategies generated, mean hash length {:.1}",
        report.iterations, report.mean_hash_len
    );
}

#[tokio::test]
#[ignore = "requires chromium, a served build on port 3000, and network access"]
async fn legacy_strategies_can_be_restored() {
    nss_probe::telemetry::init();

    let current = Deployment::served(3000);
    let legacy = vec![
        Deployment::legacy("v1", "https://janhrcek.cz/nss-strategy-compat/v1/").expect("v1 url"),
        Deployment::legacy("v2", "https://janhrcek.cz/nss-strategy-compat/v2/").expect("v2 url"),
    ];

    let config = SessionConfig::new().headless(false);
    let mut legacy_session = CdpSession::launch(config.clone()).await.expect("browser launch");
    let mut current_session = CdpSession::launch(config).await.expect("browser launch");

    let probe = CompatProbe::new(CompatConfig::new(current, legacy));
    let report = probe
        .run(
            &mut legacy_session,
            &mut current_session,
            &parser_command(),
            &mut ConsoleProgressBar::stdout(),
        )
        .await
        .expect("compatibility run");

    println!(
        "\n{} strategies restored across {} legacy deployments",
        report.restored, report.deployments
    );
}

#[tokio::test]
#[ignore = "requires chromium and a served build on port 3000"]
async fn malformed_hash_produces_a_well_formed_issue_report() {
    nss_probe::telemetry::init();

    let mut session = CdpSession::launch(SessionConfig::new())
        .await
        .expect("browser launch");
    let current = Deployment::served(3000);

    session
        .open_with_hash(&current, "definitely-not-a-strategy-hash")
        .await
        .expect("navigation");

    let notification = session
        .restoration_notification()
        .await
        .expect("alert region");
    assert!(
        notification.starts_with(DEFAULT_FAILURE_PREFIX),
        "unexpected notification: {notification}"
    );

    let raw = session.error_reporting_url().await.expect("report link");
    let report =
        IssueReport::parse(&raw, DEFAULT_ISSUE_ORG, DEFAULT_ISSUE_REPO).expect("report contract");
    assert!(!report.body.trim().is_empty());

    session.close().await.expect("close");
}
