//! The issue-report URL contract.
//!
//! When restoring a strategy from a URL hash fails, the application renders
//! a link that pre-fills a GitHub issue with a percent-encoded diagnostic.
//! The probes validate that link strictly: secure transport, the fixed
//! issue-tracker path, exactly one `title` and one `body` parameter, and a
//! non-empty decoded body. A failure report that itself cannot be filed is
//! a bug of its own.

use crate::result::{ProbeError, ProbeResult};
use url::Url;

/// Host the report link must target.
const ISSUE_HOST: &str = "github.com";

/// A validated, decoded issue report extracted from the application's
/// error-reporting link.
#[derive(Debug, Clone)]
pub struct IssueReport {
    /// Pre-filled issue title
    pub title: String,
    /// Percent-decoded diagnostic body
    pub body: String,
}

impl IssueReport {
    /// Parse and validate an error-reporting URL against the contract for
    /// the given issue tracker.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::IssueReportContract`] naming the violated
    /// clause.
    pub fn parse(raw: &str, org: &str, repo: &str) -> ProbeResult<Self> {
        let url = Url::parse(raw).map_err(|e| contract(format!("not a valid URL: {e}")))?;

        if url.scheme() != "https" {
            return Err(contract(format!(
                "insecure transport {:?}, expected https",
                url.scheme()
            )));
        }
        if url.host_str() != Some(ISSUE_HOST) {
            return Err(contract(format!(
                "host {:?}, expected {ISSUE_HOST:?}",
                url.host_str().unwrap_or_default()
            )));
        }
        let expected_path = format!("/{org}/{repo}/issues/new");
        if url.path() != expected_path {
            return Err(contract(format!(
                "path {:?}, expected {expected_path:?}",
                url.path()
            )));
        }

        let mut titles: Vec<String> = Vec::new();
        let mut bodies: Vec<String> = Vec::new();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "title" => titles.push(value.into_owned()),
                "body" => bodies.push(value.into_owned()),
                _ => {}
            }
        }
        let title = exactly_one(titles, "title")?;
        let body = exactly_one(bodies, "body")?;
        if body.trim().is_empty() {
            return Err(contract("decoded body parameter is empty".to_string()));
        }

        Ok(Self { title, body })
    }
}

fn exactly_one(mut values: Vec<String>, name: &str) -> ProbeResult<String> {
    match values.len() {
        1 => Ok(values.remove(0)),
        0 => Err(contract(format!("missing {name:?} query parameter"))),
        n => Err(contract(format!("{n} {name:?} query parameters, expected 1"))),
    }
}

fn contract(message: impl Into<String>) -> ProbeError {
    ProbeError::IssueReportContract {
        message: message.into(),
    }
}
