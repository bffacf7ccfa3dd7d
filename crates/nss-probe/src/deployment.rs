//! Deployments of the application under test.
//!
//! A deployment pairs a symbolic tag with a browser-addressable URI. The
//! URI is resolved once, at construction, and never changes for the rest of
//! the run: the current build is a local file turned into a `file://` URI,
//! a locally served build lives on a loopback port, and legacy builds are
//! static `https://` URLs.

use crate::result::{ProbeError, ProbeResult};
use std::fmt;
use std::path::Path;
use url::Url;

/// A browser-addressable build of the application under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    tag: String,
    uri: String,
}

impl Deployment {
    /// The current build, compiled to a local HTML file.
    ///
    /// The file must exist; a missing build is a configuration error, not
    /// something to discover mid-run.
    pub fn current(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let absolute = path
            .canonicalize()
            .map_err(|e| ProbeError::DeploymentUnresolvable {
                tag: "current".to_string(),
                message: format!("{}: {e}", path.display()),
            })?;
        let uri = Url::from_file_path(&absolute).map_err(|()| ProbeError::DeploymentUnresolvable {
            tag: "current".to_string(),
            message: format!("{} is not a valid file URI base", absolute.display()),
        })?;
        Ok(Self {
            tag: "current".to_string(),
            uri: uri.into(),
        })
    }

    /// The current build served from a local development server.
    #[must_use]
    pub fn served(port: u16) -> Self {
        Self {
            tag: "served".to_string(),
            uri: format!("http://127.0.0.1:{port}/index.html"),
        }
    }

    /// A legacy build hosted at a static URL.
    pub fn legacy(tag: impl Into<String>, url: &str) -> ProbeResult<Self> {
        let tag = tag.into();
        let parsed = Url::parse(url).map_err(|e| ProbeError::DeploymentUnresolvable {
            tag: tag.clone(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProbeError::DeploymentUnresolvable {
                tag,
                message: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }
        Ok(Self {
            tag,
            uri: parsed.into(),
        })
    }

    /// Symbolic tag identifying this deployment in diagnostics.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Resolved address the browser navigates to.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Address of this deployment with a strategy hash appended as the URL
    /// fragment.
    #[must_use]
    pub fn uri_with_hash(&self, hash: &str) -> String {
        format!("{}#{hash}", self.uri)
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tag, self.uri)
    }
}
