//! Seam to the external strategy-grammar parser.
//!
//! The grammar that defines strategy-text validity is owned by a separate
//! project; this crate only transports rendered text to it and maps the
//! outcome. The parser is authoritative; nothing here second-guesses it.

use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Outcome of handing a strategy text to the grammar parser.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The parser ran and rejected the text.
    #[error("{message}")]
    Rejected {
        /// Parser diagnostic
        message: String,
    },
    /// The parser could not be invoked at all.
    #[error("{message}")]
    Unavailable {
        /// Error message
        message: String,
    },
}

/// Parses a rendered strategy text, succeeding silently or failing with a
/// descriptive diagnostic.
#[async_trait]
pub trait StrategyVerifier: Send + Sync {
    /// Check one rendered strategy text against the grammar.
    async fn verify(&self, strategy: &str) -> Result<(), VerifierError>;
}

/// Verifier that shells out to the external grammar parser.
///
/// The strategy text is written to the parser's stdin; a non-zero exit
/// status is a rejection carrying the parser's stderr as the diagnostic.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    program: String,
    args: Vec<String>,
}

impl CommandVerifier {
    /// Create a verifier invoking `program` with `args` for every check.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Check that the parser command can be spawned at all, without
    /// verifying anything. Useful at probe start so a misconfigured parser
    /// fails before a thousand-iteration loop begins.
    pub async fn check_available(&self) -> Result<(), VerifierError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VerifierError::Unavailable {
                message: format!("{}: {e}", self.program),
            })?
            .kill()
            .await
            .ok();
        Ok(())
    }
}

#[async_trait]
impl StrategyVerifier for CommandVerifier {
    async fn verify(&self, strategy: &str) -> Result<(), VerifierError> {
        debug!(program = %self.program, "verifying strategy text");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VerifierError::Unavailable {
                message: format!("{}: {e}", self.program),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| VerifierError::Unavailable {
            message: "parser stdin not captured".to_string(),
        })?;
        stdin
            .write_all(strategy.as_bytes())
            .await
            .map_err(|e| VerifierError::Unavailable {
                message: format!("writing to parser stdin: {e}"),
            })?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| VerifierError::Unavailable {
                message: format!("waiting for parser: {e}"),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(VerifierError::Rejected {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Closure-backed verifier, the unit-test seam.
pub struct FnVerifier<F>
where
    F: Fn(&str) -> Result<(), VerifierError> + Send + Sync,
{
    check: F,
}

impl<F> FnVerifier<F>
where
    F: Fn(&str) -> Result<(), VerifierError> + Send + Sync,
{
    /// Wrap a verification closure.
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

#[async_trait]
impl<F> StrategyVerifier for FnVerifier<F>
where
    F: Fn(&str) -> Result<(), VerifierError> + Send + Sync,
{
    async fn verify(&self, strategy: &str) -> Result<(), VerifierError> {
        (self.check)(strategy)
    }
}
