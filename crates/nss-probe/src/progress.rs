//! Per-iteration progress reporting.
//!
//! Probes run loops of hundreds to thousands of browser round trips;
//! progress is surfaced through an observer injected into the loop rather
//! than by printing from inside probe control flow. Reporting is pure
//! presentation and never affects the pass/fail outcome, so rendering
//! errors are swallowed.

use std::io::{self, Write};

/// Observer invoked once per completed probe iteration.
pub trait ProgressObserver: Send {
    /// `done` iterations out of `total` have completed.
    fn on_progress(&mut self, done: usize, total: usize);
}

/// Observer that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_progress(&mut self, _done: usize, _total: usize) {}
}

/// Single-line, overwritten progress indicator:
/// `done/total (percent%) [====      ]`.
///
/// The bar grows one `=` per two percent into a fixed 50-column field and
/// the line is redrawn in place with a carriage return.
#[derive(Debug)]
pub struct ConsoleProgressBar<W: Write + Send> {
    out: W,
}

impl ConsoleProgressBar<io::Stdout> {
    /// Progress bar writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> ConsoleProgressBar<W> {
    /// Progress bar writing to an arbitrary sink.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the bar, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ProgressObserver for ConsoleProgressBar<W> {
    fn on_progress(&mut self, done: usize, total: usize) {
        let percent = if total == 0 { 100 } else { done * 100 / total };
        let bar = "=".repeat(percent / 2);
        let _ = write!(self.out, "\r{done}/{total} ({percent}%) [{bar:<50}]");
        let _ = self.out.flush();
    }
}
