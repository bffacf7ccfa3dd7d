//! Rendered strategies and their URL-hash fragments.
//!
//! The application embeds the URL-encoded form of each strategy into the
//! rendered text as a comment line carrying a marker. That line is the only
//! bridge between the generator side (rendered text) and the restoration
//! side (URL fragment), so its absence is a hard failure.

use crate::result::{ProbeError, ProbeResult};

/// Marker preceding the hash fragment inside the rendered strategy text.
pub const HASH_MARKER: &str = "dummy#";

/// Extract the URL-hash fragment from rendered strategy text.
///
/// The first line containing [`HASH_MARKER`] wins; everything after the
/// marker on that line is the fragment.
///
/// # Errors
///
/// Returns [`ProbeError::MissingHashLine`] when no line carries the marker.
pub fn extract_hash(rendered: &str) -> ProbeResult<&str> {
    rendered
        .lines()
        .find_map(|line| {
            line.find(HASH_MARKER)
                .map(|at| &line[at + HASH_MARKER.len()..])
        })
        .ok_or(ProbeError::MissingHashLine)
}

/// One strategy as rendered by the application, with the seed that
/// generated it when known.
#[derive(Debug, Clone)]
pub struct RenderedStrategy {
    /// Full rendered text
    pub text: String,
    /// Generation seed, when produced by random generation
    pub seed: Option<String>,
}

impl RenderedStrategy {
    /// Wrap rendered text produced by random generation.
    #[must_use]
    pub fn generated(text: impl Into<String>, seed: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            seed: Some(seed.into()),
        }
    }

    /// Wrap rendered text restored from a URL hash.
    #[must_use]
    pub fn restored(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            seed: None,
        }
    }

    /// The embedded URL-hash fragment.
    pub fn hash(&self) -> ProbeResult<&str> {
        extract_hash(&self.text)
    }
}

/// Running sample of encoded-strategy lengths across a generation run.
///
/// The mean length is a soundness proxy for the encoding's compactness: a
/// drifting mean signals an encoding regression even when every individual
/// strategy still parses.
#[derive(Debug, Clone, Default)]
pub struct HashLengthStats {
    samples: Vec<usize>,
}

impl HashLengthStats {
    /// Create an empty sample set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one encoded-strategy length.
    pub fn record(&mut self, len: usize) {
        self.samples.push(len);
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arithmetic mean of the recorded lengths, `None` when empty.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: usize = self.samples.iter().sum();
        Some(sum as f64 / self.samples.len() as f64)
    }

    /// Check the mean against a tolerance band around a nominal center.
    ///
    /// An empty sample set fails: a run that recorded nothing cannot attest
    /// to anything.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::StatisticalDrift`] when the mean is missing or
    /// outside `center ± tolerance`.
    pub fn assert_within(&self, center: f64, tolerance: f64) -> ProbeResult<f64> {
        let mean = self.mean().unwrap_or(0.0);
        if self.samples.is_empty() || (mean - center).abs() > tolerance {
            return Err(ProbeError::StatisticalDrift {
                mean,
                center,
                tolerance,
            });
        }
        Ok(mean)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const RENDERED: &str = "\
- Obecná nastavení
- Velikost investice
# https://example.invalid/dummy#3Mn5tQAAfgEB
- Pravidla prodeje";

    #[test]
    fn hash_is_taken_from_marker_line() {
        assert_eq!(extract_hash(RENDERED).unwrap(), "3Mn5tQAAfgEB");
    }

    #[test]
    fn missing_marker_is_a_hard_failure() {
        let err = extract_hash("just some text\nwithout any marker").unwrap_err();
        assert!(matches!(err, ProbeError::MissingHashLine));
    }

    #[test]
    fn first_marker_line_wins() {
        let text = "a dummy#first\nb dummy#second";
        assert_eq!(extract_hash(text).unwrap(), "first");
    }

    #[test]
    fn empty_fragment_after_marker_is_extracted_as_empty() {
        assert_eq!(extract_hash("x dummy#").unwrap(), "");
    }

    #[test]
    fn rendered_strategy_exposes_its_hash() {
        let strategy = RenderedStrategy::generated(RENDERED, "42");
        assert_eq!(strategy.hash().unwrap(), "3Mn5tQAAfgEB");
        assert_eq!(strategy.seed.as_deref(), Some("42"));
    }

    #[test]
    fn mean_of_samples() {
        let mut stats = HashLengthStats::new();
        for len in [1990, 2000, 2010] {
            stats.record(len);
        }
        assert_eq!(stats.len(), 3);
        assert_eq!(stats.mean(), Some(2000.0));
    }

    #[test]
    fn mean_of_empty_sample_set_is_none() {
        assert_eq!(HashLengthStats::new().mean(), None);
    }

    #[test]
    fn mean_inside_band_passes() {
        let mut stats = HashLengthStats::new();
        stats.record(2099);
        assert_eq!(stats.assert_within(2000.0, 100.0).unwrap(), 2099.0);
    }

    #[test]
    fn mean_on_band_edge_passes() {
        let mut stats = HashLengthStats::new();
        stats.record(2100);
        assert!(stats.assert_within(2000.0, 100.0).is_ok());
    }

    #[test]
    fn mean_outside_band_is_drift() {
        let mut stats = HashLengthStats::new();
        stats.record(2101);
        let err = stats.assert_within(2000.0, 100.0).unwrap_err();
        assert!(matches!(
            err,
            ProbeError::StatisticalDrift { center, tolerance, .. }
                if center == 2000.0 && tolerance == 100.0
        ));
    }

    #[test]
    fn empty_sample_set_is_drift() {
        let err = HashLengthStats::new().assert_within(2000.0, 100.0).unwrap_err();
        assert!(matches!(err, ProbeError::StatisticalDrift { .. }));
    }
}
