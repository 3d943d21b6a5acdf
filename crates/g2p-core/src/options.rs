// Decode options: N-best count, beam width, epsilon depth, segmentation, deadline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DecodeError;

/// Default number of pronunciations returned.
pub const DEFAULT_N_BEST: usize = 1;

/// Default number of hypotheses expanded per input position.
pub const DEFAULT_BEAM_WIDTH: usize = 1000;

/// Default bound on consecutive epsilon-input arcs.
pub const DEFAULT_MAX_EPSILON_DEPTH: usize = 8;

/// Default longest grapheme (in characters) tried by the segmenter.
pub const DEFAULT_MAX_GRAPHEME_LEN: usize = 3;

/// Options for a single phonemize call.
///
/// Deserializes from JSON with every field optional:
///
/// ```
/// use g2p_core::DecodeOptions;
///
/// let opts: DecodeOptions = serde_json::from_str(r#"{ "n_best": 3 }"#).unwrap();
/// assert_eq!(opts.n_best, 3);
/// assert_eq!(opts.beam_width, g2p_core::options::DEFAULT_BEAM_WIDTH);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeOptions {
    /// Number of distinct pronunciations to return.
    pub n_best: usize,
    /// Hypotheses expanded per input position before the rest are pruned.
    pub beam_width: usize,
    /// Longest chain of consecutive epsilon-input arcs a path may take.
    pub max_epsilon_depth: usize,
    /// Longest grapheme unit, in characters, tried during segmentation.
    pub max_grapheme_len: usize,
    /// Optional decode deadline in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            n_best: DEFAULT_N_BEST,
            beam_width: DEFAULT_BEAM_WIDTH,
            max_epsilon_depth: DEFAULT_MAX_EPSILON_DEPTH,
            max_grapheme_len: DEFAULT_MAX_GRAPHEME_LEN,
            timeout_ms: None,
        }
    }
}

impl DecodeOptions {
    pub fn with_n_best(mut self, n_best: usize) -> Self {
        self.n_best = n_best;
        self
    }

    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    pub fn with_max_epsilon_depth(mut self, depth: usize) -> Self {
        self.max_epsilon_depth = depth;
        self
    }

    pub fn with_max_grapheme_len(mut self, len: usize) -> Self {
        self.max_grapheme_len = len;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The deadline as a `Duration`, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Check that every count is at least 1.
    pub fn validate(&self) -> Result<(), DecodeError> {
        check_positive("n_best", self.n_best)?;
        check_positive("beam_width", self.beam_width)?;
        check_positive("max_epsilon_depth", self.max_epsilon_depth)?;
        check_positive("max_grapheme_len", self.max_grapheme_len)?;
        Ok(())
    }
}

fn check_positive(name: &'static str, value: usize) -> Result<(), DecodeError> {
    if value == 0 {
        return Err(DecodeError::InvalidOption {
            name,
            value: value.to_string(),
            reason: "must be at least 1",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let opts = DecodeOptions::default();
        assert_eq!(opts.n_best, 1);
        assert_eq!(opts.max_epsilon_depth, DEFAULT_MAX_EPSILON_DEPTH);
        assert!(opts.timeout().is_none());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn zero_counts_are_rejected() {
        let err = DecodeOptions::default().with_n_best(0).validate().unwrap_err();
        assert!(matches!(err, DecodeError::InvalidOption { name: "n_best", .. }));

        let err = DecodeOptions::default().with_beam_width(0).validate().unwrap_err();
        assert!(matches!(err, DecodeError::InvalidOption { name: "beam_width", .. }));

        let err = DecodeOptions::default()
            .with_max_epsilon_depth(0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidOption {
                name: "max_epsilon_depth",
                ..
            }
        ));

        let err = DecodeOptions::default()
            .with_max_grapheme_len(0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidOption {
                name: "max_grapheme_len",
                ..
            }
        ));
    }

    #[test]
    fn timeout_round_trips_through_millis() {
        let opts = DecodeOptions::default().with_timeout(Duration::from_millis(250));
        assert_eq!(opts.timeout_ms, Some(250));
        assert_eq!(opts.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let opts: DecodeOptions =
            serde_json::from_str(r#"{ "beam_width": 16, "timeout_ms": 50 }"#).unwrap();
        assert_eq!(opts.beam_width, 16);
        assert_eq!(opts.timeout_ms, Some(50));
        assert_eq!(opts.n_best, DEFAULT_N_BEST);
        assert_eq!(opts.max_grapheme_len, DEFAULT_MAX_GRAPHEME_LEN);
    }

    #[test]
    fn unknown_json_fields_are_rejected() {
        let result: Result<DecodeOptions, _> = serde_json::from_str(r#"{ "nbest": 2 }"#);
        assert!(result.is_err());
    }
}
