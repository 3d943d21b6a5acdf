// Phonemization result type.

use serde::{Deserialize, Serialize};

/// One pronunciation hypothesis for a word.
///
/// `score` is the cumulative tropical weight of the winning path: a negative
/// log probability, so lower is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemizationResult {
    /// Phoneme units in order.
    pub phonemes: Vec<String>,
    /// Negative log likelihood of the pronunciation.
    pub score: f32,
}

impl PhonemizationResult {
    pub fn new(phonemes: Vec<String>, score: f32) -> Self {
        Self { phonemes, score }
    }

    /// Phonemes joined with single spaces.
    pub fn phoneme_string(&self) -> String {
        self.phonemes.join(" ")
    }

    /// Path probability, `exp(-score)`.
    pub fn probability(&self) -> f32 {
        (-self.score).exp()
    }

    pub fn is_empty(&self) -> bool {
        self.phonemes.is_empty()
    }
}

impl std::fmt::Display for PhonemizationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.phoneme_string(), self.score)
    }
}
