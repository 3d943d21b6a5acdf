//! Grapheme-to-phoneme decoding over weighted FST models.
//!
//! A word is cut into grapheme units, the units are fed to the model's FST as
//! input labels, and the N lowest-weight accepting paths are read back as
//! phoneme sequences.
//!
//! - [`segmenter`] -- Greedy longest-match grapheme segmentation
//! - [`search`] -- Best-first N-best path search with beam and epsilon limits
//! - [`assembler`] -- Output labels to phoneme strings, deduplicated
//! - [`model`] -- [`Model`], the shareable decode handle
//! - [`shared`] -- [`SharedModel`], a model that can be hot-reloaded
//!
//! ```no_run
//! use g2p_engine::DecodeOptions;
//!
//! let model = g2p_engine::load_model("english.g2p")?;
//! let options = DecodeOptions::default().with_n_best(3);
//! for result in g2p_engine::phonemize_word(&model, "hello", &options)? {
//!     println!("{}\t{}", result.phoneme_string(), result.score);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

pub mod assembler;
pub mod model;
pub mod search;
pub mod segmenter;
pub mod shared;

pub use g2p_core::{DecodeError, DecodeOptions, PhonemizationResult};
pub use g2p_fst::LoadError;
pub use model::Model;
pub use shared::SharedModel;

/// Load and validate a binary model file.
pub fn load_model(path: impl AsRef<Path>) -> Result<Model, LoadError> {
    Model::load(path)
}

/// Decode `word` into at most `options.n_best` pronunciations, lowest score
/// first. An unpronounceable word gives an empty list.
pub fn phonemize_word(
    model: &Model,
    word: &str,
    options: &DecodeOptions,
) -> Result<Vec<PhonemizationResult>, DecodeError> {
    model.phonemize_word(word, options)
}
