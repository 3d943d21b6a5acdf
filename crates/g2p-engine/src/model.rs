// Loaded model handle and the per-word decode pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use g2p_core::{DecodeError, DecodeOptions, PhonemizationResult};
use g2p_fst::{FstModel, Label, LoadError};
use tracing::{debug, warn};

use crate::assembler::{PhonemeInventory, ResultAssembler};
use crate::search::{PathSearch, SearchParams, SearchStats};
use crate::segmenter::{Segmenter, Segments};

/// A validated G2P model ready for decoding.
///
/// Cloning is cheap: the FST and the symbol indexes are shared behind `Arc`s,
/// and a `Model` is never mutated after construction, so clones can decode on
/// any number of threads at once.
#[derive(Debug, Clone)]
pub struct Model {
    fst: Arc<FstModel>,
    segmenter: Arc<Segmenter>,
    inventory: Arc<PhonemeInventory>,
}

impl Model {
    pub fn new(fst: FstModel) -> Self {
        let segmenter = Segmenter::new(fst.input_symbols());
        let inventory = PhonemeInventory::new(fst.output_symbols());
        debug!(
            graphemes = segmenter.grapheme_count(),
            longest = segmenter.longest_grapheme(),
            phonemes = inventory.len(),
            "indexed model symbols"
        );
        Self {
            fst: Arc::new(fst),
            segmenter: Arc::new(segmenter),
            inventory: Arc::new(inventory),
        }
    }

    /// Load and validate a binary model file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        FstModel::load(path).map(Self::new)
    }

    /// Parse a binary model from memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LoadError> {
        FstModel::from_bytes(data).map(Self::new)
    }

    pub fn fst_model(&self) -> &FstModel {
        &self.fst
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Distinct phonemes spelled by the output symbols.
    pub fn phonemes(&self) -> &PhonemeInventory {
        &self.inventory
    }

    /// Grapheme units of `word` under this model's input symbols.
    pub fn segment<'a>(&'a self, word: &'a str, max_grapheme_len: usize) -> Segments<'a> {
        self.segmenter.segment(word, max_grapheme_len)
    }

    /// Decode one word into at most `options.n_best` pronunciations, best
    /// first.
    ///
    /// A word the model cannot pronounce (for example one containing a
    /// character outside the grapheme alphabet) yields `Ok(vec![])`. If the
    /// timeout passes, whatever was found so far is returned; with nothing
    /// found the result is [`DecodeError::Timeout`].
    pub fn phonemize_word(
        &self,
        word: &str,
        options: &DecodeOptions,
    ) -> Result<Vec<PhonemizationResult>, DecodeError> {
        let started = Instant::now();
        options.validate()?;
        if word.is_empty() {
            return Err(DecodeError::EmptyInput);
        }

        let labels: Vec<Label> = self.segmenter.labels(word, options.max_grapheme_len);

        let params = SearchParams::from_options(options, started);
        let mut assembler = ResultAssembler::new(&self.inventory);
        let stats = PathSearch::new(self.fst.fst(), &self.inventory)
            .run(&labels, &params, |path| assembler.push(&path));

        debug!(
            word,
            graphemes = labels.len(),
            results = stats.accepted,
            expanded = stats.expanded,
            pruned = stats.pruned,
            "decoded word"
        );

        settle(word, assembler, &stats, started)
    }

    /// The single best pronunciation of `word`, if any.
    pub fn phonemize_best(
        &self,
        word: &str,
        options: &DecodeOptions,
    ) -> Result<Option<PhonemizationResult>, DecodeError> {
        let options = DecodeOptions {
            n_best: 1,
            ..options.clone()
        };
        Ok(self.phonemize_word(word, &options)?.into_iter().next())
    }
}

/// Final results of a search: partial results survive a timeout, but a
/// timeout with nothing found is an error.
fn settle(
    word: &str,
    assembler: ResultAssembler<'_>,
    stats: &SearchStats,
    started: Instant,
) -> Result<Vec<PhonemizationResult>, DecodeError> {
    if stats.timed_out && assembler.is_empty() {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        warn!(word, elapsed_ms, "decode timed out with no result");
        return Err(DecodeError::Timeout { elapsed_ms });
    }
    if stats.timed_out {
        warn!(word, results = assembler.len(), "decode timed out, returning partial results");
    }
    Ok(assembler.finish())
}

impl From<FstModel> for Model {
    fn from(fst: FstModel) -> Self {
        Self::new(fst)
    }
}

impl TryFrom<&Path> for Model {
    type Error = LoadError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        Self::load(path)
    }
}

impl TryFrom<&[u8]> for Model {
    type Error = LoadError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(data)
    }
}
