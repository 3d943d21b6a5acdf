// Turns search paths into phoneme sequences.

use g2p_core::PhonemizationResult;
use g2p_fst::symbols::{CLUSTER_SEPARATOR, SKIP_SYMBOL};
use g2p_fst::{EPSILON, Label, SymbolTable};
use hashbrown::{HashMap, HashSet};

use crate::search::SearchPath;

/// Interned phoneme id.
pub type PhonemeId = u32;

/// The phonemes each output label spells.
///
/// Epsilon and the skip symbol `_` spell nothing. A multi-phoneme symbol such
/// as `K|S` spells its parts, so `K|S` and the pair `K`, `S` produce the same
/// id sequence. The search and the assembler both key on these sequences.
#[derive(Debug, Clone)]
pub struct PhonemeInventory {
    /// Phoneme string per id.
    phonemes: Vec<String>,
    /// Phoneme ids per output label.
    spellings: Vec<Vec<PhonemeId>>,
}

impl PhonemeInventory {
    pub fn new(output_symbols: &SymbolTable) -> Self {
        let mut phonemes: Vec<String> = Vec::new();
        let mut ids: HashMap<String, PhonemeId> = HashMap::new();
        let mut spellings = Vec::with_capacity(output_symbols.len());

        for (label, symbol) in output_symbols.iter() {
            if label == EPSILON || symbol == SKIP_SYMBOL {
                spellings.push(Vec::new());
                continue;
            }
            let spelling = symbol
                .split(CLUSTER_SEPARATOR)
                .filter(|p| !p.is_empty())
                .map(|p| {
                    *ids.entry(p.to_string()).or_insert_with(|| {
                        phonemes.push(p.to_string());
                        (phonemes.len() - 1) as PhonemeId
                    })
                })
                .collect();
            spellings.push(spelling);
        }

        Self {
            phonemes,
            spellings,
        }
    }

    /// Phoneme ids spelled by `label`; empty for silent or unknown labels.
    pub fn spelling(&self, label: Label) -> &[PhonemeId] {
        self.spellings
            .get(label as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn phoneme(&self, id: PhonemeId) -> &str {
        self.phonemes.get(id as usize).map(String::as_str).unwrap_or_default()
    }

    /// Number of distinct phonemes.
    pub fn len(&self) -> usize {
        self.phonemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phonemes.is_empty()
    }

    /// Phoneme ids along a path's output labels.
    pub fn spell_path(&self, path: &SearchPath) -> Vec<PhonemeId> {
        path.output_labels()
            .flat_map(|label| self.spelling(label).iter().copied())
            .collect()
    }
}

/// Collects N-best results, mapping output labels to phoneme strings.
///
/// Paths whose phoneme sequence was already collected are rejected, so the
/// results stay unique and keep the order in which they were pushed.
#[derive(Debug)]
pub struct ResultAssembler<'a> {
    inventory: &'a PhonemeInventory,
    results: Vec<PhonemizationResult>,
    seen: HashSet<Vec<PhonemeId>>,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(inventory: &'a PhonemeInventory) -> Self {
        Self {
            inventory,
            results: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Phoneme sequence spelled by a path's output labels.
    pub fn phonemes_for(&self, path: &SearchPath) -> Vec<String> {
        self.inventory
            .spell_path(path)
            .into_iter()
            .map(|id| self.inventory.phoneme(id).to_string())
            .collect()
    }

    /// Add a path's result. Returns `false` if its phonemes duplicate an
    /// earlier result.
    pub fn push(&mut self, path: &SearchPath) -> bool {
        let ids = self.inventory.spell_path(path);
        let phonemes = ids
            .iter()
            .map(|&id| self.inventory.phoneme(id).to_string())
            .collect();
        if !self.seen.insert(ids) {
            return false;
        }
        self.results.push(PhonemizationResult::new(phonemes, path.weight));
        true
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn finish(self) -> Vec<PhonemizationResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use g2p_fst::FstArc;

    fn inventory() -> PhonemeInventory {
        // 1 = AH, 2 = _, 3 = K|S, 4 = T, 5 = K, 6 = S
        let t = SymbolTable::from_symbols(["<eps>", "AH", "_", "K|S", "T", "K", "S"]).unwrap();
        PhonemeInventory::new(&t)
    }

    fn path(olabels: &[u32], weight: f32) -> SearchPath {
        let arcs = olabels
            .iter()
            .enumerate()
            .map(|(i, &o)| FstArc::new(i as u32, i as u32 + 1, 1, o, 0.0))
            .collect();
        SearchPath { arcs, weight }
    }

    #[test]
    fn spellings() {
        let inv = inventory();
        assert!(inv.spelling(0).is_empty());
        assert!(inv.spelling(2).is_empty());
        assert_eq!(inv.spelling(3).len(), 2);
        assert_eq!(inv.spelling(3), &[inv.spelling(5)[0], inv.spelling(6)[0]]);
        assert!(inv.spelling(99).is_empty());
        // AH, K, S, T
        assert_eq!(inv.len(), 4);
    }

    #[test]
    fn plain_phonemes() {
        let inv = inventory();
        let a = ResultAssembler::new(&inv);
        assert_eq!(a.phonemes_for(&path(&[1, 4], 0.0)), vec!["AH", "T"]);
    }

    #[test]
    fn skip_and_epsilon_emit_nothing() {
        let inv = inventory();
        let a = ResultAssembler::new(&inv);
        assert_eq!(a.phonemes_for(&path(&[2, 1, 0, 2], 0.0)), vec!["AH"]);
        assert!(a.phonemes_for(&path(&[2], 0.0)).is_empty());
    }

    #[test]
    fn clusters_split_into_phonemes() {
        let inv = inventory();
        let a = ResultAssembler::new(&inv);
        assert_eq!(a.phonemes_for(&path(&[3], 0.0)), vec!["K", "S"]);
    }

    #[test]
    fn duplicates_rejected() {
        let inv = inventory();
        let mut a = ResultAssembler::new(&inv);
        assert!(a.push(&path(&[1, 4], 0.5)));
        // Same phonemes through a skip symbol.
        assert!(!a.push(&path(&[1, 2, 4], 0.7)));
        assert!(a.push(&path(&[4], 0.9)));
        assert_eq!(a.len(), 2);

        let results = a.finish();
        assert_eq!(results[0].phonemes, vec!["AH", "T"]);
        assert_eq!(results[0].score, 0.5);
        assert_eq!(results[1].phonemes, vec!["T"]);
    }

    #[test]
    fn cluster_and_split_spelling_are_duplicates() {
        let inv = inventory();
        let mut a = ResultAssembler::new(&inv);
        assert!(a.push(&path(&[3], 0.1)));
        assert!(!a.push(&path(&[5, 6], 0.2)));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn empty_pronunciation_is_a_result() {
        let inv = inventory();
        let mut a = ResultAssembler::new(&inv);
        assert!(a.push(&path(&[2], 1.0)));
        assert!(!a.is_empty());
        assert!(a.finish()[0].is_empty());
    }
}
