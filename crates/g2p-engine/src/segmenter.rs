// Grapheme segmentation: greedy longest match against the input symbol table.

use std::iter::FusedIterator;

use g2p_fst::symbols::{CLUSTER_SEPARATOR, SKIP_SYMBOL, UNKNOWN_SYMBOL, is_reserved};
use g2p_fst::{EPSILON, Label, SymbolTable, UNKNOWN_LABEL};
use hashbrown::HashMap;
use tracing::debug;

/// One grapheme unit cut from a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Input label for the unit ([`Segmenter::unknown_label`] if unmatched).
    pub label: Label,
    /// The characters covered by the unit.
    pub text: &'a str,
    /// Whether the unit was found in the symbol table.
    pub known: bool,
}

/// Splits words into the grapheme units a model was trained on.
///
/// Models align clusters such as `th` or `ch` to a single input symbol
/// (written `t|h` in the symbol table). At each position the segmenter tries
/// the longest candidate first, down to a single character; a character with
/// no symbol maps to the unknown label.
#[derive(Debug, Clone)]
pub struct Segmenter {
    /// Grapheme text (separators removed) to input label.
    graphemes: HashMap<String, Label>,
    /// Longest grapheme in the table, in characters.
    longest: usize,
    /// Label for unmatched characters.
    unknown: Label,
}

impl Segmenter {
    /// Index the graphemes of an input symbol table.
    ///
    /// Epsilon, `<...>` symbols and the skip symbol are not graphemes. When two
    /// symbols spell the same grapheme (`th` and `t|h`), the lower label wins.
    pub fn new(symbols: &SymbolTable) -> Self {
        let mut graphemes = HashMap::with_capacity(symbols.len());
        let mut longest = 0;

        for (label, symbol) in symbols.iter() {
            if label == EPSILON || is_reserved(symbol) || symbol == SKIP_SYMBOL {
                continue;
            }
            let text: String = symbol.chars().filter(|&c| c != CLUSTER_SEPARATOR).collect();
            if text.is_empty() {
                continue;
            }
            longest = longest.max(text.chars().count());
            if let Some(&existing) = graphemes.get(&text) {
                debug!(grapheme = %text, kept = existing, ignored = label, "duplicate grapheme spelling");
                continue;
            }
            graphemes.insert(text, label);
        }

        let unknown = symbols.id_of(UNKNOWN_SYMBOL).unwrap_or(UNKNOWN_LABEL);

        Self {
            graphemes,
            longest,
            unknown,
        }
    }

    /// Label assigned to characters with no grapheme symbol.
    pub fn unknown_label(&self) -> Label {
        self.unknown
    }

    /// Length in characters of the longest grapheme in the table.
    pub fn longest_grapheme(&self) -> usize {
        self.longest
    }

    /// Number of distinct graphemes indexed.
    pub fn grapheme_count(&self) -> usize {
        self.graphemes.len()
    }

    /// Label for an exact grapheme spelling.
    pub fn lookup(&self, text: &str) -> Option<Label> {
        self.graphemes.get(text).copied()
    }

    /// Lazily segment `word`, trying units of at most `max_len` characters.
    ///
    /// The iterator is `Clone`; segmenting the same word again always yields
    /// the same units.
    pub fn segment<'a>(&'a self, word: &'a str, max_len: usize) -> Segments<'a> {
        Segments {
            segmenter: self,
            word,
            pos: 0,
            max_len: max_len.min(self.longest).max(1),
        }
    }

    /// Segment `word` and collect only the labels.
    pub fn labels(&self, word: &str, max_len: usize) -> Vec<Label> {
        self.segment(word, max_len).map(|s| s.label).collect()
    }
}

/// Iterator over the grapheme units of one word.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    segmenter: &'a Segmenter,
    word: &'a str,
    /// Byte offset of the next unit.
    pos: usize,
    max_len: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.word[self.pos..];
        if rest.is_empty() {
            return None;
        }

        // Byte offsets ending the first 1..=max_len characters of `rest`.
        let ends: Vec<usize> = rest
            .char_indices()
            .skip(1)
            .map(|(i, _)| i)
            .chain(std::iter::once(rest.len()))
            .take(self.max_len)
            .collect();

        for &end in ends.iter().rev() {
            let text = &rest[..end];
            if let Some(label) = self.segmenter.lookup(text) {
                self.pos += end;
                return Some(Segment {
                    label,
                    text,
                    known: true,
                });
            }
        }

        let end = ends[0];
        let text = &rest[..end];
        self.pos += end;
        debug!(character = text, "no grapheme symbol, using unknown label");
        Some(Segment {
            label: self.segmenter.unknown,
            text,
            known: false,
        })
    }
}

impl FusedIterator for Segments<'_> {}
