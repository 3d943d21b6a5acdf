// Symbol table: string-to-label and label-to-string mapping.

use hashbrown::HashMap;

use crate::format::SectionReader;
use crate::{EPSILON, Label, LoadError};

/// Canonical name of label 0.
pub const EPSILON_SYMBOL: &str = "<eps>";

/// Input symbol that absorbs characters the model was not trained on.
pub const UNKNOWN_SYMBOL: &str = "<unk>";

/// Output symbol for an alignment deletion; it produces no phoneme.
pub const SKIP_SYMBOL: &str = "_";

/// Joins the parts of a multi-character grapheme or multi-phoneme cluster.
pub const CLUSTER_SEPARATOR: char = '|';

/// Smallest serialized entry: `id` (u32) + `byte_len` (u16).
const MIN_ENTRY_SIZE: usize = 6;

/// Returns `true` for `<...>` symbols such as `<eps>`, `<unk>`, `<s>`.
pub fn is_reserved(symbol: &str) -> bool {
    symbol.len() > 2 && symbol.starts_with('<') && symbol.ends_with('>')
}

/// Bidirectional mapping between symbol strings and dense labels.
///
/// Label 0 is always epsilon. Labels are dense (`0..len`) and no string
/// appears twice. A table is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    /// Symbol string for each label.
    symbols: Vec<String>,
    /// Reverse mapping from string to label.
    index: HashMap<String, Label>,
}

impl SymbolTable {
    /// Build a table from an ordered symbol list; the position is the label.
    ///
    /// The first symbol must be epsilon (`<eps>` or the empty string).
    pub fn from_symbols<I, S>(symbols: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pairs = symbols
            .into_iter()
            .enumerate()
            .map(|(i, s)| (s.into(), i as Label))
            .collect();
        Self::from_pairs(pairs)
    }

    /// Build a table from `(symbol, label)` pairs in any order.
    ///
    /// Rejects gaps, duplicate labels, duplicate strings, a missing or
    /// misplaced epsilon and symbols too long for the binary format.
    pub fn from_pairs(pairs: Vec<(String, Label)>) -> Result<Self, LoadError> {
        let count = pairs.len();
        if count == 0 {
            return Err(LoadError::InconsistentSymbolTable(
                "table is empty (label 0 must be epsilon)".to_string(),
            ));
        }

        let mut slots: Vec<Option<String>> = vec![None; count];
        for (symbol, id) in pairs {
            let slot = slots.get_mut(id as usize).ok_or_else(|| {
                LoadError::InconsistentSymbolTable(format!(
                    "label {id} out of range for {count} symbols"
                ))
            })?;
            if slot.is_some() {
                return Err(LoadError::InconsistentSymbolTable(format!(
                    "label {id} assigned twice"
                )));
            }
            if symbol.len() > u16::MAX as usize {
                return Err(LoadError::InconsistentSymbolTable(format!(
                    "symbol for label {id} is {} bytes long",
                    symbol.len()
                )));
            }
            *slot = Some(symbol);
        }

        let mut symbols = Vec::with_capacity(count);
        let mut index = HashMap::with_capacity(count);
        for (id, slot) in slots.into_iter().enumerate() {
            // Every slot is filled: `count` pairs landed in `count` distinct slots.
            let symbol = slot.unwrap_or_default();
            let is_epsilon = symbol.is_empty() || symbol == EPSILON_SYMBOL;
            if id == EPSILON as usize {
                if !is_epsilon {
                    return Err(LoadError::InconsistentSymbolTable(format!(
                        "label 0 must be epsilon, found {symbol:?}"
                    )));
                }
                symbols.push(EPSILON_SYMBOL.to_string());
                index.insert(EPSILON_SYMBOL.to_string(), EPSILON);
                continue;
            }
            if is_epsilon {
                return Err(LoadError::InconsistentSymbolTable(format!(
                    "epsilon symbol reused for label {id}"
                )));
            }
            if index.insert(symbol.clone(), id as Label).is_some() {
                return Err(LoadError::InconsistentSymbolTable(format!(
                    "duplicate symbol {symbol:?}"
                )));
            }
            symbols.push(symbol);
        }

        Ok(Self { symbols, index })
    }

    /// Label for a symbol string, if present.
    pub fn id_of(&self, symbol: &str) -> Option<Label> {
        self.index.get(symbol).copied()
    }

    /// Symbol string for a label, if in range.
    pub fn symbol_of(&self, id: Label) -> Option<&str> {
        self.symbols.get(id as usize).map(String::as_str)
    }

    /// Number of symbols, including epsilon.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// A valid table always holds epsilon, so this is `false` for every
    /// constructed table.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains_label(&self, id: Label) -> bool {
        (id as usize) < self.symbols.len()
    }

    /// `(label, symbol)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &str)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (i as Label, s.as_str()))
    }

    /// Parse a serialized table: `count` (u32) then `count` entries of
    /// `id` (u32), `byte_len` (u16), UTF-8 bytes.
    pub fn read(reader: &mut SectionReader<'_>) -> Result<Self, LoadError> {
        let count = reader.read_count(MIN_ENTRY_SIZE)?;
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let id = reader.read_u32()?;
            let len = reader.read_u16()? as usize;
            let bytes = reader.read_bytes(len)?;
            let symbol = std::str::from_utf8(bytes).map_err(|_| {
                LoadError::InconsistentSymbolTable(format!("invalid UTF-8 in symbol {id}"))
            })?;
            pairs.push((symbol.to_string(), id));
        }
        Self::from_pairs(pairs)
    }

    /// Append the serialized table to `buf`.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.symbols.len() as u32).to_le_bytes());
        for (id, symbol) in self.iter() {
            buf.extend_from_slice(&id.to_le_bytes());
            // Length fits: from_pairs rejects longer symbols.
            buf.extend_from_slice(&(symbol.len() as u16).to_le_bytes());
            buf.extend_from_slice(symbol.as_bytes());
        }
    }
}

/// Incremental construction of a [`SymbolTable`] before a model exists.
#[derive(Debug, Clone)]
pub struct SymbolTableBuilder {
    pairs: Vec<(String, Label)>,
    index: HashMap<String, Label>,
}

impl Default for SymbolTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTableBuilder {
    /// A builder holding only epsilon at label 0.
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(EPSILON_SYMBOL.to_string(), EPSILON);
        Self {
            pairs: vec![(EPSILON_SYMBOL.to_string(), EPSILON)],
            index,
        }
    }

    /// Add `symbol` with an explicit label, as read from a symbol file.
    ///
    /// Re-adding an existing pair is a no-op; any other clash is an error.
    pub fn insert(&mut self, symbol: &str, id: Label) -> Result<(), LoadError> {
        let symbol = if symbol.is_empty() { EPSILON_SYMBOL } else { symbol };
        match self.index.get(symbol) {
            Some(&existing) if existing == id => Ok(()),
            Some(&existing) => Err(LoadError::InconsistentSymbolTable(format!(
                "symbol {symbol:?} has labels {existing} and {id}"
            ))),
            None => {
                self.insert_unchecked(symbol, id);
                Ok(())
            }
        }
    }

    fn insert_unchecked(&mut self, symbol: &str, id: Label) {
        self.pairs.push((symbol.to_string(), id));
        self.index.insert(symbol.to_string(), id);
    }

    /// Validate and freeze the table.
    pub fn build(self) -> Result<SymbolTable, LoadError> {
        SymbolTable::from_pairs(self.pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(symbols: &[&str]) -> SymbolTable {
        SymbolTable::from_symbols(symbols.iter().copied()).unwrap()
    }

    #[test]
    fn lookup_both_directions() {
        let t = table(&["<eps>", "a", "b", "t|h"]);
        assert_eq!(t.len(), 4);
        assert_eq!(t.id_of("a"), Some(1));
        assert_eq!(t.id_of("t|h"), Some(3));
        assert_eq!(t.symbol_of(2), Some("b"));
        assert_eq!(t.symbol_of(0), Some(EPSILON_SYMBOL));
    }

    #[test]
    fn unknown_symbols_are_not_found() {
        let t = table(&["<eps>", "a"]);
        assert_eq!(t.id_of("z"), None);
        assert_eq!(t.symbol_of(9), None);
        assert!(!t.contains_label(2));
    }

    #[test]
    fn empty_string_is_accepted_as_epsilon() {
        let t = table(&["", "x"]);
        assert_eq!(t.symbol_of(0), Some(EPSILON_SYMBOL));
        assert_eq!(t.id_of(EPSILON_SYMBOL), Some(0));
    }

    #[test]
    fn pairs_in_any_order() {
        let t = SymbolTable::from_pairs(vec![
            ("b".to_string(), 2),
            ("<eps>".to_string(), 0),
            ("a".to_string(), 1),
        ])
        .unwrap();
        let collected: Vec<_> = t.iter().collect();
        assert_eq!(collected, vec![(0, "<eps>"), (1, "a"), (2, "b")]);
    }

    #[test]
    fn reject_empty_table() {
        assert!(SymbolTable::from_pairs(Vec::new()).is_err());
    }

    #[test]
    fn reject_missing_epsilon() {
        let err = SymbolTable::from_symbols(["a", "b"]).unwrap_err();
        assert!(matches!(err, LoadError::InconsistentSymbolTable(_)));
    }

    #[test]
    fn reject_duplicate_symbol() {
        assert!(SymbolTable::from_symbols(["<eps>", "a", "a"]).is_err());
    }

    #[test]
    fn reject_reused_epsilon() {
        assert!(SymbolTable::from_symbols(["<eps>", "a", ""]).is_err());
    }

    #[test]
    fn reject_gap_in_labels() {
        let err = SymbolTable::from_pairs(vec![("<eps>".to_string(), 0), ("a".to_string(), 5)])
            .unwrap_err();
        assert!(matches!(err, LoadError::InconsistentSymbolTable(msg) if msg.contains("out of range")));
    }

    #[test]
    fn reject_duplicate_label() {
        let err = SymbolTable::from_pairs(vec![
            ("<eps>".to_string(), 0),
            ("a".to_string(), 1),
            ("b".to_string(), 1),
        ])
        .unwrap_err();
        assert!(matches!(err, LoadError::InconsistentSymbolTable(msg) if msg.contains("twice")));
    }

    #[test]
    fn serialized_table_reads_back() {
        let t = table(&["<eps>", "a", "\u{00e4}", "K|S"]);
        let mut buf = Vec::new();
        t.write(&mut buf);

        let mut reader = SectionReader::new(&buf, 0);
        let back = SymbolTable::read(&mut reader).unwrap();
        assert_eq!(back, t);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn read_rejects_invalid_utf8() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.push(0xFF);

        let mut reader = SectionReader::new(&buf, 0);
        let err = SymbolTable::read(&mut reader).unwrap_err();
        assert!(matches!(err, LoadError::InconsistentSymbolTable(msg) if msg.contains("UTF-8")));
    }

    #[test]
    fn read_rejects_truncated_entry() {
        let t = table(&["<eps>", "abc"]);
        let mut buf = Vec::new();
        t.write(&mut buf);
        buf.pop();

        let mut reader = SectionReader::new(&buf, 0);
        assert!(matches!(
            SymbolTable::read(&mut reader),
            Err(LoadError::Truncated { .. })
        ));
    }

    #[test]
    fn reserved_symbols() {
        assert!(is_reserved("<eps>"));
        assert!(is_reserved("<unk>"));
        assert!(is_reserved("</s>"));
        assert!(!is_reserved("<"));
        assert!(!is_reserved("<>"));
        assert!(!is_reserved("a"));
    }

    #[test]
    fn builder_repeated_pairs_are_no_ops() {
        let mut b = SymbolTableBuilder::new();
        b.insert("a", 1).unwrap();
        b.insert("b", 2).unwrap();
        b.insert("a", 1).unwrap();
        b.insert("", 0).unwrap();
        let t = b.build().unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.id_of("b"), Some(2));
    }

    #[test]
    fn builder_explicit_labels() {
        let mut b = SymbolTableBuilder::new();
        b.insert("<eps>", 0).unwrap();
        b.insert("y", 2).unwrap();
        b.insert("x", 1).unwrap();
        assert!(b.insert("x", 3).is_err());
        b.insert("z", 3).unwrap();
        let t = b.build().unwrap();
        assert_eq!(t.symbol_of(1), Some("x"));
        assert_eq!(t.symbol_of(3), Some("z"));
    }

    #[test]
    fn builder_with_gap_fails_on_build() {
        let mut b = SymbolTableBuilder::new();
        b.insert("x", 4).unwrap();
        assert!(b.build().is_err());
    }
}
