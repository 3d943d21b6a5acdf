// Model container: symbol tables + weighted FST, binary load/store.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::arc::{ARC_RECORD_SIZE, ArcRecord};
use crate::format::{self, HEADER_SIZE, SectionReader};
use crate::symbols::SymbolTable;
use crate::weighted::{FstBuilder, WeightedFst};
use crate::{LoadError, StateId};

/// Smallest serialized state: final flag (u8) + final weight (f32) + arc count (u32).
const MIN_STATE_SIZE: usize = 9;

/// A loaded grapheme-to-phoneme model.
///
/// Owns the input (grapheme) and output (phoneme) symbol tables and the
/// weighted FST. Every constructor validates the whole model, so an
/// `FstModel` value is always consistent: arc labels are in range for their
/// tables, arc targets exist, weights are non-negative and at least one final
/// state is reachable from the start state. There are no mutating methods.
#[derive(Debug, Clone, PartialEq)]
pub struct FstModel {
    input_symbols: SymbolTable,
    output_symbols: SymbolTable,
    fst: WeightedFst,
}

impl FstModel {
    /// Assemble and validate a model from its parts.
    pub fn new(
        input_symbols: SymbolTable,
        output_symbols: SymbolTable,
        fst: WeightedFst,
    ) -> Result<Self, LoadError> {
        for arc in fst.all_arcs() {
            if !input_symbols.contains_label(arc.ilabel) {
                return Err(LoadError::InconsistentSymbolTable(format!(
                    "input label {} on an arc of state {} is not in the {}-symbol input table",
                    arc.ilabel,
                    arc.source,
                    input_symbols.len()
                )));
            }
            if !output_symbols.contains_label(arc.olabel) {
                return Err(LoadError::InconsistentSymbolTable(format!(
                    "output label {} on an arc of state {} is not in the {}-symbol output table",
                    arc.olabel,
                    arc.source,
                    output_symbols.len()
                )));
            }
        }

        if !fst.final_reachable() {
            return Err(LoadError::NoFinalStateReachable);
        }

        Ok(Self {
            input_symbols,
            output_symbols,
            fst,
        })
    }

    /// Load a model file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io(e),
        })?;
        let model = Self::from_bytes(&data)?;
        debug!(
            path = %path.display(),
            bytes = data.len(),
            states = model.fst.num_states(),
            arcs = model.fst.num_arcs(),
            "loaded G2P model"
        );
        Ok(model)
    }

    /// Parse a model from its binary representation.
    ///
    /// Typically used with `include_bytes!` to embed a model in a binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LoadError> {
        let header = format::parse_header(data)?;
        let mut reader = SectionReader::new(data, HEADER_SIZE);

        let input_symbols = SymbolTable::read(&mut reader)?;
        let output_symbols = SymbolTable::read(&mut reader)?;

        let state_count = reader.read_count(MIN_STATE_SIZE)?;
        let mut builder = FstBuilder::new();
        builder.set_start(header.start_state);

        for _ in 0..state_count {
            let state = builder.add_state();
            let final_flag = reader.read_u8()?;
            let final_weight = reader.read_f32()?;
            match final_flag {
                0 => {}
                1 => builder.set_final(state, final_weight),
                other => {
                    return Err(LoadError::CorruptData(format!(
                        "state {state} has final flag {other}"
                    )));
                }
            }

            let arc_count = reader.read_count(ARC_RECORD_SIZE)?;
            let records = reader.read_bytes(arc_count * ARC_RECORD_SIZE)?;
            for chunk in records.chunks_exact(ARC_RECORD_SIZE) {
                let arc = ArcRecord::read(chunk).to_arc(state);
                builder.add_arc(state, arc.target, arc.ilabel, arc.olabel, arc.weight);
            }
        }

        if reader.remaining() > 0 {
            return Err(LoadError::TrailingBytes {
                count: reader.remaining(),
            });
        }

        let fst = builder.build()?;
        Self::new(input_symbols, output_symbols, fst)
    }

    /// Serialize the model to its binary representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            HEADER_SIZE
                + self.fst.num_states() * MIN_STATE_SIZE
                + self.fst.num_arcs() * ARC_RECORD_SIZE,
        );
        format::write_header(&mut buf, self.fst.start_state());
        self.input_symbols.write(&mut buf);
        self.output_symbols.write(&mut buf);

        buf.extend_from_slice(&(self.fst.num_states() as u32).to_le_bytes());
        for state in self.fst.states() {
            match self.fst.final_weight(state) {
                Some(weight) => {
                    buf.push(1);
                    buf.extend_from_slice(&weight.to_le_bytes());
                }
                None => {
                    buf.push(0);
                    buf.extend_from_slice(&0f32.to_le_bytes());
                }
            }
            let arcs = self.fst.arcs(state);
            buf.extend_from_slice(&(arcs.len() as u32).to_le_bytes());
            for arc in arcs {
                buf.extend_from_slice(bytemuck::bytes_of(&ArcRecord::from_arc(arc)));
            }
        }
        buf
    }

    /// Write the model to `path` atomically.
    ///
    /// The bytes go to a temporary file in the destination directory which is
    /// then renamed over `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.to_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LoadError::Io(e.error))?;
        debug!(path = %path.display(), "wrote G2P model");
        Ok(())
    }

    pub fn input_symbols(&self) -> &SymbolTable {
        &self.input_symbols
    }

    pub fn output_symbols(&self) -> &SymbolTable {
        &self.output_symbols
    }

    pub fn fst(&self) -> &WeightedFst {
        &self.fst
    }

    pub fn start_state(&self) -> StateId {
        self.fst.start_state()
    }
}

impl TryFrom<&Path> for FstModel {
    type Error = LoadError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        Self::load(path)
    }
}

impl TryFrom<&[u8]> for FstModel {
    type Error = LoadError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(data)
    }
}
