//! Weighted finite-state transducer engine for grapheme-to-phoneme models.
//!
//! This crate owns everything that is fixed once a model is loaded: the input
//! and output symbol tables, the weighted FST graph, and the binary model
//! format that stores them.
//!
//! # Architecture
//!
//! - [`format`] -- Binary header parsing and little-endian section reader/writer
//! - [`arc`] -- Arc struct and its fixed-size on-disk record
//! - [`symbols`] -- Symbol table (string-to-label and label-to-string mapping)
//! - [`weighted`] -- Immutable weighted FST store and its builder
//! - [`model`] -- Model container: loading, validation, serialization
//! - [`text`] -- Compiler for the OpenFst text format

use std::path::PathBuf;

pub mod arc;
pub mod format;
pub mod model;
pub mod symbols;
pub mod text;
pub mod weighted;

pub use arc::FstArc;
pub use model::FstModel;
pub use symbols::{SymbolTable, SymbolTableBuilder};
pub use weighted::{FstBuilder, WeightedFst};

/// Symbol identifier on an arc.
pub type Label = u32;

/// Dense state index.
pub type StateId = u32;

/// Tropical weight: negative log probability, combined by `+` along a path.
pub type Weight = f32;

/// Label 0 is the empty transition on both tapes.
pub const EPSILON: Label = 0;

/// Label assigned to input characters the model has never seen.
///
/// No arc carries this label, so a search over it finds no path.
pub const UNKNOWN_LABEL: Label = Label::MAX;

/// Error type for model loading, validation and compilation.
///
/// A load either returns a fully validated model or one of these errors;
/// there is no partially constructed state.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("model file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt header: {0}")]
    CorruptHeader(String),
    #[error("corrupt model data: {0}")]
    CorruptData(String),
    #[error("file truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("inconsistent symbol table: {0}")]
    InconsistentSymbolTable(String),
    #[error("arc {arc} of state {state} targets state {target}, but the model has {state_count} states")]
    DanglingArcReference {
        state: StateId,
        arc: usize,
        target: StateId,
        state_count: usize,
    },
    #[error("start state {start} out of range ({state_count} states)")]
    InvalidStartState { start: StateId, state_count: usize },
    #[error("invalid weight {weight} at state {state}: weights must be finite and non-negative")]
    InvalidWeight { state: StateId, weight: Weight },
    #[error("no final state is reachable from the start state")]
    NoFinalStateReachable,
    #[error("{count} unexpected bytes after the last state")]
    TrailingBytes { count: usize },
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// Returns `true` for weights allowed in the tropical semiring convention used
/// here: finite and non-negative.
#[inline]
pub fn is_valid_weight(weight: Weight) -> bool {
    weight.is_finite() && weight >= 0.0
}
