// FstArc and its fixed-size on-disk record.

use bytemuck::{Pod, Zeroable};

use crate::{EPSILON, Label, StateId, Weight};

/// A weighted transition between two states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FstArc {
    pub source: StateId,
    pub target: StateId,
    pub ilabel: Label,
    pub olabel: Label,
    pub weight: Weight,
}

impl FstArc {
    pub fn new(source: StateId, target: StateId, ilabel: Label, olabel: Label, weight: Weight) -> Self {
        Self {
            source,
            target,
            ilabel,
            olabel,
            weight,
        }
    }

    /// Arc that does not consume an input symbol.
    #[inline]
    pub fn is_input_epsilon(&self) -> bool {
        self.ilabel == EPSILON
    }

    /// Arc that emits no output symbol.
    #[inline]
    pub fn is_output_epsilon(&self) -> bool {
        self.olabel == EPSILON
    }
}

/// On-disk arc record (16 bytes).
///
/// Layout: `ilabel` (u32), `olabel` (u32), `weight` (f32 bits), `target` (u32),
/// each stored little-endian. The source state is implied by the state
/// section the record appears in.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ArcRecord {
    pub ilabel: u32,
    pub olabel: u32,
    pub weight_bits: u32,
    pub target: u32,
}

/// Size of one arc record in the binary format.
pub const ARC_RECORD_SIZE: usize = size_of::<ArcRecord>();

impl ArcRecord {
    /// Encode an arc, converting every field to little-endian.
    pub fn from_arc(arc: &FstArc) -> Self {
        Self {
            ilabel: arc.ilabel.to_le(),
            olabel: arc.olabel.to_le(),
            weight_bits: arc.weight.to_bits().to_le(),
            target: arc.target.to_le(),
        }
    }

    /// Decode a record read from an unaligned byte slice.
    ///
    /// `bytes` must be exactly [`ARC_RECORD_SIZE`] long.
    pub fn read(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(bytes)
    }

    pub fn to_arc(self, source: StateId) -> FstArc {
        FstArc {
            source,
            target: u32::from_le(self.target),
            ilabel: u32::from_le(self.ilabel),
            olabel: u32::from_le(self.olabel),
            weight: f32::from_bits(u32::from_le(self.weight_bits)),
        }
    }
}

const _: () = assert!(size_of::<ArcRecord>() == 16);
