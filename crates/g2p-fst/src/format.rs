// Binary model format: header parsing and a bounds-checked section reader.
//
// All integers and floats are little-endian.

use crate::{LoadError, StateId};

/// Magic bytes at the start of every model file.
pub const MAGIC: [u8; 4] = *b"G2PF";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the binary header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Parsed model file header.
///
/// The header occupies the first 16 bytes of a model file:
/// - bytes 0..4: magic `G2PF`
/// - bytes 4..6: format version
/// - bytes 6..8: flags (must be zero)
/// - bytes 8..12: start state
/// - bytes 12..16: reserved (must be zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHeader {
    pub version: u16,
    pub start_state: StateId,
}

/// Parses and validates the 16-byte header.
pub fn parse_header(data: &[u8]) -> Result<ModelHeader, LoadError> {
    if data.len() < HEADER_SIZE {
        return Err(LoadError::CorruptHeader(format!(
            "expected {HEADER_SIZE} header bytes, got {}",
            data.len()
        )));
    }

    if data[..4] != MAGIC {
        return Err(LoadError::CorruptHeader("invalid magic number".to_string()));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != FORMAT_VERSION {
        return Err(LoadError::CorruptHeader(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }

    let flags = u16::from_le_bytes([data[6], data[7]]);
    let reserved = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
    if flags != 0 || reserved != 0 {
        return Err(LoadError::CorruptHeader(
            "reserved header fields are not zero".to_string(),
        ));
    }

    let start_state = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);

    Ok(ModelHeader {
        version,
        start_state,
    })
}

/// Appends a 16-byte header for `start_state` to `buf`.
pub fn write_header(buf: &mut Vec<u8>, start_state: StateId) {
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&start_state.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
}

/// Cursor over the sections that follow the header.
///
/// Every read is bounds-checked and reports [`LoadError::Truncated`] with the
/// absolute offset it needed.
pub struct SectionReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], LoadError> {
        let end = self.pos.checked_add(len).ok_or(LoadError::Truncated {
            expected: usize::MAX,
            actual: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(LoadError::Truncated {
                expected: end,
                actual: self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, LoadError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, LoadError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, LoadError> {
        let b = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a `u32` count and checks that at least `count * min_item_size`
    /// bytes remain, so a corrupt count cannot trigger a huge allocation.
    pub fn read_count(&mut self, min_item_size: usize) -> Result<usize, LoadError> {
        let count = self.read_u32()? as usize;
        let needed = count.saturating_mul(min_item_size);
        if needed > self.remaining() {
            return Err(LoadError::Truncated {
                expected: self.pos.saturating_add(needed),
                actual: self.data.len(),
            });
        }
        Ok(count)
    }
}
