//! Shared types for FST grapheme-to-phoneme decoding.
//!
//! - [`result`] -- Phonemization results returned to callers
//! - [`options`] -- Decode options (N-best, beam, epsilon depth, deadline)
//! - [`error`] -- Decode error taxonomy

pub mod error;
pub mod options;
pub mod result;

pub use error::DecodeError;
pub use options::DecodeOptions;
pub use result::PhonemizationResult;
