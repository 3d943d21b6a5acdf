// Decode error taxonomy.
//
// Absence of a pronunciation is not an error: decoding returns an empty
// result list in that case.

/// Error returned by a phonemize call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The input word was empty.
    #[error("input word is empty")]
    EmptyInput,

    /// The decode deadline passed before any pronunciation was found.
    #[error("decoding timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    /// A decode option is outside its valid range.
    #[error("invalid option {name}={value}: {reason}")]
    InvalidOption {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}
