//! SDK error types.
//!
//! Provides error types for domain value validation.

/// SDK errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// Symbol was empty after trimming.
    #[error("symbol cannot be empty")]
    EmptySymbol,

    /// Symbol contains characters outside the ticker alphabet.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Symbol exceeds the maximum length.
    #[error("symbol too long: {0}")]
    SymbolTooLong(String),
}
