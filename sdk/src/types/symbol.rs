//! Ticker symbol type.
//!
//! Symbols are normalized to uppercase on construction so that `aapl`,
//! ` AAPL ` and `AAPL` all name the same stream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// Maximum accepted symbol length in bytes.
pub const MAX_SYMBOL_LEN: usize = 32;

/// An uppercase ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parses and normalizes a symbol.
    ///
    /// Surrounding whitespace is trimmed and letters are uppercased. Allowed
    /// characters are ASCII alphanumerics and `.`, `-`, `^`, `/`, `=`.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty, too long, or contains other
    /// characters.
    pub fn new(raw: &str) -> Result<Self, SdkError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SdkError::EmptySymbol);
        }
        if trimmed.len() > MAX_SYMBOL_LEN {
            return Err(SdkError::SymbolTooLong(trimmed.to_string()));
        }
        if !trimmed.chars().all(is_symbol_char) {
            return Err(SdkError::InvalidSymbol(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '/' | '=')
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SdkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = SdkError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
