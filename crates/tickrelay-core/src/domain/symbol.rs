use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_LEN: usize = 15;

/// Canonical ticker identifier.
///
/// Symbols end up in per-source cache keys and registry lookups, so the
/// constructor normalizes aggressively: surrounding whitespace is dropped
/// and letters fold to uppercase, making `" aapl "` and `"AAPL"` the same
/// key. Class-share and pair notation (`BRK.B`, `BTC-USD`) passes;
/// anything else is rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let candidate: String = input
            .trim()
            .chars()
            .map(|ch| ch.to_ascii_uppercase())
            .collect();

        match candidate.chars().count() {
            0 => return Err(ValidationError::EmptySymbol),
            len if len > MAX_LEN => {
                return Err(ValidationError::SymbolTooLong { len, max: MAX_LEN })
            }
            _ => {}
        }

        for (index, ch) in candidate.chars().enumerate() {
            match ch {
                'A'..='Z' => {}
                '0'..='9' | '.' | '-' if index > 0 => {}
                _ if index == 0 => return Err(ValidationError::SymbolInvalidStart { ch }),
                _ => return Err(ValidationError::SymbolInvalidChar { ch, index }),
            }
        }

        Ok(Self(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
