use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_COIN_ID_LEN: usize = 64;

/// Normalized instrument identifier as used by the upstream market API
/// (`bitcoin`, `usd-coin`, `staked-ether`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoinId(String);

impl CoinId {
    /// Parse and normalize an id to lowercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCoinId);
        }

        let normalized = trimmed.to_ascii_lowercase();
        let len = normalized.chars().count();
        if len > MAX_COIN_ID_LEN {
            return Err(ValidationError::CoinIdTooLong {
                len,
                max: MAX_COIN_ID_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.';
            if !valid {
                return Err(ValidationError::CoinIdInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CoinId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CoinId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CoinId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CoinId> for String {
    fn from(value: CoinId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_coin_id() {
        let parsed = CoinId::parse(" Staked-Ether ").expect("coin id should parse");
        assert_eq!(parsed.as_str(), "staked-ether");
    }

    #[test]
    fn rejects_path_separators() {
        let err = CoinId::parse("bitcoin/../markets").expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::CoinIdInvalidChar { ch: '/', index: 7 }
        ));
    }

    #[test]
    fn rejects_empty_id() {
        assert_eq!(CoinId::parse("   "), Err(ValidationError::EmptyCoinId));
    }
}
