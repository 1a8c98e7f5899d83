use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Who produced the data in a response.
///
/// `Synthetic` is the fallback generator and the built-in market snapshot,
/// never an upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Coingecko,
    Synthetic,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coingecko => "coingecko",
            Self::Synthetic => "synthetic",
        }
    }

    pub const fn is_upstream(self) -> bool {
        matches!(self, Self::Coingecko)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
