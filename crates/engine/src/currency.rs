use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO-like currency code attached to a group and its money values.
///
/// Splitledger is effectively mono-currency today (default `EUR`), but the
/// data model carries the currency explicitly so adding more later does not
/// require a schema change.
///
/// Monetary values are stored as an `i64` number of **minor units** (see
/// [`MoneyCents`](crate::MoneyCents)); EUR has 2 minor units, so `10.50 EUR`
/// is stored as `1050`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            other => Err(EngineError::InvalidAmount(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
