//! Report identifiers.
//!
//! The remote store hands out identifiers as decimal strings, `0x`-prefixed
//! hex strings or bare integers depending on which endpoint produced them.
//! Every one of those forms goes through [`ReportId::parse`] before it is
//! compared or used as a lookup key.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Timestamp, TypesError};

/// A report identifier in canonical form.
///
/// Numeric identifiers are rendered as decimal without leading zeros, so
/// `"0x1a"`, `"26"` and `26u64` compare equal. Hex values too large for
/// `u128` keep a `0x` prefix with lowercase digits. Anything else is an
/// opaque token kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportId(String);

impl ReportId {
    /// Normalize a raw identifier.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        normalize(raw).map(Self)
    }

    /// Fallback identifier derived from the current time in seconds.
    pub fn from_timestamp(ts: Timestamp) -> Self {
        Self::from(ts.as_secs())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric value, if this identifier is numeric and fits in `u128`.
    pub fn as_u128(&self) -> Option<u128> {
        self.0.parse().ok()
    }

    /// The identifier one step after this one, for numeric identifiers.
    pub fn successor(&self) -> Option<Self> {
        self.as_u128()
            .and_then(|n| n.checked_add(1))
            .map(Self::from)
    }
}

fn normalize(raw: &str) -> Result<String, TypesError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(TypesError::MalformedId(raw.to_string()));
    }

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypesError::MalformedId(raw.to_string()));
        }
        return Ok(match u128::from_str_radix(hex, 16) {
            Ok(value) => value.to_string(),
            Err(_) => {
                let digits = hex.trim_start_matches('0').to_ascii_lowercase();
                format!("0x{digits}")
            }
        });
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let digits = trimmed.trim_start_matches('0');
        return Ok(if digits.is_empty() {
            "0".to_string()
        } else {
            digits.to_string()
        });
    }

    Ok(trimmed.to_string())
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReportId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for ReportId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<u128> for ReportId {
    fn from(n: u128) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for ReportId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReportId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u128),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(Self::from(n)),
            RawId::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}
