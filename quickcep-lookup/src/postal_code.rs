use crate::LookupError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const POSTAL_CODE_DIGITS: usize = 8;
const POSTAL_CODE_SEPARATOR_INDEX: usize = 5;

/// A Brazilian postal code (CEP), normalized to its 8 bare digits.
///
/// Accepts either `05874120` or the formatted `05874-120` representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `NNNNN-NNN` representation.
    pub fn formatted(&self) -> String {
        let (head, tail) = self.0.split_at(POSTAL_CODE_SEPARATOR_INDEX);
        format!("{head}-{tail}")
    }
}

impl FromStr for PostalCode {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = match trimmed.char_indices().nth(POSTAL_CODE_SEPARATOR_INDEX) {
            Some((idx, '-')) if trimmed.len() == POSTAL_CODE_DIGITS + 1 => {
                format!("{}{}", &trimmed[..idx], &trimmed[idx + 1..])
            }
            _ => trimmed.to_string(),
        };

        if digits.len() != POSTAL_CODE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LookupError::InvalidPostalCode(s.to_string()));
        }

        Ok(Self(digits))
    }
}

impl Display for PostalCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PostalCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PostalCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
