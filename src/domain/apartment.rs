use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PricingError;

/// The two bookable apartments.
///
/// Stored records use either the apartment number (`"35"`, `"36"`) or the
/// legacy letter (`"A"`, `"B"`). Both are accepted here; everything past the
/// storage boundary works with this enum only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Apartment {
    App35,
    App36,
}

impl Apartment {
    pub const ALL: [Apartment; 2] = [Apartment::App35, Apartment::App36];

    pub fn code(self) -> &'static str {
        match self {
            Self::App35 => "35",
            Self::App36 => "36",
        }
    }
}

impl fmt::Display for Apartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Apartment {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "35" | "A" | "a" => Ok(Self::App35),
            "36" | "B" | "b" => Ok(Self::App36),
            other => Err(PricingError::UnknownApartment {
                code: other.to_string(),
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Text(String),
    Number(u64),
}

impl Serialize for Apartment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Apartment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = match RawCode::deserialize(deserializer)? {
            RawCode::Text(text) => text,
            RawCode::Number(n) => n.to_string(),
        };
        code.parse().map_err(serde::de::Error::custom)
    }
}

/// Family affiliation. `C` is the tier used for guests without a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    A,
    B,
    C,
}

impl Family {
    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Family A",
            Self::B => "Family B",
            Self::C => "No family",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
            Self::C => f.write_str("C"),
        }
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            other => Err(format!("unknown family '{other}'")),
        }
    }
}

/// Deserialize an optional family, treating `null` and `""` as "no affiliation".
pub fn deserialize_optional_family<'de, D>(deserializer: D) -> Result<Option<Family>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => code.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
