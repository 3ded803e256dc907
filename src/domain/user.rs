use std::fmt;

use serde::{Deserialize, Serialize};

use super::apartment::{Family, deserialize_optional_family};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSettings {
    #[serde(default)]
    pub can_book: bool,
    #[serde(default = "default_max_reservations")]
    pub max_reservations_per_year: u32,
    #[serde(default)]
    pub priority: PriorityTier,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            can_book: false,
            max_reservations_per_year: default_max_reservations(),
            priority: PriorityTier::Normal,
        }
    }
}

fn default_max_reservations() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub approved: bool,
    #[serde(default, deserialize_with = "deserialize_optional_family")]
    pub family: Option<Family>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub settings: BookingSettings,
    /// Tie-break weight for contested intentions. Only admin actions move it.
    #[serde(default, deserialize_with = "deserialize_score")]
    pub score: i64,
}

impl User {
    /// A freshly registered, not yet approved member.
    pub fn registered(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        family: Option<Family>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: Role::Member,
            approved: false,
            family,
            rank: None,
            settings: BookingSettings::default(),
            score: 0,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Pricing tier: the family, or the "no family" tier.
    pub fn pricing_family(&self) -> Family {
        self.family.unwrap_or(Family::C)
    }

    pub fn may_book(&self) -> bool {
        self.is_admin() || (self.approved && self.settings.can_book)
    }

    /// Admin approval also grants booking rights.
    pub fn approve(&mut self) {
        self.approved = true;
        self.settings.can_book = true;
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)?;
        if self.is_admin() {
            write!(f, " (admin)")?;
        }
        if let Some(family) = self.family {
            write!(f, " | {}", family.label())?;
        }
        write!(f, " | score {}", self.score)
    }
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or_default())
}
