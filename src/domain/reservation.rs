use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::apartment::{Apartment, Family, deserialize_optional_family};
use super::stay::StayRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[serde(alias = "in_afwachting")]
    Pending,
    #[serde(alias = "goedgekeurd")]
    Approved,
    #[serde(alias = "betaald")]
    Paid,
    PendingCancellation,
}

impl ReservationStatus {
    /// Statuses that make a record block the calendar even if it started as
    /// an intention.
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Approved | Self::Paid)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Paid => write!(f, "paid"),
            Self::PendingCancellation => write!(f, "pending_cancellation"),
        }
    }
}

/// A reservation or, when `is_intention` is set, a non-binding intention.
///
/// Field names follow the persisted documents so existing data loads as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    #[serde(rename = "appartement", alias = "apartment")]
    pub apartment: Apartment,
    #[serde(rename = "naam", default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(rename = "aankomst")]
    pub arrival: NaiveDate,
    #[serde(rename = "vertrek")]
    pub departure: NaiveDate,
    #[serde(rename = "personen", default = "default_guests")]
    pub guests: u32,
    #[serde(rename = "opmerking", default)]
    pub note: String,
    #[serde(rename = "prijs", default)]
    pub price: f64,
    pub status: ReservationStatus,
    #[serde(rename = "isIntention", default)]
    pub is_intention: bool,
    #[serde(default, deserialize_with = "deserialize_optional_family")]
    pub family: Option<Family>,
    pub created: DateTime<Utc>,
    #[serde(rename = "confirmedAt", default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "cancellationRequested",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cancellation_requested: Option<DateTime<Utc>>,
}

fn default_guests() -> u32 {
    1
}

impl Reservation {
    pub fn stay(&self) -> StayRange {
        StayRange {
            arrival: self.arrival,
            departure: self.departure,
        }
    }

    /// Binding records: real reservations and intentions an admin confirmed.
    pub fn is_confirmed(&self) -> bool {
        !self.is_intention || self.status.is_confirmed()
    }

    /// Intentions still waiting for the owner's decision.
    pub fn is_open_intention(&self) -> bool {
        self.is_intention && !self.status.is_confirmed()
    }

    pub fn overlaps_stay(&self, apartment: Apartment, stay: &StayRange) -> bool {
        self.apartment == apartment && self.stay().overlaps(stay)
    }

    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    pub fn apply(&mut self, patch: &ReservationPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(is_intention) = patch.is_intention {
            self.is_intention = is_intention;
        }
        if let Some(at) = patch.confirmed_at {
            self.confirmed_at = Some(at);
        }
        if let Some(at) = patch.cancellation_requested {
            self.cancellation_requested = Some(at);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_intention && !self.status.is_confirmed() {
            "Intention"
        } else {
            "Reservation"
        };
        write!(
            f,
            "{kind} {} | apartment {} | {} → {} | {} guest(s) | {} | €{:.2} | {}",
            self.id,
            self.apartment,
            self.arrival,
            self.departure,
            self.guests,
            self.name,
            self.price,
            self.status,
        )?;
        if !self.note.is_empty() {
            write!(f, " | \"{}\"", self.note)?;
        }
        Ok(())
    }
}

/// Partial update for a single record.
///
/// `expect_status` turns the update into a compare-and-swap: stores reject the
/// patch with `StaleWrite` when the current status differs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_intention: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_requested: Option<DateTime<Utc>>,
    #[serde(rename = "prijs", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip)]
    pub expect_status: Option<ReservationStatus>,
}

impl ReservationPatch {
    pub fn status(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn expecting(mut self, status: ReservationStatus) -> Self {
        self.expect_status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_RECORD: &str = r#"{
        "id": "1718000000000",
        "appartement": "A",
        "naam": "Jan",
        "email": "jan@fam.test",
        "aankomst": "2025-07-05",
        "vertrek": "2025-07-12",
        "personen": 4,
        "opmerking": "",
        "prijs": 406,
        "status": "in_afwachting",
        "userId": "u1",
        "createdBy": "Jan",
        "isIntention": true,
        "isProvisional": false,
        "created": "2025-02-15T10:00:00.000Z"
    }"#;

    #[test]
    fn legacy_record_is_normalized() {
        let res: Reservation = serde_json::from_str(LEGACY_RECORD).unwrap();
        assert_eq!(res.apartment, Apartment::App35);
        assert_eq!(res.status, ReservationStatus::Pending);
        assert_eq!(res.guests, 4);
        assert!(res.is_intention);
        assert!(res.is_open_intention());
        assert!(!res.is_confirmed());
        assert_eq!(res.family, None);
    }

    #[test]
    fn legacy_paid_status_alias() {
        let json = LEGACY_RECORD.replace("in_afwachting", "betaald");
        let res: Reservation = serde_json::from_str(&json).unwrap();
        assert_eq!(res.status, ReservationStatus::Paid);
        assert!(res.is_confirmed());
    }

    #[test]
    fn serializes_canonical_codes() {
        let res: Reservation = serde_json::from_str(LEGACY_RECORD).unwrap();
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["appartement"], "35");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["aankomst"], "2025-07-05");
        assert!(value.get("confirmedAt").is_none());
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut res: Reservation = serde_json::from_str(LEGACY_RECORD).unwrap();
        let patch = ReservationPatch {
            status: Some(ReservationStatus::Approved),
            is_intention: Some(false),
            ..Default::default()
        };
        res.apply(&patch);
        assert_eq!(res.status, ReservationStatus::Approved);
        assert!(!res.is_intention);
        assert!((res.price - 406.0).abs() < f64::EPSILON);
    }

    #[test]
    fn patch_serialization_omits_expectation() {
        let patch =
            ReservationPatch::status(ReservationStatus::Paid).expecting(ReservationStatus::Approved);
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({"status": "paid"}));
    }

    #[test]
    fn display_marks_intentions() {
        let res: Reservation = serde_json::from_str(LEGACY_RECORD).unwrap();
        let s = res.to_string();
        assert!(s.starts_with("Intention"));
        assert!(s.contains("apartment 35"));
    }
}
