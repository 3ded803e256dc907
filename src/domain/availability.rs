use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::apartment::Apartment;
use super::reservation::Reservation;
use super::stay::StayRange;

/// Does any binding record for `apartment` intersect `stay`?
///
/// Binding means a plain reservation or an intention that was approved.
/// `exclude_id` skips the record being re-checked.
pub fn overlaps_confirmed(
    reservations: &[Reservation],
    apartment: Apartment,
    stay: &StayRange,
    exclude_id: Option<&str>,
) -> bool {
    first_confirmed_conflict(reservations, apartment, stay, exclude_id).is_some()
}

pub fn first_confirmed_conflict<'a>(
    reservations: &'a [Reservation],
    apartment: Apartment,
    stay: &StayRange,
    exclude_id: Option<&str>,
) -> Option<&'a Reservation> {
    reservations.iter().find(|r| {
        exclude_id != Some(r.id.as_str()) && r.is_confirmed() && r.overlaps_stay(apartment, stay)
    })
}

/// Does another user already have an open intention for this period?
pub fn overlaps_intentions(
    reservations: &[Reservation],
    apartment: Apartment,
    stay: &StayRange,
    exclude_user: Option<&str>,
) -> bool {
    !competing_intentions(reservations, apartment, stay, exclude_user).is_empty()
}

/// Open intentions of other users overlapping the period.
pub fn competing_intentions<'a>(
    reservations: &'a [Reservation],
    apartment: Apartment,
    stay: &StayRange,
    exclude_user: Option<&str>,
) -> Vec<&'a Reservation> {
    reservations
        .iter()
        .filter(|r| r.is_open_intention() && r.overlaps_stay(apartment, stay))
        .filter(|r| match (exclude_user, r.user_id.as_deref()) {
            (Some(me), Some(owner)) => me != owner,
            _ => true,
        })
        .collect()
}

/// Occupancy of one calendar day, strongest state wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Free,
    Intention,
    Pending,
    Confirmed,
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Intention => write!(f, "intention"),
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
        }
    }
}

pub fn day_status(reservations: &[Reservation], apartment: Apartment, date: NaiveDate) -> DayStatus {
    reservations
        .iter()
        .filter(|r| r.apartment == apartment && r.stay().contains(date))
        .map(|r| {
            if r.status.is_confirmed() {
                DayStatus::Confirmed
            } else if r.is_intention {
                DayStatus::Intention
            } else {
                DayStatus::Pending
            }
        })
        .max()
        .unwrap_or(DayStatus::Free)
}
