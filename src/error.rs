use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::apartment::{Apartment, Family};
use crate::domain::pricing::Season;
use crate::domain::reservation::ReservationStatus;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid booking request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Price calculation failed: {0}")]
    Pricing(#[from] PricingError),

    #[error("Season rule violated: {0}")]
    SeasonRule(#[from] SeasonViolation),

    #[error("Priority period: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Apartment {apartment} is already booked between {arrival} and {departure}")]
    Conflict {
        apartment: Apartment,
        arrival: NaiveDate,
        departure: NaiveDate,
    },

    #[error("Access denied: {reason}")]
    Forbidden { reason: String },

    #[error("Yearly limit of {limit} reservations reached for {year}")]
    QuotaExceeded { limit: u32, year: i32 },

    #[error("Reservation not found: {id}")]
    ReservationNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Cannot {action} a reservation with status {status}")]
    InvalidTransition {
        action: &'static str,
        status: ReservationStatus,
    },

    #[error("Reservation {id} changed concurrently (expected {expected}, found {found})")]
    StaleWrite {
        id: String,
        expected: ReservationStatus,
        found: ReservationStatus,
    },

    #[error("Storage error: {reason}")]
    Storage { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Reasons a price cannot be computed. Never reported as a zero total.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("departure {departure} must be after arrival {arrival}")]
    EmptyRange {
        arrival: NaiveDate,
        departure: NaiveDate,
    },

    #[error("unknown apartment '{code}'")]
    UnknownApartment { code: String },

    #[error("no {season} rate configured for apartment {apartment}, family {family}")]
    MissingRate {
        apartment: Apartment,
        family: Family,
        season: Season,
    },
}

/// Whole-week constraints for peak-season arrivals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeasonViolation {
    #[error(
        "peak-season stays must start on a {}, not a {}",
        weekday_name(*.required),
        weekday_name(*.actual)
    )]
    WrongWeekday {
        required: chrono::Weekday,
        actual: chrono::Weekday,
    },

    #[error("peak-season stays must be whole weeks, {nights} nights requested")]
    NotWholeWeeks { nights: i64 },

    #[error("peak-season stays are limited to {max} week(s), {weeks} requested")]
    TooManyWeeks { weeks: i64, max: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("bookings for the {year} summer open on 1 January {year}")]
    WindowNotOpen { year: i32 },

    #[error(
        "during the priority window at most {max} nights may fall in the preferred months, {nights} requested"
    )]
    IntentionTooLong { nights: i64, max: u32 },
}

pub type Result<T> = std::result::Result<T, BookingError>;

fn weekday_name(day: chrono::Weekday) -> &'static str {
    match day {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}
