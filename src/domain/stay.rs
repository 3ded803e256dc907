use std::fmt;

use chrono::{Datelike, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// A stay as the half-open range `[arrival, departure)`.
///
/// The departure day is neither billed nor blocked, so two stays sharing a
/// turnover day do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayRange {
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
}

impl StayRange {
    pub fn new(arrival: NaiveDate, departure: NaiveDate) -> Result<Self> {
        if departure <= arrival {
            return Err(BookingError::InvalidRequest {
                reason: format!("departure {departure} must be after arrival {arrival}"),
            });
        }
        Ok(Self { arrival, departure })
    }

    /// Parse two `YYYY-MM-DD` strings.
    pub fn parse(arrival: &str, departure: &str) -> Result<Self> {
        let parse = |label: &str, value: &str| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                BookingError::InvalidRequest {
                    reason: format!("invalid {label} date '{value}', expected YYYY-MM-DD"),
                }
            })
        };
        Self::new(parse("arrival", arrival)?, parse("departure", departure)?)
    }

    pub fn nights(&self) -> i64 {
        (self.departure - self.arrival).num_days()
    }

    /// Every billed night, arrival inclusive, departure exclusive.
    pub fn each_night(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let count = self.nights().max(0);
        (0..count).map(move |offset| self.arrival + TimeDelta::days(offset))
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        overlaps(self.arrival, self.departure, other.arrival, other.departure)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.arrival && date < self.departure
    }

    /// Number of nights whose month is in `months` (1-12).
    pub fn nights_in_months(&self, months: &[u32]) -> i64 {
        let count = self
            .each_night()
            .filter(|night| months.contains(&night.month()))
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for StayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.arrival, self.departure)
    }
}

/// Half-open interval intersection: `[s1, e1)` and `[s2, e2)` meet iff
/// `s1 < e2 && s2 < e1`.
pub fn overlaps(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 < e2 && s2 < e1
}
