use chrono::{Datelike, NaiveDate, TimeDelta};

use super::policy::BookingPolicy;
use super::stay::StayRange;
use crate::error::SeasonViolation;

/// Whole-week rule for stays arriving in a peak month.
///
/// Applies to every requester, admins included: it is a turnover constraint
/// of the building, not a privilege.
pub fn check_season_rules(policy: &BookingPolicy, stay: &StayRange) -> Result<(), SeasonViolation> {
    let rules = &policy.peak;
    if !rules.months.contains(&stay.arrival.month()) {
        return Ok(());
    }

    let actual = stay.arrival.weekday();
    if actual != rules.turnover_day {
        return Err(SeasonViolation::WrongWeekday {
            required: rules.turnover_day,
            actual,
        });
    }

    let nights = stay.nights();
    if nights < 7 || nights % 7 != 0 {
        return Err(SeasonViolation::NotWholeWeeks { nights });
    }

    let weeks = nights / 7;
    if weeks > i64::from(rules.max_weeks) {
        return Err(SeasonViolation::TooManyWeeks {
            weeks,
            max: rules.max_weeks,
        });
    }

    Ok(())
}

/// In peak months, move a picked date back to the turnover day of its week.
/// Other dates are returned unchanged.
pub fn snap_to_turnover_day(policy: &BookingPolicy, date: NaiveDate) -> NaiveDate {
    if !policy.peak.months.contains(&date.month()) {
        return date;
    }
    let turnover = policy.peak.turnover_day.num_days_from_monday();
    let current = date.weekday().num_days_from_monday();
    let back = (current + 7 - turnover) % 7;
    date - TimeDelta::days(i64::from(back))
}
