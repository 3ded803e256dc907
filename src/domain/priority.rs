//! Who is favoured for a contested summer period, and in what order competing
//! intentions are shown to the admin.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::apartment::{Apartment, Family};
use super::policy::{BookingPolicy, PriorityRule};
use super::reservation::Reservation;
use super::stay::StayRange;
use super::user::User;
use crate::error::ClassificationError;

/// The favoured family for `apartment` in `month` of `year`.
///
/// `None` outside the preferred months, or when no rule covers the apartment.
pub fn priority_family(
    policy: &BookingPolicy,
    month: u32,
    year: i32,
    apartment: Apartment,
) -> Option<Family> {
    if !policy.is_preferred_month(month) {
        return None;
    }
    policy.priority.iter().find_map(|rule| match rule {
        PriorityRule::Fixed {
            apartment: apt,
            family,
        } if *apt == apartment => Some(*family),
        PriorityRule::Alternating {
            apartment: apt,
            months,
            even_years,
            odd_years,
        } if *apt == apartment && months.contains(&month) => {
            Some(if year % 2 == 0 { *even_years } else { *odd_years })
        }
        _ => None,
    })
}

/// Priority family of the first preferred night in the range.
pub fn priority_family_for_range(
    policy: &BookingPolicy,
    apartment: Apartment,
    stay: &StayRange,
) -> Option<Family> {
    stay.each_night()
        .find(|night| policy.is_preferred_month(night.month()))
        .and_then(|night| priority_family(policy, night.month(), night.year(), apartment))
}

/// How a valid request is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// A normal reservation that blocks the calendar.
    Binding,
    /// A non-binding wish, decided by the admin after the window closes.
    Intention,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binding => write!(f, "binding reservation"),
            Self::Intention => write!(f, "intention"),
        }
    }
}

/// Decide whether a request becomes an intention or a binding reservation.
///
/// The window for a summer opens on 1 January of that year; during the
/// window months every member files intentions, afterwards requests are
/// first come, first served. Admin requests are always binding.
pub fn classify(
    policy: &BookingPolicy,
    stay: &StayRange,
    requester: &User,
    today: NaiveDate,
) -> Result<Classification, ClassificationError> {
    if requester.is_admin() {
        return Ok(Classification::Binding);
    }

    let preferred_nights = stay.nights_in_months(&policy.preferred_months);
    if preferred_nights == 0 {
        return Ok(Classification::Binding);
    }

    let year = stay.arrival.year();
    match year.cmp(&today.year()) {
        Ordering::Greater => Err(ClassificationError::WindowNotOpen { year }),
        Ordering::Less => Ok(Classification::Binding),
        Ordering::Equal if policy.window.months.contains(&today.month()) => {
            let max = policy.window.intention_max_nights;
            if preferred_nights > i64::from(max) {
                Err(ClassificationError::IntentionTooLong {
                    nights: preferred_nights,
                    max,
                })
            } else {
                Ok(Classification::Intention)
            }
        }
        Ordering::Equal => Ok(Classification::Binding),
    }
}

/// One intention as the admin sees it in a contested group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub family: Option<Family>,
    pub score: i64,
    pub has_priority: bool,
    pub created: DateTime<Utc>,
}

impl Candidate {
    /// Score and family come from the user when known, otherwise from the
    /// snapshot on the record.
    pub fn from_intention(
        reservation: &Reservation,
        users: &[User],
        priority: Option<Family>,
    ) -> Self {
        let user = reservation
            .user_id
            .as_deref()
            .and_then(|id| users.iter().find(|u| u.id == id));
        let family = reservation.family.or_else(|| user.and_then(|u| u.family));
        Self {
            id: reservation.id.clone(),
            user_id: reservation.user_id.clone(),
            name: user.map_or_else(|| reservation.name.clone(), |u| u.name.clone()),
            family,
            score: user.map_or(0, |u| u.score),
            has_priority: family.is_some() && family == priority,
            created: reservation.created,
        }
    }
}

/// Total order for competing intentions: higher score first, then priority
/// family, then earlier submission, then id.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.has_priority.cmp(&a.has_priority))
        .then_with(|| a.created.cmp(&b.created))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn rank_intentions(
    policy: &BookingPolicy,
    intentions: &[&Reservation],
    users: &[User],
) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = intentions
        .iter()
        .map(|r| {
            let priority = priority_family_for_range(policy, r.apartment, &r.stay());
            Candidate::from_intention(r, users, priority)
        })
        .collect();
    ranked.sort_by(compare_candidates);
    ranked
}

/// Open intentions for the same apartment and the exact same dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentionGroup {
    pub apartment: Apartment,
    pub stay: StayRange,
    pub priority_family: Option<Family>,
    pub candidates: Vec<Candidate>,
}

impl IntentionGroup {
    pub fn is_contested(&self) -> bool {
        self.candidates.len() > 1
    }
}

impl fmt::Display for IntentionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Apartment {} | {}", self.apartment, self.stay)?;
        match self.priority_family {
            Some(family) => writeln!(f, " | priority: {}", family.label())?,
            None => writeln!(f, " | no priority family")?,
        }
        for (i, c) in self.candidates.iter().enumerate() {
            let marker = if c.has_priority { " *" } else { "" };
            writeln!(
                f,
                "  {}. {} (id {}) | score {}{}",
                i + 1,
                c.name,
                c.id,
                c.score,
                marker
            )?;
        }
        Ok(())
    }
}

/// Group all open intentions, ordered by apartment then arrival, each group
/// ranked with [`compare_candidates`].
pub fn group_intentions(
    policy: &BookingPolicy,
    reservations: &[Reservation],
    users: &[User],
) -> Vec<IntentionGroup> {
    let mut buckets: BTreeMap<(Apartment, NaiveDate, NaiveDate), Vec<&Reservation>> =
        BTreeMap::new();
    for r in reservations.iter().filter(|r| r.is_open_intention()) {
        buckets
            .entry((r.apartment, r.arrival, r.departure))
            .or_default()
            .push(r);
    }

    buckets
        .into_iter()
        .map(|((apartment, arrival, departure), members)| {
            let stay = StayRange { arrival, departure };
            IntentionGroup {
                apartment,
                stay,
                priority_family: priority_family_for_range(policy, apartment, &stay),
                candidates: rank_intentions(policy, &members, users),
            }
        })
        .collect()
}
