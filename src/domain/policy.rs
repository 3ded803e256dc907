//! Business tables that changed between revisions of the booking site.
//!
//! Month numbers are 1-based (1 = January). Every table has a default that
//! matches the current rules; a config file may replace any of them.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::apartment::{Apartment, Family};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPolicy {
    /// Months billed at the summer rate.
    #[serde(default = "default_pricing_summer_months")]
    pub pricing_summer_months: Vec<u32>,
    #[serde(default)]
    pub peak: PeakRules,
    /// Contested months: priority families and intentions apply here.
    #[serde(default = "default_preferred_months")]
    pub preferred_months: Vec<u32>,
    #[serde(default)]
    pub window: PriorityWindow,
    #[serde(default = "default_rates")]
    pub rates: Vec<RateEntry>,
    #[serde(default = "default_priority")]
    pub priority: Vec<PriorityRule>,
    #[serde(default)]
    pub discounts: DiscountRules,
    /// Paid stays cancelled at least this many days ahead are refundable.
    #[serde(default = "default_refund_horizon_days")]
    pub refund_horizon_days: i64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            pricing_summer_months: default_pricing_summer_months(),
            peak: PeakRules::default(),
            preferred_months: default_preferred_months(),
            window: PriorityWindow::default(),
            rates: default_rates(),
            priority: default_priority(),
            discounts: DiscountRules::default(),
            refund_horizon_days: default_refund_horizon_days(),
        }
    }
}

impl BookingPolicy {
    pub fn is_preferred_month(&self, month: u32) -> bool {
        self.preferred_months.contains(&month)
    }

    pub fn rate_for(&self, apartment: Apartment, family: Family) -> Option<&RateEntry> {
        self.rates
            .iter()
            .find(|r| r.apartment == apartment && r.family == family)
    }
}

/// Whole-week turnover rules for the busiest months.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakRules {
    #[serde(default = "default_peak_months")]
    pub months: Vec<u32>,
    #[serde(default = "default_turnover_day")]
    pub turnover_day: Weekday,
    #[serde(default = "default_max_weeks")]
    pub max_weeks: u32,
}

impl Default for PeakRules {
    fn default() -> Self {
        Self {
            months: default_peak_months(),
            turnover_day: default_turnover_day(),
            max_weeks: default_max_weeks(),
        }
    }
}

/// The yearly period during which summer requests become intentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWindow {
    #[serde(default = "default_window_months")]
    pub months: Vec<u32>,
    /// Cap on nights inside preferred months for a single intention.
    #[serde(default = "default_intention_max_nights")]
    pub intention_max_nights: u32,
}

impl Default for PriorityWindow {
    fn default() -> Self {
        Self {
            months: default_window_months(),
            intention_max_nights: default_intention_max_nights(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateEntry {
    pub apartment: Apartment,
    pub family: Family,
    pub summer: f64,
    pub low: f64,
    /// Summer is billed per started week at `summer`.
    #[serde(default)]
    pub weekly_in_summer: bool,
}

/// Which family is favoured for an apartment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriorityRule {
    /// The same family for every preferred month.
    Fixed { apartment: Apartment, family: Family },
    /// Year parity decides for the listed months.
    Alternating {
        apartment: Apartment,
        months: Vec<u32>,
        even_years: Family,
        odd_years: Family,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRules {
    #[serde(default = "default_long_stay_nights")]
    pub long_stay_nights: i64,
    #[serde(default = "default_long_stay_percent")]
    pub long_stay_percent: f64,
    #[serde(default = "default_last_minute_days")]
    pub last_minute_days: i64,
    #[serde(default = "default_family_percent")]
    pub family_percent: f64,
}

impl Default for DiscountRules {
    fn default() -> Self {
        Self {
            long_stay_nights: default_long_stay_nights(),
            long_stay_percent: default_long_stay_percent(),
            last_minute_days: default_last_minute_days(),
            family_percent: default_family_percent(),
        }
    }
}

fn default_pricing_summer_months() -> Vec<u32> {
    vec![7, 8]
}

fn default_peak_months() -> Vec<u32> {
    vec![7, 8]
}

fn default_turnover_day() -> Weekday {
    Weekday::Sat
}

fn default_max_weeks() -> u32 {
    2
}

fn default_preferred_months() -> Vec<u32> {
    vec![6, 7, 8, 9]
}

fn default_window_months() -> Vec<u32> {
    vec![1, 2, 3]
}

fn default_intention_max_nights() -> u32 {
    14
}

fn default_refund_horizon_days() -> i64 {
    14
}

fn default_long_stay_nights() -> i64 {
    21
}

fn default_long_stay_percent() -> f64 {
    5.0
}

fn default_last_minute_days() -> i64 {
    14
}

fn default_family_percent() -> f64 {
    10.0
}

fn rate(apartment: Apartment, family: Family, summer: f64, low: f64, weekly: bool) -> RateEntry {
    RateEntry {
        apartment,
        family,
        summer,
        low,
        weekly_in_summer: weekly,
    }
}

fn default_rates() -> Vec<RateEntry> {
    use Apartment::{App35, App36};
    use Family::{A, B, C};
    vec![
        rate(App35, A, 58.0, 43.0, false),
        rate(App35, B, 58.0, 43.0, false),
        rate(App35, C, 143.0, 86.0, false),
        rate(App36, B, 48.0, 34.0, false),
        rate(App36, A, 675.0, 67.0, true),
        rate(App36, C, 675.0, 67.0, true),
    ]
}

fn default_priority() -> Vec<PriorityRule> {
    vec![
        PriorityRule::Fixed {
            apartment: Apartment::App36,
            family: Family::B,
        },
        PriorityRule::Alternating {
            apartment: Apartment::App35,
            months: vec![6, 7],
            even_years: Family::A,
            odd_years: Family::B,
        },
        PriorityRule::Alternating {
            apartment: Apartment::App35,
            months: vec![8, 9],
            even_years: Family::B,
            odd_years: Family::A,
        },
    ]
}
