use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::apartment::{Apartment, Family};
use super::policy::BookingPolicy;
use super::priority;
use super::stay::StayRange;
use super::user::Role;
use crate::error::PricingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Summer,
    Low,
}

impl Season {
    pub fn of_month(policy: &BookingPolicy, month: u32) -> Self {
        if policy.pricing_summer_months.contains(&month) {
            Self::Summer
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summer => write!(f, "summer"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingUnit {
    Night,
    Week,
}

/// One line of the breakdown: `count` units at `rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSegment {
    pub season: Season,
    pub unit: BillingUnit,
    pub rate: f64,
    pub count: u32,
}

impl PriceSegment {
    pub fn amount(&self) -> f64 {
        self.rate * f64::from(self.count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Admins stay for free.
    Administrator,
    LongStay,
    /// Last-minute booking by a family that has no priority for the period.
    LastMinuteFamily,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    pub percentage: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub apartment: Apartment,
    pub family: Family,
    pub stay: StayRange,
    pub nights: i64,
    pub segments: Vec<PriceSegment>,
    pub discounts: Vec<Discount>,
    /// Total before discounts, set once the discount stage ran.
    pub base_total: Option<f64>,
    pub total: f64,
}

/// Who is booking, for the discount stage.
#[derive(Debug, Clone, Copy)]
pub struct DiscountContext {
    pub role: Role,
    pub family: Option<Family>,
    pub today: NaiveDate,
}

/// Base price for a stay, before discounts.
///
/// Nights in a weekly-billed regime are charged per started week.
pub fn calculate_price(
    policy: &BookingPolicy,
    apartment: Apartment,
    stay: &StayRange,
    family: Family,
) -> Result<PriceQuote, PricingError> {
    if stay.departure <= stay.arrival {
        return Err(PricingError::EmptyRange {
            arrival: stay.arrival,
            departure: stay.departure,
        });
    }
    let entry = policy
        .rate_for(apartment, family)
        .ok_or(PricingError::MissingRate {
            apartment,
            family,
            season: Season::of_month(policy, stay.arrival.month()),
        })?;

    let mut segments: Vec<PriceSegment> = Vec::new();
    let mut weekly_nights: u32 = 0;

    for night in stay.each_night() {
        let season = Season::of_month(policy, night.month());
        let rate = match season {
            Season::Summer => entry.summer,
            Season::Low => entry.low,
        };
        if !(rate.is_finite() && rate > 0.0) {
            return Err(PricingError::MissingRate {
                apartment,
                family,
                season,
            });
        }
        if season == Season::Summer && entry.weekly_in_summer {
            weekly_nights += 1;
            continue;
        }
        match segments
            .iter_mut()
            .find(|s| s.season == season && s.unit == BillingUnit::Night)
        {
            Some(segment) => segment.count += 1,
            None => segments.push(PriceSegment {
                season,
                unit: BillingUnit::Night,
                rate,
                count: 1,
            }),
        }
    }

    if weekly_nights > 0 {
        segments.push(PriceSegment {
            season: Season::Summer,
            unit: BillingUnit::Week,
            rate: entry.summer,
            count: weekly_nights.div_ceil(7),
        });
    }

    let total = segments.iter().map(PriceSegment::amount).sum();
    tracing::debug!(%apartment, %family, stay = %stay, total, "price calculated");

    Ok(PriceQuote {
        apartment,
        family,
        stay: *stay,
        nights: stay.nights(),
        segments,
        discounts: Vec::new(),
        base_total: None,
        total,
    })
}

/// Discount stage, composed after [`calculate_price`].
///
/// Order matters: the family discount is taken from what remains after the
/// long-stay discount. An admin waiver replaces every other discount.
pub fn apply_discounts(
    policy: &BookingPolicy,
    mut quote: PriceQuote,
    ctx: &DiscountContext,
) -> PriceQuote {
    let base = quote.total;
    quote.base_total = Some(base);
    quote.discounts.clear();

    if ctx.role == Role::Admin {
        quote.discounts.push(Discount {
            kind: DiscountKind::Administrator,
            percentage: 100.0,
            amount: base,
        });
        quote.total = 0.0;
        return quote;
    }

    let rules = &policy.discounts;
    let mut discounted = 0.0;

    let entirely_off_season = quote
        .stay
        .each_night()
        .all(|night| !policy.is_preferred_month(night.month()));
    if quote.nights >= rules.long_stay_nights && entirely_off_season {
        let amount = base * rules.long_stay_percent / 100.0;
        discounted += amount;
        quote.discounts.push(Discount {
            kind: DiscountKind::LongStay,
            percentage: rules.long_stay_percent,
            amount,
        });
    }

    let arrival = quote.stay.arrival;
    let days_until_arrival = (arrival - ctx.today).num_days();
    if (0..=rules.last_minute_days).contains(&days_until_arrival)
        && policy.is_preferred_month(arrival.month())
        && let Some(family) = ctx.family
    {
        let favoured =
            priority::priority_family(policy, arrival.month(), arrival.year(), quote.apartment);
        if favoured != Some(family) {
            let amount = (base - discounted) * rules.family_percent / 100.0;
            discounted += amount;
            quote.discounts.push(Discount {
                kind: DiscountKind::LastMinuteFamily,
                percentage: rules.family_percent,
                amount,
            });
        }
    }

    quote.total = (base - discounted).max(0.0);
    quote
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Price for apartment {} ({}), {} ({} nights)",
            self.apartment,
            self.family.label(),
            self.stay,
            self.nights
        )?;
        for segment in &self.segments {
            let unit = match segment.unit {
                BillingUnit::Night => "night",
                BillingUnit::Week => "week",
            };
            writeln!(
                f,
                "  {} {unit}(s) {} season @ €{:.2}/{unit} = €{:.2}",
                segment.count,
                segment.season,
                segment.rate,
                segment.amount()
            )?;
        }
        if let Some(base) = self.base_total {
            writeln!(f, "  Subtotal: €{base:.2}")?;
        }
        for discount in &self.discounts {
            let label = match discount.kind {
                DiscountKind::Administrator => "Administrator",
                DiscountKind::LongStay => "Long stay",
                DiscountKind::LastMinuteFamily => "Last-minute family",
            };
            writeln!(
                f,
                "  {label} discount ({}%): -€{:.2}",
                discount.percentage, discount.amount
            )?;
        }
        write!(f, "Total: €{:.2}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn stay(a: NaiveDate, b: NaiveDate) -> StayRange {
        StayRange {
            arrival: a,
            departure: b,
        }
    }

    fn member(family: Option<Family>, today: NaiveDate) -> DiscountContext {
        DiscountContext {
            role: Role::Member,
            family,
            today,
        }
    }

    #[test]
    fn summer_week_at_nightly_rate() {
        let policy = BookingPolicy::default();
        let quote = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 7, 5), d(2025, 7, 12)),
            Family::A,
        )
        .unwrap();
        assert_eq!(quote.nights, 7);
        assert!((quote.total - 7.0 * 58.0).abs() < 1e-9);
        assert_eq!(quote.segments.len(), 1);
        assert_eq!(quote.segments[0].season, Season::Summer);
    }

    #[test]
    fn stay_across_season_boundary_has_two_segments() {
        let policy = BookingPolicy::default();
        let quote = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 6, 28), d(2025, 7, 3)),
            Family::C,
        )
        .unwrap();
        // 28, 29, 30 June low; 1, 2 July summer
        assert!((quote.total - (3.0 * 86.0 + 2.0 * 143.0)).abs() < 1e-9);
        assert_eq!(quote.segments[0].season, Season::Low);
        assert_eq!(quote.segments[0].count, 3);
        assert_eq!(quote.segments[1].season, Season::Summer);
        assert_eq!(quote.segments[1].count, 2);
    }

    #[test]
    fn weekly_regime_rounds_partial_week_up() {
        let policy = BookingPolicy::default();
        let quote = calculate_price(
            &policy,
            Apartment::App36,
            &stay(d(2025, 7, 5), d(2025, 7, 15)),
            Family::A,
        )
        .unwrap();
        assert_eq!(quote.segments.len(), 1);
        assert_eq!(quote.segments[0].unit, BillingUnit::Week);
        assert_eq!(quote.segments[0].count, 2);
        assert!((quote.total - 1350.0).abs() < 1e-9);
    }

    #[test]
    fn weekly_regime_only_counts_summer_nights() {
        let policy = BookingPolicy::default();
        let quote = calculate_price(
            &policy,
            Apartment::App36,
            &stay(d(2025, 6, 29), d(2025, 7, 5)),
            Family::C,
        )
        .unwrap();
        // 2 low nights at 67, 4 summer nights = 1 started week at 675
        assert!((quote.total - (2.0 * 67.0 + 675.0)).abs() < 1e-9);
    }

    #[test]
    fn family_b_in_36_pays_nightly() {
        let policy = BookingPolicy::default();
        let quote = calculate_price(
            &policy,
            Apartment::App36,
            &stay(d(2025, 7, 5), d(2025, 7, 12)),
            Family::B,
        )
        .unwrap();
        assert!((quote.total - 7.0 * 48.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_range_is_an_error() {
        let policy = BookingPolicy::default();
        let err = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 7, 12), d(2025, 7, 5)),
            Family::A,
        )
        .unwrap_err();
        assert!(matches!(err, PricingError::EmptyRange { .. }));
    }

    #[test]
    fn missing_rate_is_an_error() {
        let mut policy = BookingPolicy::default();
        policy
            .rates
            .retain(|r| !(r.apartment == Apartment::App35 && r.family == Family::C));
        let err = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 3, 1), d(2025, 3, 4)),
            Family::C,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PricingError::MissingRate {
                apartment: Apartment::App35,
                family: Family::C,
                season: Season::Low,
            }
        );
    }

    #[test]
    fn admin_waiver_short_circuits() {
        let policy = BookingPolicy::default();
        let base = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 10, 1), d(2025, 10, 29)),
            Family::A,
        )
        .unwrap();
        let ctx = DiscountContext {
            role: Role::Admin,
            family: Some(Family::A),
            today: d(2025, 9, 30),
        };
        let quote = apply_discounts(&policy, base, &ctx);
        assert!(quote.total.abs() < f64::EPSILON);
        assert_eq!(quote.discounts.len(), 1);
        assert_eq!(quote.discounts[0].kind, DiscountKind::Administrator);
        assert!((quote.base_total.unwrap() - 28.0 * 43.0).abs() < 1e-9);
    }

    #[test]
    fn long_stay_outside_summer_gets_five_percent() {
        let policy = BookingPolicy::default();
        let base = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 10, 1), d(2025, 10, 22)),
            Family::A,
        )
        .unwrap();
        let quote = apply_discounts(&policy, base, &member(Some(Family::A), d(2025, 1, 1)));
        let expected_base = 21.0 * 43.0;
        assert!((quote.total - expected_base * 0.95).abs() < 1e-9);
        assert_eq!(quote.discounts[0].kind, DiscountKind::LongStay);
    }

    #[test]
    fn long_stay_touching_preferred_months_gets_nothing() {
        let policy = BookingPolicy::default();
        let base = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 5, 15), d(2025, 6, 10)),
            Family::A,
        )
        .unwrap();
        let quote = apply_discounts(&policy, base, &member(Some(Family::A), d(2025, 1, 1)));
        assert!(quote.discounts.is_empty());
        assert!((quote.total - quote.base_total.unwrap()).abs() < f64::EPSILON);
    }

    #[test]
    fn last_minute_discount_for_non_priority_family() {
        let policy = BookingPolicy::default();
        // July 2025 on 35 favours family B (odd year)
        let base = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 7, 5), d(2025, 7, 12)),
            Family::A,
        )
        .unwrap();
        let quote = apply_discounts(&policy, base, &member(Some(Family::A), d(2025, 6, 25)));
        assert_eq!(quote.discounts.len(), 1);
        assert_eq!(quote.discounts[0].kind, DiscountKind::LastMinuteFamily);
        assert!((quote.total - 406.0 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn priority_family_gets_no_last_minute_discount() {
        let policy = BookingPolicy::default();
        let base = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 7, 5), d(2025, 7, 12)),
            Family::B,
        )
        .unwrap();
        let quote = apply_discounts(&policy, base, &member(Some(Family::B), d(2025, 6, 25)));
        assert!(quote.discounts.is_empty());
    }

    #[test]
    fn last_minute_window_is_fourteen_days() {
        let policy = BookingPolicy::default();
        let base = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 7, 5), d(2025, 7, 12)),
            Family::A,
        )
        .unwrap();
        let early = apply_discounts(
            &policy,
            base.clone(),
            &member(Some(Family::A), d(2025, 6, 20)),
        );
        let edge = apply_discounts(&policy, base, &member(Some(Family::A), d(2025, 6, 21)));
        assert!(early.discounts.is_empty());
        assert_eq!(edge.discounts.len(), 1);
    }

    #[test]
    fn unaffiliated_requester_gets_no_family_discount() {
        let policy = BookingPolicy::default();
        let base = calculate_price(
            &policy,
            Apartment::App35,
            &stay(d(2025, 7, 5), d(2025, 7, 12)),
            Family::C,
        )
        .unwrap();
        let quote = apply_discounts(&policy, base, &member(None, d(2025, 6, 30)));
        assert!(quote.discounts.is_empty());
    }

    #[test]
    fn display_lists_segments_and_total() {
        let policy = BookingPolicy::default();
        let base = calculate_price(
            &policy,
            Apartment::App36,
            &stay(d(2025, 7, 5), d(2025, 7, 12)),
            Family::A,
        )
        .unwrap();
        let s = base.to_string();
        assert!(s.contains("1 week(s) summer season @ €675.00/week"));
        assert!(s.ends_with("Total: €675.00"));
    }
}
