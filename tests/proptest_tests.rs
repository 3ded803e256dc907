#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use proptest::prelude::*;

use family_stays::domain::apartment::{Apartment, Family};
use family_stays::domain::pricing::{Season, calculate_price};
use family_stays::domain::policy::BookingPolicy;
use family_stays::domain::priority::priority_family;
use family_stays::domain::reservation::{Reservation, ReservationStatus};
use family_stays::domain::scoring::score_adjustments;
use family_stays::domain::season::{check_season_rules, snap_to_turnover_day};
use family_stays::domain::stay::StayRange;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn arb_stay() -> impl Strategy<Value = StayRange> {
    (0..700_i64, 1..40_i64).prop_map(|(offset, nights)| {
        let arrival = base() + TimeDelta::days(offset);
        StayRange::new(arrival, arrival + TimeDelta::days(nights)).unwrap()
    })
}

fn arb_apartment() -> impl Strategy<Value = Apartment> {
    prop_oneof![Just(Apartment::App35), Just(Apartment::App36)]
}

fn arb_family() -> impl Strategy<Value = Family> {
    prop_oneof![Just(Family::A), Just(Family::B), Just(Family::C)]
}

/// A Saturday in July or August 2025.
fn arb_peak_saturday() -> impl Strategy<Value = NaiveDate> {
    (0..9_i64).prop_map(|week| NaiveDate::from_ymd_opt(2025, 7, 5).unwrap() + TimeDelta::weeks(week))
}

fn intention(id: usize, user: &str) -> Reservation {
    let arrival = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
    Reservation {
        id: format!("i{id}"),
        apartment: Apartment::App35,
        name: user.to_string(),
        email: format!("{user}@stays.test"),
        user_id: Some(user.to_string()),
        created_by: None,
        arrival,
        departure: arrival + TimeDelta::days(7),
        guests: 2,
        note: String::new(),
        price: 0.0,
        status: ReservationStatus::Pending,
        is_intention: true,
        family: None,
        created: base().and_hms_opt(8, 0, 0).unwrap().and_utc(),
        confirmed_at: None,
        cancellation_requested: None,
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_pricing_is_deterministic(stay in arb_stay(), apt in arb_apartment(), family in arb_family()) {
        let policy = BookingPolicy::default();
        let first = calculate_price(&policy, apt, &stay, family).unwrap();
        let second = calculate_price(&policy, apt, &stay, family).unwrap();
        prop_assert_eq!(first.total, second.total);
        prop_assert_eq!(first.segments, second.segments);
    }

    #[test]
    fn prop_nightly_total_is_sum_of_nights(stay in arb_stay(), family in arb_family()) {
        let policy = BookingPolicy::default();
        let entry = policy.rate_for(Apartment::App35, family).unwrap();
        let expected: f64 = stay
            .each_night()
            .map(|night| match Season::of_month(&policy, night.month()) {
                Season::Summer => entry.summer,
                Season::Low => entry.low,
            })
            .sum();
        let quote = calculate_price(&policy, Apartment::App35, &stay, family).unwrap();
        prop_assert!((quote.total - expected).abs() < 1e-6);
        prop_assert_eq!(quote.nights, stay.nights());
    }

    #[test]
    fn prop_weekly_regime_charges_started_weeks(stay in arb_stay()) {
        let policy = BookingPolicy::default();
        let summer = stay.nights_in_months(&policy.pricing_summer_months);
        let low = stay.nights() - summer;
        let weeks = (summer + 6) / 7;
        let expected = weeks as f64 * 675.0 + low as f64 * 67.0;
        let quote = calculate_price(&policy, Apartment::App36, &stay, Family::A).unwrap();
        prop_assert!((quote.total - expected).abs() < 1e-6, "{} != {}", quote.total, expected);
    }
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_overlap_is_symmetric(a in arb_stay(), b in arb_stay()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn prop_adjacent_stays_never_overlap(a in arb_stay(), nights in 1..30_i64) {
        let next = StayRange::new(a.departure, a.departure + TimeDelta::days(nights)).unwrap();
        prop_assert!(!a.overlaps(&next));
        prop_assert!(!next.overlaps(&a));
        prop_assert!(a.overlaps(&a));
    }
}

// ---------------------------------------------------------------------------
// Season rules
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_peak_arrival_off_turnover_day_is_rejected(
        saturday in arb_peak_saturday(),
        shift in 1..7_i64,
        weeks in 1..3_i64,
    ) {
        let arrival = saturday + TimeDelta::days(shift);
        prop_assume!(arrival.month() == 7 || arrival.month() == 8);
        let stay = StayRange::new(arrival, arrival + TimeDelta::weeks(weeks)).unwrap();
        prop_assert!(check_season_rules(&BookingPolicy::default(), &stay).is_err());
    }

    #[test]
    fn prop_peak_partial_weeks_are_rejected(saturday in arb_peak_saturday(), nights in 1..30_i64) {
        prop_assume!(nights % 7 != 0);
        let stay = StayRange::new(saturday, saturday + TimeDelta::days(nights)).unwrap();
        prop_assert!(check_season_rules(&BookingPolicy::default(), &stay).is_err());
    }

    #[test]
    fn prop_peak_whole_weeks_up_to_cap(saturday in arb_peak_saturday(), weeks in 1..5_i64) {
        let stay = StayRange::new(saturday, saturday + TimeDelta::weeks(weeks)).unwrap();
        let result = check_season_rules(&BookingPolicy::default(), &stay);
        prop_assert_eq!(result.is_ok(), weeks <= 2);
    }

    #[test]
    fn prop_snapped_peak_dates_land_on_saturday(offset in 0..62_i64) {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap() + TimeDelta::days(offset);
        let snapped = snap_to_turnover_day(&BookingPolicy::default(), date);
        prop_assert!(snapped <= date);
        prop_assert!((date - snapped).num_days() < 7);
        prop_assert_eq!(snapped.weekday(), Weekday::Sat);
    }
}

// ---------------------------------------------------------------------------
// Priority and scoring
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_alternating_apartment_flips_each_year(year in 2000..2100_i32, month in 6..10_u32) {
        let policy = BookingPolicy::default();
        let this_year = priority_family(&policy, month, year, Apartment::App35);
        let next_year = priority_family(&policy, month, year + 1, Apartment::App35);
        prop_assert!(this_year.is_some());
        prop_assert_ne!(this_year, next_year);
    }

    #[test]
    fn prop_fixed_apartment_never_changes(year in 2000..2100_i32, month in 6..10_u32) {
        let policy = BookingPolicy::default();
        prop_assert_eq!(priority_family(&policy, month, year, Apartment::App36), Some(Family::B));
    }

    #[test]
    fn prop_score_changes_balance(losers in 1..8_usize) {
        let winner = intention(0, "u0");
        let others: Vec<Reservation> = (1..=losers).map(|i| intention(i, &format!("u{i}"))).collect();
        let adjustments = score_adjustments(&winner, &others);

        prop_assert_eq!(adjustments.len(), losers + 1);
        prop_assert_eq!(adjustments.iter().filter(|a| a.delta == -1).count(), 1);
        prop_assert_eq!(adjustments.iter().filter(|a| a.delta == 1).count(), losers);
    }
}
