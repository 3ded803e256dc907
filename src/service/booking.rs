use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use super::BookingService;
use crate::domain::apartment::{Apartment, Family};
use crate::domain::availability;
use crate::domain::lifecycle::{self, CancellationOutcome};
use crate::domain::pricing::PriceQuote;
use crate::domain::priority::{self, Classification};
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::season;
use crate::domain::stay::StayRange;
use crate::domain::user::User;
use crate::error::{BookingError, Result};

/// A member's request for a stay.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: String,
    pub apartment: Apartment,
    pub stay: StayRange,
    pub guests: u32,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub reservation: Reservation,
    pub classification: Classification,
    pub quote: PriceQuote,
    /// Names of other members holding an intention for an overlapping period.
    pub competing: Vec<String>,
}

/// What a submission would run into, without writing anything.
#[derive(Debug, Clone, Serialize)]
pub struct RequestCheck {
    pub apartment: Apartment,
    pub stay: StayRange,
    pub season_violation: Option<String>,
    pub classification: Option<Classification>,
    pub classification_error: Option<String>,
    /// Id of a binding record already occupying the period.
    pub conflict_with: Option<String>,
    pub competing: Vec<String>,
    pub priority_family: Option<Family>,
    pub quote: Option<PriceQuote>,
}

impl RequestCheck {
    pub fn can_submit(&self) -> bool {
        self.season_violation.is_none()
            && self.classification_error.is_none()
            && self.conflict_with.is_none()
    }
}

impl BookingService {
    pub async fn submit(&self, request: BookingRequest) -> Result<SubmitOutcome> {
        let user = self.store.find_user(&request.user_id).await?;
        if !user.may_book() {
            return Err(BookingError::Forbidden {
                reason: format!("{} is not allowed to book yet", user.name),
            });
        }
        if request.guests == 0 {
            return Err(BookingError::InvalidRequest {
                reason: "at least one guest is required".into(),
            });
        }

        let today = self.clock.today();
        let stay = request.stay;
        if !user.is_admin() && stay.arrival < today {
            return Err(BookingError::InvalidRequest {
                reason: format!("arrival {} is in the past", stay.arrival),
            });
        }

        season::check_season_rules(&self.policy, &stay)?;
        let classification = priority::classify(&self.policy, &stay, &user, today)?;
        debug!(user = %user.id, %classification, stay = %stay, "request classified");

        let reservations = self.store.all_reservations().await?;
        if !user.is_admin() {
            check_quota(&user, &reservations, stay.arrival)?;
        }
        if availability::overlaps_confirmed(&reservations, request.apartment, &stay, None) {
            return Err(BookingError::Conflict {
                apartment: request.apartment,
                arrival: stay.arrival,
                departure: stay.departure,
            });
        }

        let quote = self.quote(request.apartment, &stay, Some(&user))?;
        let competing = competing_names(&reservations, request.apartment, &stay, &user.id);

        let reservation = Reservation {
            id: self.next_id(|id| reservations.iter().any(|r| r.id == id)),
            apartment: request.apartment,
            name: user.name.clone(),
            email: user.email.clone(),
            user_id: Some(user.id.clone()),
            created_by: Some(user.name.clone()),
            arrival: stay.arrival,
            departure: stay.departure,
            guests: request.guests,
            note: request.note,
            price: quote.total,
            status: ReservationStatus::Pending,
            is_intention: classification == Classification::Intention,
            family: user.family,
            created: self.clock.now(),
            confirmed_at: None,
            cancellation_requested: None,
        };
        self.store.persist(&reservation).await?;
        info!(
            id = %reservation.id,
            user = %user.id,
            apartment = %reservation.apartment,
            stay = %stay,
            intention = reservation.is_intention,
            "booking submitted"
        );

        Ok(SubmitOutcome {
            reservation,
            classification,
            quote,
            competing,
        })
    }

    /// Owner cancellation. Paid stays follow the refund horizon.
    pub async fn cancel(&self, user_id: &str, reservation_id: &str) -> Result<CancellationOutcome> {
        let reservation = self.store.find_reservation(reservation_id).await?;
        if !reservation.belongs_to(user_id) {
            return Err(BookingError::Forbidden {
                reason: format!("reservation {reservation_id} belongs to someone else"),
            });
        }

        let outcome = lifecycle::cancellation_outcome(
            &reservation,
            self.clock.today(),
            self.clock.now(),
            &self.policy,
        )?;
        match &outcome {
            CancellationOutcome::Delete => {
                self.store.remove(reservation_id).await?;
                info!(id = reservation_id, "reservation cancelled and removed");
            }
            CancellationOutcome::RefundPending { patch } => {
                self.store.update_fields(reservation_id, patch).await?;
                info!(id = reservation_id, "paid reservation cancelled, refund pending");
            }
            CancellationOutcome::DeleteWithoutRefund { days_before_arrival } => {
                self.store.remove(reservation_id).await?;
                info!(
                    id = reservation_id,
                    days_before_arrival, "paid reservation cancelled late, no refund"
                );
            }
        }
        Ok(outcome)
    }

    /// The user's records, earliest arrival first.
    pub async fn my_reservations(&self, user_id: &str) -> Result<Vec<Reservation>> {
        let mut mine: Vec<Reservation> = self
            .store
            .all_reservations()
            .await?
            .into_iter()
            .filter(|r| r.belongs_to(user_id))
            .collect();
        mine.sort_by(|a, b| a.arrival.cmp(&b.arrival).then_with(|| a.id.cmp(&b.id)));
        Ok(mine)
    }

    /// Pre-submission report for the booking form.
    pub async fn check_request(
        &self,
        user_id: &str,
        apartment: Apartment,
        stay: StayRange,
    ) -> Result<RequestCheck> {
        let user = self.store.find_user(user_id).await?;
        let reservations = self.store.all_reservations().await?;

        let season_violation = season::check_season_rules(&self.policy, &stay)
            .err()
            .map(|e| e.to_string());
        let (classification, classification_error) =
            match priority::classify(&self.policy, &stay, &user, self.clock.today()) {
                Ok(c) => (Some(c), None),
                Err(e) => (None, Some(e.to_string())),
            };
        let conflict_with =
            availability::first_confirmed_conflict(&reservations, apartment, &stay, None)
                .map(|r| r.id.clone());

        Ok(RequestCheck {
            apartment,
            stay,
            season_violation,
            classification,
            classification_error,
            conflict_with,
            competing: competing_names(&reservations, apartment, &stay, &user.id),
            priority_family: priority::priority_family_for_range(&self.policy, apartment, &stay),
            quote: self.quote(apartment, &stay, Some(&user)).ok(),
        })
    }
}

fn check_quota(user: &User, reservations: &[Reservation], arrival: NaiveDate) -> Result<()> {
    let year = arrival.year();
    let limit = user.settings.max_reservations_per_year;
    let used = reservations
        .iter()
        .filter(|r| r.belongs_to(&user.id) && r.arrival.year() == year)
        .count();
    if used >= limit as usize {
        return Err(BookingError::QuotaExceeded { limit, year });
    }
    Ok(())
}

fn competing_names(
    reservations: &[Reservation],
    apartment: Apartment,
    stay: &StayRange,
    user_id: &str,
) -> Vec<String> {
    let mut names: Vec<String> =
        availability::competing_intentions(reservations, apartment, stay, Some(user_id))
            .into_iter()
            .map(|r| r.name.clone())
            .collect();
    names.sort();
    names.dedup();
    names
}
