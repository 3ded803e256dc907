//! Status transitions of a single record.
//!
//! The functions here only decide; the service applies the resulting patch or
//! deletion through the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::policy::BookingPolicy;
use super::reservation::{Reservation, ReservationPatch, ReservationStatus};
use crate::error::{BookingError, Result};

/// `pending` → `approved`.
pub fn approve(reservation: &Reservation) -> Result<ReservationPatch> {
    match reservation.status {
        ReservationStatus::Pending => Ok(ReservationPatch::status(ReservationStatus::Approved)
            .expecting(ReservationStatus::Pending)),
        status => Err(BookingError::InvalidTransition {
            action: "approve",
            status,
        }),
    }
}

/// `pending` or `approved` → `paid`. There is no way back.
pub fn mark_paid(reservation: &Reservation) -> Result<ReservationPatch> {
    match reservation.status {
        status @ (ReservationStatus::Pending | ReservationStatus::Approved) => {
            Ok(ReservationPatch::status(ReservationStatus::Paid).expecting(status))
        }
        status => Err(BookingError::InvalidTransition {
            action: "mark as paid",
            status,
        }),
    }
}

/// Turn an open intention into an approved, binding reservation.
pub fn confirm_intention(reservation: &Reservation, now: DateTime<Utc>) -> Result<ReservationPatch> {
    if !reservation.is_open_intention() {
        return Err(BookingError::InvalidRequest {
            reason: format!("{} is not an open intention", reservation.id),
        });
    }
    Ok(ReservationPatch {
        status: Some(ReservationStatus::Approved),
        is_intention: Some(false),
        confirmed_at: Some(now),
        expect_status: Some(reservation.status),
        ..Default::default()
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CancellationOutcome {
    /// Not paid yet: the record simply disappears.
    Delete,
    /// Paid and early enough: kept until the refund is settled by hand.
    RefundPending { patch: ReservationPatch },
    /// Paid but too close to arrival: deleted, nothing is refunded.
    DeleteWithoutRefund { days_before_arrival: i64 },
}

/// What happens when the owner cancels `reservation` on `today`.
pub fn cancellation_outcome(
    reservation: &Reservation,
    today: NaiveDate,
    now: DateTime<Utc>,
    policy: &BookingPolicy,
) -> Result<CancellationOutcome> {
    match reservation.status {
        ReservationStatus::PendingCancellation => Err(BookingError::InvalidTransition {
            action: "cancel",
            status: ReservationStatus::PendingCancellation,
        }),
        ReservationStatus::Paid => {
            let days = (reservation.arrival - today).num_days();
            if days >= policy.refund_horizon_days {
                Ok(CancellationOutcome::RefundPending {
                    patch: ReservationPatch {
                        status: Some(ReservationStatus::PendingCancellation),
                        cancellation_requested: Some(now),
                        expect_status: Some(ReservationStatus::Paid),
                        ..Default::default()
                    },
                })
            } else {
                Ok(CancellationOutcome::DeleteWithoutRefund {
                    days_before_arrival: days,
                })
            }
        }
        ReservationStatus::Pending | ReservationStatus::Approved => Ok(CancellationOutcome::Delete),
    }
}
