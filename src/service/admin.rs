use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::BookingService;
use crate::domain::apartment::Family;
use crate::domain::availability;
use crate::domain::lifecycle;
use crate::domain::priority::{self, IntentionGroup};
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::scoring::{self, ScoreAdjustment};
use crate::domain::user::{BookingSettings, PriorityTier, User};
use crate::error::{BookingError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationOutcome {
    pub confirmed: Reservation,
    /// Competing intentions deleted by the confirmation.
    pub removed: Vec<String>,
    pub adjustments: Vec<ScoreAdjustment>,
}

/// Fields an admin may change on a user's booking settings. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSettingsUpdate {
    pub can_book: Option<bool>,
    pub max_reservations_per_year: Option<u32>,
    pub priority: Option<PriorityTier>,
    pub family: Option<Family>,
    pub rank: Option<String>,
}

impl BookingService {
    /// Confirm one intention: it becomes an approved reservation, every other
    /// open intention overlapping it on the same apartment is deleted, and
    /// scores move.
    pub async fn confirm_intention(
        &self,
        admin_id: &str,
        intention_id: &str,
    ) -> Result<ConfirmationOutcome> {
        self.require_admin(admin_id).await?;
        let reservations = self.store.all_reservations().await?;
        let intention = reservations
            .iter()
            .find(|r| r.id == intention_id)
            .cloned()
            .ok_or_else(|| BookingError::ReservationNotFound {
                id: intention_id.to_string(),
            })?;

        let patch = lifecycle::confirm_intention(&intention, self.clock.now())?;
        let stay = intention.stay();
        if availability::overlaps_confirmed(&reservations, intention.apartment, &stay, Some(intention_id))
        {
            return Err(BookingError::Conflict {
                apartment: intention.apartment,
                arrival: stay.arrival,
                departure: stay.departure,
            });
        }

        let losers: Vec<Reservation> =
            availability::competing_intentions(&reservations, intention.apartment, &stay, None)
                .into_iter()
                .filter(|r| r.id != intention.id)
                .cloned()
                .collect();

        let confirmed = self.store.update_fields(intention_id, &patch).await?;
        for (done, loser) in losers.iter().enumerate() {
            if let Err(e) = self.store.remove(&loser.id).await {
                let left: Vec<&str> = losers[done..].iter().map(|r| r.id.as_str()).collect();
                warn!(
                    id = intention_id,
                    error = %e,
                    removed = done,
                    left = ?left,
                    "intention confirmed but competing intentions remain; scores not adjusted"
                );
                return Err(e);
            }
        }

        let adjustments = scoring::score_adjustments(&intention, &losers);
        for adjustment in &adjustments {
            match self.store.find_user(&adjustment.user_id).await {
                Ok(mut user) => {
                    user.score = user.score.saturating_add(adjustment.delta);
                    self.store.persist_user(&user).await?;
                }
                Err(BookingError::UserNotFound { id }) => {
                    warn!(user = %id, "score adjustment for unknown user skipped");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            id = intention_id,
            removed = losers.len(),
            "intention confirmed"
        );
        Ok(ConfirmationOutcome {
            confirmed,
            removed: losers.into_iter().map(|r| r.id).collect(),
            adjustments,
        })
    }

    /// Delete one intention without confirming any other.
    pub async fn reject_intention(&self, admin_id: &str, intention_id: &str) -> Result<Reservation> {
        self.require_admin(admin_id).await?;
        let intention = self.store.find_reservation(intention_id).await?;
        if !intention.is_open_intention() {
            return Err(BookingError::InvalidRequest {
                reason: format!("{intention_id} is not an open intention"),
            });
        }
        self.store.remove(intention_id).await?;
        info!(id = intention_id, "intention rejected");
        Ok(intention)
    }

    pub async fn mark_approved(&self, admin_id: &str, reservation_id: &str) -> Result<Reservation> {
        self.require_admin(admin_id).await?;
        let reservation = self.binding_record(reservation_id).await?;
        let patch = lifecycle::approve(&reservation)?;
        let updated = self.store.update_fields(reservation_id, &patch).await?;
        info!(id = reservation_id, "reservation approved");
        Ok(updated)
    }

    pub async fn mark_paid(&self, admin_id: &str, reservation_id: &str) -> Result<Reservation> {
        self.require_admin(admin_id).await?;
        let reservation = self.binding_record(reservation_id).await?;
        let patch = lifecycle::mark_paid(&reservation)?;
        let updated = self.store.update_fields(reservation_id, &patch).await?;
        info!(id = reservation_id, "reservation marked as paid");
        Ok(updated)
    }

    /// Open intentions must go through confirmation, never a plain approval.
    async fn binding_record(&self, reservation_id: &str) -> Result<Reservation> {
        let reservation = self.store.find_reservation(reservation_id).await?;
        if reservation.is_open_intention() {
            return Err(BookingError::InvalidRequest {
                reason: format!("{reservation_id} is an intention; confirm it instead"),
            });
        }
        Ok(reservation)
    }

    /// Admin removal of any record.
    pub async fn remove(&self, admin_id: &str, reservation_id: &str) -> Result<Reservation> {
        self.require_admin(admin_id).await?;
        let reservation = self.store.find_reservation(reservation_id).await?;
        self.store.remove(reservation_id).await?;
        info!(id = reservation_id, status = %reservation.status, "reservation removed by admin");
        Ok(reservation)
    }

    /// Delete a cancelled paid stay once the refund was made by hand.
    pub async fn settle_cancellation(
        &self,
        admin_id: &str,
        reservation_id: &str,
    ) -> Result<Reservation> {
        self.require_admin(admin_id).await?;
        let reservation = self.store.find_reservation(reservation_id).await?;
        if reservation.status != ReservationStatus::PendingCancellation {
            return Err(BookingError::InvalidTransition {
                action: "settle the cancellation of",
                status: reservation.status,
            });
        }
        self.store.remove(reservation_id).await?;
        info!(id = reservation_id, refunded = reservation.price, "cancellation settled");
        Ok(reservation)
    }

    pub async fn intention_groups(&self, admin_id: &str) -> Result<Vec<IntentionGroup>> {
        self.require_admin(admin_id).await?;
        let reservations = self.store.all_reservations().await?;
        let users = self.store.all_users().await?;
        Ok(priority::group_intentions(&self.policy, &reservations, &users))
    }

    /// New members start unapproved and cannot book.
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        family: Option<Family>,
    ) -> Result<User> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || !email.contains('@') {
            return Err(BookingError::InvalidRequest {
                reason: "a name and a valid email address are required".into(),
            });
        }
        let users = self.store.all_users().await?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(BookingError::InvalidRequest {
                reason: format!("{email} is already registered"),
            });
        }
        let user = User::registered(
            self.next_id(|id| users.iter().any(|u| u.id == id)),
            name,
            email,
            family,
        );
        self.store.persist_user(&user).await?;
        info!(user = %user.id, "user registered, awaiting approval");
        Ok(user)
    }

    pub async fn approve_user(&self, admin_id: &str, user_id: &str) -> Result<User> {
        self.require_admin(admin_id).await?;
        let mut user = self.store.find_user(user_id).await?;
        user.approve();
        self.store.persist_user(&user).await?;
        info!(user = user_id, "user approved");
        Ok(user)
    }

    pub async fn update_user_settings(
        &self,
        admin_id: &str,
        user_id: &str,
        update: UserSettingsUpdate,
    ) -> Result<User> {
        self.require_admin(admin_id).await?;
        let mut user = self.store.find_user(user_id).await?;
        let settings: &mut BookingSettings = &mut user.settings;
        if let Some(can_book) = update.can_book {
            settings.can_book = can_book;
        }
        if let Some(max) = update.max_reservations_per_year {
            settings.max_reservations_per_year = max;
        }
        if let Some(priority) = update.priority {
            settings.priority = priority;
        }
        if update.family.is_some() {
            user.family = update.family;
        }
        if update.rank.is_some() {
            user.rank = update.rank;
        }
        self.store.persist_user(&user).await?;
        info!(user = user_id, "user settings updated");
        Ok(user)
    }

    /// Manual score correction, bounded only by the `i64` range.
    pub async fn adjust_score(&self, admin_id: &str, user_id: &str, delta: i64) -> Result<User> {
        self.require_admin(admin_id).await?;
        let mut user = self.store.find_user(user_id).await?;
        user.score = user
            .score
            .checked_add(delta)
            .ok_or_else(|| BookingError::InvalidRequest {
                reason: format!("score {} {delta:+} is out of range", user.score),
            })?;
        self.store.persist_user(&user).await?;
        info!(user = user_id, delta, score = user.score, "score adjusted");
        Ok(user)
    }

    /// Removes the account; the user's reservations stay.
    pub async fn remove_user(&self, admin_id: &str, user_id: &str) -> Result<User> {
        if admin_id == user_id {
            return Err(BookingError::InvalidRequest {
                reason: "administrators cannot remove their own account".into(),
            });
        }
        self.require_admin(admin_id).await?;
        let user = self.store.find_user(user_id).await?;
        self.store.remove_user(user_id).await?;
        info!(user = user_id, "user removed");
        Ok(user)
    }
}
