use async_trait::async_trait;

use crate::domain::reservation::{Reservation, ReservationPatch};
use crate::domain::user::User;
use crate::error::{BookingError, Result};

/// Persistence for reservations and users.
///
/// Writes may fail; callers get the error and nothing is retried here.
/// `update_fields` honours `ReservationPatch::expect_status` and returns the
/// record as stored after the patch.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn all_reservations(&self) -> Result<Vec<Reservation>>;
    async fn all_users(&self) -> Result<Vec<User>>;

    /// Insert or overwrite by id.
    async fn persist(&self, reservation: &Reservation) -> Result<()>;
    async fn remove(&self, id: &str) -> Result<()>;
    async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation>;

    /// Overwrite the whole reservation collection.
    async fn replace_reservations(&self, reservations: &[Reservation]) -> Result<()>;

    async fn persist_user(&self, user: &User) -> Result<()>;
    async fn remove_user(&self, id: &str) -> Result<()>;

    async fn find_reservation(&self, id: &str) -> Result<Reservation> {
        self.all_reservations()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| BookingError::ReservationNotFound { id: id.to_string() })
    }

    async fn find_user(&self, id: &str) -> Result<User> {
        self.all_users()
            .await?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| BookingError::UserNotFound { id: id.to_string() })
    }
}

/// Apply a patch to an in-memory record, enforcing the status expectation.
pub fn apply_checked(reservation: &mut Reservation, patch: &ReservationPatch) -> Result<()> {
    if let Some(expected) = patch.expect_status
        && reservation.status != expected
    {
        return Err(BookingError::StaleWrite {
            id: reservation.id.clone(),
            expected,
            found: reservation.status,
        });
    }
    reservation.apply(patch);
    Ok(())
}
