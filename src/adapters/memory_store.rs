use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::reservation::{Reservation, ReservationPatch};
use crate::domain::user::User;
use crate::error::{BookingError, Result};
use crate::ports::store::{BookingStore, apply_checked};

/// Both collections as one document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    #[serde(default)]
    pub users: Vec<User>,
}

/// In-process store. Every operation holds the lock for its whole duration,
/// so a status-checked patch is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(reservations: Vec<Reservation>, users: Vec<User>) -> Self {
        Self {
            inner: RwLock::new(Snapshot {
                reservations,
                users,
            }),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Snapshot>> {
        self.inner.read().map_err(|_| {
            tracing::error!("Store lock poisoned on read");
            BookingError::Storage {
                reason: "memory store lock poisoned".into(),
            }
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Snapshot>> {
        self.inner.write().map_err(|_| {
            tracing::error!("Store lock poisoned on write");
            BookingError::Storage {
                reason: "memory store lock poisoned".into(),
            }
        })
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.read()?.clone())
    }
}

pub(crate) fn upsert_reservation(list: &mut Vec<Reservation>, reservation: &Reservation) {
    match list.iter_mut().find(|r| r.id == reservation.id) {
        Some(existing) => *existing = reservation.clone(),
        None => list.push(reservation.clone()),
    }
}

pub(crate) fn upsert_user(list: &mut Vec<User>, user: &User) {
    match list.iter_mut().find(|u| u.id == user.id) {
        Some(existing) => *existing = user.clone(),
        None => list.push(user.clone()),
    }
}

pub(crate) fn patch_in_place(
    list: &mut [Reservation],
    id: &str,
    patch: &ReservationPatch,
) -> Result<Reservation> {
    let record = list
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| BookingError::ReservationNotFound { id: id.to_string() })?;
    apply_checked(record, patch)?;
    Ok(record.clone())
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn all_reservations(&self) -> Result<Vec<Reservation>> {
        Ok(self.read()?.reservations.clone())
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        Ok(self.read()?.users.clone())
    }

    async fn persist(&self, reservation: &Reservation) -> Result<()> {
        upsert_reservation(&mut self.write()?.reservations, reservation);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.write()?.reservations.retain(|r| r.id != id);
        Ok(())
    }

    async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation> {
        patch_in_place(&mut self.write()?.reservations, id, patch)
    }

    async fn replace_reservations(&self, reservations: &[Reservation]) -> Result<()> {
        self.write()?.reservations = reservations.to_vec();
        Ok(())
    }

    async fn persist_user(&self, user: &User) -> Result<()> {
        upsert_user(&mut self.write()?.users, user);
        Ok(())
    }

    async fn remove_user(&self, id: &str) -> Result<()> {
        self.write()?.users.retain(|u| u.id != id);
        Ok(())
    }
}
