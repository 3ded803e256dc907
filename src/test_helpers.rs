use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::adapters::memory_store::MemoryStore;
use crate::domain::apartment::{Apartment, Family};
use crate::domain::reservation::{Reservation, ReservationPatch, ReservationStatus};
use crate::domain::user::User;
use crate::error::{BookingError, Result};
use crate::ports::store::BookingStore;

pub fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, 0, 0).unwrap().and_utc()
}

/// An approved member who may book.
pub fn make_user(id: &str, family: Option<Family>) -> User {
    let mut user = User::registered(id, format!("User {id}"), format!("{id}@family.test"), family);
    user.approve();
    user
}

/// A pending, binding reservation without an owner.
pub fn make_reservation(
    id: &str,
    apartment: Apartment,
    arrival: NaiveDate,
    departure: NaiveDate,
) -> Reservation {
    Reservation {
        id: id.to_string(),
        apartment,
        name: "Guest".into(),
        email: "guest@family.test".into(),
        user_id: None,
        created_by: None,
        arrival,
        departure,
        guests: 2,
        note: String::new(),
        price: 100.0,
        status: ReservationStatus::Pending,
        is_intention: false,
        family: None,
        created: at(d(2025, 1, 10), 10),
        confirmed_at: None,
        cancellation_requested: None,
    }
}

/// An open intention owned by `user_id`.
pub fn make_intention(
    id: &str,
    user_id: &str,
    apartment: Apartment,
    arrival: NaiveDate,
    departure: NaiveDate,
) -> Reservation {
    let mut r = make_reservation(id, apartment, arrival, departure);
    r.user_id = Some(user_id.to_string());
    r.name = format!("User {user_id}");
    r.is_intention = true;
    r
}

/// A store whose every call fails like an unreachable remote.
pub struct FailingStore;

fn down<T>() -> Result<T> {
    Err(BookingError::Storage {
        reason: "remote unavailable".into(),
    })
}

#[async_trait]
impl BookingStore for FailingStore {
    async fn all_reservations(&self) -> Result<Vec<Reservation>> {
        down()
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        down()
    }

    async fn persist(&self, _reservation: &Reservation) -> Result<()> {
        down()
    }

    async fn remove(&self, _id: &str) -> Result<()> {
        down()
    }

    async fn update_fields(&self, _id: &str, _patch: &ReservationPatch) -> Result<Reservation> {
        down()
    }

    async fn replace_reservations(&self, _reservations: &[Reservation]) -> Result<()> {
        down()
    }

    async fn persist_user(&self, _user: &User) -> Result<()> {
        down()
    }

    async fn remove_user(&self, _id: &str) -> Result<()> {
        down()
    }
}

/// In-memory store whose `remove` fails for one id.
pub struct StickyRecordStore {
    pub inner: MemoryStore,
    pub sticky_id: String,
}

#[async_trait]
impl BookingStore for StickyRecordStore {
    async fn all_reservations(&self) -> Result<Vec<Reservation>> {
        self.inner.all_reservations().await
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        self.inner.all_users().await
    }

    async fn persist(&self, reservation: &Reservation) -> Result<()> {
        self.inner.persist(reservation).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        if id == self.sticky_id {
            return down();
        }
        self.inner.remove(id).await
    }

    async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation> {
        self.inner.update_fields(id, patch).await
    }

    async fn replace_reservations(&self, reservations: &[Reservation]) -> Result<()> {
        self.inner.replace_reservations(reservations).await
    }

    async fn persist_user(&self, user: &User) -> Result<()> {
        self.inner.persist_user(user).await
    }

    async fn remove_user(&self, id: &str) -> Result<()> {
        self.inner.remove_user(id).await
    }
}
