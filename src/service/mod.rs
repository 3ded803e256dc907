//! Booking operations against a store and a clock.
//!
//! Every decision reads the store again right before it is made, and every
//! status change goes through a status-checked patch.

mod admin;
mod booking;

use std::sync::Arc;

use crate::domain::apartment::{Apartment, Family};
use crate::domain::policy::BookingPolicy;
use crate::domain::pricing::{self, DiscountContext, PriceQuote};
use crate::domain::stay::StayRange;
use crate::domain::user::{Role, User};
use crate::error::{BookingError, Result};
use crate::ports::clock::Clock;
use crate::ports::store::BookingStore;

pub use admin::{ConfirmationOutcome, UserSettingsUpdate};
pub use booking::{BookingRequest, RequestCheck, SubmitOutcome};

pub struct BookingService {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>, policy: BookingPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn store(&self) -> &dyn BookingStore {
        self.store.as_ref()
    }

    /// Millisecond timestamp plus a random suffix, never one `taken` reports.
    ///
    /// The clock may be pinned, so the timestamp alone does not separate runs.
    fn next_id(&self, taken: impl Fn(&str) -> bool) -> String {
        let millis = self.clock.now().timestamp_millis();
        loop {
            let id = format!("{millis}{:06}", rand::random::<u32>() % 1_000_000);
            if !taken(&id) {
                return id;
            }
        }
    }

    pub(crate) async fn require_admin(&self, actor_id: &str) -> Result<User> {
        let actor = self.store.find_user(actor_id).await?;
        if !actor.is_admin() {
            return Err(BookingError::Forbidden {
                reason: format!("{} is not an administrator", actor.name),
            });
        }
        Ok(actor)
    }

    /// Price with discounts for `requester`, or the "no family" tier for an
    /// anonymous quote.
    pub fn quote(
        &self,
        apartment: Apartment,
        stay: &StayRange,
        requester: Option<&User>,
    ) -> Result<PriceQuote> {
        let family = requester.map_or(Family::C, User::pricing_family);
        let base = pricing::calculate_price(&self.policy, apartment, stay, family)?;
        let ctx = DiscountContext {
            role: requester.map_or(Role::Member, |u| u.role),
            family: requester.and_then(|u| u.family),
            today: self.clock.today(),
        };
        Ok(pricing::apply_discounts(&self.policy, base, &ctx))
    }

    /// Quote for an explicit family tier, without discounts tied to a user.
    pub fn quote_for_family(
        &self,
        apartment: Apartment,
        stay: &StayRange,
        family: Option<Family>,
    ) -> Result<PriceQuote> {
        let base = pricing::calculate_price(
            &self.policy,
            apartment,
            stay,
            family.unwrap_or(Family::C),
        )?;
        let ctx = DiscountContext {
            role: Role::Member,
            family,
            today: self.clock.today(),
        };
        Ok(pricing::apply_discounts(&self.policy, base, &ctx))
    }
}
