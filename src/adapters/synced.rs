use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::reservation::{Reservation, ReservationPatch};
use crate::domain::user::User;
use crate::error::{BookingError, Result};
use crate::ports::store::BookingStore;

/// Result of a full-collection resync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    pub written: usize,
    /// Records left at their remote state because they were point-written
    /// inside the quarantine window.
    pub kept_remote: Vec<String>,
    pub users_pushed: usize,
}

/// Remote store as source of truth with a local mirror.
///
/// Point writes go to the remote first. When the remote fails the write is
/// made locally only, the id is recorded as diverged and the error is logged;
/// the two sides stay apart until [`SyncedStore::resync`] runs. While anything
/// is diverged, reads come from the local mirror.
pub struct SyncedStore {
    state: Arc<SyncState>,
}

struct SyncState {
    remote: Arc<dyn BookingStore>,
    local: Arc<dyn BookingStore>,
    quarantine: Duration,
    auto_resync_delay: Option<Duration>,
    recent_writes: Mutex<HashMap<String, Instant>>,
    diverged: Mutex<BTreeSet<String>>,
    diverged_users: Mutex<BTreeSet<String>>,
    resync_scheduled: AtomicBool,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::error!("Sync bookkeeping lock '{name}' poisoned, continuing with inner state");
        poisoned.into_inner()
    })
}

/// Errors that mean "the remote could not be reached or refused the write",
/// as opposed to a decision the remote made about the record.
fn is_transport_failure(err: &BookingError) -> bool {
    matches!(
        err,
        BookingError::Http(_)
            | BookingError::Storage { .. }
            | BookingError::Io(_)
            | BookingError::Json(_)
            | BookingError::Url(_)
    )
}

impl SyncedStore {
    pub fn new(
        remote: Arc<dyn BookingStore>,
        local: Arc<dyn BookingStore>,
        quarantine: Duration,
    ) -> Self {
        Self {
            state: Arc::new(SyncState {
                remote,
                local,
                quarantine,
                auto_resync_delay: None,
                recent_writes: Mutex::new(HashMap::new()),
                diverged: Mutex::new(BTreeSet::new()),
                diverged_users: Mutex::new(BTreeSet::new()),
                resync_scheduled: AtomicBool::new(false),
            }),
        }
    }

    /// Schedule one delayed resync after a failed remote write.
    #[must_use]
    pub fn with_auto_resync(self, delay: Duration) -> Self {
        let state = Arc::try_unwrap(self.state).map_or_else(
            |shared| {
                warn!("Auto-resync must be configured before the store is shared, ignoring");
                shared
            },
            |mut owned| {
                owned.auto_resync_delay = Some(delay);
                Arc::new(owned)
            },
        );
        Self { state }
    }

    /// Ids of reservations written locally but not remotely.
    pub fn diverged_ids(&self) -> Vec<String> {
        lock(&self.state.diverged, "diverged").iter().cloned().collect()
    }

    pub fn is_diverged(&self) -> bool {
        !lock(&self.state.diverged, "diverged").is_empty()
            || !lock(&self.state.diverged_users, "diverged_users").is_empty()
    }

    pub async fn resync(&self) -> Result<ResyncReport> {
        self.state.resync().await
    }
}

impl SyncState {
    fn mark_written(&self, id: &str) {
        let mut recent = lock(&self.recent_writes, "recent_writes");
        recent.retain(|_, at| at.elapsed() < self.quarantine);
        recent.insert(id.to_string(), Instant::now());
    }

    fn is_diverged_record(&self, id: &str) -> bool {
        lock(&self.diverged, "diverged").contains(id)
    }

    fn is_quarantined(&self, id: &str) -> bool {
        lock(&self.recent_writes, "recent_writes")
            .get(id)
            .is_some_and(|at| at.elapsed() < self.quarantine)
    }

    fn record_divergence(self: &Arc<Self>, id: &str, user: bool, err: &BookingError) {
        warn!(
            error = %err,
            id,
            "Remote write failed, kept local copy only; stores diverge until resync"
        );
        if user {
            lock(&self.diverged_users, "diverged_users").insert(id.to_string());
        } else {
            lock(&self.diverged, "diverged").insert(id.to_string());
        }
        self.schedule_resync();
    }

    fn has_divergence(&self) -> bool {
        !lock(&self.diverged, "diverged").is_empty()
            || !lock(&self.diverged_users, "diverged_users").is_empty()
    }

    fn schedule_resync(self: &Arc<Self>) {
        let Some(delay) = self.auto_resync_delay else {
            return;
        };
        if self.resync_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let state = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match state.resync().await {
                Ok(report) => info!(written = report.written, "Automatic resync finished"),
                Err(e) => warn!(error = %e, "Automatic resync failed, manual resync needed"),
            }
            state.resync_scheduled.store(false, Ordering::SeqCst);
        });
    }

    async fn resync(&self) -> Result<ResyncReport> {
        let local = self.local.all_reservations().await?;
        let remote = self.remote.all_reservations().await?;

        let mut kept_remote = Vec::new();
        let mut merged: Vec<Reservation> = Vec::with_capacity(local.len());
        for record in local {
            if self.is_quarantined(&record.id) {
                continue;
            }
            merged.push(record);
        }
        for record in remote {
            if self.is_quarantined(&record.id) {
                kept_remote.push(record.id.clone());
                merged.push(record);
            }
        }

        self.remote.replace_reservations(&merged).await?;
        self.local.replace_reservations(&merged).await?;

        let pending_users: Vec<String> = lock(&self.diverged_users, "diverged_users")
            .iter()
            .cloned()
            .collect();
        let local_users = self.local.all_users().await?;
        for id in &pending_users {
            match local_users.iter().find(|u| &u.id == id) {
                Some(user) => self.remote.persist_user(user).await?,
                None => self.remote.remove_user(id).await?,
            }
        }

        lock(&self.diverged, "diverged").clear();
        lock(&self.diverged_users, "diverged_users").clear();

        info!(
            written = merged.len(),
            kept_remote = kept_remote.len(),
            users = pending_users.len(),
            "Resynced remote collection from local snapshot"
        );
        Ok(ResyncReport {
            written: merged.len(),
            kept_remote,
            users_pushed: pending_users.len(),
        })
    }
}

#[async_trait]
impl BookingStore for SyncedStore {
    async fn all_reservations(&self) -> Result<Vec<Reservation>> {
        let state = &self.state;
        if state.has_divergence() {
            debug!("Stores diverged, reading reservations from local mirror");
            return state.local.all_reservations().await;
        }
        match state.remote.all_reservations().await {
            Ok(records) => {
                if let Err(e) = state.local.replace_reservations(&records).await {
                    warn!(error = %e, "Failed to refresh local mirror");
                }
                Ok(records)
            }
            Err(e) => {
                warn!(error = %e, "Remote read failed, falling back to local mirror");
                state.local.all_reservations().await
            }
        }
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        let state = &self.state;
        if state.has_divergence() {
            return state.local.all_users().await;
        }
        match state.remote.all_users().await {
            Ok(users) => {
                for user in &users {
                    if let Err(e) = state.local.persist_user(user).await {
                        warn!(error = %e, user = %user.id, "Failed to mirror user locally");
                    }
                }
                Ok(users)
            }
            Err(e) => {
                warn!(error = %e, "Remote read failed, falling back to local mirror");
                state.local.all_users().await
            }
        }
    }

    async fn persist(&self, reservation: &Reservation) -> Result<()> {
        let state = &self.state;
        match state.remote.persist(reservation).await {
            Ok(()) => state.mark_written(&reservation.id),
            Err(e) if is_transport_failure(&e) => {
                state.record_divergence(&reservation.id, false, &e);
            }
            Err(e) => return Err(e),
        }
        state.local.persist(reservation).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let state = &self.state;
        match state.remote.remove(id).await {
            Ok(()) => state.mark_written(id),
            Err(e) if is_transport_failure(&e) => state.record_divergence(id, false, &e),
            Err(e) => return Err(e),
        }
        state.local.remove(id).await
    }

    async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation> {
        let state = &self.state;
        if state.is_diverged_record(id) {
            debug!(id, "Record only current locally, patching the mirror until resync");
            return state.local.update_fields(id, patch).await;
        }
        match state.remote.update_fields(id, patch).await {
            Ok(updated) => {
                state.mark_written(id);
                state.local.persist(&updated).await?;
                Ok(updated)
            }
            Err(e) if is_transport_failure(&e) => {
                let updated = state.local.update_fields(id, patch).await?;
                state.record_divergence(id, false, &e);
                Ok(updated)
            }
            Err(e) => Err(e),
        }
    }

    async fn replace_reservations(&self, reservations: &[Reservation]) -> Result<()> {
        self.state.remote.replace_reservations(reservations).await?;
        self.state.local.replace_reservations(reservations).await
    }

    async fn persist_user(&self, user: &User) -> Result<()> {
        let state = &self.state;
        match state.remote.persist_user(user).await {
            Ok(()) => {}
            Err(e) if is_transport_failure(&e) => state.record_divergence(&user.id, true, &e),
            Err(e) => return Err(e),
        }
        state.local.persist_user(user).await
    }

    async fn remove_user(&self, id: &str) -> Result<()> {
        let state = &self.state;
        match state.remote.remove_user(id).await {
            Ok(()) => {}
            Err(e) if is_transport_failure(&e) => state.record_divergence(id, true, &e),
            Err(e) => return Err(e),
        }
        state.local.remove_user(id).await
    }
}
