use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::memory_store::{Snapshot, patch_in_place, upsert_reservation, upsert_user};
use crate::domain::reservation::{Reservation, ReservationPatch};
use crate::domain::user::User;
use crate::error::Result;
use crate::ports::store::BookingStore;

/// A JSON document on disk holding every reservation and user.
///
/// The whole document is rewritten after each mutation. A missing file is an
/// empty store.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<Snapshot>,
}

impl FileStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Snapshot::default(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No local store yet, starting empty");
                Snapshot::default()
            }
            Err(e) => return Err(e.into()),
        };
        debug!(
            path = %path.display(),
            reservations = state.reservations.len(),
            users = state.users.len(),
            "Local store loaded"
        );
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `state` next to the target and rename it into place.
    async fn flush(&self, state: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `change` to a copy, persist it, and only then make it current.
    async fn commit<T>(&self, change: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let out = change(&mut next)?;
        if let Err(e) = self.flush(&next).await {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Local store write failed, change discarded"
            );
            return Err(e);
        }
        *state = next;
        Ok(out)
    }
}

#[async_trait]
impl BookingStore for FileStore {
    async fn all_reservations(&self) -> Result<Vec<Reservation>> {
        Ok(self.state.lock().await.reservations.clone())
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        Ok(self.state.lock().await.users.clone())
    }

    async fn persist(&self, reservation: &Reservation) -> Result<()> {
        self.commit(|state| {
            upsert_reservation(&mut state.reservations, reservation);
            Ok(())
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.commit(|state| {
            state.reservations.retain(|r| r.id != id);
            Ok(())
        })
        .await
    }

    async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation> {
        self.commit(|state| patch_in_place(&mut state.reservations, id, patch)).await
    }

    async fn replace_reservations(&self, reservations: &[Reservation]) -> Result<()> {
        self.commit(|state| {
            state.reservations = reservations.to_vec();
            Ok(())
        })
        .await
    }

    async fn persist_user(&self, user: &User) -> Result<()> {
        self.commit(|state| {
            upsert_user(&mut state.users, user);
            Ok(())
        })
        .await
    }

    async fn remove_user(&self, id: &str) -> Result<()> {
        self.commit(|state| {
            state.users.retain(|u| u.id != id);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::apartment::Apartment;
    use crate::domain::reservation::ReservationStatus;
    use crate::test_helpers::{d, make_reservation, make_user};

    #[tokio::test]
    async fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("stays.json")).await.unwrap();
        assert!(store.all_reservations().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stays.json");
        {
            let store = FileStore::open(&path).await.unwrap();
            store
                .persist(&make_reservation("r1", Apartment::App35, d(2025, 3, 1), d(2025, 3, 4)))
                .await
                .unwrap();
            store.persist_user(&make_user("u1", None)).await.unwrap();
            store
                .update_fields("r1", &ReservationPatch::status(ReservationStatus::Approved))
                .await
                .unwrap();
        }
        let reopened = FileStore::open(&path).await.unwrap();
        let r = reopened.find_reservation("r1").await.unwrap();
        assert_eq!(r.status, ReservationStatus::Approved);
        assert_eq!(reopened.all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stays.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(FileStore::open(&path).await.is_err());
    }

    #[tokio::test]
    async fn replace_rewrites_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("s.json")).await.unwrap();
        store
            .persist(&make_reservation("old", Apartment::App35, d(2025, 3, 1), d(2025, 3, 4)))
            .await
            .unwrap();
        store
            .replace_reservations(&[make_reservation(
                "new",
                Apartment::App36,
                d(2025, 4, 1),
                d(2025, 4, 4),
            )])
            .await
            .unwrap();
        let ids: Vec<_> = store
            .all_reservations()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[tokio::test]
    async fn failed_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        let store = FileStore::open(blocked.join("stays.json")).await.unwrap();
        std::fs::write(&blocked, "not a directory").unwrap();

        let result = store
            .persist(&make_reservation("r1", Apartment::App35, d(2025, 3, 1), d(2025, 3, 4)))
            .await;
        assert!(result.is_err());
        assert!(store.all_reservations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stays.json");
        let store = FileStore::open(&path).await.unwrap();
        store.persist_user(&make_user("u1", None)).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["stays.json".to_string()]);
    }
}
