use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::types::RemoteConfig;
use crate::domain::reservation::{Reservation, ReservationPatch};
use crate::domain::user::User;
use crate::error::{BookingError, Result};
use crate::ports::store::{BookingStore, apply_checked};

/// Document-collection REST backend.
///
/// `GET|PUT /reservations`, `GET|PUT|PATCH|DELETE /reservations/{id}`,
/// `GET /users`, `PUT|DELETE /users/{id}`. JSON bodies use the persisted
/// record layout.
pub struct RemoteStore {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl RemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("family-stays/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // A trailing slash makes `join` append instead of replacing the last segment.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        debug!(%method, url = %url, "Remote store request");
        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(BookingError::Http)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BookingError::Storage {
                reason: format!("{what}: not found on remote"),
            });
        }
        if !status.is_success() {
            return Err(BookingError::Storage {
                reason: format!("{what} returned HTTP {status}"),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)?, path).await?;
        let body = response.text().await.map_err(BookingError::Http)?;
        debug!(path, body_len = body.len(), "Remote response received");
        trace!(path, body = %body, "Remote raw response");
        if body.trim().is_empty() || body.trim() == "null" {
            return serde_json::from_str("[]").map_err(Into::into);
        }
        serde_json::from_str(&body).map_err(|e| BookingError::Storage {
            reason: format!("{path}: invalid JSON from remote: {e}"),
        })
    }

    async fn put_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        self.send(self.request(Method::PUT, path)?.json(body), path)
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, path)?
            .send()
            .await
            .map_err(BookingError::Http)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(path, "Remote delete of a missing document, ignoring");
            return Ok(());
        }
        if !status.is_success() {
            return Err(BookingError::Storage {
                reason: format!("DELETE {path} returned HTTP {status}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for RemoteStore {
    async fn all_reservations(&self) -> Result<Vec<Reservation>> {
        self.get_json("reservations").await
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        self.get_json("users").await
    }

    async fn persist(&self, reservation: &Reservation) -> Result<()> {
        self.put_json(&format!("reservations/{}", reservation.id), reservation)
            .await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.delete(&format!("reservations/{id}")).await
    }

    /// The status check is a read before the PATCH, so it narrows the race
    /// window on the remote side without closing it.
    async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation> {
        let path = format!("reservations/{id}");
        let mut current: Reservation = match self.get_json(&path).await {
            Ok(record) => record,
            Err(BookingError::Storage { reason }) if reason.contains("not found") => {
                return Err(BookingError::ReservationNotFound { id: id.to_string() });
            }
            Err(e) => return Err(e),
        };
        apply_checked(&mut current, patch)?;
        self.send(self.request(Method::PATCH, &path)?.json(patch), &path)
            .await?;
        Ok(current)
    }

    async fn replace_reservations(&self, reservations: &[Reservation]) -> Result<()> {
        self.put_json("reservations", reservations).await
    }

    async fn persist_user(&self, user: &User) -> Result<()> {
        self.put_json(&format!("users/{}", user.id), user).await
    }

    async fn remove_user(&self, id: &str) -> Result<()> {
        self.delete(&format!("users/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let store = RemoteStore::new(&RemoteConfig {
            base_url: "https://stays.example/api".into(),
            timeout_secs: 5,
            token: None,
        })
        .unwrap();
        assert_eq!(
            store.base_url.join("reservations").unwrap().as_str(),
            "https://stays.example/api/reservations"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = RemoteStore::new(&RemoteConfig {
            base_url: "not a url".into(),
            timeout_secs: 5,
            token: None,
        });
        assert!(matches!(result, Err(BookingError::Url(_))));
    }
}
