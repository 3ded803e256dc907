use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::policy::BookingPolicy;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub policy: BookingPolicy,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Remote,
    Synced,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_file_path")]
    pub file_path: String,
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Point-written records are left alone by a resync for this long.
    #[serde(default = "default_quarantine_secs")]
    pub quarantine_secs: u64,
    /// Delay before the single automatic resync after a failed remote write.
    /// Unset disables it.
    #[serde(default)]
    pub auto_resync_delay_secs: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            file_path: default_file_path(),
            remote: RemoteConfig::default(),
            quarantine_secs: default_quarantine_secs(),
            auto_resync_delay_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ClockConfig {
    /// Pin "today" to this date instead of the system clock.
    #[serde(default)]
    pub date_override: Option<NaiveDate>,
}

fn default_file_path() -> String {
    "stays.json".into()
}

fn default_quarantine_secs() -> u64 {
    5
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_timeout() -> u64 {
    30
}
