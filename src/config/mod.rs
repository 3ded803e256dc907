pub mod types;

use std::path::Path;

use crate::error::{BookingError, Result};
use types::Config;

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        BookingError::Config(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Reject tables that would make pricing or the window checks meaningless.
fn validate(config: &Config) -> Result<()> {
    let policy = &config.policy;
    let months = policy
        .pricing_summer_months
        .iter()
        .chain(&policy.peak.months)
        .chain(&policy.preferred_months)
        .chain(&policy.window.months);
    if let Some(bad) = months.copied().find(|m| !(1..=12).contains(m)) {
        return Err(BookingError::Config(format!("month {bad} is out of range")));
    }
    if policy.peak.max_weeks == 0 {
        return Err(BookingError::Config("peak.max_weeks must be at least 1".into()));
    }
    if policy.rates.is_empty() {
        return Err(BookingError::Config("rate table is empty".into()));
    }
    Ok(())
}
