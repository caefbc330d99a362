//! # Configuration
//!
//! Tracker configuration is managed by [`clapfig`], which handles layered loading
//! from TOML files, environment variables, and programmatic overrides.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `REQTRACK__BACKUP_RETENTION`, `REQTRACK__RATE_LIMIT_ATTEMPTS`, etc.
//! 2. **Data-dir Config**: `<data dir>/reqtrack.toml`, for one tracker instance.
//! 3. **Global Config**: `reqtrack.toml` in the OS data directory (via `directories`).
//! 4. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `backup_interval_secs` | `300` | Auto-backup period |
//! | `sync_interval_secs` | `30` | How often the staleness check runs |
//! | `stale_after_secs` | `300` | Last sync older than this triggers a re-announce |
//! | `cleanup_interval_secs` | `86400` | Dated-backup and rate-limit cleanup period |
//! | `backup_retention` | `10` | Dated backups kept |
//! | `max_deleted_records` | unset | Cap on the deleted-records table (unset keeps all) |
//! | `rate_limit_attempts` | `3` | Submissions allowed per window and address |
//! | `rate_limit_window_secs` | `60` | Rate-limit window |

use chrono::Duration;
use confique::Config;
use serde::{Deserialize, Serialize};

/// Configuration for the tracker, stored in `reqtrack.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    #[config(default = 300)]
    pub backup_interval_secs: u64,

    #[config(default = 30)]
    pub sync_interval_secs: u64,

    #[config(default = 300)]
    pub stale_after_secs: u64,

    #[config(default = 86400)]
    pub cleanup_interval_secs: u64,

    /// Dated backups kept; older ones are removed on cleanup.
    #[config(default = 10)]
    pub backup_retention: usize,

    /// When absent, deleted records are kept forever.
    pub max_deleted_records: Option<usize>,

    #[config(default = 3)]
    pub rate_limit_attempts: u32,

    #[config(default = 60)]
    pub rate_limit_window_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            backup_interval_secs: 300,
            sync_interval_secs: 30,
            stale_after_secs: 300,
            cleanup_interval_secs: 86400,
            backup_retention: 10,
            max_deleted_records: None,
            rate_limit_attempts: 3,
            rate_limit_window_secs: 60,
        }
    }
}

const MAX_SECS: u64 = (i64::MAX / 1000) as u64;

fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_SECS) as i64)
}

impl TrackerConfig {
    pub fn backup_interval(&self) -> Duration {
        secs(self.backup_interval_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        secs(self.sync_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        secs(self.stale_after_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        secs(self.cleanup_interval_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        secs(self.rate_limit_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.backup_interval(), Duration::minutes(5));
        assert_eq!(config.sync_interval(), Duration::seconds(30));
        assert_eq!(config.stale_after(), Duration::minutes(5));
        assert_eq!(config.cleanup_interval(), Duration::hours(24));
        assert_eq!(config.backup_retention, 10);
        assert_eq!(config.max_deleted_records, None);
        assert_eq!(config.rate_limit_attempts, 3);
        assert_eq!(config.rate_limit_window(), Duration::seconds(60));
    }

    #[test]
    fn test_config_from_toml() {
        let config: TrackerConfig = toml::from_str(
            r#"
backup_interval_secs = 300
sync_interval_secs = 30
stale_after_secs = 300
cleanup_interval_secs = 86400
backup_retention = 3
max_deleted_records = 50
rate_limit_attempts = 5
rate_limit_window_secs = 120
"#,
        )
        .unwrap();
        assert_eq!(config.backup_retention, 3);
        assert_eq!(config.max_deleted_records, Some(50));
        assert_eq!(config.rate_limit_window(), Duration::minutes(2));
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let config = TrackerConfig {
            cleanup_interval_secs: u64::MAX,
            ..Default::default()
        };
        assert!(config.cleanup_interval() > Duration::days(365));
    }
}
