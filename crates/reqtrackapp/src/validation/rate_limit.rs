//! Sliding-window attempt limiter.
//!
//! Keeps, per key, the timestamps of attempts that were allowed. A new attempt is
//! allowed while fewer than `max_attempts` of those fall inside the window ending
//! now; only allowed attempts are recorded, so a caller hammering a limited key
//! does not extend its own lockout.
//!
//! [`check_persisted`] runs the same window over attempts kept in storage under
//! `rate_limit_<key>`, so the limit holds across tabs and processes.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::error::Result;
use crate::store::backend::StorageBackend;

pub const STORAGE_PREFIX: &str = "rate_limit_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    attempts: HashMap<String, Vec<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, key: &str, max_attempts: u32, window: Duration) -> RateDecision {
        self.check_at(key, max_attempts, window, Utc::now())
    }

    pub fn check_at(
        &mut self,
        key: &str,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let entries = self.attempts.entry(key.to_string()).or_default();
        entries.retain(|t| now - *t < window);

        if entries.len() as u32 >= max_attempts {
            let oldest = entries.iter().min().copied().unwrap_or(now);
            let wait = window - (now - oldest);
            let retry_after_secs = (wait.num_milliseconds().max(0) as u64).div_ceil(1000);
            return RateDecision::Limited { retry_after_secs };
        }

        entries.push(now);
        RateDecision::Allowed {
            remaining: max_attempts - entries.len() as u32,
        }
    }

    /// Drops attempts older than `window`, and keys left empty. Returns the
    /// number of keys removed.
    pub fn prune(&mut self, window: Duration, now: DateTime<Utc>) -> usize {
        let before = self.attempts.len();
        self.attempts.retain(|_, entries| {
            entries.retain(|t| now - *t < window);
            !entries.is_empty()
        });
        before - self.attempts.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }

    pub fn attempts(&self, key: &str) -> &[DateTime<Utc>] {
        self.attempts.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn load(&mut self, key: &str, attempts: Vec<DateTime<Utc>>) {
        self.attempts.insert(key.to_string(), attempts);
    }
}

fn read_attempts<B: StorageBackend>(backend: &B, storage_key: &str) -> Result<Vec<DateTime<Utc>>> {
    let millis: Vec<i64> = backend
        .get_item(storage_key)?
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    Ok(millis
        .into_iter()
        .filter_map(DateTime::from_timestamp_millis)
        .collect())
}

fn write_attempts<B: StorageBackend>(
    backend: &B,
    storage_key: &str,
    attempts: &[DateTime<Utc>],
) -> Result<()> {
    let millis: Vec<i64> = attempts.iter().map(|t| t.timestamp_millis()).collect();
    backend.set_item(storage_key, &serde_json::to_string(&millis)?)
}

/// [`RateLimiter::check_at`] against attempts persisted in `backend`.
pub fn check_persisted<B: StorageBackend>(
    backend: &B,
    key: &str,
    max_attempts: u32,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<RateDecision> {
    let storage_key = format!("{}{}", STORAGE_PREFIX, key);
    let mut limiter = RateLimiter::new();
    limiter.load(key, read_attempts(backend, &storage_key)?);

    let decision = limiter.check_at(key, max_attempts, window, now);
    if decision.is_allowed() {
        write_attempts(backend, &storage_key, limiter.attempts(key))?;
    }
    Ok(decision)
}

/// Drops expired persisted attempts; keys left empty are removed. Returns how
/// many keys were removed.
pub fn prune_persisted<B: StorageBackend>(
    backend: &B,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<usize> {
    let mut removed = 0;
    for storage_key in backend.keys()? {
        if !storage_key.starts_with(STORAGE_PREFIX) {
            continue;
        }
        let live: Vec<DateTime<Utc>> = read_attempts(backend, &storage_key)?
            .into_iter()
            .filter(|t| now - *t < window)
            .collect();
        if live.is_empty() {
            backend.remove_item(&storage_key)?;
            removed += 1;
        } else {
            write_attempts(backend, &storage_key, &live)?;
        }
    }
    Ok(removed)
}
