//! # Storage Layer
//!
//! The [`RecordStore`] owns the canonical ticket collection. It sits on top of a
//! [`StorageBackend`](backend::StorageBackend), a flat string key → value map shared
//! by every open "tab" (another handle, another process).
//!
//! ## Storage Layout
//!
//! ```text
//! tickets                   # active collection, JSON array, newest first
//! tickets_backup            # the one backup slot {data, timestamp, version, user}
//! tickets_backup_<stamp>    # dated manual backups, newest 10 kept
//! tickets_deleted           # deleted side table, newest first
//! data_version              # collection-wide version counter
//! last_sync_time            # ms since epoch
//! last_record_time          # ms since epoch, strictly increasing
//! ```
//!
//! ## Save Pipeline
//!
//! Every mutation funnels into [`RecordStore::save_all`]:
//!
//! 1. Drop tickets failing the required-field predicate.
//! 2. Write the collection.
//! 3. Write `version + 1`.
//! 4. Overwrite the backup slot with what was just saved.
//! 5. Refresh `last_sync_time` (best effort).
//!
//! If step 3 or 4 fails, the collection and counter are put back to their previous
//! raw values before the error is returned, so a failed save leaves prior state
//! intact.
//!
//! ## Reads Self-Heal
//!
//! [`RecordStore::get_all`] never surfaces corruption. A collection that is not a
//! JSON array (or not JSON at all) is replaced from the backup slot; elements that
//! cannot be read, or fail validation, are skipped.
//!
//! ## Concurrency
//!
//! Saves are whole-collection, last-write-wins. Two tabs doing read-modify-write at
//! the same time can lose one addition; the version counter is informational.
//! [`RecordStore::save_all_if_version`] is the opt-in compare-and-swap for callers
//! that want a stale write rejected instead.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: one file per key, for real use.
//! - [`mem_backend::MemBackend`]: for tests and multi-tab simulation.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::lifecycle;
use crate::model::{BackupSnapshot, HistoryEntry, RequestType, Ticket, TicketPatch};
use crate::notify::{ChangeKind, ChangeNotifier};
use crate::validation::rules::{is_valid_ticket, required_field_errors};
use backend::StorageBackend;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;
pub mod memory;

pub const TICKETS_KEY: &str = "tickets";
pub const BACKUP_KEY: &str = "tickets_backup";
pub const DATED_BACKUP_PREFIX: &str = "tickets_backup_";
pub const DELETED_KEY: &str = "tickets_deleted";
pub const VERSION_KEY: &str = "data_version";
pub const LAST_SYNC_KEY: &str = "last_sync_time";
pub const LAST_RECORD_KEY: &str = "last_record_time";

pub const DEFAULT_BACKUP_RETENTION: usize = 10;
pub const DEFAULT_ACTOR: &str = "system";

/// Result of [`RecordStore::repair_data`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Active tickets dropped for failing validation.
    pub invalid_removed: usize,
    /// Deleted-table entries whose id was still active.
    pub overlap_removed: usize,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.invalid_removed == 0 && self.overlap_removed == 0
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total: usize,
    pub invalid: usize,
    pub legacy: usize,
    pub overlapping: usize,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.invalid == 0 && self.legacy == 0 && self.overlapping == 0
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub migrated: usize,
    pub integrity: IntegrityReport,
    pub repaired: Option<RepairReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataStats {
    pub total_records: usize,
    pub deleted_records: usize,
    pub data_version: u64,
    pub last_backup: Option<DateTime<Utc>>,
    pub last_sync: Option<DateTime<Utc>>,
    pub dated_backups: usize,
    pub storage_bytes: usize,
}

enum StoredList {
    Missing,
    /// Entries that failed to deserialize are counted, not kept.
    List {
        tickets: Vec<Ticket>,
        unreadable: usize,
    },
    Corrupt(String),
}

pub struct RecordStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    notifier: ChangeNotifier,
    actor: String,
    backup_retention: usize,
    max_deleted: Option<usize>,
}

impl<B: StorageBackend> RecordStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            notifier: ChangeNotifier::new(),
            actor: DEFAULT_ACTOR.to_string(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            max_deleted: None,
        }
    }

    /// Share a notifier with other components of this tab.
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Who this tab acts as; recorded as `createdBy` and as the backup `user`.
    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    pub fn with_backup_retention(mut self, retention: usize) -> Self {
        self.backup_retention = retention;
        self
    }

    /// Cap for the deleted side table. `None` keeps everything.
    pub fn with_max_deleted(mut self, max: Option<usize>) -> Self {
        self.max_deleted = max;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    // --- Reads ---

    /// The active collection, newest first, with invalid tickets filtered out.
    pub fn get_all(&self) -> Result<Vec<Ticket>> {
        let tickets = self.load_collection()?;
        let total = tickets.len();
        let valid: Vec<Ticket> = tickets.into_iter().filter(is_valid_ticket).collect();
        if valid.len() < total {
            tracing::warn!(
                dropped = total - valid.len(),
                "Filtered invalid tickets from stored collection"
            );
        }
        Ok(valid)
    }

    pub fn get(&self, id: &str) -> Result<Ticket> {
        self.get_all()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    /// The deleted side table, newest first. An unreadable table reads as empty.
    pub fn deleted_records(&self) -> Result<Vec<Ticket>> {
        match self.read_list(DELETED_KEY)? {
            StoredList::Missing => Ok(Vec::new()),
            StoredList::List { tickets, .. } => Ok(tickets),
            StoredList::Corrupt(reason) => {
                tracing::warn!(%reason, "Deleted records table is unreadable");
                Ok(Vec::new())
            }
        }
    }

    pub fn version(&self) -> Result<u64> {
        Ok(parse_version(self.backend.get_item(VERSION_KEY)?.as_deref()))
    }

    pub fn last_sync_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .read_millis(LAST_SYNC_KEY)?
            .and_then(DateTime::from_timestamp_millis))
    }

    /// The last-record-created marker, 0 if never set.
    pub fn last_record_marker(&self) -> Result<i64> {
        Ok(self.read_millis(LAST_RECORD_KEY)?.unwrap_or(0))
    }

    /// Raw collection, unfiltered. Corruption is healed from the backup slot.
    fn load_collection(&self) -> Result<Vec<Ticket>> {
        Ok(self.load_collection_counted()?.0)
    }

    /// Like `load_collection`, plus the number of stored entries that could
    /// not be read as tickets.
    fn load_collection_counted(&self) -> Result<(Vec<Ticket>, usize)> {
        match self.read_list(TICKETS_KEY)? {
            StoredList::Missing => Ok((Vec::new(), 0)),
            StoredList::List {
                tickets,
                unreadable,
            } => Ok((tickets, unreadable)),
            StoredList::Corrupt(reason) => {
                tracing::warn!(%reason, "Stored collection is corrupt, restoring from backup");
                Ok((self.restore_from_backup()?, 0))
            }
        }
    }

    fn read_list(&self, key: &str) -> Result<StoredList> {
        let Some(raw) = self.backend.get_item(key)? else {
            return Ok(StoredList::Missing);
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => {
                let (tickets, unreadable) = parse_tickets(items);
                Ok(StoredList::List {
                    tickets,
                    unreadable,
                })
            }
            Ok(_) => Ok(StoredList::Corrupt("not a list".to_string())),
            Err(e) => Ok(StoredList::Corrupt(e.to_string())),
        }
    }

    fn read_millis(&self, key: &str) -> Result<Option<i64>> {
        Ok(self
            .backend
            .get_item(key)?
            .and_then(|v| v.trim().parse::<i64>().ok()))
    }

    // --- Writes ---

    /// Persists `tickets` as the active collection and returns the new version.
    ///
    /// Invalid tickets are dropped, not rejected. On failure nothing observable
    /// changes.
    pub fn save_all(&self, tickets: &[Ticket]) -> Result<u64> {
        let valid: Vec<Ticket> = tickets.iter().filter(|t| is_valid_ticket(t)).cloned().collect();
        if valid.len() < tickets.len() {
            tracing::warn!(
                dropped = tickets.len() - valid.len(),
                "Dropping invalid tickets on save"
            );
        }
        let json = serde_json::to_string(&valid)?;

        let previous_collection = self.backend.get_item(TICKETS_KEY)?;
        let previous_version = self.backend.get_item(VERSION_KEY)?;
        let version = parse_version(previous_version.as_deref()) + 1;

        if let Err(e) = self.backend.set_item(TICKETS_KEY, &json) {
            tracing::error!(error = %e, "Failed to save ticket collection");
            return Err(e);
        }

        let committed = self
            .backend
            .set_item(VERSION_KEY, &version.to_string())
            .and_then(|_| self.create_backup(Some(&valid)).map(|_| ()));
        if let Err(e) = committed {
            tracing::error!(error = %e, "Save failed after writing the collection, rolling back");
            self.restore_raw(TICKETS_KEY, previous_collection.as_deref());
            self.restore_raw(VERSION_KEY, previous_version.as_deref());
            return Err(e);
        }

        if let Err(e) = self.touch_sync_time(Utc::now()) {
            tracing::warn!(error = %e, "Could not update last sync time");
        }

        tracing::debug!(version, count = valid.len(), "Saved ticket collection");
        Ok(version)
    }

    /// Like [`save_all`](Self::save_all), but fails with
    /// [`TrackerError::VersionConflict`] if another writer saved since `expected`
    /// was read.
    pub fn save_all_if_version(&self, expected: u64, tickets: &[Ticket]) -> Result<u64> {
        let found = self.version()?;
        if found != expected {
            tracing::warn!(expected, found, "Rejected stale save");
            return Err(TrackerError::VersionConflict { expected, found });
        }
        self.save_all(tickets)
    }

    /// Stores a new ticket at the front of the collection.
    ///
    /// Assigns id, creation time, version and creator. A ticket failing the
    /// required-field predicate is refused with [`TrackerError::Validation`].
    pub fn add(&self, ticket: Ticket) -> Result<Ticket> {
        let mut tickets = self.get_all()?;
        let now = Utc::now();

        let mut ticket = ticket;
        ticket.id = new_ticket_id();
        ticket.created_at = Some(now);
        ticket.created_by = Some(self.actor.clone());
        ticket.version = self.version()? + 1;
        ticket.deleted_at = None;
        ticket.deleted_by = None;
        ticket.deleted_from = None;
        if ticket.history.is_empty() {
            ticket.history.push(lifecycle::creation_entry(now));
        }
        ensure_valid(&ticket)?;

        tickets.insert(0, ticket.clone());
        self.save_all(&tickets)?;

        if let Err(e) = self.bump_record_marker(now) {
            tracing::warn!(error = %e, "Could not update last record marker");
        }

        tracing::info!(id = %ticket.id, request_type = %ticket.effective_type(), "Ticket added");
        self.notifier.publish(ChangeKind::Added, &ticket);
        Ok(ticket)
    }

    /// Shallow-merges `patch` onto a ticket and appends one history entry
    /// listing the fields written.
    pub fn update(&self, id: &str, patch: &TicketPatch, actor: &str) -> Result<Ticket> {
        if patch.is_empty() {
            return Err(TrackerError::Api("Nothing to update".to_string()));
        }

        let now = Utc::now();
        let updated = self.modify(id, actor, |ticket| {
            let changed = patch.apply(ticket);
            ticket.history.push(HistoryEntry {
                status: ticket.status,
                timestamp: now,
                note: format!("Updated: {}", changed.join(", ")),
                changed_by: Some(actor.to_string()),
            });
        })?;

        tracing::info!(id, actor, "Ticket updated");
        Ok(updated)
    }

    /// Read-modify-write of one ticket, shared by field updates and status
    /// changes. Publishes `record:updated`.
    pub(crate) fn modify<F>(&self, id: &str, actor: &str, change: F) -> Result<Ticket>
    where
        F: FnOnce(&mut Ticket),
    {
        let mut tickets = self.get_all()?;
        let pos = tickets
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        let mut ticket = tickets[pos].clone();
        change(&mut ticket);
        ticket.id = id.to_string();
        ticket.last_modified = Some(Utc::now());
        ticket.modified_by = Some(actor.to_string());
        ticket.version = self.version()? + 1;
        ensure_valid(&ticket)?;

        tickets[pos] = ticket.clone();
        self.save_all(&tickets)?;

        self.notifier.publish(ChangeKind::Updated, &ticket);
        Ok(ticket)
    }

    /// Moves a ticket into the deleted side table.
    ///
    /// The side table is written first; if saving the active collection then
    /// fails, the side table is put back, so a ticket is never in both.
    pub fn delete(&self, id: &str, actor: &str, origin: &str) -> Result<Ticket> {
        let mut tickets = self.get_all()?;
        let pos = tickets
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        let mut removed = tickets.remove(pos);

        removed.deleted_at = Some(Utc::now());
        removed.deleted_by = Some(actor.to_string());
        removed.deleted_from = Some(origin.to_string());

        let previous_deleted = self.backend.get_item(DELETED_KEY)?;
        let mut deleted = self.deleted_records()?;
        deleted.retain(|t| t.id != id);
        deleted.insert(0, removed.clone());
        self.cap_deleted(&mut deleted);
        self.backend
            .set_item(DELETED_KEY, &serde_json::to_string(&deleted)?)?;

        if let Err(e) = self.save_all(&tickets) {
            tracing::error!(id, error = %e, "Delete failed, restoring deleted records table");
            self.restore_raw(DELETED_KEY, previous_deleted.as_deref());
            return Err(e);
        }

        tracing::info!(id, actor, origin, "Ticket deleted");
        self.notifier.publish(ChangeKind::Deleted, &removed);
        Ok(removed)
    }

    fn cap_deleted(&self, deleted: &mut Vec<Ticket>) -> usize {
        match self.max_deleted {
            Some(max) if deleted.len() > max => {
                let dropped = deleted.len() - max;
                deleted.truncate(max);
                dropped
            }
            _ => 0,
        }
    }

    /// Applies the deleted-records cap. Returns how many were dropped.
    pub fn enforce_deleted_cap(&self) -> Result<usize> {
        let mut deleted = self.deleted_records()?;
        let dropped = self.cap_deleted(&mut deleted);
        if dropped > 0 {
            self.backend
                .set_item(DELETED_KEY, &serde_json::to_string(&deleted)?)?;
            tracing::info!(dropped, "Trimmed deleted records table");
        }
        Ok(dropped)
    }

    /// Best-effort write-back of a raw value captured before a failed operation.
    fn restore_raw(&self, key: &str, previous: Option<&str>) {
        let result = match previous {
            Some(value) => self.backend.set_item(key, value),
            None => self.backend.remove_item(key),
        };
        if let Err(e) = result {
            tracing::error!(key, error = %e, "Rollback failed");
        }
    }

    // --- Backups ---

    /// Overwrites the backup slot with `tickets`, or with the current collection.
    pub fn create_backup(&self, tickets: Option<&[Ticket]>) -> Result<BackupSnapshot> {
        let data = match tickets {
            Some(tickets) => tickets.to_vec(),
            None => self.get_all()?,
        };
        let snapshot = BackupSnapshot {
            data,
            timestamp: Utc::now(),
            version: self.version()?,
            user: self.actor.clone(),
        };
        self.backend
            .set_item(BACKUP_KEY, &serde_json::to_string(&snapshot)?)?;

        if let Err(e) = self.cleanup_old_backups() {
            tracing::warn!(error = %e, "Could not clean up old backups");
        }
        tracing::debug!(count = snapshot.data.len(), version = snapshot.version, "Backup written");
        Ok(snapshot)
    }

    /// Writes the backup slot plus a dated copy. Returns the dated key.
    pub fn create_dated_backup(&self) -> Result<String> {
        let snapshot = self.create_backup(None)?;

        let mut stamp = snapshot.timestamp;
        let key = loop {
            let candidate = format!("{}{}", DATED_BACKUP_PREFIX, stamp.format("%Y%m%d%H%M%S%6f"));
            if self.backend.get_item(&candidate)?.is_none() {
                break candidate;
            }
            stamp += Duration::microseconds(1);
        };

        self.backend.set_item(&key, &serde_json::to_string(&snapshot)?)?;
        self.cleanup_old_backups()?;
        tracing::info!(%key, count = snapshot.data.len(), "Manual backup created");
        Ok(key)
    }

    /// Dated backup keys, newest first.
    pub fn dated_backups(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .backend
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(DATED_BACKUP_PREFIX))
            .collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));
        Ok(keys)
    }

    /// Removes dated backups beyond the retention count. Returns how many.
    pub fn cleanup_old_backups(&self) -> Result<usize> {
        let mut keys = self.dated_backups()?;
        if keys.len() <= self.backup_retention {
            return Ok(0);
        }
        let stale = keys.split_off(self.backup_retention);
        for key in &stale {
            self.backend.remove_item(key)?;
        }
        tracing::info!(removed = stale.len(), "Removed old dated backups");
        Ok(stale.len())
    }

    /// Replaces the active collection and version counter with the backup slot.
    ///
    /// A missing or unreadable backup is logged and yields an empty list.
    pub fn restore_from_backup(&self) -> Result<Vec<Ticket>> {
        let Some(raw) = self.backend.get_item(BACKUP_KEY)? else {
            tracing::warn!("No backup snapshot found");
            return Ok(Vec::new());
        };
        let Some((data, version)) = parse_snapshot(&raw) else {
            tracing::warn!("Backup snapshot is unreadable");
            return Ok(Vec::new());
        };

        let restored: Vec<Ticket> = data.into_iter().filter(is_valid_ticket).collect();
        self.backend
            .set_item(TICKETS_KEY, &serde_json::to_string(&restored)?)?;
        self.backend.set_item(VERSION_KEY, &version.to_string())?;

        tracing::info!(count = restored.len(), version, "Restored tickets from backup");
        Ok(restored)
    }

    // --- Maintenance ---

    /// Drops invalid or unreadable active entries, and deleted-table entries
    /// that are still active.
    pub fn repair_data(&self) -> Result<RepairReport> {
        let (tickets, unreadable) = self.load_collection_counted()?;
        let total = tickets.len();
        let valid: Vec<Ticket> = tickets.into_iter().filter(is_valid_ticket).collect();

        let mut report = RepairReport {
            invalid_removed: total - valid.len() + unreadable,
            ..Default::default()
        };
        if report.invalid_removed > 0 {
            self.save_all(&valid)?;
            tracing::warn!(removed = report.invalid_removed, "Removed invalid tickets");
        }

        let active: HashSet<&str> = valid.iter().map(|t| t.id.as_str()).collect();
        let deleted = self.deleted_records()?;
        let kept: Vec<&Ticket> = deleted
            .iter()
            .filter(|t| !active.contains(t.id.as_str()))
            .collect();
        report.overlap_removed = deleted.len() - kept.len();
        if report.overlap_removed > 0 {
            self.backend
                .set_item(DELETED_KEY, &serde_json::to_string(&kept)?)?;
            tracing::warn!(
                removed = report.overlap_removed,
                "Removed deleted records that were still active"
            );
        }

        Ok(report)
    }

    /// Stamps `requestType = fault` and `version = 1` on tickets without a type.
    pub fn migrate_legacy(&self) -> Result<usize> {
        let mut tickets = self.load_collection()?;
        let mut migrated = 0;
        for ticket in tickets.iter_mut().filter(|t| t.request_type.is_none()) {
            ticket.request_type = Some(RequestType::Fault);
            ticket.version = 1;
            migrated += 1;
        }
        if migrated > 0 {
            self.save_all(&tickets)?;
            tracing::info!(migrated, "Migrated legacy tickets");
        }
        Ok(migrated)
    }

    /// Unreadable stored entries count as invalid.
    pub fn check_integrity(&self) -> Result<IntegrityReport> {
        let (tickets, unreadable) = self.load_collection_counted()?;
        let active: HashSet<&str> = tickets.iter().map(|t| t.id.as_str()).collect();
        let overlapping = self
            .deleted_records()?
            .iter()
            .filter(|t| active.contains(t.id.as_str()))
            .count();

        Ok(IntegrityReport {
            total: tickets.len() + unreadable,
            invalid: tickets.iter().filter(|t| !is_valid_ticket(t)).count() + unreadable,
            legacy: tickets.iter().filter(|t| t.request_type.is_none()).count(),
            overlapping,
        })
    }

    /// Start-of-tab routine: migrate, then check integrity and repair if needed.
    pub fn init(&self) -> Result<InitReport> {
        let migrated = self.migrate_legacy()?;
        let integrity = self.check_integrity()?;
        let repaired = if integrity.invalid > 0 || integrity.overlapping > 0 {
            tracing::warn!(
                invalid = integrity.invalid,
                overlapping = integrity.overlapping,
                "Integrity check failed, repairing"
            );
            Some(self.repair_data()?)
        } else {
            None
        };
        Ok(InitReport {
            migrated,
            integrity,
            repaired,
        })
    }

    // --- Sync markers ---

    fn touch_sync_time(&self, now: DateTime<Utc>) -> Result<()> {
        self.backend
            .set_item(LAST_SYNC_KEY, &now.timestamp_millis().to_string())
    }

    /// Refreshes the sync time and rewrites the collection key unchanged, so
    /// every other tab gets a change signal and re-reads.
    pub fn sync_data(&self, now: DateTime<Utc>) -> Result<()> {
        self.touch_sync_time(now)?;
        if let Some(raw) = self.backend.get_item(TICKETS_KEY)? {
            self.backend.set_item(TICKETS_KEY, &raw)?;
        }
        tracing::debug!("Announced collection to other tabs");
        Ok(())
    }

    /// Runs [`sync_data`](Self::sync_data) if the last sync is older than
    /// `stale_after`. Returns whether it did.
    pub fn check_for_updates(&self, now: DateTime<Utc>, stale_after: Duration) -> Result<bool> {
        let stale = match self.last_sync_time()? {
            None => true,
            Some(last) => now - last > stale_after,
        };
        if stale {
            self.sync_data(now)?;
        }
        Ok(stale)
    }

    /// Advances the last-record marker to `max(previous + 1, now)`.
    fn bump_record_marker(&self, now: DateTime<Utc>) -> Result<i64> {
        let next = (self.last_record_marker()? + 1).max(now.timestamp_millis());
        self.backend.set_item(LAST_RECORD_KEY, &next.to_string())?;
        Ok(next)
    }

    pub fn data_stats(&self) -> Result<DataStats> {
        let last_backup = self
            .backend
            .get_item(BACKUP_KEY)?
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .and_then(|v| v.get("timestamp").cloned())
            .and_then(|ts| serde_json::from_value::<DateTime<Utc>>(ts).ok());

        Ok(DataStats {
            total_records: self.get_all()?.len(),
            deleted_records: self.deleted_records()?.len(),
            data_version: self.version()?,
            last_backup,
            last_sync: self.last_sync_time()?,
            dated_backups: self.dated_backups()?.len(),
            storage_bytes: self.backend.size_of(TICKETS_KEY)?,
        })
    }
}

fn new_ticket_id() -> String {
    format!("t_{}", Uuid::new_v4().simple())
}

fn parse_version(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Tickets that deserialize, and the count of entries that did not.
fn parse_tickets(items: Vec<Value>) -> (Vec<Ticket>, usize) {
    let mut tickets = Vec::with_capacity(items.len());
    let mut unreadable = 0;
    for item in items {
        match serde_json::from_value::<Ticket>(item) {
            Ok(ticket) => tickets.push(ticket),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable ticket entry");
                unreadable += 1;
            }
        }
    }
    (tickets, unreadable)
}

fn parse_snapshot(raw: &str) -> Option<(Vec<Ticket>, u64)> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let items = value.get("data")?.as_array()?.clone();
    let version = value.get("version").and_then(Value::as_u64).unwrap_or(0);
    Some((parse_tickets(items).0, version))
}

fn ensure_valid(ticket: &Ticket) -> Result<()> {
    let errors = required_field_errors(ticket);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TrackerError::Validation(errors))
    }
}
