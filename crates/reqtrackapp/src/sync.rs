//! # Cross-Tab Sync
//!
//! Several tabs (processes, CLI invocations, `watch` loops) share one storage. A
//! tab learns about the others' writes by draining its backend's change feed:
//!
//! ```text
//! tab A: add() ──► tickets, data_version, tickets_backup, last_record_time
//!                        │
//! tab B: poll() ◄────────┘  collection_changed = true  → full re-read
//!                           new_record = true          (marker moved forward)
//! ```
//!
//! Events only name keys. Values are always re-read from storage, never taken
//! from the event, so a tab can never act on a stale or forged payload.
//!
//! The last-record marker lets a tab tell "a new request arrived" (alert the
//! operator) from "something was edited" (just refresh) without diffing lists.

use crate::error::Result;
use crate::model::Ticket;
use crate::store::backend::StorageBackend;
use crate::store::{RecordStore, LAST_RECORD_KEY, TICKETS_KEY};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncUpdate {
    /// Keys changed by other tabs since the previous poll, sorted, deduplicated.
    pub keys: Vec<String>,
    pub collection_changed: bool,
    pub new_record: bool,
    /// Fresh read of the collection, present when it changed.
    pub tickets: Option<Vec<Ticket>>,
}

impl SyncUpdate {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub struct CrossTabSync {
    last_marker: i64,
}

impl CrossTabSync {
    /// Starts watching from the store's current marker; records created before
    /// this point never count as new.
    pub fn new<B: StorageBackend>(store: &RecordStore<B>) -> Result<Self> {
        Ok(Self {
            last_marker: store.last_record_marker()?,
        })
    }

    pub fn last_marker(&self) -> i64 {
        self.last_marker
    }

    pub fn poll<B: StorageBackend>(&mut self, store: &RecordStore<B>) -> Result<SyncUpdate> {
        let mut keys: Vec<String> = store
            .backend()
            .take_changes()?
            .into_iter()
            .map(|e| e.key)
            .collect();
        keys.sort();
        keys.dedup();

        let mut update = SyncUpdate {
            collection_changed: keys.iter().any(|k| k == TICKETS_KEY),
            ..Default::default()
        };

        if keys.iter().any(|k| k == LAST_RECORD_KEY) {
            let marker = store.last_record_marker()?;
            if marker > self.last_marker {
                self.last_marker = marker;
                update.new_record = true;
                tracing::info!(marker, "New record created in another tab");
            }
        }

        if update.collection_changed {
            let tickets = store.get_all()?;
            tracing::debug!(count = tickets.len(), "Collection changed in another tab");
            update.tickets = Some(tickets);
        }

        update.keys = keys;
        Ok(update)
    }
}
