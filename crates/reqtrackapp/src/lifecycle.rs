//! # Ticket Lifecycle
//!
//! ```text
//! pending_approval -> approved -> forwarded -> processing -> completed
//! ```
//!
//! The arrow is the expected path, not an enforced one. [`change_status`] accepts any
//! target status (skipping, going back, repeating); the lifecycle only records
//! provenance. Every transition appends exactly one [`HistoryEntry`]; existing entries
//! are never touched.
//!
//! A status change emits two events, in order: `record:updated` from the store save,
//! then `status:changed` carrying the old and new status.
//!
//! `resolved` is readable for old records but never produced here.

use chrono::{DateTime, Utc};

use crate::error::{Result, TrackerError};
use crate::model::{HistoryEntry, Ticket, TicketStatus};
use crate::notify::ChangeKind;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub const CREATION_NOTE: &str = "Request created";
pub const SYSTEM_ACTOR: &str = "system";

/// The seed history entry of a new ticket.
pub fn creation_entry(at: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        status: TicketStatus::PendingApproval,
        timestamp: at,
        note: CREATION_NOTE.to_string(),
        changed_by: Some(SYSTEM_ACTOR.to_string()),
    }
}

pub fn default_note(status: TicketStatus) -> String {
    match status {
        TicketStatus::Approved => "Approved by administrator".to_string(),
        TicketStatus::Forwarded => "Forwarded to the responsible unit".to_string(),
        TicketStatus::Processing => "Processing started".to_string(),
        TicketStatus::Completed => "Processing completed".to_string(),
        other => format!("Status changed to \"{}\"", other.as_str()),
    }
}

/// Moves a ticket to `new_status`, appending one history entry by `actor`.
///
/// `note` overrides the default note for the target status.
pub fn change_status<B: StorageBackend>(
    store: &RecordStore<B>,
    id: &str,
    new_status: TicketStatus,
    actor: &str,
    note: Option<&str>,
) -> Result<Ticket> {
    if new_status == TicketStatus::Resolved {
        return Err(TrackerError::Api(
            "'resolved' is a legacy status and cannot be set".to_string(),
        ));
    }

    let now = Utc::now();
    let note = note
        .map(str::to_string)
        .unwrap_or_else(|| default_note(new_status));

    let mut previous = new_status;
    let updated = store.modify(id, actor, |ticket| {
        previous = ticket.status;
        ticket.status = new_status;
        ticket.history.push(HistoryEntry {
            status: new_status,
            timestamp: now,
            note: note.clone(),
            changed_by: Some(actor.to_string()),
        });
    })?;

    tracing::info!(
        id,
        from = previous.as_str(),
        to = new_status.as_str(),
        actor,
        "Ticket status changed"
    );
    store.notifier().publish(
        ChangeKind::StatusChanged {
            from: previous,
            to: new_status,
        },
        &updated,
    );

    Ok(updated)
}
