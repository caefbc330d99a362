use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{Ticket, TicketStatus};
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

/// Counts for one submitter's tickets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketStats {
    pub total: usize,
    /// Pending approval, approved or forwarded.
    pub pending: usize,
    pub completed: usize,
    pub this_month: usize,
}

impl TicketStats {
    pub fn from_tickets<'a>(tickets: impl IntoIterator<Item = &'a Ticket>, now: DateTime<Utc>) -> Self {
        let mut stats = TicketStats::default();
        for ticket in tickets {
            stats.total += 1;
            if ticket.status.is_open() {
                stats.pending += 1;
            }
            if ticket.status == TicketStatus::Completed {
                stats.completed += 1;
            }
            if ticket
                .created_at
                .is_some_and(|t| t.year() == now.year() && t.month() == now.month())
            {
                stats.this_month += 1;
            }
        }
        stats
    }
}

pub fn ticket_stats<B: StorageBackend>(
    store: &RecordStore<B>,
    submitter_ip: &str,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let ip = submitter_ip.trim();
    let tickets = store.get_all()?;
    let stats = TicketStats::from_tickets(tickets.iter().filter(|t| t.submitter_ip == ip), now);

    let mut result = CmdResult::default();
    if stats.total == 0 {
        result.add_message(CmdMessage::info(format!("No tickets from {}", ip)));
    }
    result.ticket_stats = Some(stats);
    Ok(result)
}

pub fn data_stats<B: StorageBackend>(store: &RecordStore<B>) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    result.data_stats = Some(store.data_stats()?);
    Ok(result)
}
