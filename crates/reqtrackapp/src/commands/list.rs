use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{RequestType, Ticket, TicketStatus};
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

/// Conditions a listed ticket must all satisfy. An empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub request_type: Option<RequestType>,
    pub status: Option<TicketStatus>,
    /// Only tickets submitted from this address.
    pub submitter_ip: Option<String>,
    /// Case-insensitive match on subject, description or submitter name.
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.request_type.is_some_and(|t| ticket.effective_type() != t) {
            return false;
        }
        if self.status.is_some_and(|s| ticket.status != s) {
            return false;
        }
        if let Some(ip) = &self.submitter_ip {
            if ticket.submitter_ip != ip.trim() {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.trim().to_lowercase();
            if !term.is_empty() {
                let haystack = [ticket.subject(), ticket.detail(), ticket.submitter_name.as_str()];
                if !haystack.iter().any(|h| h.to_lowercase().contains(&term)) {
                    return false;
                }
            }
        }
        true
    }
}

pub fn run<B: StorageBackend>(store: &RecordStore<B>, filter: &TicketFilter) -> Result<CmdResult> {
    let tickets: Vec<Ticket> = store
        .get_all()?
        .into_iter()
        .filter(|t| filter.matches(t))
        .collect();

    let mut result = CmdResult::default();
    if tickets.is_empty() {
        result.add_message(CmdMessage::info("No tickets found."));
    }
    Ok(result.with_listed_tickets(tickets))
}

pub fn show<B: StorageBackend, I: AsRef<str>>(store: &RecordStore<B>, ids: &[I]) -> Result<CmdResult> {
    let tickets = ids
        .iter()
        .map(|id| store.get(id.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(CmdResult::default().with_listed_tickets(tickets))
}
