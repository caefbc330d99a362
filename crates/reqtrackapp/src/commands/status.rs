use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::lifecycle;
use crate::model::TicketStatus;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub fn run<B: StorageBackend>(
    store: &RecordStore<B>,
    id: &str,
    status: TicketStatus,
    note: Option<&str>,
) -> Result<CmdResult> {
    let updated = lifecycle::change_status(store, id, status, store.actor(), note)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "{} is now {}",
        updated.id,
        updated.status.label()
    )));
    Ok(result.with_affected_tickets(vec![updated]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use crate::fixtures::{fault_ticket, make_store};

    #[test]
    fn test_status_change_reports_ticket() {
        let store = make_store();
        let added = store.add(fault_ticket("10.0.0.1")).unwrap();

        let result = run(&store, &added.id, TicketStatus::Forwarded, Some("To IT")).unwrap();

        let ticket = &result.affected_tickets[0];
        assert_eq!(ticket.status, TicketStatus::Forwarded);
        assert_eq!(ticket.history.last().unwrap().note, "To IT");
        assert_eq!(
            ticket.history.last().unwrap().changed_by.as_deref(),
            Some(store.actor())
        );
        assert!(result.messages[0].content.ends_with("Forwarded"));
    }

    #[test]
    fn test_resolved_cannot_be_set() {
        let store = make_store();
        let added = store.add(fault_ticket("10.0.0.1")).unwrap();
        assert!(matches!(
            run(&store, &added.id, TicketStatus::Resolved, None),
            Err(TrackerError::Api(_))
        ));
        assert_eq!(store.get(&added.id).unwrap(), added);
    }
}
