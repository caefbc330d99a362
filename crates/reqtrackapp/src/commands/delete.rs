use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

/// Moves each ticket to the deleted table, stopping at the first failure.
/// `origin` records where the deletion came from (e.g. `cli`, `admin-panel`).
pub fn run<B: StorageBackend, I: AsRef<str>>(
    store: &RecordStore<B>,
    ids: &[I],
    origin: &str,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();

    for id in ids {
        let removed = store.delete(id.as_ref(), store.actor(), origin)?;
        result.add_message(CmdMessage::success(format!(
            "Deleted {} ({})",
            removed.id,
            removed.subject()
        )));
        result.affected_tickets.push(removed);
    }

    Ok(result)
}

/// The deleted table, newest first.
pub fn list_deleted<B: StorageBackend>(store: &RecordStore<B>) -> Result<CmdResult> {
    let deleted = store.deleted_records()?;
    let mut result = CmdResult::default();
    if deleted.is_empty() {
        result.add_message(CmdMessage::info("No deleted tickets."));
    }
    Ok(result.with_listed_tickets(deleted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use crate::fixtures::{fault_ticket, make_store, other_ticket};

    #[test]
    fn test_delete_several() {
        let store = make_store();
        let a = store.add(fault_ticket("10.0.0.1")).unwrap();
        let b = store.add(other_ticket("10.0.0.1")).unwrap();

        let result = run(&store, &[a.id.as_str(), b.id.as_str()], "cli").unwrap();

        assert_eq!(result.affected_tickets.len(), 2);
        assert!(result
            .affected_tickets
            .iter()
            .all(|t| t.deleted_from.as_deref() == Some("cli")));
        assert!(store.get_all().unwrap().is_empty());

        let listed = list_deleted(&store).unwrap().listed_tickets;
        let ids: Vec<&str> = listed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);
    }

    #[test]
    fn test_delete_stops_at_missing_id() {
        let store = make_store();
        let a = store.add(fault_ticket("10.0.0.1")).unwrap();

        let result = run(&store, &["t_missing", a.id.as_str()], "cli");
        assert!(matches!(result, Err(TrackerError::NotFound(_))));
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_list_deleted_empty() {
        let store = make_store();
        let result = list_deleted(&store).unwrap();
        assert!(result.listed_tickets.is_empty());
        assert_eq!(result.messages[0].content, "No deleted tickets.");
    }
}
