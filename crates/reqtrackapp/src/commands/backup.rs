use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

/// Manual backup: refreshes the backup slot and writes a dated copy.
pub fn run<B: StorageBackend>(store: &RecordStore<B>) -> Result<CmdResult> {
    let key = store.create_dated_backup()?;
    let count = store.get_all()?.len();

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Backed up {} ticket(s) to {}",
        count, key
    )));
    Ok(result)
}

/// Manual restore from the backup slot.
pub fn restore<B: StorageBackend>(store: &RecordStore<B>) -> Result<CmdResult> {
    let restored = store.restore_from_backup()?;

    let mut result = CmdResult::default();
    if restored.is_empty() {
        result.add_message(CmdMessage::warning(
            "No usable backup found; nothing was restored.",
        ));
    } else {
        result.add_message(CmdMessage::success(format!(
            "Restored {} ticket(s) from backup",
            restored.len()
        )));
    }
    Ok(result.with_listed_tickets(restored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn test_backup_then_restore() {
        let fixture = StoreFixture::new().with_tickets(2, "10.0.0.1");
        let store = fixture.store;

        let backup = run(&store).unwrap();
        assert!(backup.messages[0].content.starts_with("Backed up 2 ticket(s)"));
        assert_eq!(store.dated_backups().unwrap().len(), 1);

        let restored = restore(&store).unwrap();
        assert_eq!(restored.listed_tickets.len(), 2);
        assert_eq!(restored.messages[0].level, MessageLevel::Success);
    }

    #[test]
    fn test_restore_without_backup_warns() {
        let store = InMemoryStore::new();
        let result = restore(&store).unwrap();
        assert_eq!(result.messages[0].level, MessageLevel::Warning);
    }
}
