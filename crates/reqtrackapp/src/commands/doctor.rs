use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

/// Migration, integrity check, and repair when needed.
pub fn run<B: StorageBackend>(store: &RecordStore<B>) -> Result<CmdResult> {
    let report = store.init()?;
    let mut result = CmdResult::default();

    if report.migrated > 0 {
        result.add_message(CmdMessage::info(format!(
            "Migrated {} legacy ticket(s) to the fault type.",
            report.migrated
        )));
    }

    match report.repaired {
        None => result.add_message(CmdMessage::success(format!(
            "No inconsistencies found in {} ticket(s).",
            report.integrity.total
        ))),
        Some(repair) => {
            result.add_message(CmdMessage::warning("Inconsistencies found and fixed:"));
            if repair.invalid_removed > 0 {
                result.add_message(CmdMessage::info(format!(
                    "  - Removed {} ticket(s) missing required fields.",
                    repair.invalid_removed
                )));
            }
            if repair.overlap_removed > 0 {
                result.add_message(CmdMessage::info(format!(
                    "  - Dropped {} deleted record(s) that were still active.",
                    repair.overlap_removed
                )));
            }
        }
    }

    Ok(result)
}
