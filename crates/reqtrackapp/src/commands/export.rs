//! Flat export rows, one per ticket, for spreadsheets.
//!
//! | Column | Fault | Material | Other |
//! |--------|-------|----------|-------|
//! | Subject | device | material type | title |
//! | Detail | fault description | material description | description |
//! | Resolution/Quantity | solution | quantity | (empty) |
//!
//! `Deleted By` and `Deleted From` are only filled for rows coming from the
//! deleted table, which are appended after the active tickets when requested.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{RequestType, Ticket};
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub const COLUMNS: [&str; 10] = [
    "IP",
    "Name",
    "Request Type",
    "Subject",
    "Detail",
    "Resolution/Quantity",
    "Status",
    "Created At",
    "Deleted By",
    "Deleted From",
];

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub request_type: Option<RequestType>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    /// Rows as column-name → value objects.
    pub fn records(&self) -> Vec<BTreeMap<&str, &str>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(String::as_str))
                    .collect()
            })
            .collect()
    }

    /// Tab-separated text with a header line. Tabs and line breaks inside cells
    /// become spaces.
    pub fn to_tsv(&self) -> String {
        let clean = |cell: &str| cell.replace(['\t', '\r', '\n'], " ");
        let mut out = String::new();
        for line in std::iter::once(&self.columns).chain(self.rows.iter()) {
            let cells: Vec<String> = line.iter().map(|c| clean(c.as_str())).collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }
}

pub fn export_row(ticket: &Ticket) -> Vec<String> {
    let resolution = match ticket.effective_type() {
        RequestType::Fault => ticket.solution.clone().unwrap_or_default(),
        RequestType::Material => ticket.quantity.map(|q| q.to_string()).unwrap_or_default(),
        RequestType::Other => String::new(),
    };
    vec![
        ticket.submitter_ip.clone(),
        ticket.submitter_name.clone(),
        ticket.effective_type().label().to_string(),
        ticket.subject().to_string(),
        ticket.detail().to_string(),
        resolution,
        ticket.status.label().to_string(),
        ticket
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
        ticket.deleted_by.clone().unwrap_or_default(),
        ticket.deleted_from.clone().unwrap_or_default(),
    ]
}

pub fn run<B: StorageBackend>(store: &RecordStore<B>, options: &ExportOptions) -> Result<CmdResult> {
    let mut tickets = store.get_all()?;
    if options.include_deleted {
        tickets.extend(store.deleted_records()?);
    }
    let rows: Vec<Vec<String>> = tickets
        .iter()
        .filter(|t| options.request_type.map_or(true, |rt| t.effective_type() == rt))
        .map(export_row)
        .collect();

    let mut result = CmdResult::default();
    if rows.is_empty() {
        result.add_message(CmdMessage::warning("No tickets to export."));
    } else {
        result.add_message(CmdMessage::info(format!("Exported {} row(s)", rows.len())));
    }
    result.export = Some(ExportTable {
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fault_ticket, make_store, material_ticket, other_ticket};

    #[test]
    fn test_rows_per_type() {
        let store = make_store();
        store
            .add(fault_ticket("10.0.0.1").with_fault("Laptop", "Dead", Some("New battery")))
            .unwrap();
        store.add(material_ticket("10.0.0.2", 4)).unwrap();
        store.add(other_ticket("10.0.0.3")).unwrap();

        let table = run(&store, &ExportOptions::default()).unwrap().export.unwrap();

        assert_eq!(table.columns.len(), 10);
        assert_eq!(table.rows.len(), 3);
        // newest first
        assert_eq!(table.rows[0][2], "Other Request");
        assert_eq!(table.rows[0][5], "");
        assert_eq!(table.rows[1][3], "Toner");
        assert_eq!(table.rows[1][5], "4");
        assert_eq!(table.rows[2][5], "New battery");
        assert_eq!(table.rows[2][6], "Pending Approval");
        assert_eq!(table.records()[2]["Subject"], "Laptop");
    }

    #[test]
    fn test_type_filter_and_deleted_rows() {
        let store = make_store();
        let gone = store.add(fault_ticket("10.0.0.1")).unwrap();
        store.add(fault_ticket("10.0.0.1")).unwrap();
        store.add(other_ticket("10.0.0.1")).unwrap();
        store.delete(&gone.id, "admin", "cli").unwrap();

        let options = ExportOptions {
            request_type: Some(RequestType::Fault),
            include_deleted: true,
        };
        let table = run(&store, &options).unwrap().export.unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][8], "");
        assert_eq!(table.rows[1][8], "admin");
        assert_eq!(table.rows[1][9], "cli");
    }

    #[test]
    fn test_tsv_flattens_cells() {
        let table = ExportTable {
            columns: vec!["A".into(), "B".into()],
            rows: vec![vec!["x\ty".into(), "line\nbreak".into()]],
        };
        assert_eq!(table.to_tsv(), "A\tB\nx y\tline break\n");
    }

    #[test]
    fn test_empty_export_warns() {
        let store = make_store();
        let result = run(&store, &ExportOptions::default()).unwrap();
        assert!(result.export.unwrap().rows.is_empty());
        assert_eq!(result.messages[0].content, "No tickets to export.");
    }
}
