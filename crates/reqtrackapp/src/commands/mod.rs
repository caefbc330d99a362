//! # Command Layer
//!
//! This module contains the **business operations** of the tracker. Each command lives
//! in its own submodule as a plain `run` function over a [`RecordStore`].
//!
//! ## Role and Responsibilities
//!
//! Commands are where requests turn into store calls:
//! - Gate submissions (rate limit, validation, XSS) before anything is written
//! - Translate user input (field maps, filters, id lists) into store operations
//! - Return structured [`CmdResult`]s with the tickets touched and messages
//! - Stay completely UI-agnostic
//!
//! ## What Commands Do NOT Do
//!
//! - **Any terminal I/O**: No stdout, stderr, colors or tables
//! - **Argument parsing**: That's the CLI layer's job
//! - **Exit codes**: Return `Result`, let the caller decide
//! - **Persistence details**: Keys, rollback and backups belong to the store
//!
//! ## Structured Returns
//!
//! [`CmdResult`] carries:
//! - `affected_tickets`: Tickets written by the operation (added, updated, deleted)
//! - `listed_tickets`: Tickets to display
//! - `messages`: Structured messages with levels (info, success, warning, error)
//! - `export`, `ticket_stats`, `data_stats`: Payloads of the commands that produce them
//!
//! ## Testing Strategy
//!
//! **This is where most behavioral tests live.** Command tests use
//! [`InMemoryStore`](crate::store::memory::InMemoryStore) and the
//! [`fixtures`](crate::fixtures) helpers, and check `CmdResult` contents and
//! error variants.
//!
//! ## Command Modules
//!
//! - [`submit`]: Gate and store a new request
//! - [`list`]: Filter, list and show tickets
//! - [`status`]: Move a ticket through its lifecycle
//! - [`update`]: Patch ticket fields
//! - [`delete`]: Move tickets to the deleted table, list deleted tickets
//! - [`backup`]: Manual backup and restore
//! - [`doctor`]: Migration, integrity check and repair
//! - [`export`]: Flat rows for spreadsheets
//! - [`stats`]: Per-submitter and storage statistics

use crate::model::Ticket;
use crate::store::DataStats;
use serde::Serialize;

pub mod backup;
pub mod delete;
pub mod doctor;
pub mod export;
pub mod list;
pub mod stats;
pub mod status;
pub mod submit;
pub mod update;

use export::ExportTable;
use stats::TicketStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CmdResult {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_tickets: Vec<Ticket>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listed_tickets: Vec<Ticket>,
    pub messages: Vec<CmdMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_stats: Option<TicketStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_stats: Option<DataStats>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected_tickets(mut self, tickets: Vec<Ticket>) -> Self {
        self.affected_tickets = tickets;
        self
    }

    pub fn with_listed_tickets(mut self, tickets: Vec<Ticket>) -> Self {
        self.listed_tickets = tickets;
        self
    }
}
