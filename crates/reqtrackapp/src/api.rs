//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for tracker operations, regardless of the UI driving them.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Dispatches** to the appropriate command function
//! - **Supplies context** the commands need (configuration, the current time)
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: That belongs in `commands/*.rs`
//! - **I/O operations**: No stdout, stderr, or formatting
//! - **Presentation concerns**: Returns data structures, not strings
//!
//! ## Generic Over StorageBackend
//!
//! `ReqtrackApi<B: StorageBackend>` is generic over the storage backend:
//! - Production: `ReqtrackApi<FsBackend>`
//! - Testing: `ReqtrackApi<MemBackend>`
//!
//! Background work (cross-tab polling, maintenance ticks) goes straight to the
//! store through [`ReqtrackApi::store`]; see [`crate::sync`] and
//! [`crate::maintenance`].

use chrono::Utc;

use crate::commands::{self, CmdResult};
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::model::TicketStatus;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub use crate::commands::export::ExportOptions;
pub use crate::commands::list::TicketFilter;
pub use crate::commands::submit::SubmitForm;
pub use crate::commands::update::TicketEdit;

/// The main API facade for tracker operations.
pub struct ReqtrackApi<B: StorageBackend> {
    store: RecordStore<B>,
    config: TrackerConfig,
}

impl<B: StorageBackend> ReqtrackApi<B> {
    pub fn new(store: RecordStore<B>, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn submit(&self, form: &SubmitForm) -> Result<CmdResult> {
        commands::submit::run(&self.store, &self.config, form, Utc::now())
    }

    pub fn list_tickets(&self, filter: &TicketFilter) -> Result<CmdResult> {
        commands::list::run(&self.store, filter)
    }

    pub fn show_tickets<I: AsRef<str>>(&self, ids: &[I]) -> Result<CmdResult> {
        commands::list::show(&self.store, ids)
    }

    pub fn change_status(
        &self,
        id: &str,
        status: TicketStatus,
        note: Option<&str>,
    ) -> Result<CmdResult> {
        commands::status::run(&self.store, id, status, note)
    }

    pub fn update_ticket(&self, id: &str, edit: &TicketEdit) -> Result<CmdResult> {
        commands::update::run(&self.store, id, edit)
    }

    pub fn delete_tickets<I: AsRef<str>>(&self, ids: &[I], origin: &str) -> Result<CmdResult> {
        commands::delete::run(&self.store, ids, origin)
    }

    pub fn deleted_tickets(&self) -> Result<CmdResult> {
        commands::delete::list_deleted(&self.store)
    }

    pub fn backup(&self) -> Result<CmdResult> {
        commands::backup::run(&self.store)
    }

    pub fn restore(&self) -> Result<CmdResult> {
        commands::backup::restore(&self.store)
    }

    pub fn doctor(&self) -> Result<CmdResult> {
        commands::doctor::run(&self.store)
    }

    pub fn export(&self, options: &ExportOptions) -> Result<CmdResult> {
        commands::export::run(&self.store, options)
    }

    pub fn ticket_stats(&self, submitter_ip: &str) -> Result<CmdResult> {
        commands::stats::ticket_stats(&self.store, submitter_ip, Utc::now())
    }

    pub fn data_stats(&self) -> Result<CmdResult> {
        commands::stats::data_stats(&self.store)
    }
}
