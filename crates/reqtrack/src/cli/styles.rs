//! Styles for the reqtrack CLI.
//!
//! Renderers never pick colors directly. They ask for a semantic style (a status,
//! a message level, the time column) and this module maps it to a
//! `console::Style`. `console` drops the escape codes by itself when stdout is not
//! a terminal or `NO_COLOR` is set, so piped output stays plain.
//!
//! The shared style tokens are:
//!
//!     * Muted text (ids, metadata, info messages)
//!     * Time text (muted + italic)
//!     * Title text (bold)
//!     * One color per ticket status, grouped by how much attention it needs
//!     * Success, warning and error messages
//!     * Deleted entries (red)

use console::Style;
use once_cell::sync::Lazy;
use reqtrackapp::commands::MessageLevel;
use reqtrackapp::model::{Priority, TicketStatus};

pub struct Styles {
    pub muted: Style,
    pub time: Style,
    pub title: Style,
    pub deleted: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub pending: Style,
    pub active: Style,
    pub done: Style,
    pub urgent: Style,
    pub plain: Style,
}

pub static STYLES: Lazy<Styles> = Lazy::new(|| {
    let muted = Style::new().color256(245);
    Styles {
        time: muted.clone().italic(),
        title: Style::new().bold(),
        deleted: Style::new().red(),
        success: Style::new().green(),
        warning: Style::new().yellow().bold(),
        error: Style::new().red().bold(),
        pending: Style::new().yellow(),
        active: Style::new().cyan(),
        done: Style::new().green(),
        urgent: Style::new().red().bold(),
        plain: Style::new(),
        muted,
    }
});

pub fn status_style(status: TicketStatus) -> &'static Style {
    match status {
        TicketStatus::PendingApproval => &STYLES.pending,
        TicketStatus::Approved | TicketStatus::Forwarded | TicketStatus::Processing => {
            &STYLES.active
        }
        TicketStatus::Completed | TicketStatus::Resolved => &STYLES.done,
    }
}

pub fn message_style(level: &MessageLevel) -> &'static Style {
    match level {
        MessageLevel::Info => &STYLES.muted,
        MessageLevel::Success => &STYLES.success,
        MessageLevel::Warning => &STYLES.warning,
        MessageLevel::Error => &STYLES.error,
    }
}

pub fn priority_style(priority: Priority) -> &'static Style {
    match priority {
        Priority::Urgent | Priority::High => &STYLES.urgent,
        Priority::Normal => &STYLES.plain,
        Priority::Low => &STYLES.muted,
    }
}
