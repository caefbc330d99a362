//! # Rendering Module
//!
//! Turns command results into terminal text. Every function here returns a
//! `String`; printing is left to `commands.rs`, which keeps rendering testable.
//!
//! Layout calculations (width, truncation, padding) are Unicode-aware through
//! `unicode-width`, since submitter names and descriptions are free text.
//! Colors come from [`super::styles`] and disappear when stdout is not a terminal.

use super::styles::{message_style, priority_style, status_style, STYLES};
use chrono::{DateTime, Utc};
use reqtrackapp::commands::stats::TicketStats;
use reqtrackapp::commands::CmdMessage;
use reqtrackapp::maintenance::{JobOutcome, JobReport};
use reqtrackapp::model::{RequestType, Ticket};
use reqtrackapp::store::DataStats;
use reqtrackapp::sync::SyncUpdate;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const LINE_WIDTH: usize = 100;
pub const TIME_WIDTH: usize = 14;
const ID_WIDTH: usize = 10;
const TYPE_WIDTH: usize = 9;
const STATUS_WIDTH: usize = 17;

pub fn render_messages(messages: &[CmdMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&format!(
            "{}\n",
            message_style(&message.level).apply_to(&message.content)
        ));
    }
    out
}

/// One line per ticket: short id, type, status, subject, age.
pub fn render_ticket_list(tickets: &[Ticket], deleted: bool) -> String {
    let mut out = String::new();
    for ticket in tickets {
        let id = short_id(&ticket.id);
        let kind = pad_to(ticket.effective_type().as_str(), TYPE_WIDTH);
        let status = pad_to(ticket.status.label(), STATUS_WIDTH);

        let stamp = if deleted { ticket.deleted_at } else { ticket.created_at };
        let time_ago = stamp.map(format_time_ago).unwrap_or_else(|| " ".repeat(TIME_WIDTH));

        let subject = format!("{} ({})", ticket.subject(), ticket.submitter_name);
        let fixed = 2 + ID_WIDTH + TYPE_WIDTH + STATUS_WIDTH + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed);
        let subject = truncate_to_width(&subject, available);
        let padding = available.saturating_sub(subject.width());

        let id_styled = if deleted {
            STYLES.deleted.apply_to(id)
        } else {
            STYLES.muted.apply_to(id)
        };

        out.push_str(&format!(
            "  {}{}{}{}{}{}\n",
            id_styled,
            kind,
            status_style(ticket.status).apply_to(status),
            priority_style(ticket.priority).apply_to(subject),
            " ".repeat(padding),
            STYLES.time.apply_to(time_ago)
        ));
    }
    out
}

/// Every field and the full history of each ticket.
pub fn render_full_tickets(tickets: &[Ticket]) -> String {
    let mut blocks = Vec::new();
    for ticket in tickets {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {}\n",
            STYLES.muted.apply_to(&ticket.id),
            STYLES.title.apply_to(ticket.subject())
        ));
        out.push_str(&format!(
            "{} request, {}, priority {}\n",
            ticket.effective_type().label(),
            status_style(ticket.status).apply_to(ticket.status.label()),
            priority_style(ticket.priority).apply_to(ticket.priority.as_str())
        ));
        out.push_str(&"-".repeat(32));
        out.push('\n');

        field(&mut out, "Submitter", &format!("{} ({})", ticket.submitter_name, ticket.submitter_ip));
        match ticket.effective_type() {
            RequestType::Fault => {
                field(&mut out, "Device", ticket.device_name.as_deref().unwrap_or(""));
                field(&mut out, "Problem", ticket.fault_desc.as_deref().unwrap_or(""));
                if let Some(solution) = ticket.solution.as_deref().filter(|s| !s.is_empty()) {
                    field(&mut out, "Solution", solution);
                }
            }
            RequestType::Material => {
                field(&mut out, "Material", ticket.material_type.as_deref().unwrap_or(""));
                field(&mut out, "Details", ticket.material_desc.as_deref().unwrap_or(""));
                if let Some(quantity) = ticket.quantity {
                    field(&mut out, "Quantity", &quantity.to_string());
                }
            }
            RequestType::Other => {
                field(&mut out, "Details", ticket.other_desc.as_deref().unwrap_or(""));
            }
        }
        if let Some(created) = ticket.created_at {
            field(&mut out, "Created", &format_timestamp(created));
        }
        if let (Some(modified), Some(by)) = (ticket.last_modified, ticket.modified_by.as_deref()) {
            field(&mut out, "Modified", &format!("{} by {}", format_timestamp(modified), by));
        }
        if let Some(deleted) = ticket.deleted_at {
            let by = ticket.deleted_by.as_deref().unwrap_or("unknown");
            field(
                &mut out,
                "Deleted",
                &STYLES
                    .deleted
                    .apply_to(format!("{} by {}", format_timestamp(deleted), by))
                    .to_string(),
            );
        }

        if !ticket.history.is_empty() {
            out.push_str(&format!("\n{}\n", STYLES.title.apply_to("History")));
            for entry in &ticket.history {
                let by = entry
                    .changed_by
                    .as_deref()
                    .map(|b| format!(" ({})", b))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "  {}  {:<17}{}{}\n",
                    STYLES.time.apply_to(format_timestamp(entry.timestamp)),
                    entry.status.label(),
                    entry.note,
                    STYLES.muted.apply_to(by)
                ));
            }
        }
        blocks.push(out);
    }
    blocks.join("\n")
}

pub fn render_ticket_stats(ip: &str, stats: &TicketStats) -> String {
    format!(
        "{}\n  total       {}\n  pending     {}\n  completed   {}\n  this month  {}\n",
        STYLES.title.apply_to(format!("Requests from {}", ip)),
        stats.total,
        stats.pending,
        stats.completed,
        stats.this_month
    )
}

pub fn render_data_stats(stats: &DataStats) -> String {
    let never = || "never".to_string();
    format!(
        "{}\n  tickets        {}\n  deleted        {}\n  data version   {}\n  last backup    {}\n  last sync      {}\n  dated backups  {}\n  storage        {} bytes\n",
        STYLES.title.apply_to("Storage"),
        stats.total_records,
        stats.deleted_records,
        stats.data_version,
        stats.last_backup.map(format_timestamp).unwrap_or_else(never),
        stats.last_sync.map(format_timestamp).unwrap_or_else(never),
        stats.dated_backups,
        stats.storage_bytes
    )
}

/// `None` when nothing worth showing happened.
pub fn render_sync_update(update: &SyncUpdate) -> Option<String> {
    if update.new_record {
        let newest = update
            .tickets
            .as_ref()
            .and_then(|t| t.first())
            .map(|t| format!(": {} ({})", t.subject(), t.submitter_name))
            .unwrap_or_default();
        return Some(format!("{}\n", STYLES.success.apply_to(format!("New request{}", newest))));
    }
    if let Some(tickets) = &update.tickets {
        return Some(format!(
            "{}\n",
            STYLES
                .muted
                .apply_to(format!("Tickets changed elsewhere ({} active)", tickets.len()))
        ));
    }
    None
}

pub fn render_job_report(report: &JobReport) -> String {
    let text = match &report.outcome {
        JobOutcome::BackedUp { tickets } => format!("Backup refreshed ({} tickets)", tickets),
        JobOutcome::Synced { announced: true } => "Sync announced to other clients".to_string(),
        JobOutcome::Synced { announced: false } => "Sync up to date".to_string(),
        JobOutcome::CleanedUp {
            backups_removed,
            rate_limits_removed,
            deleted_trimmed,
        } => format!(
            "Cleanup removed {} backup(s), {} rate-limit record(s), {} deleted ticket(s)",
            backups_removed, rate_limits_removed, deleted_trimmed
        ),
        JobOutcome::Failed(reason) => {
            return format!(
                "{}\n",
                STYLES
                    .error
                    .apply_to(format!("{} failed: {}", report.job.name(), reason))
            );
        }
    };
    format!("{}\n", STYLES.muted.apply_to(text))
}

fn field(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("{:<10}{}\n", format!("{}:", label), value));
}

fn short_id(id: &str) -> String {
    pad_to(&truncate_to_width(id, ID_WIDTH - 1), ID_WIDTH)
}

fn pad_to(s: &str, width: usize) -> String {
    format!("{}{}", s, " ".repeat(width.saturating_sub(s.width())))
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }
    result
}

fn format_timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
