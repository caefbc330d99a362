//! # Domain Model: Tickets
//!
//! This module defines the persisted unit of the tracker, the [`Ticket`], and the small
//! value types hanging off it ([`RequestType`], [`Priority`], [`TicketStatus`],
//! [`HistoryEntry`]).
//!
//! ## Request Types
//!
//! Every ticket carries a type-specific payload. The payload is stored flat on the
//! ticket (one optional field per input), which keeps the JSON shape stable and lets
//! a [`TicketPatch`] shallow-merge onto any ticket regardless of its type:
//!
//! | Type | Required | Optional |
//! |------|----------|----------|
//! | `fault` | `deviceName`, `faultDesc` | `solution` |
//! | `material` | `materialType`, `materialDesc`, `quantity` (1-100) | |
//! | `other` | `otherTitle`, `otherDesc` | |
//!
//! Which fields are required is decided by the rule table in
//! [`crate::validation::rules`], not here.
//!
//! ## Legacy Records
//!
//! Older collections used different field names and may lack `requestType`.
//! Deserialization accepts the old names (`ip`, `fullname`, `timestamp`,
//! `processHistory`); a missing `requestType` is kept as `None` on read and treated
//! as `fault` everywhere ([`Ticket::effective_type`]). The store's migration stamps
//! it explicitly.
//!
//! ## Deletion Metadata
//!
//! `deletedAt`/`deletedBy`/`deletedFrom` are only ever set on tickets living in the
//! deleted-records side table. They are skipped when empty so active tickets never
//! carry them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Fault,
    Material,
    Other,
}

impl RequestType {
    pub const ALL: [RequestType; 3] = [RequestType::Fault, RequestType::Material, RequestType::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Fault => "fault",
            RequestType::Material => "material",
            RequestType::Other => "other",
        }
    }

    /// Human readable label, used in exports and messages.
    pub fn label(&self) -> &'static str {
        match self {
            RequestType::Fault => "Fault Request",
            RequestType::Material => "Material Request",
            RequestType::Other => "Other Request",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fault" => Ok(RequestType::Fault),
            "material" => Ok(RequestType::Material),
            "other" => Ok(RequestType::Other),
            other => Err(TrackerError::Api(format!("Unknown request type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" | "" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(TrackerError::Api(format!("Unknown priority: {}", other))),
        }
    }
}

/// Ticket status. Transitions live in [`crate::lifecycle`].
///
/// `Resolved` only exists so that old collections still deserialize; the
/// transition function never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    PendingApproval,
    Approved,
    Forwarded,
    Processing,
    Completed,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::PendingApproval => "pending_approval",
            TicketStatus::Approved => "approved",
            TicketStatus::Forwarded => "forwarded",
            TicketStatus::Processing => "processing",
            TicketStatus::Completed => "completed",
            TicketStatus::Resolved => "resolved",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::PendingApproval => "Pending Approval",
            TicketStatus::Approved => "Approved",
            TicketStatus::Forwarded => "Forwarded",
            TicketStatus::Processing => "Processing",
            TicketStatus::Completed => "Completed",
            TicketStatus::Resolved => "Resolved",
        }
    }

    /// Counted as "pending" in submitter statistics.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            TicketStatus::PendingApproval | TicketStatus::Approved | TicketStatus::Forwarded
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending_approval" | "pending" => Ok(TicketStatus::PendingApproval),
            "approved" => Ok(TicketStatus::Approved),
            "forwarded" => Ok(TicketStatus::Forwarded),
            "processing" => Ok(TicketStatus::Processing),
            "completed" => Ok(TicketStatus::Completed),
            "resolved" => Ok(TicketStatus::Resolved),
            other => Err(TrackerError::Api(format!("Unknown status: {}", other))),
        }
    }
}

/// One audit entry. Entries are appended, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: TicketStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<RequestType>,
    #[serde(default, alias = "ip")]
    pub submitter_ip: String,
    #[serde(default, alias = "fullname")]
    pub submitter_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_desc: Option<String>,

    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default, alias = "processHistory")]
    pub history: Vec<HistoryEntry>,

    #[serde(default, alias = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_from: Option<String>,
}

impl Ticket {
    /// A fresh, unsaved ticket: `pending_approval` with the creation entry in its
    /// history. Identity fields are assigned by the store on `add`.
    pub fn new(
        request_type: RequestType,
        submitter_ip: impl Into<String>,
        submitter_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            request_type: Some(request_type),
            submitter_ip: submitter_ip.into(),
            submitter_name: submitter_name.into(),
            device_name: None,
            fault_desc: None,
            solution: None,
            material_type: None,
            material_desc: None,
            quantity: None,
            other_title: None,
            other_desc: None,
            priority: Priority::Normal,
            status: TicketStatus::PendingApproval,
            history: vec![crate::lifecycle::creation_entry(now)],
            created_at: Some(now),
            created_by: None,
            version: 0,
            last_modified: None,
            modified_by: None,
            deleted_at: None,
            deleted_by: None,
            deleted_from: None,
        }
    }

    pub fn with_fault(mut self, device_name: &str, description: &str, solution: Option<&str>) -> Self {
        self.device_name = Some(device_name.to_string());
        self.fault_desc = Some(description.to_string());
        self.solution = solution.map(str::to_string);
        self
    }

    pub fn with_material(mut self, material_type: &str, description: &str, quantity: u32) -> Self {
        self.material_type = Some(material_type.to_string());
        self.material_desc = Some(description.to_string());
        self.quantity = Some(quantity);
        self
    }

    pub fn with_other(mut self, title: &str, description: &str) -> Self {
        self.other_title = Some(title.to_string());
        self.other_desc = Some(description.to_string());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Request type with the legacy default applied.
    pub fn effective_type(&self) -> RequestType {
        self.request_type.unwrap_or(RequestType::Fault)
    }

    /// Device, material or title, depending on the request type.
    pub fn subject(&self) -> &str {
        let value = match self.effective_type() {
            RequestType::Fault => &self.device_name,
            RequestType::Material => &self.material_type,
            RequestType::Other => &self.other_title,
        };
        value.as_deref().unwrap_or("")
    }

    pub fn detail(&self) -> &str {
        let value = match self.effective_type() {
            RequestType::Fault => &self.fault_desc,
            RequestType::Material => &self.material_desc,
            RequestType::Other => &self.other_desc,
        };
        value.as_deref().unwrap_or("")
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A shallow patch: every `Some` field overwrites the ticket's value, `None`
/// leaves it alone. Status and history are deliberately absent; they only move
/// through [`crate::lifecycle::change_status`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub request_type: Option<RequestType>,
    pub submitter_ip: Option<String>,
    pub submitter_name: Option<String>,
    pub device_name: Option<String>,
    pub fault_desc: Option<String>,
    pub solution: Option<String>,
    pub material_type: Option<String>,
    pub material_desc: Option<String>,
    pub quantity: Option<u32>,
    pub other_title: Option<String>,
    pub other_desc: Option<String>,
    pub priority: Option<Priority>,
}

impl TicketPatch {
    pub fn is_empty(&self) -> bool {
        *self == TicketPatch::default()
    }

    /// Merges onto `ticket`, returning the camelCase names of the fields written.
    pub fn apply(&self, ticket: &mut Ticket) -> Vec<&'static str> {
        let mut changed = Vec::new();

        macro_rules! merge {
            // An empty string clears an optional text field.
            (text $field:ident, $name:literal) => {
                if let Some(value) = &self.$field {
                    ticket.$field = Some(value.clone()).filter(|v| !v.is_empty());
                    changed.push($name);
                }
            };
            (opt $field:ident, $name:literal) => {
                if let Some(value) = &self.$field {
                    ticket.$field = Some(value.clone());
                    changed.push($name);
                }
            };
            ($field:ident, $name:literal) => {
                if let Some(value) = &self.$field {
                    ticket.$field = value.clone();
                    changed.push($name);
                }
            };
        }

        merge!(opt request_type, "requestType");
        merge!(submitter_ip, "submitterIp");
        merge!(submitter_name, "submitterName");
        merge!(text device_name, "deviceName");
        merge!(text fault_desc, "faultDesc");
        merge!(text solution, "solution");
        merge!(text material_type, "materialType");
        merge!(text material_desc, "materialDesc");
        merge!(opt quantity, "quantity");
        merge!(text other_title, "otherTitle");
        merge!(text other_desc, "otherDesc");
        merge!(priority, "priority");

        changed
    }
}

/// The single backup slot (and the dated manual copies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub data: Vec<Ticket>,
    pub timestamp: DateTime<Utc>,
    pub version: u64,
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ticket_starts_pending_with_one_history_entry() {
        let ticket = Ticket::new(RequestType::Fault, "10.0.0.1", "Ada Lovelace");
        assert_eq!(ticket.status, TicketStatus::PendingApproval);
        assert_eq!(ticket.history.len(), 1);
        assert_eq!(ticket.history[0].status, TicketStatus::PendingApproval);
        assert!(ticket.created_at.is_some());
    }

    #[test]
    fn legacy_field_names_deserialize() {
        let raw = r#"{
            "id": "f_1700000000000_abc",
            "ip": "192.168.1.10",
            "fullname": "Grace Hopper",
            "deviceName": "Printer",
            "faultDesc": "Paper jam",
            "timestamp": "2024-03-01T10:00:00Z",
            "processHistory": [
                {"status": "pending_approval", "timestamp": "2024-03-01T10:00:00Z", "note": "Request created"}
            ]
        }"#;
        let ticket: Ticket = serde_json::from_str(raw).unwrap();
        assert_eq!(ticket.submitter_ip, "192.168.1.10");
        assert_eq!(ticket.submitter_name, "Grace Hopper");
        assert_eq!(ticket.request_type, None);
        assert_eq!(ticket.effective_type(), RequestType::Fault);
        assert_eq!(ticket.history.len(), 1);
        assert!(ticket.created_at.is_some());
        assert_eq!(ticket.priority, Priority::Normal);
    }

    #[test]
    fn legacy_resolved_status_is_accepted() {
        let raw = r#"{"id": "x", "status": "resolved"}"#;
        let ticket: Ticket = serde_json::from_str(raw).unwrap();
        assert_eq!(ticket.status, TicketStatus::Resolved);
    }

    #[test]
    fn active_ticket_serializes_without_deletion_metadata() {
        let ticket = Ticket::new(RequestType::Other, "10.0.0.1", "Ada Lovelace")
            .with_other("Chair", "Need a new chair");
        let json = serde_json::to_string(&ticket).unwrap();
        assert!(!json.contains("deletedAt"));
        assert!(json.contains("\"requestType\":\"other\""));
        assert!(json.contains("\"submitterIp\""));
    }

    #[test]
    fn patch_overwrites_only_given_fields() {
        let mut ticket = Ticket::new(RequestType::Fault, "10.0.0.1", "Ada Lovelace")
            .with_fault("Laptop", "Does not boot", None);
        let patch = TicketPatch {
            solution: Some("Replace battery".into()),
            priority: Some(Priority::High),
            ..Default::default()
        };

        let changed = patch.apply(&mut ticket);

        assert_eq!(changed, vec!["solution", "priority"]);
        assert_eq!(ticket.solution.as_deref(), Some("Replace battery"));
        assert_eq!(ticket.device_name.as_deref(), Some("Laptop"));
        assert_eq!(ticket.priority, Priority::High);
    }

    #[test]
    fn subject_and_detail_follow_request_type() {
        let material = Ticket::new(RequestType::Material, "10.0.0.1", "Ada Lovelace")
            .with_material("Toner", "Black toner", 2);
        assert_eq!(material.subject(), "Toner");
        assert_eq!(material.detail(), "Black toner");
    }

    #[test]
    fn parses_status_names() {
        assert_eq!(
            "pending-approval".parse::<TicketStatus>().unwrap(),
            TicketStatus::PendingApproval
        );
        assert_eq!("Completed".parse::<TicketStatus>().unwrap(), TicketStatus::Completed);
        assert!("done".parse::<TicketStatus>().is_err());
    }
}
