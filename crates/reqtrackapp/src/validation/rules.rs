//! Per-request-type rule table.
//!
//! Each [`RequestType`] maps to one [`RuleSet`]: the submitter rules shared by all
//! types, followed by the type's own payload rules. Adding a ticket type means
//! adding one entry here.
//!
//! The same table backs [`is_valid_ticket`], the predicate the store applies on
//! every read and write. That predicate only looks at the *required* rules
//! (presence plus any `custom` range check); length and format limits apply to
//! fresh input, not to records already stored.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::{is_blank, FieldError, FieldKind, FieldRule, RuleSet};
use crate::model::{RequestType, Ticket};

pub const SUBMITTER_IP: &str = "submitterIp";
pub const SUBMITTER_NAME: &str = "submitterName";
pub const DEVICE_NAME: &str = "deviceName";
pub const FAULT_DESC: &str = "faultDesc";
pub const SOLUTION: &str = "solution";
pub const MATERIAL_TYPE: &str = "materialType";
pub const MATERIAL_DESC: &str = "materialDesc";
pub const QUANTITY: &str = "quantity";
pub const OTHER_TITLE: &str = "otherTitle";
pub const OTHER_DESC: &str = "otherDesc";

pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 100;

pub static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    )
    .expect("valid ipv4 regex")
});

pub static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-ZÀ-ÖØ-öø-ÿğüşıöçĞÜŞİÖÇ\s]+$").expect("valid name regex")
});

static RULE_TABLE: Lazy<HashMap<RequestType, RuleSet>> = Lazy::new(|| {
    let submitter = submitter_rules();
    let mut table = HashMap::new();

    table.insert(
        RequestType::Fault,
        RuleSet::new()
            .extend(&submitter)
            .with(
                FieldRule::new(DEVICE_NAME, "Device name", FieldKind::Text)
                    .required()
                    .max_length(50),
            )
            .with(
                FieldRule::new(FAULT_DESC, "Fault description", FieldKind::Textarea)
                    .required()
                    .max_length(200),
            )
            .with(FieldRule::new(SOLUTION, "Proposed solution", FieldKind::Textarea).max_length(200)),
    );

    table.insert(
        RequestType::Material,
        RuleSet::new()
            .extend(&submitter)
            .with(
                FieldRule::new(MATERIAL_TYPE, "Material type", FieldKind::Text)
                    .required()
                    .max_length(30),
            )
            .with(
                FieldRule::new(MATERIAL_DESC, "Material description", FieldKind::Textarea)
                    .required()
                    .max_length(200),
            )
            .with(
                FieldRule::new(QUANTITY, "Quantity", FieldKind::Number)
                    .required()
                    .custom(is_valid_quantity)
                    .message("Quantity must be between 1 and 100"),
            ),
    );

    table.insert(
        RequestType::Other,
        RuleSet::new()
            .extend(&submitter)
            .with(
                FieldRule::new(OTHER_TITLE, "Request title", FieldKind::Text)
                    .required()
                    .max_length(100),
            )
            .with(
                FieldRule::new(OTHER_DESC, "Request description", FieldKind::Textarea)
                    .required()
                    .max_length(300),
            ),
    );

    table
});

fn submitter_rules() -> RuleSet {
    RuleSet::new()
        .with(
            FieldRule::new(SUBMITTER_IP, "IP address", FieldKind::Ip)
                .required()
                .min_length(7)
                .max_length(15)
                .pattern(&IPV4_RE),
        )
        .with(
            FieldRule::new(SUBMITTER_NAME, "Full name", FieldKind::Text)
                .required()
                .min_length(3)
                .max_length(50)
                .pattern(&NAME_RE),
        )
}

/// Rules for a submission of the given type.
pub fn rules_for(request_type: RequestType) -> &'static RuleSet {
    // Every RequestType variant is inserted above.
    &RULE_TABLE[&request_type]
}

pub fn is_valid_quantity(value: &str) -> bool {
    value
        .trim()
        .parse::<u32>()
        .map(|n| (MIN_QUANTITY..=MAX_QUANTITY).contains(&n))
        .unwrap_or(false)
}

/// The stored value of a rule field, as text.
pub fn ticket_field(ticket: &Ticket, field: &str) -> Option<String> {
    match field {
        SUBMITTER_IP => Some(ticket.submitter_ip.clone()),
        SUBMITTER_NAME => Some(ticket.submitter_name.clone()),
        DEVICE_NAME => ticket.device_name.clone(),
        FAULT_DESC => ticket.fault_desc.clone(),
        SOLUTION => ticket.solution.clone(),
        MATERIAL_TYPE => ticket.material_type.clone(),
        MATERIAL_DESC => ticket.material_desc.clone(),
        QUANTITY => ticket.quantity.map(|q| q.to_string()),
        OTHER_TITLE => ticket.other_title.clone(),
        OTHER_DESC => ticket.other_desc.clone(),
        _ => None,
    }
}

/// One error per required field of `ticket` that is missing or out of range.
pub fn required_field_errors(ticket: &Ticket) -> Vec<FieldError> {
    let now = Utc::now();
    rules_for(ticket.effective_type())
        .rules
        .iter()
        .filter(|rule| rule.required)
        .filter_map(|rule| {
            let value = ticket_field(ticket, &rule.field).unwrap_or_default();
            let message = if is_blank(&value) {
                format!("{} is required.", rule.label)
            } else if rule.custom.is_some_and(|check| !check(&value)) {
                rule.message
                    .clone()
                    .unwrap_or_else(|| format!("{} is invalid.", rule.label))
            } else {
                return None;
            };
            Some(FieldError {
                field: rule.field.clone(),
                message,
                timestamp: now,
            })
        })
        .collect()
}

/// Names of the required fields failing [`required_field_errors`].
pub fn missing_required(ticket: &Ticket) -> Vec<String> {
    required_field_errors(ticket)
        .into_iter()
        .map(|e| e.field)
        .collect()
}

/// True when the ticket has an identity, a creation time, and every field its
/// type requires.
pub fn is_valid_ticket(ticket: &Ticket) -> bool {
    !ticket.id.trim().is_empty()
        && ticket.created_at.is_some()
        && required_field_errors(ticket).is_empty()
}
