//! New requests.
//!
//! A submission passes four gates before anything is stored:
//!
//! ```text
//! rate limit (form_<ip>) -> rule table -> XSS detector (raw ip/name) -> RecordStore::add
//! ```
//!
//! The stored ticket is built from the *sanitized* values only.

use chrono::{DateTime, Utc};

use crate::commands::{CmdMessage, CmdResult};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::model::{Priority, RequestType, Ticket};
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;
use crate::validation::rate_limit::{check_persisted, RateDecision};
use crate::validation::rules::{
    rules_for, DEVICE_NAME, FAULT_DESC, IPV4_RE, MATERIAL_DESC, MATERIAL_TYPE, OTHER_DESC,
    OTHER_TITLE, QUANTITY, SOLUTION, SUBMITTER_IP, SUBMITTER_NAME,
};
use crate::validation::xss::detect_xss;
use crate::validation::{sanitize, validate, FieldKind, FieldMap};

#[derive(Debug, Clone)]
pub struct SubmitForm {
    pub request_type: RequestType,
    pub priority: Priority,
    pub fields: FieldMap,
}

impl SubmitForm {
    pub fn new(request_type: RequestType) -> Self {
        Self {
            request_type,
            priority: Priority::Normal,
            fields: FieldMap::new(),
        }
    }

    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    fn raw(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Rate-limit key for a submitter address. Anything that is not a clean IPv4
/// address shares the `unknown` bucket.
pub fn rate_limit_key(raw_ip: &str) -> String {
    let ip = sanitize(raw_ip, FieldKind::Ip);
    if IPV4_RE.is_match(&ip) {
        format!("form_{}", ip)
    } else {
        "form_unknown".to_string()
    }
}

pub fn run<B: StorageBackend>(
    store: &RecordStore<B>,
    config: &TrackerConfig,
    form: &SubmitForm,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let key = rate_limit_key(form.raw(SUBMITTER_IP));
    let decision = check_persisted(
        store.backend(),
        &key,
        config.rate_limit_attempts,
        config.rate_limit_window(),
        now,
    )?;
    if let RateDecision::Limited { retry_after_secs } = decision {
        tracing::warn!(%key, retry_after_secs, "Submission rate limited");
        return Err(TrackerError::RateLimited { retry_after_secs });
    }

    let outcome = validate(&form.fields, rules_for(form.request_type));
    if !outcome.is_valid() {
        return Err(TrackerError::Validation(outcome.errors));
    }

    for field in [SUBMITTER_IP, SUBMITTER_NAME] {
        if detect_xss(form.raw(field)) {
            tracing::warn!(field, "Rejected submission with script-like input");
            return Err(TrackerError::UnsafeInput(field.to_string()));
        }
    }

    let ticket = build_ticket(form.request_type, form.priority, &outcome.sanitized);
    let added = store.add(ticket)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "{} request submitted: {}",
        added.effective_type().label(),
        added.subject()
    )));
    result.affected_tickets.push(added);
    Ok(result)
}

fn build_ticket(request_type: RequestType, priority: Priority, values: &FieldMap) -> Ticket {
    let get = |name: &str| values.get(name).cloned();

    let mut ticket = Ticket::new(
        request_type,
        get(SUBMITTER_IP).unwrap_or_default(),
        get(SUBMITTER_NAME).unwrap_or_default(),
    )
    .with_priority(priority);

    ticket.device_name = get(DEVICE_NAME);
    ticket.fault_desc = get(FAULT_DESC);
    ticket.solution = get(SOLUTION);
    ticket.material_type = get(MATERIAL_TYPE);
    ticket.material_desc = get(MATERIAL_DESC);
    ticket.quantity = get(QUANTITY).and_then(|q| q.parse().ok());
    ticket.other_title = get(OTHER_TITLE);
    ticket.other_desc = get(OTHER_DESC);
    ticket
}
