//! # Input Validation and Sanitization
//!
//! Everything a submitter types passes through [`validate`] before it can reach the
//! store. Validation never fails with an error: an invalid form is a normal outcome,
//! reported as a list of [`FieldError`]s next to the sanitized values.
//!
//! ## Per-Field Pipeline
//!
//! For every rule in a [`RuleSet`], in declaration order:
//!
//! 1. **Required**: a required field that is missing or blank yields one error and
//!    is skipped entirely (no sanitizing, no further checks).
//! 2. **Empty**: a blank optional field is skipped and does not appear in the output.
//! 3. **Sanitize**: the trimmed value is cleaned according to its [`FieldKind`].
//! 4. **Checks**: `min_length`, `max_length`, `pattern`, `custom`, in that order.
//!    Each failing check adds an error; none short-circuits the others.
//! 5. The sanitized value is recorded, even when a check failed.
//!
//! ## Sanitizing
//!
//! | Kind | Transformation |
//! |------|----------------|
//! | `Text`, `Textarea` | strip tags, then HTML-escape |
//! | `Email` | lowercase, then strip tags |
//! | `Ip` | keep only `[0-9.]` |
//! | `Number` | keep only digits |
//!
//! ## Companions
//!
//! - [`rules`]: the declarative per-request-type rule table, and the required-field
//!   predicate the store uses to accept or drop tickets.
//! - [`xss`]: a pattern detector run on raw submitter fields, independent of the
//!   sanitizer.
//! - [`rate_limit`]: sliding-window attempt limiter for form submissions.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

pub mod rate_limit;
pub mod rules;
pub mod xss;

/// Raw or sanitized form input, keyed by camelCase field name.
pub type FieldMap = BTreeMap<String, String>;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Ip,
    Number,
}

/// Declarative rule for one field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub custom: Option<fn(&str) -> bool>,
    pub message: Option<String>,
}

impl FieldRule {
    pub fn new(field: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            field: field.to_string(),
            label: label.to_string(),
            kind,
            required: false,
            min_length: None,
            max_length: None,
            pattern: None,
            custom: None,
            message: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: &Regex) -> Self {
        self.pattern = Some(pattern.clone());
        self
    }

    pub fn custom(mut self, check: fn(&str) -> bool) -> Self {
        self.custom = Some(check);
        self
    }

    /// Message used when the `custom` check fails.
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

/// Ordered list of rules; validation runs them in this order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn extend(mut self, other: &RuleSet) -> Self {
        self.rules.extend(other.rules.iter().cloned());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.field == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub errors: Vec<FieldError>,
    pub sanitized: FieldMap,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_error_for(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn add_error(&mut self, field: &str, message: String) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message,
            timestamp: Utc::now(),
        });
    }
}

/// Validates `fields` against `rules`.
pub fn validate(fields: &FieldMap, rules: &RuleSet) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for rule in &rules.rules {
        let value = fields.get(&rule.field).map(String::as_str).unwrap_or("");

        if is_blank(value) {
            if rule.required {
                outcome.add_error(&rule.field, format!("{} is required.", rule.label));
            }
            continue;
        }

        let sanitized = sanitize(value, rule.kind);
        let len = sanitized.chars().count();

        if let Some(min) = rule.min_length {
            if len < min {
                outcome.add_error(
                    &rule.field,
                    format!("{} must be at least {} characters.", rule.label, min),
                );
            }
        }

        if let Some(max) = rule.max_length {
            if len > max {
                outcome.add_error(
                    &rule.field,
                    format!("{} must be at most {} characters.", rule.label, max),
                );
            }
        }

        if let Some(pattern) = &rule.pattern {
            if !pattern.is_match(&sanitized) {
                outcome.add_error(&rule.field, format!("{} has an invalid format.", rule.label));
            }
        }

        if let Some(check) = rule.custom {
            if !check(&sanitized) {
                let message = rule
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} is invalid.", rule.label));
                outcome.add_error(&rule.field, message);
            }
        }

        outcome.sanitized.insert(rule.field.clone(), sanitized);
    }

    outcome
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn sanitize(value: &str, kind: FieldKind) -> String {
    let trimmed = value.trim();
    match kind {
        FieldKind::Text | FieldKind::Textarea => escape_html(&strip_tags(trimmed)),
        FieldKind::Email => strip_tags(&trimmed.to_lowercase()),
        FieldKind::Ip => trimmed
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect(),
        FieldKind::Number => trimmed.chars().filter(|c| c.is_ascii_digit()).collect(),
    }
}

pub fn strip_tags(value: &str) -> String {
    TAG_RE.replace_all(value, "").into_owned()
}

/// Escapes the characters a text node would escape.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn digits_under_ten(value: &str) -> bool {
        value.parse::<u32>().map(|n| n < 10).unwrap_or(false)
    }

    #[test]
    fn required_empty_field_reports_once_and_is_skipped() {
        let rules = RuleSet::new().with(
            FieldRule::new("title", "Title", FieldKind::Text)
                .required()
                .min_length(3),
        );
        let outcome = validate(&fields(&[("title", "   ")]), &rules);

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].message, "Title is required.");
        assert!(!outcome.sanitized.contains_key("title"));
    }

    #[test]
    fn optional_empty_field_passes_without_output() {
        let rules = RuleSet::new().with(FieldRule::new("note", "Note", FieldKind::Textarea));
        let outcome = validate(&FieldMap::new(), &rules);

        assert!(outcome.is_valid());
        assert!(outcome.sanitized.is_empty());
    }

    #[test]
    fn optional_provided_field_is_sanitized_into_output() {
        let rules = RuleSet::new().with(FieldRule::new("note", "Note", FieldKind::Textarea));
        let outcome = validate(&fields(&[("note", "  <b>bold</b> & more ")]), &rules);

        assert!(outcome.is_valid());
        assert_eq!(outcome.sanitized["note"], "bold &amp; more");
    }

    #[test]
    fn failed_checks_do_not_short_circuit() {
        let rules = RuleSet::new().with(
            FieldRule::new("code", "Code", FieldKind::Number)
                .min_length(3)
                .custom(digits_under_ten),
        );
        let outcome = validate(&fields(&[("code", "42")]), &rules);

        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors[0].message.contains("at least 3"));
        assert_eq!(outcome.errors[1].message, "Code is invalid.");
        assert_eq!(outcome.sanitized["code"], "42");
    }

    #[test]
    fn custom_message_replaces_default() {
        let rules = RuleSet::new().with(
            FieldRule::new("code", "Code", FieldKind::Number)
                .custom(digits_under_ten)
                .message("Code must be a single digit"),
        );
        let outcome = validate(&fields(&[("code", "12")]), &rules);
        assert_eq!(outcome.errors[0].message, "Code must be a single digit");
    }

    #[test]
    fn pattern_failure_keeps_generic_message() {
        let digits = Regex::new(r"^\d+$").unwrap();
        let rules = RuleSet::new().with(
            FieldRule::new("code", "Code", FieldKind::Text)
                .pattern(&digits)
                .message("Code must be a single digit"),
        );
        let outcome = validate(&fields(&[("code", "abc")]), &rules);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].message, "Code has an invalid format.");
    }

    #[test]
    fn sanitize_by_kind() {
        assert_eq!(sanitize(" Foo@Example.COM ", FieldKind::Email), "foo@example.com");
        assert_eq!(sanitize("192.168.1.1<x>", FieldKind::Ip), "192.168.1.1");
        assert_eq!(sanitize("1a2b3", FieldKind::Number), "123");
        assert_eq!(
            sanitize("<script>alert(1)</script>", FieldKind::Text),
            "alert(1)"
        );
        assert_eq!(sanitize("a < b", FieldKind::Text), "a &lt; b");
    }

    #[test]
    fn errors_are_reported_in_rule_order() {
        let rules = RuleSet::new()
            .with(FieldRule::new("a", "A", FieldKind::Text).required())
            .with(FieldRule::new("b", "B", FieldKind::Text).required());
        let outcome = validate(&FieldMap::new(), &rules);
        let order: Vec<_> = outcome.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }
}
