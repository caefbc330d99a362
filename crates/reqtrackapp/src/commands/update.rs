//! Field edits on an existing ticket.
//!
//! Edited values go through the same rules as a submission: each named field is
//! checked and sanitized with its rule (taken from the ticket's type, or from
//! whichever type declares it), and submitter fields pass the XSS detector. Only
//! then does a [`TicketPatch`] reach [`RecordStore::update`].

use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, TrackerError};
use crate::model::{Priority, RequestType, TicketPatch};
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;
use crate::validation::rules::{
    rules_for, DEVICE_NAME, FAULT_DESC, MATERIAL_DESC, MATERIAL_TYPE, OTHER_DESC, OTHER_TITLE,
    QUANTITY, SOLUTION, SUBMITTER_IP, SUBMITTER_NAME,
};
use crate::validation::xss::detect_xss;
use crate::validation::{validate, FieldMap, FieldRule, RuleSet};

#[derive(Debug, Clone, Default)]
pub struct TicketEdit {
    pub request_type: Option<RequestType>,
    pub priority: Option<Priority>,
    pub fields: FieldMap,
}

impl TicketEdit {
    pub fn is_empty(&self) -> bool {
        self.request_type.is_none() && self.priority.is_none() && self.fields.is_empty()
    }
}

fn rule_for(target: RequestType, field: &str) -> Option<&'static FieldRule> {
    rules_for(target).get(field).or_else(|| {
        RequestType::ALL
            .iter()
            .find_map(|t| rules_for(*t).get(field))
    })
}

pub fn run<B: StorageBackend>(store: &RecordStore<B>, id: &str, edit: &TicketEdit) -> Result<CmdResult> {
    if edit.is_empty() {
        return Err(TrackerError::Api("Nothing to update".to_string()));
    }

    let current = store.get(id)?;
    let target = edit.request_type.unwrap_or(current.effective_type());

    let mut rules = RuleSet::new();
    for field in edit.fields.keys() {
        let rule = rule_for(target, field)
            .ok_or_else(|| TrackerError::Api(format!("Unknown field: {}", field)))?;
        rules = rules.with(rule.clone());
    }

    let outcome = validate(&edit.fields, &rules);
    if !outcome.is_valid() {
        return Err(TrackerError::Validation(outcome.errors));
    }
    for field in [SUBMITTER_IP, SUBMITTER_NAME] {
        if edit.fields.get(field).is_some_and(|raw| detect_xss(raw)) {
            tracing::warn!(id, field, "Rejected edit with script-like input");
            return Err(TrackerError::UnsafeInput(field.to_string()));
        }
    }

    let mut patch = TicketPatch {
        request_type: edit.request_type,
        priority: edit.priority,
        ..Default::default()
    };
    for field in edit.fields.keys() {
        // Blank optional fields are absent from the sanitized map; the empty
        // value clears them.
        let value = outcome.sanitized.get(field).cloned().unwrap_or_default();
        set_field(&mut patch, field, value)?;
    }

    let updated = store.update(id, &patch, store.actor())?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Updated {}", updated.id)));
    Ok(result.with_affected_tickets(vec![updated]))
}

fn set_field(patch: &mut TicketPatch, field: &str, value: String) -> Result<()> {
    match field {
        SUBMITTER_IP => patch.submitter_ip = Some(value),
        SUBMITTER_NAME => patch.submitter_name = Some(value),
        DEVICE_NAME => patch.device_name = Some(value),
        FAULT_DESC => patch.fault_desc = Some(value),
        SOLUTION => patch.solution = Some(value),
        MATERIAL_TYPE => patch.material_type = Some(value),
        MATERIAL_DESC => patch.material_desc = Some(value),
        OTHER_TITLE => patch.other_title = Some(value),
        OTHER_DESC => patch.other_desc = Some(value),
        QUANTITY => {
            let quantity = value
                .parse()
                .map_err(|_| TrackerError::Api(format!("Invalid quantity: {}", value)))?;
            patch.quantity = Some(quantity);
        }
        other => return Err(TrackerError::Api(format!("Unknown field: {}", other))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fault_ticket, make_store};

    fn edit(fields: &[(&str, &str)]) -> TicketEdit {
        TicketEdit {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_update_sanitizes_values() {
        let store = make_store();
        let added = store.add(fault_ticket("10.0.0.1")).unwrap();

        let result = run(&store, &added.id, &edit(&[(SOLUTION, "<i>Swap</i> PSU & fan")])).unwrap();

        let ticket = &result.affected_tickets[0];
        assert_eq!(ticket.solution.as_deref(), Some("Swap PSU &amp; fan"));
        assert_eq!(ticket.history.last().unwrap().note, "Updated: solution");
        assert_eq!(ticket.modified_by.as_deref(), Some(store.actor()));
    }

    #[test]
    fn test_blank_optional_field_clears() {
        let store = make_store();
        let added = store
            .add(fault_ticket("10.0.0.1").with_fault("Laptop", "Dead", Some("Charge it")))
            .unwrap();

        let result = run(&store, &added.id, &edit(&[(SOLUTION, "  ")])).unwrap();
        assert_eq!(result.affected_tickets[0].solution, None);

        let stored = store.get(&added.id).unwrap();
        assert_eq!(stored.solution, None);
        let json = serde_json::to_value(&stored).unwrap();
        assert!(json.get("solution").is_none());
    }

    #[test]
    fn test_blank_required_field_is_rejected() {
        let store = make_store();
        let added = store.add(fault_ticket("10.0.0.1")).unwrap();

        assert!(matches!(
            run(&store, &added.id, &edit(&[(DEVICE_NAME, "")])),
            Err(TrackerError::Validation(_))
        ));
        assert_eq!(store.get(&added.id).unwrap(), added);
    }

    #[test]
    fn test_changing_type_needs_new_payload() {
        let store = make_store();
        let added = store.add(fault_ticket("10.0.0.1")).unwrap();

        let bare = TicketEdit {
            request_type: Some(RequestType::Other),
            ..Default::default()
        };
        assert!(matches!(
            run(&store, &added.id, &bare),
            Err(TrackerError::Validation(_))
        ));

        let mut full = edit(&[(OTHER_TITLE, "Desk lamp"), (OTHER_DESC, "Flickers")]);
        full.request_type = Some(RequestType::Other);
        let updated = run(&store, &added.id, &full).unwrap().affected_tickets.remove(0);
        assert_eq!(updated.effective_type(), RequestType::Other);
        assert_eq!(updated.subject(), "Desk lamp");
    }

    #[test]
    fn test_unknown_field_and_empty_edit() {
        let store = make_store();
        let added = store.add(fault_ticket("10.0.0.1")).unwrap();

        assert!(run(&store, &added.id, &edit(&[("color", "red")])).is_err());
        assert!(run(&store, &added.id, &TicketEdit::default()).is_err());
    }

    #[test]
    fn test_script_like_ip_is_rejected() {
        let store = make_store();
        let added = store.add(fault_ticket("10.0.0.1")).unwrap();
        assert!(matches!(
            run(&store, &added.id, &edit(&[(SUBMITTER_IP, "javascript:10.0.0.2")])),
            Err(TrackerError::UnsafeInput(_))
        ));
    }
}
