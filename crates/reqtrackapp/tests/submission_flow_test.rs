use reqtrackapp::api::{ExportOptions, SubmitForm, TicketFilter};
use reqtrackapp::error::TrackerError;
use reqtrackapp::init::initialize;
use reqtrackapp::model::{RequestType, TicketStatus};
use reqtrackapp::validation::rules::{
    DEVICE_NAME, FAULT_DESC, MATERIAL_DESC, MATERIAL_TYPE, QUANTITY, SUBMITTER_IP, SUBMITTER_NAME,
};
use std::fs;
use tempfile::TempDir;

fn fault_form(ip: &str) -> SubmitForm {
    SubmitForm::new(RequestType::Fault)
        .field(SUBMITTER_IP, ip)
        .field(SUBMITTER_NAME, "Grace Hopper")
        .field(DEVICE_NAME, "Projector")
        .field(FAULT_DESC, "No signal on HDMI")
}

#[test]
fn test_submit_approve_complete_export() {
    let dir = TempDir::new().unwrap();

    // 1. Submitter tab files two requests
    let submitter = initialize(Some(dir.path().to_path_buf()), "system").unwrap();
    submitter.api.submit(&fault_form("10.1.2.3")).unwrap();
    let material = SubmitForm::new(RequestType::Material)
        .field(SUBMITTER_IP, "10.1.2.3")
        .field(SUBMITTER_NAME, "Grace Hopper")
        .field(MATERIAL_TYPE, "Toner")
        .field(MATERIAL_DESC, "Black, for room 4")
        .field(QUANTITY, "2");
    submitter.api.submit(&material).unwrap();

    // 2. Admin tab opens the same directory and works the fault
    let admin = initialize(Some(dir.path().to_path_buf()), "admin").unwrap();
    let faults = admin
        .api
        .list_tickets(&TicketFilter {
            request_type: Some(RequestType::Fault),
            ..Default::default()
        })
        .unwrap()
        .listed_tickets;
    assert_eq!(faults.len(), 1);
    let id = faults[0].id.clone();

    admin.api.change_status(&id, TicketStatus::Approved, None).unwrap();
    admin.api.change_status(&id, TicketStatus::Completed, Some("Cable replaced")).unwrap();

    // 3. Submitter sees the outcome
    let stats = submitter.api.ticket_stats("10.1.2.3").unwrap().ticket_stats.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 1);

    let shown = submitter.api.show_tickets(&[id.as_str()]).unwrap().listed_tickets;
    let history: Vec<_> = shown[0].history.iter().map(|h| h.status).collect();
    assert_eq!(
        history,
        vec![
            TicketStatus::PendingApproval,
            TicketStatus::Approved,
            TicketStatus::Completed
        ]
    );
    assert_eq!(shown[0].history[2].changed_by.as_deref(), Some("admin"));

    // 4. Export has one row per ticket
    let table = admin
        .api
        .export(&ExportOptions::default())
        .unwrap()
        .export
        .unwrap();
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.to_tsv().lines().count(), 3);
}

#[test]
fn test_rate_limit_survives_reopen() {
    let dir = TempDir::new().unwrap();
    for _ in 0..3 {
        let ctx = initialize(Some(dir.path().to_path_buf()), "system").unwrap();
        ctx.api.submit(&fault_form("10.1.2.3")).unwrap();
    }

    let ctx = initialize(Some(dir.path().to_path_buf()), "system").unwrap();
    let err = ctx.api.submit(&fault_form("10.1.2.3")).unwrap_err();
    assert!(matches!(err, TrackerError::RateLimited { .. }));

    // Another submitter is unaffected
    ctx.api.submit(&fault_form("10.1.2.4")).unwrap();
}

#[test]
fn test_config_file_in_data_dir_is_used() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("reqtrack.toml"), "rate_limit_attempts = 1\n").unwrap();

    let ctx = initialize(Some(dir.path().to_path_buf()), "system").unwrap();
    assert_eq!(ctx.config.rate_limit_attempts, 1);

    ctx.api.submit(&fault_form("10.1.2.3")).unwrap();
    assert!(ctx.api.submit(&fault_form("10.1.2.3")).is_err());
}

#[test]
fn test_open_repairs_legacy_data() {
    let dir = TempDir::new().unwrap();
    let legacy = serde_json::json!([{
        "id": "t_legacy",
        "submitterIp": "10.1.2.3",
        "submitterName": "Grace Hopper",
        "deviceName": "Fax",
        "faultDesc": "Beeps",
        "status": "pending_approval",
        "createdAt": "2023-04-01T09:00:00Z"
    }]);
    fs::write(dir.path().join("tickets.json"), legacy.to_string()).unwrap();

    let ctx = initialize(Some(dir.path().to_path_buf()), "system").unwrap();
    assert_eq!(ctx.init_report.migrated, 1);

    let ticket = ctx.api.store().get("t_legacy").unwrap();
    assert_eq!(ticket.request_type, Some(RequestType::Fault));
    assert_eq!(ticket.version, 1);
}
