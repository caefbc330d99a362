//! # CLI Layer
//!
//! This module is **one possible UI client** for reqtrack. It is not the application itself.
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Installs the log subscriber
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: Convert shell arguments into typed commands via clap
//! 2. **Context Setup**: Open the data directory as the acting user
//! 3. **Dispatch**: Route commands to the API facade
//! 4. **Output Formatting**: Styled text or the raw result as JSON
//! 5. **Error Handling**: Errors bubble up as `anyhow::Error`; `main` sets the exit code

use super::render::{
    render_data_stats, render_full_tickets, render_job_report, render_messages,
    render_sync_update, render_ticket_list, render_ticket_stats,
};
use super::setup::{
    parse_cli, Commands, CoreCommands, DataCommands, ExportFormat, MiscCommands, OutputMode,
    SubmitCommands, SubmitterArgs, TicketCommands,
};
use anyhow::{Context, Result};
use chrono::Utc;
use reqtrackapp::api::{ExportOptions, ReqtrackApi, SubmitForm, TicketEdit, TicketFilter};
use reqtrackapp::commands::CmdResult;
use reqtrackapp::init::{initialize, TrackerContext};
use reqtrackapp::maintenance::Maintenance;
use reqtrackapp::model::RequestType;
use reqtrackapp::store::backend::StorageBackend;
use reqtrackapp::store::fs_backend::FsBackend;
use reqtrackapp::store::RecordStore;
use reqtrackapp::sync::CrossTabSync;
use reqtrackapp::validation::rules::{
    DEVICE_NAME, FAULT_DESC, MATERIAL_DESC, MATERIAL_TYPE, OTHER_DESC, OTHER_TITLE, QUANTITY,
    SOLUTION, SUBMITTER_IP, SUBMITTER_NAME,
};
use tracing_subscriber::EnvFilter;

/// Origin recorded on tickets deleted from the command line.
const DELETE_ORIGIN: &str = "cli";

pub fn run() -> Result<()> {
    let cli = parse_cli();
    init_logging(cli.verbose);

    let ctx = initialize(cli.data_dir.clone(), &cli.actor)
        .context("Could not open the tracker data directory")?;
    report_init(&ctx);

    // Naked reqtrack lists tickets
    let command = cli.command.unwrap_or(Commands::Core(CoreCommands::List {
        request_type: None,
        status: None,
        ip: None,
        search: None,
    }));

    match command {
        Commands::Core(cmd) => handle_core(&ctx.api, cmd, cli.output),
        Commands::Ticket(cmd) => handle_ticket(&ctx.api, cmd, cli.output),
        Commands::Data(cmd) => handle_data(&ctx.api, cmd, cli.output),
        Commands::Misc(MiscCommands::Watch {
            interval,
            iterations,
        }) => watch(&ctx, interval, iterations),
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn report_init(ctx: &TrackerContext) {
    let report = &ctx.init_report;
    if report.migrated > 0 {
        eprintln!("Migrated {} legacy ticket(s)", report.migrated);
    }
    if let Some(repair) = &report.repaired {
        if !repair.is_empty() {
            eprintln!(
                "Repaired data: removed {} invalid ticket(s), {} stale deleted record(s)",
                repair.invalid_removed, repair.overlap_removed
            );
        }
    }
}

fn handle_core(api: &ReqtrackApi<FsBackend>, cmd: CoreCommands, output: OutputMode) -> Result<()> {
    match cmd {
        CoreCommands::Submit { form } => {
            let result = api.submit(&submit_form(form))?;
            emit(&result, output, |r| render_messages(&r.messages))
        }
        CoreCommands::List {
            request_type,
            status,
            ip,
            search,
        } => {
            let filter = TicketFilter {
                request_type,
                status,
                submitter_ip: ip,
                search,
            };
            let result = api.list_tickets(&filter)?;
            emit(&result, output, |r| {
                format!(
                    "{}{}",
                    render_ticket_list(&r.listed_tickets, false),
                    render_messages(&r.messages)
                )
            })
        }
        CoreCommands::Show { ids } => {
            let result = api.show_tickets(&ids)?;
            emit(&result, output, |r| render_full_tickets(&r.listed_tickets))
        }
    }
}

fn handle_ticket(
    api: &ReqtrackApi<FsBackend>,
    cmd: TicketCommands,
    output: OutputMode,
) -> Result<()> {
    let result = match cmd {
        TicketCommands::Status { id, status, note } => {
            api.change_status(&id, status, note.as_deref())?
        }
        TicketCommands::Update {
            id,
            request_type,
            priority,
            fields,
        } => {
            let edit = TicketEdit {
                request_type,
                priority,
                fields: fields.into_iter().collect(),
            };
            api.update_ticket(&id, &edit)?
        }
        TicketCommands::Delete { ids } => api.delete_tickets(&ids, DELETE_ORIGIN)?,
        TicketCommands::Deleted => {
            let result = api.deleted_tickets()?;
            return emit(&result, output, |r| {
                format!(
                    "{}{}",
                    render_ticket_list(&r.listed_tickets, true),
                    render_messages(&r.messages)
                )
            });
        }
    };
    emit(&result, output, |r| render_messages(&r.messages))
}

fn handle_data(api: &ReqtrackApi<FsBackend>, cmd: DataCommands, output: OutputMode) -> Result<()> {
    match cmd {
        DataCommands::Backup => {
            let result = api.backup()?;
            emit(&result, output, |r| render_messages(&r.messages))
        }
        DataCommands::Restore => {
            let result = api.restore()?;
            emit(&result, output, |r| render_messages(&r.messages))
        }
        DataCommands::Doctor => {
            let result = api.doctor()?;
            emit(&result, output, |r| render_messages(&r.messages))
        }
        DataCommands::Export {
            request_type,
            include_deleted,
            format,
            out,
        } => {
            let result = api.export(&ExportOptions {
                request_type,
                include_deleted,
            })?;
            let Some(table) = &result.export else {
                return emit(&result, output, |r| render_messages(&r.messages));
            };
            let text = match format {
                ExportFormat::Tsv => table.to_tsv(),
                ExportFormat::Json => format!("{}\n", serde_json::to_string_pretty(&table.records())?),
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Could not write {}", path.display()))?;
                    println!("Exported {} ticket(s) to {}", table.rows.len(), path.display());
                }
                None => print!("{}", text),
            }
            Ok(())
        }
        DataCommands::Stats { ip: Some(ip) } => {
            let result = api.ticket_stats(&ip)?;
            emit(&result, output, |r| {
                let stats = r
                    .ticket_stats
                    .as_ref()
                    .map(|s| render_ticket_stats(ip.trim(), s))
                    .unwrap_or_default();
                format!("{}{}", stats, render_messages(&r.messages))
            })
        }
        DataCommands::Stats { ip: None } => {
            let result = api.data_stats()?;
            emit(&result, output, |r| {
                r.data_stats.as_ref().map(render_data_stats).unwrap_or_default()
            })
        }
    }
}

/// Polls for changes made by other clients and runs maintenance until
/// `iterations` polls are done, or forever.
fn watch(ctx: &TrackerContext, interval: u64, iterations: Option<u64>) -> Result<()> {
    let store = ctx.api.store();
    let mut sync = CrossTabSync::new(store)?;
    let mut maintenance = Maintenance::start(&ctx.config, Utc::now());
    let pause = std::time::Duration::from_secs(interval.max(1));

    println!("Watching {} (ctrl-c to stop)", ctx.data_dir.display());
    let mut polls = 0;
    loop {
        if let Some(text) = poll_changes(&mut sync, store) {
            print!("{}", text);
        }
        for report in maintenance.tick(store, Utc::now()) {
            print!("{}", render_job_report(&report));
        }

        polls += 1;
        if iterations.is_some_and(|max| polls >= max) {
            return Ok(());
        }
        std::thread::sleep(pause);
    }
}

/// One sync poll, rendered. A failed poll is logged and retried on the next
/// interval rather than ending the watch.
fn poll_changes<B: StorageBackend>(
    sync: &mut CrossTabSync,
    store: &RecordStore<B>,
) -> Option<String> {
    match sync.poll(store) {
        Ok(update) => render_sync_update(&update),
        Err(e) => {
            tracing::warn!(error = %e, "Sync poll failed, retrying next interval");
            None
        }
    }
}

fn emit<F>(result: &CmdResult, output: OutputMode, render: F) -> Result<()>
where
    F: FnOnce(&CmdResult) -> String,
{
    match output {
        OutputMode::Term => print!("{}", render(result)),
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

fn submit_form(form: SubmitCommands) -> SubmitForm {
    fn base(request_type: RequestType, submitter: SubmitterArgs) -> SubmitForm {
        let form = SubmitForm::new(request_type).priority(submitter.priority);
        set(set(form, SUBMITTER_IP, submitter.ip), SUBMITTER_NAME, submitter.name)
    }
    fn set(form: SubmitForm, name: &str, value: Option<String>) -> SubmitForm {
        match value {
            Some(value) => form.field(name, value),
            None => form,
        }
    }

    match form {
        SubmitCommands::Fault {
            submitter,
            device,
            description,
            solution,
        } => {
            let form = base(RequestType::Fault, submitter);
            let form = set(form, DEVICE_NAME, device);
            let form = set(form, FAULT_DESC, description);
            set(form, SOLUTION, solution)
        }
        SubmitCommands::Material {
            submitter,
            material_type,
            description,
            quantity,
        } => {
            let form = base(RequestType::Material, submitter);
            let form = set(form, MATERIAL_TYPE, material_type);
            let form = set(form, MATERIAL_DESC, description);
            set(form, QUANTITY, quantity)
        }
        SubmitCommands::Other {
            submitter,
            title,
            description,
        } => {
            let form = base(RequestType::Other, submitter);
            let form = set(form, OTHER_TITLE, title);
            set(form, OTHER_DESC, description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqtrackapp::error::TrackerError;
    use reqtrackapp::model::Ticket;
    use reqtrackapp::store::backend::StorageEvent;
    use reqtrackapp::store::memory::InMemoryStore;

    /// Reads work; the change feed does not.
    struct BrokenFeed;

    impl StorageBackend for BrokenFeed {
        fn get_item(&self, _key: &str) -> reqtrackapp::error::Result<Option<String>> {
            Ok(None)
        }

        fn set_item(&self, _key: &str, _value: &str) -> reqtrackapp::error::Result<()> {
            Ok(())
        }

        fn remove_item(&self, _key: &str) -> reqtrackapp::error::Result<()> {
            Ok(())
        }

        fn keys(&self) -> reqtrackapp::error::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn take_changes(&self) -> reqtrackapp::error::Result<Vec<StorageEvent>> {
            Err(TrackerError::Store("storage unavailable".to_string()))
        }
    }

    fn submitter() -> SubmitterArgs {
        SubmitterArgs {
            ip: Some("10.0.0.1".into()),
            name: None,
            priority: reqtrackapp::model::Priority::High,
        }
    }

    #[test]
    fn test_submit_form_maps_fields() {
        let form = submit_form(SubmitCommands::Material {
            submitter: submitter(),
            material_type: Some("Toner".into()),
            description: None,
            quantity: Some("3".into()),
        });

        assert_eq!(form.request_type, RequestType::Material);
        assert_eq!(form.priority, reqtrackapp::model::Priority::High);
        assert_eq!(form.fields.get(SUBMITTER_IP).map(String::as_str), Some("10.0.0.1"));
        assert_eq!(form.fields.get(QUANTITY).map(String::as_str), Some("3"));
        assert!(!form.fields.contains_key(SUBMITTER_NAME));
        assert!(!form.fields.contains_key(MATERIAL_DESC));
    }

    #[test]
    fn test_failed_poll_does_not_end_watch() {
        let store = RecordStore::with_backend(BrokenFeed);
        let mut sync = CrossTabSync::new(&store).unwrap();

        assert_eq!(poll_changes(&mut sync, &store), None);
        assert_eq!(poll_changes(&mut sync, &store), None);
    }

    #[test]
    fn test_poll_reports_new_request_from_other_tab() {
        console::set_colors_enabled(false);
        let watcher = InMemoryStore::new();
        let submitter = watcher.open_tab();
        let mut sync = CrossTabSync::new(&watcher).unwrap();

        submitter
            .add(
                Ticket::new(RequestType::Fault, "10.0.0.1", "Ada Lovelace")
                    .with_fault("Printer", "Paper jam", None),
            )
            .unwrap();

        assert_eq!(
            poll_changes(&mut sync, &watcher).as_deref(),
            Some("New request: Printer (Ada Lovelace)\n")
        );
        assert_eq!(poll_changes(&mut sync, &watcher), None);
    }
}
