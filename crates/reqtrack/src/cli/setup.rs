use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use reqtrackapp::model::{Priority, RequestType, TicketStatus};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Styled terminal output
    #[default]
    Term,
    /// The full command result as JSON
    Json,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Tsv,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "reqtrack",
    bin_name = "reqtrack",
    version,
    disable_help_subcommand = true,
    after_help = "Data lives in $REQTRACK_DATA, or the OS data directory when unset."
)]
#[command(about = "Track fault, material and other requests from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory to use instead of $REQTRACK_DATA
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Name recorded as the author of changes
    #[arg(long, global = true, default_value = "system", help_heading = "Options")]
    pub actor: String,

    /// Output mode
    #[arg(long, global = true, value_enum, default_value_t, help_heading = "Options")]
    pub output: OutputMode,

    /// Verbose logging on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count, help_heading = "Options")]
    pub verbose: u8,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

fn parse_type(s: &str) -> Result<RequestType, String> {
    s.parse().map_err(|e: reqtrackapp::error::TrackerError| e.to_string())
}

fn parse_status(s: &str) -> Result<TicketStatus, String> {
    s.parse().map_err(|e: reqtrackapp::error::TrackerError| e.to_string())
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse().map_err(|e: reqtrackapp::error::TrackerError| e.to_string())
}

/// `name=value`, split on the first `=`.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Core(CoreCommands),

    #[command(flatten)]
    Ticket(TicketCommands),

    #[command(flatten)]
    Data(DataCommands),

    #[command(flatten)]
    Misc(MiscCommands),
}

#[derive(Subcommand, Debug)]
pub enum CoreCommands {
    /// Submit a new request
    #[command(alias = "new", display_order = 1)]
    Submit {
        #[command(subcommand)]
        form: SubmitCommands,
    },

    /// List tickets, newest first
    #[command(alias = "ls", display_order = 2)]
    List {
        /// Only this request type (fault, material, other)
        #[arg(long = "type", value_parser = parse_type)]
        request_type: Option<RequestType>,

        /// Only this status (e.g. pending, approved, completed)
        #[arg(long, value_parser = parse_status)]
        status: Option<TicketStatus>,

        /// Only tickets from this address
        #[arg(long)]
        ip: Option<String>,

        /// Search subject, description and submitter name
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one or more tickets in full
    #[command(alias = "v", display_order = 3)]
    Show {
        /// Ticket ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
}

/// Fields shared by every request form.
#[derive(clap::Args, Debug)]
pub struct SubmitterArgs {
    /// Submitter IPv4 address
    #[arg(long)]
    pub ip: Option<String>,

    /// Submitter full name
    #[arg(long)]
    pub name: Option<String>,

    /// Priority (low, normal, high, urgent)
    #[arg(long, value_parser = parse_priority, default_value = "normal")]
    pub priority: Priority,
}

#[derive(Subcommand, Debug)]
pub enum SubmitCommands {
    /// Report a broken device
    Fault {
        #[command(flatten)]
        submitter: SubmitterArgs,

        /// Device name
        #[arg(long)]
        device: Option<String>,

        /// What is wrong
        #[arg(long)]
        description: Option<String>,

        /// Suggested fix
        #[arg(long)]
        solution: Option<String>,
    },

    /// Ask for supplies
    Material {
        #[command(flatten)]
        submitter: SubmitterArgs,

        /// Material kind
        #[arg(long = "material-type")]
        material_type: Option<String>,

        /// What is needed
        #[arg(long)]
        description: Option<String>,

        /// How many (1 to 100)
        #[arg(long)]
        quantity: Option<String>,
    },

    /// Anything else
    Other {
        #[command(flatten)]
        submitter: SubmitterArgs,

        /// Short title
        #[arg(long)]
        title: Option<String>,

        /// Details
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TicketCommands {
    /// Move a ticket to another status
    #[command(display_order = 10)]
    Status {
        /// Ticket id
        id: String,

        /// New status (approved, forwarded, processing, completed, pending)
        #[arg(value_parser = parse_status)]
        status: TicketStatus,

        /// Note recorded in the history
        #[arg(long)]
        note: Option<String>,
    },

    /// Edit ticket fields
    #[command(alias = "e", display_order = 11)]
    Update {
        /// Ticket id
        id: String,

        /// Change the request type
        #[arg(long = "type", value_parser = parse_type)]
        request_type: Option<RequestType>,

        /// Change the priority
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,

        /// Field assignment, e.g. --set deviceName=Printer (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },

    /// Move tickets to the deleted table
    #[command(alias = "rm", display_order = 12)]
    Delete {
        /// Ticket ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// List deleted tickets
    #[command(display_order = 13)]
    Deleted,
}

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Write a dated backup of the collection
    #[command(display_order = 20)]
    Backup,

    /// Replace the collection with the backup slot
    #[command(display_order = 21)]
    Restore,

    /// Migrate legacy tickets and repair inconsistencies
    #[command(display_order = 22)]
    Doctor,

    /// Export tickets as a table
    #[command(display_order = 23)]
    Export {
        /// Only this request type
        #[arg(long = "type", value_parser = parse_type)]
        request_type: Option<RequestType>,

        /// Append deleted tickets
        #[arg(long)]
        include_deleted: bool,

        /// Table format
        #[arg(long, value_enum, default_value_t)]
        format: ExportFormat,

        /// Write to this file instead of stdout
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Submitter counts with --ip, storage statistics without
    #[command(display_order = 24)]
    Stats {
        /// Submitter address
        #[arg(long)]
        ip: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum MiscCommands {
    /// Follow changes from other clients and run periodic maintenance
    #[command(display_order = 30)]
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 2)]
        interval: u64,

        /// Stop after this many polls
        #[arg(long)]
        iterations: Option<u64>,
    },
}
