//! # CLI Behavior
//!
//! This is **one possible UI client** for reqtrack, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes, and output formatting.
//!
//! For the overall architecture, see the crate-level documentation in [`crate`].
//!
//! ## Naked Execution (`reqtrack`)
//!
//! Running `reqtrack` with no arguments defaults to `reqtrack list`.
//!
//! ## Every Invocation Is a Tab
//!
//! Each run opens the data directory the way a browser tab opens local storage:
//! legacy tickets are migrated and inconsistencies repaired before the command
//! runs. `reqtrack watch` is the long-lived tab. It reports what other
//! invocations changed and runs the periodic backup, sync and cleanup jobs.
//!
//! ## Acting User
//!
//! `--actor` names who makes a change. It lands in `modifiedBy`, `deletedBy` and
//! the status history. Submissions default to `system`.
//!
//! ## Output
//!
//! Styled text by default. `--output json` prints the whole command result,
//! for scripts.
//!
//! ## Module Structure
//!
//! - `commands`: Dispatch, logging setup and the watch loop
//! - `render`: Output formatting (lists, full tickets, statistics)
//! - `setup`: Argument parsing via clap, help text
//! - `styles`: Terminal styling constants

mod commands;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
