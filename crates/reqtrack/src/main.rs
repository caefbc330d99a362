//! # Reqtrack CLI Architecture
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, while this file
//! only invokes `cli::run()` and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/reqtrackapp/`: Core library with UI-agnostic business logic
//! - `crates/reqtrack/`: This CLI tool, depends on the `reqtrackapp` library
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/reqtrack/src/cli/)                       │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Dispatch, logging, watch loop (commands.rs)              │
//! │  - Terminal rendering (render.rs, styles.rs)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (crates/reqtrackapp/src/api.rs)                  │
//! │  - Dispatches to command modules                            │
//! │  - Returns structured `CmdResult` values                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (crates/reqtrackapp/src/commands/*)          │
//! │  - Submission gates, filters, exports, statistics           │
//! │  - No knowledge of stdout/stderr or process exits           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Testing Approach
//!
//! - **Library**: unit tests next to each module, integration tests over real
//!   data directories.
//! - **CLI**: parser and rendering unit tests in `src/cli/`, and end-to-end runs
//!   of the binary in `tests/` against a temporary `REQTRACK_DATA`.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
