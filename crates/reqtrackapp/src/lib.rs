//! # Reqtrack Architecture
//!
//! Reqtrack is a **UI-agnostic request-tracking library**. Submitters file fault,
//! material and other requests; administrators move them through a status
//! lifecycle. There is no server: every client ("tab") works on one shared local
//! storage and keeps itself consistent with the others.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (reqtrack crate)                                 │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Submission gates, filters, exports, statistics           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core                                                       │
//! │  - validation/: rules, sanitizer, XSS detector, rate limit  │
//! │  - lifecycle: ticket status transitions and history         │
//! │  - notify: in-tab change events                             │
//! │  - store/: RecordStore over a StorageBackend                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two long-running helpers sit beside the layers and talk to the store directly:
//! [`sync`] (what other tabs changed) and [`maintenance`] (auto-backup, staleness
//! checks, cleanup).
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code:
//! - Takes regular Rust function arguments
//! - Returns regular Rust types (`Result<CmdResult>`)
//! - **Never** writes to stdout/stderr (diagnostics go through `tracing`)
//! - **Never** calls `std::process::exit`
//!
//! ## Testing Strategy
//!
//! 1. **Core and commands**: unit tests next to the code over
//!    [`InMemoryStore`](store::memory::InMemoryStore), using [`fixtures`].
//! 2. **API** (`api.rs`): dispatch tests.
//! 3. **Integration** (`tests/`): real [`FsBackend`](store::fs_backend::FsBackend)
//!    directories, several handles acting as tabs.
//! 4. **CLI**: end-to-end runs of the binary.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Business operations
//! - [`validation`]: Field rules, sanitizing, XSS detection, rate limiting
//! - [`lifecycle`]: Status transitions
//! - [`notify`]: Change events inside one tab
//! - [`sync`]: Change detection across tabs
//! - [`maintenance`]: Periodic backup, sync and cleanup
//! - [`store`]: Storage abstraction and the record store
//! - [`model`]: Tickets and their value types
//! - [`config`]: Configuration management
//! - [`init`]: Opening a tracker data directory
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod init;
pub mod lifecycle;
pub mod maintenance;
pub mod model;
pub mod notify;
pub mod store;
pub mod sync;
pub mod validation;

#[cfg(any(test, feature = "test_utils"))]
pub use store::memory::fixtures;
