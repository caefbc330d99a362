//! # Opening a Tracker
//!
//! A tracker instance is a data directory. Every process (CLI invocation, `watch`
//! loop) that opens the same directory behaves like another browser tab on the
//! same storage: writes by one are seen by the others through the backend's
//! change feed.
//!
//! ## Data Directory Resolution
//!
//! [`resolve_data_dir`] picks the first of:
//! 1. The explicit override (the CLI's `--data-dir`).
//! 2. The `REQTRACK_DATA` environment variable (primarily for testing).
//! 3. The OS-appropriate data directory via the `directories` crate.
//!
//! ## Startup Flow
//!
//! [`initialize`]:
//! 1. Resolve the data directory and open an [`FsBackend`] on it.
//! 2. Load [`TrackerConfig`], merging `reqtrack.toml` from the global data dir
//!    and from the instance's data dir (the latter wins).
//! 3. Build the [`RecordStore`] with the configured actor, backup retention and
//!    deleted-records cap.
//! 4. Run [`RecordStore::init`]: legacy migration, integrity check, repair.

use crate::api::ReqtrackApi;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::store::fs_backend::FsBackend;
use crate::store::{InitReport, RecordStore};
use clapfig::{Clapfig, SearchMode, SearchPath};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DATA_ENV: &str = "REQTRACK_DATA";

pub struct TrackerContext {
    pub api: ReqtrackApi<FsBackend>,
    pub config: TrackerConfig,
    pub data_dir: PathBuf,
    pub init_report: InitReport,
}

fn global_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "reqtrack", "reqtrack").map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn resolve_data_dir(data_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = data_override {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(DATA_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    global_data_dir()
        .ok_or_else(|| TrackerError::Store("Could not determine a data directory".to_string()))
}

/// Loads configuration for the tracker living in `data_dir`.
///
/// Unreadable or invalid config files fall back to the compiled defaults.
pub fn load_config(data_dir: &Path) -> TrackerConfig {
    let mut search_paths = Vec::new();
    if let Some(global) = global_data_dir() {
        if global != data_dir {
            search_paths.push(SearchPath::Path(global));
        }
    }
    search_paths.push(SearchPath::Path(data_dir.to_path_buf()));

    Clapfig::builder()
        .app_name("reqtrack")
        .file_name("reqtrack.toml")
        .search_paths(search_paths)
        .search_mode(SearchMode::Merge)
        .load()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not load configuration, using defaults");
            TrackerConfig::default()
        })
}

/// Opens the tracker, acting as `actor`.
pub fn initialize(data_override: Option<PathBuf>, actor: &str) -> Result<TrackerContext> {
    let data_dir = resolve_data_dir(data_override)?;
    let backend = FsBackend::open(&data_dir)?;
    let config = load_config(&data_dir);

    let store = RecordStore::with_backend(backend)
        .with_actor(actor)
        .with_backup_retention(config.backup_retention)
        .with_max_deleted(config.max_deleted_records);

    let init_report = store.init()?;
    tracing::debug!(data_dir = %data_dir.display(), actor, "Tracker opened");

    Ok(TrackerContext {
        api: ReqtrackApi::new(store, config.clone()),
        config,
        data_dir,
        init_report,
    })
}
