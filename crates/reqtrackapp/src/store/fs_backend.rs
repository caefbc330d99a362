use super::backend::{StorageBackend, StorageEvent};
use crate::error::{Result, TrackerError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

const FILE_EXT: &str = ".json";

/// What a handle last knew about a key file.
type Signature = (SystemTime, u64);

/// One file per key in a data directory.
///
/// Several processes pointing at the same directory behave like browser tabs:
/// [`StorageBackend::take_changes`] compares each key file's (mtime, length) with
/// what this handle last observed or wrote, and reports the ones that moved.
pub struct FsBackend {
    root: PathBuf,
    seen: RefCell<HashMap<String, Signature>>,
}

impl FsBackend {
    /// Opens (creating if needed) a data directory. Keys already present count as
    /// seen, so the first poll only reports later writes.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let backend = Self {
            root: root.into(),
            seen: RefCell::new(HashMap::new()),
        };
        backend.ensure_dir(&backend.root)?;
        let current = backend.scan()?;
        *backend.seen.borrow_mut() = current;
        Ok(backend)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(TrackerError::Io)?;
        }
        Ok(())
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains("..")
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(TrackerError::Store(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root.join(format!("{}{}", key, FILE_EXT)))
    }

    fn signature(path: &Path) -> Result<Option<Signature>> {
        match fs::metadata(path) {
            Ok(meta) => {
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Ok(Some((mtime, meta.len())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TrackerError::Io(e)),
        }
    }

    fn scan(&self) -> Result<HashMap<String, Signature>> {
        let mut found = HashMap::new();
        for key in self.keys()? {
            if let Some(sig) = Self::signature(&self.key_path(&key)?)? {
                found.insert(key, sig);
            }
        }
        Ok(found)
    }
}

impl StorageBackend for FsBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TrackerError::Io(e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let target = self.key_path(key)?;
        self.ensure_dir(&self.root)?;

        // Atomic Write
        let tmp_path = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        fs::write(&tmp_path, value).map_err(TrackerError::Io)?;
        fs::rename(&tmp_path, &target).map_err(TrackerError::Io)?;

        if let Some(sig) = Self::signature(&target)? {
            self.seen.borrow_mut().insert(key.to_string(), sig);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TrackerError::Io(e)),
        }
        self.seen.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(TrackerError::Io)? {
            let path = entry.map_err(TrackerError::Io)?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                if name.starts_with('.') {
                    continue;
                }
                if let Some(key) = name.strip_suffix(FILE_EXT) {
                    keys.push(key.to_string());
                }
            }
        }
        Ok(keys)
    }

    fn take_changes(&self) -> Result<Vec<StorageEvent>> {
        let current = self.scan()?;
        let mut seen = self.seen.borrow_mut();
        let mut events = Vec::new();

        for (key, sig) in &current {
            if seen.get(key) != Some(sig) {
                events.push(StorageEvent { key: key.clone() });
            }
        }
        for key in seen.keys() {
            if !current.contains_key(key) {
                events.push(StorageEvent { key: key.clone() });
            }
        }

        *seen = current;
        events.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(events)
    }

    fn size_of(&self, key: &str) -> Result<usize> {
        Ok(Self::signature(&self.key_path(key)?)?
            .map(|(_, len)| len as usize)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();
        assert_eq!(backend.get_item("tickets").unwrap(), None);
    }

    #[test]
    fn set_get_remove() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();

        backend.set_item("data_version", "3").unwrap();
        assert_eq!(backend.get_item("data_version").unwrap().as_deref(), Some("3"));
        assert!(dir.path().join("data_version.json").exists());
        assert_eq!(backend.keys().unwrap(), vec!["data_version".to_string()]);

        backend.remove_item("data_version").unwrap();
        assert_eq!(backend.get_item("data_version").unwrap(), None);
        backend.remove_item("data_version").unwrap();
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();
        assert!(backend.set_item("../escape", "x").is_err());
        assert!(backend.set_item(".hidden", "x").is_err());
        backend.set_item("rate_limit_form_10.0.0.1", "[]").unwrap();
    }

    #[test]
    fn own_writes_are_not_reported() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).unwrap();
        backend.set_item("tickets", "[]").unwrap();
        assert!(backend.take_changes().unwrap().is_empty());
    }

    #[test]
    fn other_handle_writes_are_reported_once() {
        let dir = tempdir().unwrap();
        let first = FsBackend::open(dir.path()).unwrap();
        let second = FsBackend::open(dir.path()).unwrap();

        first.set_item("tickets", "[1]").unwrap();

        let events = second.take_changes().unwrap();
        assert_eq!(events, vec![StorageEvent { key: "tickets".into() }]);
        assert!(second.take_changes().unwrap().is_empty());

        first.remove_item("tickets").unwrap();
        assert_eq!(second.take_changes().unwrap().len(), 1);
    }

    #[test]
    fn existing_keys_are_primed_on_open() {
        let dir = tempdir().unwrap();
        FsBackend::open(dir.path())
            .unwrap()
            .set_item("tickets", "[]")
            .unwrap();

        let later = FsBackend::open(dir.path()).unwrap();
        assert!(later.take_changes().unwrap().is_empty());
    }
}
