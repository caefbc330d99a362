use super::backend::{StorageBackend, StorageEvent};
use crate::error::{Result, TrackerError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
struct Shared {
    items: HashMap<String, String>,
    queues: HashMap<u64, Vec<StorageEvent>>,
    next_tab: u64,
    simulate_write_error: bool,
    failing_key: Option<String>,
    quota_bytes: Option<usize>,
}

impl Shared {
    fn register_tab(&mut self) -> u64 {
        let tab = self.next_tab;
        self.next_tab += 1;
        self.queues.insert(tab, Vec::new());
        tab
    }

    fn broadcast(&mut self, from: u64, key: &str) {
        for (tab, queue) in self.queues.iter_mut() {
            if *tab != from {
                queue.push(StorageEvent {
                    key: key.to_string(),
                });
            }
        }
    }

    fn used_bytes_with(&self, key: &str, value: &str) -> usize {
        let others: usize = self
            .items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        others + key.len() + value.len()
    }
}

/// In-memory storage backend.
///
/// Uses `RefCell` for interior mutability since the tracker is single-threaded.
/// Several handles ("tabs") can share one map through [`MemBackend::open_tab`];
/// each receives [`StorageEvent`]s for the writes of the others.
pub struct MemBackend {
    shared: Rc<RefCell<Shared>>,
    tab: u64,
}

impl Default for MemBackend {
    fn default() -> Self {
        let mut shared = Shared::default();
        let tab = shared.register_tab();
        Self {
            shared: Rc::new(RefCell::new(shared)),
            tab,
        }
    }
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A second handle onto the same storage.
    pub fn open_tab(&self) -> MemBackend {
        let tab = self.shared.borrow_mut().register_tab();
        MemBackend {
            shared: self.shared.clone(),
            tab,
        }
    }

    /// Enable write error simulation for testing error handling.
    /// Applies to every tab sharing this storage.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.shared.borrow_mut().simulate_write_error = simulate;
    }

    /// Fail writes to one key only, leaving the others working.
    pub fn set_failing_key(&self, key: Option<&str>) {
        self.shared.borrow_mut().failing_key = key.map(str::to_string);
    }

    /// Total bytes (keys plus values) the storage may hold.
    pub fn set_quota(&self, bytes: Option<usize>) {
        self.shared.borrow_mut().quota_bytes = bytes;
    }
}

impl Drop for MemBackend {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.try_borrow_mut() {
            shared.queues.remove(&self.tab);
        }
    }
}

impl StorageBackend for MemBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.shared.borrow().items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.simulate_write_error || shared.failing_key.as_deref() == Some(key) {
            return Err(TrackerError::Store("Simulated write error".to_string()));
        }
        if let Some(quota) = shared.quota_bytes {
            if shared.used_bytes_with(key, value) > quota {
                return Err(TrackerError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        shared.items.insert(key.to_string(), value.to_string());
        shared.broadcast(self.tab, key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.simulate_write_error {
            return Err(TrackerError::Store("Simulated write error".to_string()));
        }
        if shared.items.remove(key).is_some() {
            shared.broadcast(self.tab, key);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.shared.borrow().items.keys().cloned().collect())
    }

    fn take_changes(&self) -> Result<Vec<StorageEvent>> {
        let mut shared = self.shared.borrow_mut();
        Ok(shared
            .queues
            .get_mut(&self.tab)
            .map(std::mem::take)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_broadcast_to_other_tabs_only() {
        let first = MemBackend::new();
        let second = first.open_tab();

        first.set_item("tickets", "[]").unwrap();

        assert!(first.take_changes().unwrap().is_empty());
        assert_eq!(
            second.take_changes().unwrap(),
            vec![StorageEvent {
                key: "tickets".into()
            }]
        );
        assert!(second.take_changes().unwrap().is_empty());
        assert_eq!(second.get_item("tickets").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn removing_missing_key_is_silent() {
        let first = MemBackend::new();
        let second = first.open_tab();
        first.remove_item("nothing").unwrap();
        assert!(second.take_changes().unwrap().is_empty());
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let backend = MemBackend::new();
        backend.set_quota(Some(20));
        backend.set_item("k", "small").unwrap();

        let err = backend.set_item("k", &"x".repeat(50)).unwrap_err();
        assert!(matches!(err, TrackerError::QuotaExceeded { .. }));
        assert_eq!(backend.get_item("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn simulated_write_error_leaves_value() {
        let backend = MemBackend::new();
        backend.set_item("k", "v").unwrap();
        backend.set_simulate_write_error(true);
        assert!(backend.set_item("k", "w").is_err());
        assert_eq!(backend.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn failing_key_only_affects_that_key() {
        let backend = MemBackend::new();
        backend.set_failing_key(Some("data_version"));
        assert!(backend.set_item("data_version", "1").is_err());
        backend.set_item("tickets", "[]").unwrap();
    }

    #[test]
    fn closed_tab_stops_receiving() {
        let first = MemBackend::new();
        let second = first.open_tab();
        drop(second);
        first.set_item("k", "v").unwrap();
        assert_eq!(first.shared.borrow().queues.len(), 1);
    }
}
