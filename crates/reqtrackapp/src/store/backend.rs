use crate::error::Result;

/// A key written by another handle onto the same storage.
///
/// Only the key is carried. Whoever reacts must re-read the value from the
/// backend rather than trust anything captured at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
}

/// Abstract interface for raw storage I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while RecordStore handles the "what" (tickets, versions, backups).
///
/// The model is a flat string key → string value map, shared by several
/// independent handles ("tabs").
pub trait StorageBackend {
    /// Read a value. Returns Ok(None) if the key was never written or was removed.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value.
    /// MUST be atomic: a reader sees either the old or the new value, never a mix.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys currently present, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Drain the keys changed by *other* handles since the last call.
    /// A handle never receives events for its own writes.
    fn take_changes(&self) -> Result<Vec<StorageEvent>>;

    /// Approximate bytes used by one key's value, 0 if absent.
    fn size_of(&self, key: &str) -> Result<usize> {
        Ok(self.get_item(key)?.map(|v| v.len()).unwrap_or(0))
    }
}
