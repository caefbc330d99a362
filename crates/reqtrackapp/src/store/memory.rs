use super::mem_backend::MemBackend;
use super::RecordStore;

pub type InMemoryStore = RecordStore<MemBackend>;

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        RecordStore::with_backend(MemBackend::new())
    }

    /// Another tab onto the same in-memory storage, with its own notifier.
    pub fn open_tab(&self) -> InMemoryStore {
        RecordStore::with_backend(self.backend.open_tab()).with_actor(self.actor())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::model::{RequestType, Ticket};

    pub fn make_store() -> InMemoryStore {
        InMemoryStore::new()
    }

    pub fn fault_ticket(ip: &str) -> Ticket {
        Ticket::new(RequestType::Fault, ip, "Ada Lovelace").with_fault(
            "Laptop",
            "Does not power on",
            None,
        )
    }

    pub fn material_ticket(ip: &str, quantity: u32) -> Ticket {
        Ticket::new(RequestType::Material, ip, "Grace Hopper").with_material(
            "Toner",
            "Black toner cartridge",
            quantity,
        )
    }

    pub fn other_ticket(ip: &str) -> Ticket {
        Ticket::new(RequestType::Other, ip, "Alan Turing")
            .with_other("Office chair", "The chair in room 12 is broken")
    }

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        /// Adds `count` tickets cycling through fault, material and other.
        pub fn with_tickets(self, count: usize, ip: &str) -> Self {
            for i in 0..count {
                let ticket = match i % 3 {
                    0 => fault_ticket(ip),
                    1 => material_ticket(ip, (i as u32 % 100) + 1),
                    _ => other_ticket(ip),
                };
                self.store.add(ticket).unwrap();
            }
            self
        }

        pub fn with_ticket(self, ticket: Ticket) -> Self {
            self.store.add(ticket).unwrap();
            self
        }

        pub fn with_deleted_ticket(self, ip: &str) -> Self {
            let added = self.store.add(fault_ticket(ip)).unwrap();
            self.store.delete(&added.id, "admin", "fixture").unwrap();
            self
        }
    }
}
