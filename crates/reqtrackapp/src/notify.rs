//! # Change Notifier
//!
//! In-process publish/subscribe for record changes. The store publishes after every
//! successful mutation; UI collaborators (toasts, badges, sounds) subscribe.
//!
//! ## Delivery
//!
//! - Synchronous: `publish` returns after every listener ran.
//! - Ordered: listeners run in subscription order.
//! - Isolated: a panicking listener is caught and logged; the remaining listeners
//!   still run.
//!
//! Listeners may subscribe or unsubscribe from inside a callback. The listener list
//! is snapshotted at the start of each publish, so such changes apply to the next
//! event.
//!
//! ## Events
//!
//! | Name | Published by |
//! |------|--------------|
//! | `record:added` | [`RecordStore::add`](crate::store::RecordStore::add) |
//! | `record:updated` | `update`, and every status change |
//! | `record:deleted` | `delete` |
//! | `status:changed` | [`change_status`](crate::lifecycle::change_status), after `record:updated` |
//!
//! Changes made by other tabs never arrive here; see [`crate::sync`].

use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::model::{Ticket, TicketStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
    StatusChanged {
        from: TicketStatus,
        to: TicketStatus,
    },
}

impl ChangeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::Added => "record:added",
            ChangeKind::Updated => "record:updated",
            ChangeKind::Deleted => "record:deleted",
            ChangeKind::StatusChanged { .. } => "status:changed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub ticket: Ticket,
    pub timestamp: DateTime<Utc>,
}

type Listener = Rc<dyn Fn(&ChangeEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Cheap to clone; clones share one listener list.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    registry: Rc<RefCell<Registry>>,
}

/// Handle returned by [`ChangeNotifier::subscribe`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Removes the listener. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.borrow_mut();
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != self.id);
        registry.listeners.len() != before
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, Rc::new(listener)));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    /// Delivers an event to every listener. Returns how many completed without
    /// panicking.
    pub fn publish(&self, kind: ChangeKind, ticket: &Ticket) -> usize {
        let event = ChangeEvent {
            kind,
            ticket: ticket.clone(),
            timestamp: Utc::now(),
        };

        let listeners: Vec<Listener> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        let mut delivered = 0;
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        event = event.kind.name(),
                        id = %event.ticket.id,
                        %reason,
                        "Change listener panicked"
                    );
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestType;

    fn ticket() -> Ticket {
        Ticket::new(RequestType::Fault, "10.0.0.1", "Ada Lovelace")
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let notifier = ChangeNotifier::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for n in 1..=3 {
            let sink = seen.clone();
            notifier.subscribe(move |_| sink.borrow_mut().push(n));
        }

        assert_eq!(notifier.publish(ChangeKind::Added, &ticket()), 3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let notifier = ChangeNotifier::new();
        let seen = Rc::new(RefCell::new(0));

        notifier.subscribe(|_| panic!("listener failure"));
        let sink = seen.clone();
        notifier.subscribe(move |_| *sink.borrow_mut() += 1);

        assert_eq!(notifier.publish(ChangeKind::Updated, &ticket()), 1);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let notifier = ChangeNotifier::new();
        let seen = Rc::new(RefCell::new(0));
        let sink = seen.clone();
        let sub = notifier.subscribe(move |_| *sink.borrow_mut() += 1);

        notifier.publish(ChangeKind::Added, &ticket());
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        notifier.publish(ChangeKind::Added, &ticket());

        assert_eq!(*seen.borrow(), 1);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn subscribing_inside_a_listener_applies_to_next_event() {
        let notifier = ChangeNotifier::new();
        let inner_calls = Rc::new(RefCell::new(0));

        let handle = notifier.clone();
        let counter = inner_calls.clone();
        notifier.subscribe(move |_| {
            let counter = counter.clone();
            handle.subscribe(move |_| *counter.borrow_mut() += 1);
        });

        notifier.publish(ChangeKind::Added, &ticket());
        assert_eq!(*inner_calls.borrow(), 0);
        notifier.publish(ChangeKind::Added, &ticket());
        assert_eq!(*inner_calls.borrow(), 1);
    }

    #[test]
    fn event_names() {
        assert_eq!(ChangeKind::Deleted.name(), "record:deleted");
        let kind = ChangeKind::StatusChanged {
            from: TicketStatus::PendingApproval,
            to: TicketStatus::Approved,
        };
        assert_eq!(kind.name(), "status:changed");
    }
}
