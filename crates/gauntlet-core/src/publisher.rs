//! Event fan-out

use crate::events::TestEvent;
use crate::observer::Observer;

/// Fans each event out to every registered observer in registration order.
///
/// The observer set is fixed before the run starts. A failing observer is
/// reported to stderr and skipped for the rest of the run; it never affects
/// delivery to the others.
#[derive(Default)]
pub struct EventPublisher {
    observers: Vec<ObserverSlot>,
    closed: bool,
}

struct ObserverSlot {
    observer: Box<dyn Observer>,
    broken: bool,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(ObserverSlot {
            observer,
            broken: false,
        });
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver `event` to every healthy observer, in registration order.
    pub fn notify_all(&mut self, event: &TestEvent) {
        for slot in &mut self.observers {
            if slot.broken {
                continue;
            }
            if let Err(e) = slot.observer.on_event(event) {
                eprintln!("output observer failed, disabling it: {e}");
                slot.broken = true;
            }
        }
    }

    /// Close every observer in registration order. Idempotent; a close
    /// failure on one observer never prevents closing the rest.
    pub fn close_all(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for slot in &mut self.observers {
            if let Err(e) = slot.observer.close() {
                eprintln!("failed to close output observer: {e}");
            }
        }
    }
}

impl Drop for EventPublisher {
    fn drop(&mut self) {
        self.close_all();
    }
}
