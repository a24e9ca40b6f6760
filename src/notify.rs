//! Change-notification dispatch (spec.md §4.1 phase 20, §4.5, §7).
//!
//! Listener exceptions are logged and suppressed, never surfaced - a
//! subscriber's bug must not turn a successful rename into a failed
//! response.

use crate::entry::{Entry, EntryInvalid};
use crate::error::OperationError;
use crate::event::ModifyDnEvent;

pub trait ChangeNotificationListener: Send + Sync {
    fn id(&self) -> &'static str;

    fn handle_modify_dn_operation(
        &self,
        event: &ModifyDnEvent,
        old_entry: &Entry<EntryInvalid>,
        new_entry: &Entry<EntryInvalid>,
    ) -> Result<(), OperationError>;
}

#[derive(Default)]
pub struct ChangeNotificationBus {
    listeners: Vec<Box<dyn ChangeNotificationListener>>,
}

impl ChangeNotificationBus {
    pub fn new() -> Self {
        ChangeNotificationBus::default()
    }

    pub fn register(&mut self, listener: Box<dyn ChangeNotificationListener>) {
        self.listeners.push(listener);
    }

    pub fn dispatch(&self, event: &ModifyDnEvent, old_entry: &Entry<EntryInvalid>, new_entry: &Entry<EntryInvalid>) {
        for listener in &self.listeners {
            if let Err(e) = listener.handle_modify_dn_operation(event, old_entry, new_entry) {
                crate::admin_warn!(listener = listener.id(), error = ?e, "change notification listener failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::{Dn, Rdn};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingListener(Arc<AtomicUsize>);
    impl ChangeNotificationListener for CountingListener {
        fn id(&self) -> &'static str {
            "counting"
        }
        fn handle_modify_dn_operation(
            &self,
            _event: &ModifyDnEvent,
            _old: &Entry<EntryInvalid>,
            _new: &Entry<EntryInvalid>,
        ) -> Result<(), OperationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingListener;
    impl ChangeNotificationListener for FailingListener {
        fn id(&self) -> &'static str {
            "failing"
        }
        fn handle_modify_dn_operation(
            &self,
            _event: &ModifyDnEvent,
            _old: &Entry<EntryInvalid>,
            _new: &Entry<EntryInvalid>,
        ) -> Result<(), OperationError> {
            Err(OperationError::ServerError("boom".to_string()))
        }
    }

    #[test]
    fn a_failing_listener_does_not_stop_dispatch_to_others() {
        let dn = Dn::new(vec![Rdn::single("cn", "a")]);
        let event = ModifyDnEvent::new_internal(dn.clone(), Rdn::single("cn", "b"), true);
        let entry = Entry::new(dn, Vec::new()).into_invalid();

        let count = Arc::new(AtomicUsize::new(0));
        let mut bus = ChangeNotificationBus::new();
        bus.register(Box::new(FailingListener));
        bus.register(Box::new(CountingListener(count.clone())));

        bus.dispatch(&event, &entry, &entry);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
