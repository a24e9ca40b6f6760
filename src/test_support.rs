//! Shared mock collaborators for scenario-level tests of
//! `QueryServerWriteTransaction::modify_dn` (spec.md §8). Only compiled
//! under `#[cfg(test)]`; nothing here is part of the crate's public API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::access::AccessControlHandler;
use crate::backend::{Backend, Directory, RenameError};
use crate::config::WritabilityMode;
use crate::context::OperationContext;
use crate::control::ClientControl;
use crate::control_pipeline::ControlCodec;
use crate::dn::Dn;
use crate::entry::{Entry, EntryInit, EntrySealed};
use crate::error::OperationError;
use crate::event::ModifyDnEvent;
use crate::filter::Filter;
use crate::value::{AttributeType, AttributeValue};

/// A single-naming-context in-memory backend. Tracks how many times
/// `rename_entry` was called so tests can assert P2 (no rename on failure).
pub struct TestBackend {
    id: &'static str,
    entries: Mutex<HashMap<String, Entry<EntryInit>>>,
    writability: WritabilityMode,
    private: bool,
    supported_controls: Vec<&'static str>,
    rename_calls: AtomicUsize,
}

impl TestBackend {
    pub fn new(id: &'static str) -> Self {
        TestBackend {
            id,
            entries: Mutex::new(HashMap::new()),
            writability: WritabilityMode::Enabled,
            private: false,
            supported_controls: Vec::new(),
            rename_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_entry(self, entry: Entry<EntryInit>) -> Self {
        self.entries
            .lock()
            .expect("not poisoned")
            .insert(entry.dn().normalized(), entry);
        self
    }

    pub fn rename_count(&self) -> usize {
        self.rename_calls.load(Ordering::SeqCst)
    }

    pub fn entry_at(&self, dn: &Dn) -> Option<Entry<EntryInit>> {
        self.entries.lock().expect("not poisoned").get(&dn.normalized()).cloned()
    }
}

impl Backend for TestBackend {
    fn backend_id(&self) -> &str {
        self.id
    }

    fn get_entry(&self, dn: &Dn) -> Result<Entry<EntryInit>, OperationError> {
        self.entries
            .lock()
            .expect("not poisoned")
            .get(&dn.normalized())
            .cloned()
            .ok_or(OperationError::NoSuchObject)
    }

    fn rename_entry(&self, old_dn: &Dn, new_entry: Entry<EntrySealed>, _ctx: &OperationContext) -> Result<(), RenameError> {
        self.rename_calls.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.lock().expect("not poisoned");
        entries.remove(&old_dn.normalized());
        let new_entry = new_entry.into_init();
        entries.insert(new_entry.dn().normalized(), new_entry);
        Ok(())
    }

    fn is_private_backend(&self) -> bool {
        self.private
    }

    fn writability_mode(&self) -> WritabilityMode {
        self.writability
    }

    fn supports_control(&self, oid: &str) -> bool {
        self.supported_controls.contains(&oid)
    }
}

/// Routes DNs to backends by suffix, and carries the two directory-wide
/// settings the pipeline reads (spec.md §6).
pub struct TestDirectory {
    backends: Vec<(Dn, TestBackend)>,
    writability_mode: WritabilityMode,
    check_schema: bool,
}

impl TestDirectory {
    pub fn new() -> Self {
        TestDirectory {
            backends: Vec::new(),
            writability_mode: WritabilityMode::Enabled,
            check_schema: true,
        }
    }

    pub fn with_backend(mut self, suffix: Dn, backend: TestBackend) -> Self {
        self.backends.push((suffix, backend));
        self
    }

    pub fn with_writability_mode(mut self, mode: WritabilityMode) -> Self {
        self.writability_mode = mode;
        self
    }

    pub fn with_check_schema(mut self, check_schema: bool) -> Self {
        self.check_schema = check_schema;
        self
    }

    pub fn backend(&self, id: &str) -> &TestBackend {
        self.backends
            .iter()
            .map(|(_, b)| b)
            .find(|b| b.backend_id() == id)
            .expect("backend registered under this id")
    }
}

impl Directory for TestDirectory {
    fn get_backend(&self, dn: &Dn) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|(suffix, _)| suffix.is_ancestor_of_or_equal(dn))
            .map(|(_, b)| b as &dyn Backend)
    }

    fn entry_exists(&self, dn: &Dn) -> bool {
        self.get_backend(dn).map(|b| b.get_entry(dn).is_ok()).unwrap_or(false)
    }

    fn writability_mode(&self) -> WritabilityMode {
        self.writability_mode
    }

    fn check_schema(&self) -> bool {
        self.check_schema
    }
}

/// Grants every access-control decision the pipeline asks for.
pub struct AllowAllAccess;

impl AccessControlHandler for AllowAllAccess {
    fn is_allowed(&self, _event: &ModifyDnEvent) -> Result<bool, OperationError> {
        Ok(true)
    }

    fn is_allowed_control(&self, _entry_dn: &Dn, _event: &ModifyDnEvent, _control: &ClientControl) -> Result<bool, OperationError> {
        Ok(true)
    }
}

/// Decodes an assertion payload as a UTF-8 `cn=<value>` equality filter and
/// everything else as a no-op pass-through; sufficient for the control
/// pipeline tests driven through the full state machine.
pub struct TestControlCodec;

impl ControlCodec for TestControlCodec {
    fn decode_assertion_filter(&self, payload: &[u8]) -> Result<Filter, OperationError> {
        let s = std::str::from_utf8(payload).map_err(|_| OperationError::ProtocolError("non-UTF8 assertion payload".to_string()))?;
        Ok(Filter::Equality(AttributeType::new("cn"), AttributeValue::new(s)))
    }

    fn decode_read_entry_inclusion_policy(&self, _payload: &[u8]) -> Result<crate::control::ReadEntryInclusionPolicy, OperationError> {
        Ok(crate::control::ReadEntryInclusionPolicy::all())
    }

    fn decode_proxied_authorization_dn(&self, _payload: &[u8]) -> Result<Option<Dn>, OperationError> {
        Ok(None)
    }
}
