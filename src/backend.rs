//! Storage-engine and directory-topology collaborator contracts
//! (spec.md §6). The on-disk backend itself is out of scope; this models
//! only the calls the state machine makes into it.

use crate::config::WritabilityMode;
use crate::context::OperationContext;
use crate::dn::Dn;
use crate::entry::{Entry, EntryInit, EntrySealed};
use crate::error::{CancelledOperationException, OperationError};

pub trait Backend: Send + Sync {
    /// A stable identifier for this backend, used only to tell whether two
    /// `Directory::get_backend` lookups resolved to the same backend
    /// (spec.md §4.1 phase 2 - cross-backend moves are rejected).
    fn backend_id(&self) -> &str;

    fn get_entry(&self, dn: &Dn) -> Result<Entry<EntryInit>, OperationError>;

    /// Persist the rename. The new entry's DN (`new_entry.dn()`) is the
    /// commit target; `old_dn` is supplied separately because some backends
    /// key their rename implementation off of the pre-image location.
    fn rename_entry(
        &self,
        old_dn: &Dn,
        new_entry: Entry<EntrySealed>,
        ctx: &OperationContext,
    ) -> Result<(), RenameError>;

    fn is_private_backend(&self) -> bool;

    fn writability_mode(&self) -> WritabilityMode;

    fn supports_control(&self, oid: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameError {
    Directory(OperationError),
    Cancelled(CancelledOperationException),
}

impl From<OperationError> for RenameError {
    fn from(e: OperationError) -> Self {
        RenameError::Directory(e)
    }
}

/// Directory-wide topology lookups: which backend owns a DN, whether a DN
/// exists anywhere, and the two global settings the pipeline reads.
pub trait Directory: Send + Sync {
    fn get_backend(&self, dn: &Dn) -> Option<&dyn Backend>;

    fn entry_exists(&self, dn: &Dn) -> bool;

    fn writability_mode(&self) -> WritabilityMode;

    fn check_schema(&self) -> bool;
}
