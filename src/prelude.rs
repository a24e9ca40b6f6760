//! Convenience re-exports for host crates driving a Modify-DN operation end
//! to end: the event/context/error types plus the server entry point, so a
//! caller usually only needs `use moddn_core::prelude::*;`.

pub use crate::backend::{Backend, Directory, RenameError};
pub use crate::context::{CancelHandle, OperationContext};
pub use crate::dn::{Dn, Rdn, RdnValue};
pub use crate::entry::{Attribute, Entry, EntryInit, EntryInvalid, EntrySealed};
pub use crate::error::{CancelledOperationException, LdapResultCode, OperationError};
pub use crate::event::ModifyDnEvent;
pub use crate::identity::{Identity, Privilege};
pub use crate::server::{DirectoryEnvironment, QueryServerWriteTransaction};
pub use crate::value::{AttributeType, AttributeValue};
