//! The immutable request shape for a Modify-DN operation.

use crate::control::Control;
use crate::dn::{Dn, Rdn};
use crate::identity::Identity;

#[derive(Debug, Clone)]
pub struct ModifyDnEvent {
    pub entry_dn: Dn,
    pub new_rdn: Rdn,
    pub new_superior: Option<Dn>,
    pub delete_old_rdn: bool,
    /// The client-provided controls in their original, undecoded wire form,
    /// in request order. `ControlPipeline` decodes each of these once
    /// (spec.md §4.3.1) into `OperationContext::decoded_controls`; that
    /// field, not this one, is the typed view every extension point after
    /// the control pipeline (plugins, synchronization providers, the access
    /// decision) must read. This list is kept around verbatim only for
    /// logging/replay - it is never mutated in place.
    pub request_controls: Vec<Control>,
    pub ident: Identity,
    pub is_internal: bool,
    pub is_synchronization: bool,
}

impl ModifyDnEvent {
    pub fn new_internal(entry_dn: Dn, new_rdn: Rdn, delete_old_rdn: bool) -> Self {
        ModifyDnEvent {
            entry_dn,
            new_rdn,
            new_superior: None,
            delete_old_rdn,
            request_controls: Vec::new(),
            ident: crate::identity::Identity::Internal,
            is_internal: true,
            is_synchronization: false,
        }
    }
}
