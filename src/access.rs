//! Access-control decision point contract.
//!
//! The decision logic (ACI evaluation) itself is explicitly out of scope
//! (spec.md §1 Non-goals); this models only the two calls the pipeline
//! makes into it.

use crate::control::ClientControl;
use crate::dn::Dn;
use crate::error::OperationError;
use crate::event::ModifyDnEvent;

pub trait AccessControlHandler: Send + Sync {
    /// Phase 7 (spec.md §4.1): may `event.ident` perform this rename at all?
    fn is_allowed(&self, event: &ModifyDnEvent) -> Result<bool, OperationError>;

    /// Per-control gate (spec.md §4.3.1): may `event.ident` use `control`
    /// against `entry_dn`?
    fn is_allowed_control(
        &self,
        entry_dn: &Dn,
        event: &ModifyDnEvent,
        control: &ClientControl,
    ) -> Result<bool, OperationError>;
}
