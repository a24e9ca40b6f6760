//! `OperationContext`: the mutable per-request state a Modify-DN operation
//! accumulates as it runs (spec.md §3), plus the `OperationOutcome` sum
//! type spec.md §9 asks for in place of "a labeled block to skip to
//! cleanup".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::control::ResponseControl;
use crate::dn::Dn;
use crate::entry::{Entry, EntryInit, EntryInvalid};
use crate::error::{LdapResultCode, OperationError};
use crate::event::ModifyDnEvent;
use crate::modify::Modification;

/// Whether the caller's `cancelRequest` has had any effect on this
/// operation's outcome (spec.md §3 invariant 4, §5 "Cancellation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelResult {
    NotRequested,
    Cancelled,
    /// Latched once commit begins and permanently after cleanup: further
    /// `cancelRequest`s have no effect.
    TooLate,
}

pub struct OperationContext {
    pub event: ModifyDnEvent,

    pub current_entry: Option<Entry<EntryInvalid>>,
    pub new_entry: Option<Entry<EntryInvalid>>,
    pub modifications: Vec<Modification>,

    pub result_code: Option<LdapResultCode>,
    pub error_message: Option<String>,
    pub matched_dn: Option<Dn>,
    pub response_controls: Vec<ResponseControl>,

    /// The canonical, typed substitute for `event.request_controls` that
    /// spec.md §4.3.1 calls for ("decoded forms must be substituted back
    /// into the request-controls list so subsequent extensions see typed
    /// objects"): `ControlPipeline` appends each control's decoded form
    /// here, in request order, as it processes it. `event.request_controls`
    /// is never rewritten in place (it stays the original wire bytes for
    /// logging/replay) - every extension point that runs after the control
    /// pipeline (plugins, synchronization providers, the access decision)
    /// must read this field, not `event.request_controls`.
    pub decoded_controls: Vec<crate::control::ClientControl>,

    /// Set by `ControlPipeline` when an `LDAP_PREREAD`/`LDAP_POSTREAD`
    /// control was present, consumed at §4.3.2 once the pre/post-image
    /// entries are available.
    pub pre_read_policy: Option<crate::control::ReadEntryInclusionPolicy>,
    pub post_read_policy: Option<crate::control::ReadEntryInclusionPolicy>,

    cancel_request: Arc<AtomicBool>,
    pub cancel_result: CancelResult,

    pub proxied_authorization_dn: Option<Dn>,
    pub authorization_entry: Option<Entry<EntryInit>>,

    pub no_op: bool,
    pub skip_post_operation: bool,
}

impl OperationContext {
    pub fn new(event: ModifyDnEvent) -> Self {
        OperationContext {
            event,
            current_entry: None,
            new_entry: None,
            modifications: Vec::new(),
            result_code: None,
            error_message: None,
            matched_dn: None,
            response_controls: Vec::new(),
            decoded_controls: Vec::new(),
            pre_read_policy: None,
            post_read_policy: None,
            cancel_request: Arc::new(AtomicBool::new(false)),
            cancel_result: CancelResult::NotRequested,
            proxied_authorization_dn: None,
            authorization_entry: None,
            no_op: false,
            skip_post_operation: false,
        }
    }

    /// A cloneable handle the caller can use to request cancellation from
    /// another thread while this operation is in flight.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: self.cancel_request.clone(),
        }
    }

    /// Poll point used at every checkpoint marked **CP** in spec.md §4.1.
    /// Once `cancel_result` has latched to `TooLate` this always reports no
    /// cancellation, per invariant 4.
    pub fn poll_cancel(&mut self) -> bool {
        if self.cancel_result == CancelResult::TooLate {
            return false;
        }
        if self.cancel_request.load(Ordering::Acquire) {
            self.cancel_result = CancelResult::Cancelled;
            true
        } else {
            false
        }
    }

    /// Latches `cancel_result` to `TooLate`, per spec.md §5: "After commit
    /// begins ... and always after the cleanup block".
    pub fn latch_too_late(&mut self) {
        self.cancel_result = CancelResult::TooLate;
    }

    pub fn set_failure(&mut self, err: OperationError) {
        self.result_code = Some(err.to_result_code());
        self.error_message = Some(err.message());
        if let OperationError::NoSuchObjectMatched(dn) = &err {
            self.matched_dn = Some(dn.clone());
        }
    }
}

#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn request_cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Replaces the reference implementation's labeled-block "skip to cleanup".
/// Every phase of `ModifyDnStateMachine::process` returns one of these
/// instead of throwing a generic exception (spec.md §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Continue,
    Abort {
        error: OperationError,
        skip_post_operation: bool,
    },
    /// A collaborator (plugin directive `sendResponseImmediately` /
    /// `skipCoreProcessing`, or a synchronization provider's "do not
    /// continue") has already stamped `result_code`/`error_message` on the
    /// context itself; core processing stops without recomputing them.
    StampedStop {
        skip_post_operation: bool,
    },
    Cancelled,
    ConnectionTerminated,
}

impl OperationOutcome {
    pub fn abort(error: OperationError) -> Self {
        OperationOutcome::Abort {
            error,
            skip_post_operation: false,
        }
    }

    pub fn abort_skip_post(error: OperationError) -> Self {
        OperationOutcome::Abort {
            error,
            skip_post_operation: true,
        }
    }
}

impl From<OperationError> for OperationOutcome {
    fn from(e: OperationError) -> Self {
        OperationOutcome::abort(e)
    }
}
