//! Operation error taxonomy and its mapping onto LDAP result codes.
//!
//! Mirrors the reference architecture's own error type: a flat, cloneable,
//! serialisable enum carried as data across the operation boundary rather
//! than a `std::error::Error` chain built with `thiserror`/`anyhow`.

use serde::{Deserialize, Serialize};

use crate::dn::Dn;

/// The LDAP result codes this pipeline can produce. Bit-for-bit these are a
/// subset of RFC 4511's `resultCode` enumeration; only the values this
/// pipeline actually returns are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LdapResultCode {
    Success,
    NoSuchObject,
    UnwillingToPerform,
    InsufficientAccessRights,
    AssertionFailed,
    ProtocolError,
    UnavailableCriticalExtension,
    AuthorizationDenied,
    ObjectclassViolation,
    ConstraintViolation,
    NoSuchAttribute,
    Canceled,
    NoOperation,
    /// Catch-all for backend/internal failures the spec calls a
    /// "generic SERVER_ERROR (configured)".
    Other,
}

/// Internal failure taxonomy. Every non-success exit from the state machine
/// is represented by one of these, recorded on `OperationContext` rather
/// than thrown past the entry point (spec.md §7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationError {
    EmptyRequest,
    NoSuchObject,
    /// Carries the first existing ancestor, used to populate `matchedDN`.
    NoSuchObjectMatched(Dn),
    InvalidDnSyntax(String),
    UnwillingToPerform(String),
    InsufficientAccessRights(String),
    AssertionFailed,
    ProtocolError(String),
    UnavailableCriticalExtension(String),
    AuthorizationDenied(String),
    SchemaViolation(String),
    NoSuchAttribute(String),
    ConstraintViolation(String),
    Canceled,
    Backend(String),
    /// A plugin, synchronization provider, or change-notification listener
    /// raised an error that the dispatch loop converted into response data
    /// rather than propagating.
    ExtensionFailure(String),
    ServerError(String),
}

impl OperationError {
    pub fn to_result_code(&self) -> LdapResultCode {
        use OperationError::*;
        match self {
            EmptyRequest => LdapResultCode::ProtocolError,
            NoSuchObject | NoSuchObjectMatched(_) => LdapResultCode::NoSuchObject,
            InvalidDnSyntax(_) => LdapResultCode::ProtocolError,
            UnwillingToPerform(_) => LdapResultCode::UnwillingToPerform,
            InsufficientAccessRights(_) => LdapResultCode::InsufficientAccessRights,
            AssertionFailed => LdapResultCode::AssertionFailed,
            ProtocolError(_) => LdapResultCode::ProtocolError,
            UnavailableCriticalExtension(_) => LdapResultCode::UnavailableCriticalExtension,
            AuthorizationDenied(_) => LdapResultCode::AuthorizationDenied,
            SchemaViolation(_) => LdapResultCode::ObjectclassViolation,
            NoSuchAttribute(_) => LdapResultCode::NoSuchAttribute,
            ConstraintViolation(_) => LdapResultCode::ConstraintViolation,
            Canceled => LdapResultCode::Canceled,
            Backend(_) | ExtensionFailure(_) | ServerError(_) => LdapResultCode::Other,
        }
    }

    pub fn message(&self) -> String {
        use OperationError::*;
        match self {
            EmptyRequest => "empty request".to_string(),
            NoSuchObject => "no such object".to_string(),
            NoSuchObjectMatched(dn) => format!("no such object (matched {dn})"),
            InvalidDnSyntax(m) => m.clone(),
            UnwillingToPerform(m) => m.clone(),
            InsufficientAccessRights(m) => m.clone(),
            AssertionFailed => "assertion control evaluated to false".to_string(),
            ProtocolError(m) => m.clone(),
            UnavailableCriticalExtension(m) => m.clone(),
            AuthorizationDenied(m) => m.clone(),
            SchemaViolation(m) => m.clone(),
            NoSuchAttribute(m) => m.clone(),
            ConstraintViolation(m) => m.clone(),
            Canceled => "operation canceled".to_string(),
            Backend(m) => m.clone(),
            ExtensionFailure(m) => m.clone(),
            ServerError(m) => m.clone(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Raised by `Backend::rename_entry` when the worker's cancellation flag was
/// observed mid-commit. Kept as a distinct type (rather than a variant of
/// `OperationError`) because the state machine treats it specially: it maps
/// onto `cancelResult`/`resultCode` through `indicateCancelled`, not through
/// the generic abort path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelledOperationException;
