//! Request/response controls.
//!
//! `Control` is the wire-level shape; `ClientControl` is the typed form the
//! pipeline actually dispatches on once the control pipeline has decoded a
//! request control (spec.md §4.3.1: "decoded forms must be substituted back
//! into the request-controls list so subsequent extensions see typed
//! objects").

use crate::dn::Dn;
use crate::entry::{Entry, EntryInvalid};
use crate::filter::Filter;

/// OIDs recognized by the control pipeline, reproduced bit-exact for wire
/// compatibility (spec.md §6).
pub mod oid {
    pub const LDAP_ASSERTION: &str = "1.3.6.1.1.12";
    pub const LDAP_NOOP_OPENLDAP_ASSIGNED: &str = "1.3.6.1.4.1.4203.1.10.2";
    pub const LDAP_READENTRY_PREREAD: &str = "1.3.6.1.1.13.1";
    pub const LDAP_READENTRY_POSTREAD: &str = "1.3.6.1.1.13.2";
    pub const PROXIED_AUTH_V1: &str = "2.16.840.1.113730.3.4.12";
    pub const PROXIED_AUTH_V2: &str = "2.16.840.1.113730.3.4.18";
}

/// An undecoded request or response control as received on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub oid: String,
    pub critical: bool,
    pub payload: Vec<u8>,
}

/// Which attribute groups a pre/post-read control should include in its
/// response entry (spec.md §4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadEntryInclusionPolicy {
    pub user_attributes: bool,
    pub operational_attributes: bool,
    pub object_class: bool,
}

impl ReadEntryInclusionPolicy {
    pub fn all() -> Self {
        ReadEntryInclusionPolicy {
            user_attributes: true,
            operational_attributes: true,
            object_class: true,
        }
    }
}

/// A decoded request control, after `ControlPipeline` has matched it by OID
/// and (where applicable) parsed its payload into a typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientControl {
    Assertion(Filter),
    NoOp,
    PreRead(ReadEntryInclusionPolicy),
    PostRead(ReadEntryInclusionPolicy),
    ProxiedAuthV1(Option<Dn>),
    ProxiedAuthV2(Option<Dn>),
    /// Any OID this pipeline does not itself interpret. Only the `critical`
    /// flag matters: if set and the backend does not claim support for the
    /// OID, the operation fails `UNAVAILABLE_CRITICAL_EXTENSION`.
    Unknown {
        oid: String,
        critical: bool,
        payload: Vec<u8>,
    },
}

impl ClientControl {
    pub fn oid(&self) -> &str {
        match self {
            ClientControl::Assertion(_) => oid::LDAP_ASSERTION,
            ClientControl::NoOp => oid::LDAP_NOOP_OPENLDAP_ASSIGNED,
            ClientControl::PreRead(_) => oid::LDAP_READENTRY_PREREAD,
            ClientControl::PostRead(_) => oid::LDAP_READENTRY_POSTREAD,
            ClientControl::ProxiedAuthV1(_) => oid::PROXIED_AUTH_V1,
            ClientControl::ProxiedAuthV2(_) => oid::PROXIED_AUTH_V2,
            ClientControl::Unknown { oid, .. } => oid,
        }
    }

    pub fn critical(&self) -> bool {
        match self {
            ClientControl::Unknown { critical, .. } => *critical,
            // The typed controls this pipeline understands are always
            // treated as handled regardless of the criticality bit the
            // client set: that bit only gates the *unknown*-OID path
            // (spec.md §4.3.1).
            _ => false,
        }
    }
}

/// The `LDAP_PREREAD_RESPONSE`/`LDAP_POSTREAD_RESPONSE` response control
/// payload: a filtered snapshot of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadEntryResponse {
    pub entry: Entry<EntryInvalid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseControl {
    PreRead(ReadEntryResponse),
    PostRead(ReadEntryResponse),
}
