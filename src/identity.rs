//! The caller's resolved authorization subject for one operation.

use std::collections::HashSet;

use crate::dn::Dn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    ProxiedAuth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A request generated by the server itself (e.g. a migration, an
    /// internal search), never subject to access control.
    Internal,
    /// A replication/synchronization peer.
    Synchronization,
    /// A bound client entry plus its effective privilege set.
    Entry {
        dn: Dn,
        privileges: HashSet<Privilege>,
    },
}

impl Identity {
    pub fn is_internal(&self) -> bool {
        matches!(self, Identity::Internal)
    }

    pub fn is_synchronization(&self) -> bool {
        matches!(self, Identity::Synchronization)
    }

    pub fn has_privilege(&self, privilege: Privilege) -> bool {
        match self {
            Identity::Internal => true,
            Identity::Synchronization => false,
            Identity::Entry { privileges, .. } => privileges.contains(&privilege),
        }
    }

    pub fn dn(&self) -> Option<&Dn> {
        match self {
            Identity::Entry { dn, .. } => Some(dn),
            _ => None,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Internal => write!(f, "internal"),
            Identity::Synchronization => write!(f, "synchronization"),
            Identity::Entry { dn, .. } => write!(f, "{dn}"),
        }
    }
}
