//! Modification records: the tagged deltas the RDN rewriter derives and
//! records, in order, as `OperationContext::modifications` (spec.md §3,
//! invariant 5).

use serde::{Deserialize, Serialize};

use crate::entry::Attribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModificationKind {
    Add,
    Delete,
    Replace,
    Increment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub kind: ModificationKind,
    pub attribute: Attribute,
}

impl Modification {
    pub fn add(attribute: Attribute) -> Self {
        Modification {
            kind: ModificationKind::Add,
            attribute,
        }
    }

    pub fn delete(attribute: Attribute) -> Self {
        Modification {
            kind: ModificationKind::Delete,
            attribute,
        }
    }

    pub fn replace(attribute: Attribute) -> Self {
        Modification {
            kind: ModificationKind::Replace,
            attribute,
        }
    }

    pub fn increment(attribute: Attribute) -> Self {
        Modification {
            kind: ModificationKind::Increment,
            attribute,
        }
    }
}
