//! Distinguished Names and Relative Distinguished Names.
//!
//! `Dn` is stored leaf-first: `rdns[0]` is the entry's own RDN, the last
//! element is the suffix. That makes `parentInSuffix()` a cheap "drop the
//! first element" and `concat` a cheap "push to the front", at the cost of
//! reading a bit unusually against the conventional root-first string form
//! (`cn=alice,ou=people,dc=example,dc=com`) when rendered with `Display`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{AttributeType, AttributeValue};

/// A single (AttributeType, AttributeValue) pair within an RDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdnValue {
    pub attribute_type: AttributeType,
    pub attribute_value: AttributeValue,
}

impl RdnValue {
    pub fn new(attribute_type: impl Into<AttributeType>, attribute_value: impl Into<AttributeValue>) -> Self {
        RdnValue {
            attribute_type: attribute_type.into(),
            attribute_value: attribute_value.into(),
        }
    }
}

impl fmt::Display for RdnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute_type, self.attribute_value)
    }
}

/// A non-empty, ordered sequence of (AttributeType, AttributeValue) pairs
/// (a multi-valued RDN such as `cn=alice+uid=1234`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rdn(Vec<RdnValue>);

impl Rdn {
    /// Panics on an empty slice: an RDN is non-empty by definition
    /// (spec.md §3).
    pub fn new(values: Vec<RdnValue>) -> Self {
        assert!(!values.is_empty(), "an RDN must have at least one value");
        Rdn(values)
    }

    pub fn single(attribute_type: impl Into<AttributeType>, attribute_value: impl Into<AttributeValue>) -> Self {
        Rdn(vec![RdnValue::new(attribute_type, attribute_value)])
    }

    pub fn num_values(&self) -> usize {
        self.0.len()
    }

    pub fn attribute_type_at(&self, i: usize) -> &AttributeType {
        &self.0[i].attribute_type
    }

    pub fn attribute_value_at(&self, i: usize) -> &AttributeValue {
        &self.0[i].attribute_value
    }

    pub fn values(&self) -> impl Iterator<Item = &RdnValue> {
        self.0.iter()
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join("+"))
    }
}

/// An ordered, leaf-first sequence of RDNs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dn(Vec<Rdn>);

impl Dn {
    pub fn new(rdns: Vec<Rdn>) -> Self {
        Dn(rdns)
    }

    /// The null DN (zero RDNs) - the root of the DIT, never a valid suffix
    /// root for a naming context.
    pub fn null() -> Self {
        Dn(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn leaf_rdn(&self) -> Option<&Rdn> {
        self.0.first()
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.0
    }

    /// The parent DN within the same naming context, or `None` at (or past)
    /// the suffix root.
    pub fn parent_in_suffix(&self) -> Option<Dn> {
        if self.0.len() <= 1 {
            None
        } else {
            Some(Dn(self.0[1..].to_vec()))
        }
    }

    /// Append `rdn` as the new leaf, returning the resulting child DN.
    pub fn concat(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.0.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.0.iter().cloned());
        Dn(rdns)
    }

    pub fn normalized(&self) -> String {
        self.0
            .iter()
            .map(|r| r.to_string().to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `true` if `other` is this DN or an ancestor of it within the same
    /// naming context.
    pub fn is_ancestor_of_or_equal(&self, other: &Dn) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        let offset = other.0.len() - self.0.len();
        self.0 == other.0[offset..]
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
