//! Schema gate: the collaborator contract for validating candidate entries
//! and looking up attribute-type properties. The validator implementation
//! itself is out of scope (spec.md §1); this models the contract the rest
//! of the pipeline calls through.

use crate::entry::{Entry, EntryInvalid};
use crate::value::AttributeType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static properties of an attribute type the RDN rewriter and control
/// pipeline need, independent of any particular entry's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTypeProperties {
    pub no_user_modification: bool,
    pub obsolete: bool,
}

pub trait SchemaHandle: Send + Sync {
    /// Validate an entry against the schema. On failure, the error carries
    /// a human-readable reason (`conformsToSchema(...) -> (bool, reason)`
    /// in spec.md §3).
    fn validate_entry(&self, entry: &Entry<EntryInvalid>) -> Result<(), ValidationError>;

    fn attribute_type_properties(&self, attribute_type: &AttributeType) -> Option<AttributeTypeProperties>;
}

#[cfg(test)]
pub(crate) mod test_impls {
    use super::*;
    use std::collections::HashMap;

    /// A permissive schema that accepts everything except entries carrying
    /// a sentinel "must_fail" class value, and that lets tests register
    /// per-attribute-type properties (no-user-modification / obsolete).
    pub struct PermissiveSchema {
        pub properties: HashMap<String, AttributeTypeProperties>,
    }

    impl Default for PermissiveSchema {
        fn default() -> Self {
            PermissiveSchema {
                properties: HashMap::new(),
            }
        }
    }

    impl SchemaHandle for PermissiveSchema {
        fn validate_entry(&self, entry: &Entry<EntryInvalid>) -> Result<(), ValidationError> {
            if entry.attribute_equality(
                &AttributeType::new("class"),
                &crate::value::AttributeValue::new("must_fail"),
            ) {
                return Err(ValidationError("objectClass must_fail is not permitted".to_string()));
            }
            Ok(())
        }

        fn attribute_type_properties(&self, attribute_type: &AttributeType) -> Option<AttributeTypeProperties> {
            self.properties.get(&attribute_type.normalized()).copied()
        }
    }
}
