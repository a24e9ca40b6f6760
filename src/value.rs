//! Attribute types and values.
//!
//! Stored as small, case-preserving strings (the reference architecture's
//! entry layer leans on `smartstring` throughout rather than `String` for
//! exactly this kind of short, frequently-cloned identifier) with a
//! normalized form used for every comparison. A full schema-driven
//! matching-rule engine is out of scope; normalization here is a fixed
//! ASCII lowercase fold, which is the correct equality rule for the
//! directory-string and IA5-string syntaxes this pipeline's own attribute
//! types (`cn`, `ou`, `dc`, `objectClass`, ...) actually use.

use std::fmt;

use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmolStr;

#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct AttributeType(SmolStr);

impl AttributeType {
    pub fn new(s: impl AsRef<str>) -> Self {
        AttributeType(SmolStr::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for AttributeType {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl std::hash::Hash for AttributeType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state)
    }
}

impl From<&str> for AttributeType {
    fn from(s: &str) -> Self {
        AttributeType::new(s)
    }
}

impl From<String> for AttributeType {
    fn from(s: String) -> Self {
        AttributeType::new(s)
    }
}

#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct AttributeValue(SmolStr);

impl AttributeValue {
    pub fn new(s: impl AsRef<str>) -> Self {
        AttributeValue(SmolStr::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// True if the value parses as a signed 64-bit decimal integer, as
    /// required by the INCREMENT modification (spec.md §4.4.4).
    pub fn as_decimal_i64(&self) -> Option<i64> {
        self.0.parse::<i64>().ok()
    }

    /// Parses the value as a UUID, as `entryUUID` and other identifier
    /// attributes require.
    pub fn as_uuid(&self) -> Option<uuid::Uuid> {
        uuid::Uuid::parse_str(self.0.as_str()).ok()
    }
}

impl From<uuid::Uuid> for AttributeValue {
    fn from(u: uuid::Uuid) -> Self {
        AttributeValue::new(u.to_string())
    }
}

impl From<time::OffsetDateTime> for AttributeValue {
    fn from(t: time::OffsetDateTime) -> Self {
        AttributeValue::new(t.to_string())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl std::hash::Hash for AttributeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::new(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::new(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_type_equality_is_case_insensitive() {
        assert_eq!(AttributeType::new("cn"), AttributeType::new("CN"));
        assert_ne!(AttributeType::new("cn"), AttributeType::new("sn"));
    }

    #[test]
    fn attribute_value_decimal_parsing() {
        assert_eq!(AttributeValue::new("42").as_decimal_i64(), Some(42));
        assert_eq!(AttributeValue::new("-7").as_decimal_i64(), Some(-7));
        assert_eq!(AttributeValue::new("abc").as_decimal_i64(), None);
    }
}
