//! A minimal filter AST, sufficient for evaluating the LDAP assertion
//! control (spec.md §4.3.1) against `currentEntry`. A full RFC 4515 filter
//! parser/evaluator is out of this crate's scope; the wire decode step is a
//! collaborator responsibility, this module only evaluates an already-typed
//! filter tree.

use crate::entry::Entry;
use crate::value::{AttributeType, AttributeValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equality(AttributeType, AttributeValue),
    Present(AttributeType),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn evaluate<S>(&self, entry: &Entry<S>) -> bool {
        match self {
            Filter::Equality(at, av) => entry.attribute_equality(at, av),
            Filter::Present(at) => entry.get_attribute(at).is_some(),
            Filter::And(fs) => fs.iter().all(|f| f.evaluate(entry)),
            Filter::Or(fs) => fs.iter().any(|f| f.evaluate(entry)),
            Filter::Not(f) => !f.evaluate(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::{Dn, Rdn};
    use crate::entry::Attribute;

    fn entry() -> Entry<crate::entry::EntryInit> {
        Entry::new(
            Dn::new(vec![Rdn::single("cn", "bob")]),
            vec![Attribute::single("cn", "bob"), Attribute::single("sn", "b")],
        )
    }

    #[test]
    fn equality_matches_case_insensitively() {
        let e = entry();
        assert!(Filter::Equality(AttributeType::new("cn"), AttributeValue::new("BOB")).evaluate(&e));
        assert!(!Filter::Equality(AttributeType::new("cn"), AttributeValue::new("carol")).evaluate(&e));
    }

    #[test]
    fn present_checks_attribute_existence() {
        let e = entry();
        assert!(Filter::Present(AttributeType::new("sn")).evaluate(&e));
        assert!(!Filter::Present(AttributeType::new("mail")).evaluate(&e));
    }

    #[test]
    fn and_or_not_compose() {
        let e = entry();
        let f = Filter::And(vec![
            Filter::Equality(AttributeType::new("cn"), AttributeValue::new("bob")),
            Filter::Not(Box::new(Filter::Present(AttributeType::new("mail")))),
        ]);
        assert!(f.evaluate(&e));
    }
}
