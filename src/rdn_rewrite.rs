//! Derives the attribute modifications implied by an RDN change and applies
//! them to the candidate entry, then re-validates against schema
//! (spec.md §4.4).

use crate::dn::Rdn;
use crate::entry::{Attribute, AttributeKey, Entry, EntryInvalid};
use crate::error::OperationError;
use crate::modify::{Modification, ModificationKind};
use crate::schema::SchemaHandle;
use crate::value::{AttributeType, AttributeValue};

pub struct RdnRewriteParams<'a> {
    pub current_rdn: &'a Rdn,
    pub new_rdn: &'a Rdn,
    pub delete_old_rdn: bool,
    pub is_internal: bool,
    pub is_synchronization: bool,
}

impl RdnRewriteParams<'_> {
    fn may_touch_no_user_modification(&self) -> bool {
        self.is_internal || self.is_synchronization
    }
}

/// Whether `rdn` itself names `(attribute_type, attribute_value)` as one of
/// its values, e.g. to detect an old-RDN value carried over unchanged into
/// the new RDN.
fn rdn_contains(rdn: &Rdn, attribute_type: &AttributeType, attribute_value: &AttributeValue) -> bool {
    rdn.values()
        .any(|v| &v.attribute_type == attribute_type && &v.attribute_value == attribute_value)
}

/// spec.md §4.4.1: deletes the old RDN's values from `new_entry` when
/// `delete_old_rdn` is set, recording a `DELETE` modification for each value
/// that was actually present. A value also named by the new RDN is left
/// untouched entirely - it is not removed and no modification is recorded,
/// since the addition pass will simply see it already there.
fn apply_old_rdn_deletion(
    new_entry: &mut Entry<EntryInvalid>,
    modifications: &mut Vec<Modification>,
    params: &RdnRewriteParams,
    schema: &dyn SchemaHandle,
) -> Result<(), OperationError> {
    if !params.delete_old_rdn {
        return Ok(());
    }
    for i in 0..params.current_rdn.num_values() {
        let attribute_type = params.current_rdn.attribute_type_at(i).clone();
        let attribute_value = params.current_rdn.attribute_value_at(i).clone();

        if rdn_contains(params.new_rdn, &attribute_type, &attribute_value) {
            continue;
        }

        let a = Attribute::single(attribute_type.clone(), attribute_value);

        if is_no_user_modification(schema, &attribute_type) && !params.may_touch_no_user_modification() {
            return Err(OperationError::UnwillingToPerform(format!(
                "{attribute_type} is NO-USER-MODIFICATION and cannot be removed by the old RDN"
            )));
        }

        let mut missing = Vec::new();
        let nothing_missing = new_entry.remove_attribute(&a, &mut missing);
        if nothing_missing {
            modifications.push(Modification::delete(a));
        }
        // else: the value was already absent for some other reason - no
        // modification is recorded for it.
    }
    Ok(())
}

/// spec.md §4.4.2: adds the new RDN's values to `new_entry`, recording an
/// `ADD` modification for each value that was not already present.
fn apply_new_rdn_addition(
    new_entry: &mut Entry<EntryInvalid>,
    modifications: &mut Vec<Modification>,
    params: &RdnRewriteParams,
    schema: &dyn SchemaHandle,
) -> Result<(), OperationError> {
    for i in 0..params.new_rdn.num_values() {
        let attribute_type = params.new_rdn.attribute_type_at(i).clone();
        let attribute_value = params.new_rdn.attribute_value_at(i).clone();
        let a = Attribute::single(attribute_type.clone(), attribute_value);

        let mut duplicates = Vec::new();
        let no_duplicates = new_entry.add_attribute(&a, &mut duplicates);
        if no_duplicates {
            if is_no_user_modification(schema, &attribute_type) && !params.may_touch_no_user_modification() {
                return Err(OperationError::UnwillingToPerform(format!(
                    "{attribute_type} is NO-USER-MODIFICATION and cannot be set by the new RDN"
                )));
            }
            modifications.push(Modification::add(a));
        }
    }
    Ok(())
}

fn is_no_user_modification(schema: &dyn SchemaHandle, attribute_type: &AttributeType) -> bool {
    schema
        .attribute_type_properties(attribute_type)
        .map(|p| p.no_user_modification)
        .unwrap_or(false)
}

fn is_obsolete(schema: &dyn SchemaHandle, attribute_type: &AttributeType) -> bool {
    schema
        .attribute_type_properties(attribute_type)
        .map(|p| p.obsolete)
        .unwrap_or(false)
}

/// spec.md §4.4.3: re-validates `new_entry` against schema, and separately
/// rejects any obsolete attribute type named by the new RDN. Runs only when
/// `check_schema` is set and the operation is not a synchronization
/// operation.
pub fn run_schema_gate(
    new_entry: &Entry<EntryInvalid>,
    new_rdn: &Rdn,
    schema: &dyn SchemaHandle,
    check_schema: bool,
    is_synchronization: bool,
) -> Result<(), OperationError> {
    if !check_schema || is_synchronization {
        return Ok(());
    }

    let (conforms, reason) = new_entry.conforms_to_schema(schema);
    if !conforms {
        let reason = reason.map(|r| r.to_string()).unwrap_or_default();
        return Err(OperationError::SchemaViolation(reason));
    }

    for i in 0..new_rdn.num_values() {
        let attribute_type = new_rdn.attribute_type_at(i);
        if is_obsolete(schema, attribute_type) {
            return Err(OperationError::UnwillingToPerform(format!(
                "{attribute_type} is obsolete and cannot be used in an RDN"
            )));
        }
    }
    Ok(())
}

/// The full rewrite: deletion, addition, then the schema gate.
pub fn apply(
    new_entry: &mut Entry<EntryInvalid>,
    modifications: &mut Vec<Modification>,
    params: RdnRewriteParams,
    schema: &dyn SchemaHandle,
    check_schema: bool,
) -> Result<(), OperationError> {
    apply_old_rdn_deletion(new_entry, modifications, &params, schema)?;
    apply_new_rdn_addition(new_entry, modifications, &params, schema)?;
    run_schema_gate(
        new_entry,
        params.new_rdn,
        schema,
        check_schema,
        params.is_synchronization,
    )
}

/// spec.md §4.4.4: applies the modifications a pre-operation plugin
/// appended to `modifications` beyond `start_pos`, in order, then
/// re-validates against schema.
pub fn apply_pre_op_modifications(
    new_entry: &mut Entry<EntryInvalid>,
    modifications: &[Modification],
    start_pos: usize,
    new_rdn: &Rdn,
    schema: &dyn SchemaHandle,
    check_schema: bool,
    is_synchronization: bool,
) -> Result<(), OperationError> {
    for m in &modifications[start_pos..] {
        match m.kind {
            ModificationKind::Add => {
                let mut _dups = Vec::new();
                new_entry.add_attribute(&m.attribute, &mut _dups);
            }
            ModificationKind::Delete => {
                let mut _missing = Vec::new();
                new_entry.remove_attribute(&m.attribute, &mut _missing);
            }
            ModificationKind::Replace => {
                let key = m.attribute.key();
                new_entry.remove_attribute_by_key(&key);
                let mut _dups = Vec::new();
                new_entry.add_attribute(&m.attribute, &mut _dups);
            }
            ModificationKind::Increment => {
                apply_increment(new_entry, &m.attribute)?;
            }
        }
    }
    run_schema_gate(new_entry, new_rdn, schema, check_schema, is_synchronization)
}

fn apply_increment(new_entry: &mut Entry<EntryInvalid>, increment_attr: &Attribute) -> Result<(), OperationError> {
    let key = AttributeKey::of(&increment_attr.attribute_type);
    let existing = new_entry
        .get_attribute_by_key(&key)
        .ok_or_else(|| OperationError::NoSuchAttribute(increment_attr.attribute_type.to_string()))?;

    if existing.values().len() != 1 {
        return Err(OperationError::ConstraintViolation(format!(
            "{} has {} values, INCREMENT requires exactly one",
            increment_attr.attribute_type,
            existing.values().len()
        )));
    }
    if increment_attr.values().len() != 1 {
        return Err(OperationError::ConstraintViolation(format!(
            "INCREMENT modification for {} must carry exactly one amount",
            increment_attr.attribute_type
        )));
    }

    // Correct behavior per spec.md §9's documented divergence from the
    // (buggy) reference source: the current value comes from the existing
    // attribute, the increment amount from the modification's own value.
    let current_long_value = existing.values()[0]
        .as_decimal_i64()
        .ok_or_else(|| OperationError::ConstraintViolation(format!("{} is not an integer", increment_attr.attribute_type)))?;
    let increment_amount = increment_attr.values()[0].as_decimal_i64().ok_or_else(|| {
        OperationError::ConstraintViolation(format!(
            "INCREMENT amount for {} is not an integer",
            increment_attr.attribute_type
        ))
    })?;

    let sum = current_long_value
        .checked_add(increment_amount)
        .ok_or_else(|| OperationError::ConstraintViolation(format!("{} increment overflowed i64", increment_attr.attribute_type)))?;

    new_entry.put_attribute(Attribute::single(increment_attr.attribute_type.clone(), sum));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::{Dn, Rdn};
    use crate::schema::test_impls::PermissiveSchema;
    use crate::value::AttributeValue;

    fn new_entry(dn_rdn: Rdn, attrs: Vec<(&str, &str)>) -> Entry<EntryInvalid> {
        let dn = Dn::new(vec![dn_rdn]);
        let attrs = attrs.into_iter().map(|(t, v)| Attribute::single(t, v)).collect();
        Entry::new(dn, attrs).into_invalid()
    }

    #[test]
    fn delete_old_rdn_removes_value_not_shared_with_new_rdn() {
        let mut e = new_entry(Rdn::single("cn", "alice"), vec![("cn", "alice"), ("sn", "a")]);
        let mut mods = Vec::new();
        let params = RdnRewriteParams {
            current_rdn: &Rdn::single("cn", "alice"),
            new_rdn: &Rdn::single("cn", "allie"),
            delete_old_rdn: true,
            is_internal: false,
            is_synchronization: false,
        };
        let schema = PermissiveSchema::default();
        apply(&mut e, &mut mods, params, &schema, true).unwrap();

        assert!(!e.attribute_equality(&AttributeType::new("cn"), &AttributeValue::new("alice")));
        assert!(e.attribute_equality(&AttributeType::new("cn"), &AttributeValue::new("allie")));
        assert_eq!(mods.len(), 2); // DELETE(cn=alice), ADD(cn=allie)
    }

    #[test]
    fn shared_value_between_old_and_new_rdn_produces_no_delete_modification() {
        // cn=alice+sn=a -> cn=alice+sn=b : "alice" stays, only sn changes.
        let current_rdn = Rdn::new(vec![
            crate::dn::RdnValue::new("cn", "alice"),
            crate::dn::RdnValue::new("sn", "a"),
        ]);
        let new_rdn = Rdn::new(vec![
            crate::dn::RdnValue::new("cn", "alice"),
            crate::dn::RdnValue::new("sn", "b"),
        ]);
        let mut e = new_entry(current_rdn.clone(), vec![("cn", "alice"), ("sn", "a")]);
        let mut mods = Vec::new();
        let params = RdnRewriteParams {
            current_rdn: &current_rdn,
            new_rdn: &new_rdn,
            delete_old_rdn: true,
            is_internal: false,
            is_synchronization: false,
        };
        let schema = PermissiveSchema::default();
        apply(&mut e, &mut mods, params, &schema, true).unwrap();

        // cn=alice is named by both RDNs, so the deletion pass leaves it
        // untouched entirely (no DELETE(cn=alice) is ever recorded) - only
        // a DELETE(sn=a) and an ADD(sn=b).
        assert!(e.attribute_equality(&AttributeType::new("cn"), &AttributeValue::new("alice")));
        assert!(e.attribute_equality(&AttributeType::new("sn"), &AttributeValue::new("b")));
        assert_eq!(mods.len(), 2);
    }

    #[test]
    fn delete_old_rdn_false_preserves_old_values() {
        let mut e = new_entry(Rdn::single("cn", "alice"), vec![("cn", "alice")]);
        let mut mods = Vec::new();
        let params = RdnRewriteParams {
            current_rdn: &Rdn::single("cn", "alice"),
            new_rdn: &Rdn::single("cn", "allie"),
            delete_old_rdn: false,
            is_internal: false,
            is_synchronization: false,
        };
        let schema = PermissiveSchema::default();
        apply(&mut e, &mut mods, params, &schema, true).unwrap();

        assert!(e.attribute_equality(&AttributeType::new("cn"), &AttributeValue::new("alice")));
        assert!(e.attribute_equality(&AttributeType::new("cn"), &AttributeValue::new("allie")));
        assert_eq!(mods.len(), 1); // only ADD(cn=allie)
    }

    #[test]
    fn no_user_modification_rdn_attribute_is_rejected_for_external_callers() {
        let mut e = new_entry(Rdn::single("cn", "alice"), vec![("cn", "alice")]);
        let mut mods = Vec::new();
        let params = RdnRewriteParams {
            current_rdn: &Rdn::single("cn", "alice"),
            new_rdn: &Rdn::single("entryuuid", "deadbeef"),
            delete_old_rdn: true,
            is_internal: false,
            is_synchronization: false,
        };
        let mut schema = PermissiveSchema::default();
        schema.properties.insert(
            "entryuuid".to_string(),
            crate::schema::AttributeTypeProperties {
                no_user_modification: true,
                obsolete: false,
            },
        );
        let res = apply(&mut e, &mut mods, params, &schema, true);
        assert!(matches!(res, Err(OperationError::UnwillingToPerform(_))));
    }

    #[test]
    fn obsolete_new_rdn_attribute_is_rejected() {
        let mut e = new_entry(Rdn::single("cn", "alice"), vec![("cn", "alice")]);
        let mut mods = Vec::new();
        let params = RdnRewriteParams {
            current_rdn: &Rdn::single("cn", "alice"),
            new_rdn: &Rdn::single("oldattr", "x"),
            delete_old_rdn: true,
            is_internal: false,
            is_synchronization: false,
        };
        let mut schema = PermissiveSchema::default();
        schema.properties.insert(
            "oldattr".to_string(),
            crate::schema::AttributeTypeProperties {
                no_user_modification: false,
                obsolete: true,
            },
        );
        let res = apply(&mut e, &mut mods, params, &schema, true);
        assert!(matches!(res, Err(OperationError::UnwillingToPerform(_))));
    }

    #[test]
    fn increment_sums_current_attribute_value_and_modification_amount() {
        let mut e = new_entry(Rdn::single("cn", "alice"), vec![("cn", "alice"), ("loginCount", "5")]);
        let modifications = vec![Modification::increment(Attribute::single("loginCount", 3i64))];
        apply_pre_op_modifications(
            &mut e,
            &modifications,
            0,
            &Rdn::single("cn", "alice"),
            &PermissiveSchema::default(),
            true,
            false,
        )
        .unwrap();
        let attr = e.get_attribute(&AttributeType::new("loginCount")).unwrap();
        assert_eq!(attr.values(), &[AttributeValue::new("8")]);
    }

    #[test]
    fn increment_fails_on_missing_attribute() {
        let mut e = new_entry(Rdn::single("cn", "alice"), vec![("cn", "alice")]);
        let modifications = vec![Modification::increment(Attribute::single("loginCount", 3i64))];
        let res = apply_pre_op_modifications(
            &mut e,
            &modifications,
            0,
            &Rdn::single("cn", "alice"),
            &PermissiveSchema::default(),
            true,
            false,
        );
        assert!(matches!(res, Err(OperationError::NoSuchAttribute(_))));
    }

    #[test]
    fn replace_swaps_the_full_value_set() {
        let mut e = new_entry(Rdn::single("cn", "alice"), vec![("cn", "alice"), ("sn", "old1")]);
        let modifications = vec![Modification::replace(Attribute::new(
            "sn",
            vec![AttributeValue::new("new1"), AttributeValue::new("new2")],
        ))];
        apply_pre_op_modifications(
            &mut e,
            &modifications,
            0,
            &Rdn::single("cn", "alice"),
            &PermissiveSchema::default(),
            true,
            false,
        )
        .unwrap();
        let attr = e.get_attribute(&AttributeType::new("sn")).unwrap();
        assert_eq!(
            attr.values(),
            &[AttributeValue::new("new1"), AttributeValue::new("new2")]
        );
    }
}
