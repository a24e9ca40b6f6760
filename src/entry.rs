//! Entries and attributes.
//!
//! `Entry<S>` carries a phantom state marker so that "has this entry been
//! schema-validated since its last mutation" is a property the type system
//! tracks, mirroring the reference architecture's `Entry<VALID, STATE>`
//! pattern. Three markers are used here:
//!
//! - [`EntryInit`] - as handed back by the backend, assumed already valid.
//! - [`EntryInvalid`] - under mutation; schema conformance is not implied.
//! - [`EntrySealed`] - revalidated against schema and ready to hand to
//!   `Backend::rename_entry`.
//!
//! Only `EntryInvalid` entries expose the mutation methods; only
//! `EntryInvalid::seal` produces an `EntrySealed`.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::dn::Dn;
use crate::schema::{SchemaHandle, ValidationError};
use crate::value::{AttributeType, AttributeValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInit;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInvalid;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySealed;

/// An attribute: a type, an options set (e.g. `;lang-en`), and an ordered,
/// duplicate-free set of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_type: AttributeType,
    pub options: BTreeSet<String>,
    values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(attribute_type: impl Into<AttributeType>, values: Vec<AttributeValue>) -> Self {
        Attribute {
            attribute_type: attribute_type.into(),
            options: BTreeSet::new(),
            values,
        }
    }

    pub fn single(attribute_type: impl Into<AttributeType>, value: impl Into<AttributeValue>) -> Self {
        Attribute::new(attribute_type, vec![value.into()])
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn key(&self) -> AttributeKey {
        AttributeKey {
            attribute_type: self.attribute_type.normalized(),
            options: self.options.clone(),
        }
    }
}

/// The (type, options) identity used to locate an attribute within an
/// entry, independent of its current value set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeKey {
    attribute_type: String,
    options: BTreeSet<String>,
}

impl AttributeKey {
    pub fn of(attribute_type: &AttributeType) -> Self {
        AttributeKey {
            attribute_type: attribute_type.normalized(),
            options: BTreeSet::new(),
        }
    }
}

/// Operational attributes are those the directory maintains about an entry
/// rather than attributes of the entry's subject matter. This is a fixed,
/// small allowlist rather than a schema lookup because schema's notion of
/// "operational" is out of this crate's scope beyond what `conforms_to_schema`
/// needs.
fn is_operational(attribute_type: &AttributeType) -> bool {
    matches!(
        attribute_type.normalized().as_str(),
        "createtimestamp" | "modifytimestamp" | "creatorsname" | "modifiersname" | "entryuuid"
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<S> {
    dn: Dn,
    attrs: HashMap<AttributeKey, Attribute>,
    #[serde(skip)]
    _state: PhantomData<S>,
}

impl<S> Entry<S> {
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn get_attribute(&self, attribute_type: &AttributeType) -> Option<&Attribute> {
        self.attrs.get(&AttributeKey::of(attribute_type))
    }

    pub fn get_attribute_by_key(&self, key: &AttributeKey) -> Option<&Attribute> {
        self.attrs.get(key)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.values()
    }

    pub fn user_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs
            .values()
            .filter(|a| !is_operational(&a.attribute_type))
    }

    pub fn operational_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs
            .values()
            .filter(|a| is_operational(&a.attribute_type))
    }

    pub fn attribute_equality(&self, attribute_type: &AttributeType, value: &AttributeValue) -> bool {
        self.get_attribute(attribute_type)
            .map(|a| a.values.contains(value))
            .unwrap_or(false)
    }

    /// The entry's `entryUUID`, if present and well-formed.
    pub fn entry_uuid(&self) -> Option<uuid::Uuid> {
        self.get_attribute(&AttributeType::new("entryuuid"))?
            .values()
            .first()?
            .as_uuid()
    }

    /// Re-key into a different state marker without touching content. Used
    /// at transitions the type system can't otherwise express (e.g. "the
    /// backend handed this back, treat it as sealed").
    fn retype<T>(self) -> Entry<T> {
        Entry {
            dn: self.dn,
            attrs: self.attrs,
            _state: PhantomData,
        }
    }
}

impl Entry<EntryInit> {
    pub fn new(dn: Dn, attrs: Vec<Attribute>) -> Self {
        Entry {
            dn,
            attrs: attrs.into_iter().map(|a| (a.key(), a)).collect(),
            _state: PhantomData,
        }
    }

    /// Entries fetched from the backend are trusted to already conform to
    /// schema; this just changes which methods are available.
    pub fn into_invalid(self) -> Entry<EntryInvalid> {
        self.retype()
    }
}

impl Entry<EntryInvalid> {
    /// `duplicate(deep)`: `deep` controls nothing observable today (there is
    /// no shared interior mutability in `Attribute`/`Dn`), but is kept as a
    /// parameter to match the collaborator contract entries are cloned
    /// under (spec.md §3).
    pub fn duplicate(&self, _deep: bool) -> Entry<EntryInvalid> {
        Entry {
            dn: self.dn.clone(),
            attrs: self.attrs.clone(),
            _state: PhantomData,
        }
    }

    pub fn set_dn(&mut self, dn: Dn) {
        self.dn = dn;
    }

    /// Remove `a`'s values from the matching attribute. Values present in
    /// `a` but absent from the entry are pushed onto `out_missing_values`;
    /// this is not itself an error (spec.md §4.4.1 - the RDN value may
    /// already be absent, e.g. shared with the new RDN). Returns `true` iff
    /// nothing was missing.
    pub fn remove_attribute(&mut self, a: &Attribute, out_missing_values: &mut Vec<AttributeValue>) -> bool {
        let key = a.key();
        let mut all_present = true;
        if let Some(existing) = self.attrs.get_mut(&key) {
            for v in &a.values {
                if let Some(pos) = existing.values.iter().position(|ev| ev == v) {
                    existing.values.remove(pos);
                } else {
                    all_present = false;
                    out_missing_values.push(v.clone());
                }
            }
            if existing.values.is_empty() {
                self.attrs.remove(&key);
            }
        } else {
            all_present = false;
            out_missing_values.extend(a.values.iter().cloned());
        }
        all_present
    }

    /// Add `a`'s values to the matching attribute (creating it if absent).
    /// Values already present are pushed onto `out_duplicate_values` rather
    /// than being re-added. Returns `true` iff nothing was a duplicate.
    pub fn add_attribute(&mut self, a: &Attribute, out_duplicate_values: &mut Vec<AttributeValue>) -> bool {
        let key = a.key();
        let mut all_new = true;
        let entry = self.attrs.entry(key).or_insert_with(|| Attribute {
            attribute_type: a.attribute_type.clone(),
            options: a.options.clone(),
            values: Vec::new(),
        });
        for v in &a.values {
            if entry.values.contains(v) {
                all_new = false;
                out_duplicate_values.push(v.clone());
            } else {
                entry.values.push(v.clone());
            }
        }
        all_new
    }

    /// Unconditionally replace whatever attribute matches `a`'s type+options
    /// with `a` itself.
    pub fn put_attribute(&mut self, a: Attribute) {
        self.attrs.insert(a.key(), a);
    }

    pub fn remove_attribute_by_key(&mut self, key: &AttributeKey) -> Option<Attribute> {
        self.attrs.remove(key)
    }

    /// Stamps `modifyTimestamp` with the current time, as every directory
    /// write must (spec.md §4.1 step 8's candidate construction is the
    /// natural place for this: it runs whether or not the RDN itself
    /// actually changes).
    pub fn stamp_modify_timestamp(&mut self) {
        self.put_attribute(Attribute::single(
            "modifytimestamp",
            AttributeValue::from(time::OffsetDateTime::now_utc()),
        ));
    }

    pub fn conforms_to_schema(&self, schema: &dyn SchemaHandle) -> (bool, Option<ValidationError>) {
        match schema.validate_entry(self) {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e)),
        }
    }

    pub fn seal(self, schema: &dyn SchemaHandle) -> Result<Entry<EntrySealed>, ValidationError> {
        schema.validate_entry(&self)?;
        Ok(self.retype())
    }

    /// Transitions to `EntrySealed` without validating. Only correct when
    /// schema checking has been disabled for the whole operation (spec.md
    /// §4.1 step 12's `checkSchema` gate) - otherwise use [`Entry::seal`].
    pub fn force_seal(self) -> Entry<EntrySealed> {
        self.retype()
    }
}

impl Entry<EntrySealed> {
    pub fn into_invalid(self) -> Entry<EntryInvalid> {
        self.retype()
    }

    /// A backend persisting the result of `rename_entry` ends up holding a
    /// sealed entry; the next `get_entry` for that DN hands it back out as
    /// `EntryInit` (schema-valid, as given by the backend).
    pub fn into_init(self) -> Entry<EntryInit> {
        self.retype()
    }
}
