//! Refuses to let a Modify-DN rename move a system-protected entry.
//!
//! Generalizes the reference architecture's long-standing practice of
//! flagging certain system entries (schema, built-in accounts, built-in
//! groups) so that mutating operations refuse them outright, narrowed here
//! to the one class value this pipeline's domain cares about:
//! `system_protected`.

use crate::context::OperationContext;
use crate::entry::{Entry, EntryInvalid};
use crate::error::OperationError;
use crate::plugins::{Directive, Plugin};
use crate::value::{AttributeType, AttributeValue};

pub struct ProtectedEntryPlugin;

impl Plugin for ProtectedEntryPlugin {
    fn id(&self) -> &'static str {
        "plugin_protected_entry"
    }

    fn pre_modify_dn(
        &self,
        ctx: &mut OperationContext,
        _new_entry: &mut Entry<EntryInvalid>,
    ) -> Result<Directive, OperationError> {
        let is_protected = ctx
            .current_entry
            .as_ref()
            .map(|e| e.attribute_equality(&AttributeType::new("class"), &AttributeValue::new("system_protected")))
            .unwrap_or(false);

        if is_protected && !(ctx.event.is_internal || ctx.event.is_synchronization) {
            crate::admin_warn!(dn = %ctx.event.entry_dn, "refusing to rename a protected entry");
            return Err(OperationError::UnwillingToPerform(format!(
                "{} is a protected system entry and may not be renamed",
                ctx.event.entry_dn
            )));
        }
        Ok(Directive::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::{Dn, Rdn};
    use crate::entry::Attribute;
    use crate::event::ModifyDnEvent;

    fn ctx_with(is_protected: bool, is_internal: bool) -> OperationContext {
        let event = {
            let mut e = ModifyDnEvent::new_internal(
                Dn::new(vec![Rdn::single("cn", "admin")]),
                Rdn::single("cn", "administrator"),
                true,
            );
            e.is_internal = is_internal;
            e
        };
        let mut ctx = OperationContext::new(event);
        let mut attrs = vec![Attribute::single("cn", "admin")];
        if is_protected {
            attrs.push(Attribute::single("class", "system_protected"));
        }
        ctx.current_entry = Some(
            Entry::new(Dn::new(vec![Rdn::single("cn", "admin")]), attrs).into_invalid(),
        );
        ctx
    }

    #[test]
    fn blocks_rename_of_protected_entry_for_external_callers() {
        let mut ctx = ctx_with(true, false);
        let mut new_entry = ctx.current_entry.clone().unwrap();
        let res = ProtectedEntryPlugin.pre_modify_dn(&mut ctx, &mut new_entry);
        assert!(matches!(res, Err(OperationError::UnwillingToPerform(_))));
    }

    #[test]
    fn allows_internal_callers_to_rename_protected_entries() {
        let mut ctx = ctx_with(true, true);
        let mut new_entry = ctx.current_entry.clone().unwrap();
        let res = ProtectedEntryPlugin.pre_modify_dn(&mut ctx, &mut new_entry);
        assert_eq!(res, Ok(Directive::Continue));
    }

    #[test]
    fn allows_unprotected_entries() {
        let mut ctx = ctx_with(false, false);
        let mut new_entry = ctx.current_entry.clone().unwrap();
        let res = ProtectedEntryPlugin.pre_modify_dn(&mut ctx, &mut new_entry);
        assert_eq!(res, Ok(Directive::Continue));
    }
}
