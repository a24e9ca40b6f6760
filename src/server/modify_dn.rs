//! `ModifyDnStateMachine`: the top-level Modify-DN orchestrator (spec.md
//! §4.1). `QueryServerWriteTransaction::modify_dn` is the sole entry point;
//! everything else in this module is private phase plumbing.

use crate::backend::{Directory, RenameError};
use crate::config::WritabilityMode;
use crate::context::{OperationContext, OperationOutcome};
use crate::control_pipeline;
use crate::dn::{Dn, Rdn};
use crate::entry::{Entry, EntryInvalid};
use crate::error::{LdapResultCode, OperationError};
use crate::event::ModifyDnEvent;
use crate::lock::DualLockGuard;
use crate::plugins::Directive;
use crate::rdn_rewrite::{self, RdnRewriteParams};
use crate::sync::SyncDirective;

use super::QueryServerWriteTransaction;

/// Bubbles an `OperationError` out of a phase as an `OperationOutcome::Abort`,
/// the same shorthand `?` gives a `Result`-returning function.
macro_rules! try_outcome {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(err) => return OperationOutcome::from(err),
        }
    };
}

impl QueryServerWriteTransaction {
    /// Runs a Modify-DN operation to completion and returns the populated
    /// context (`result_code`, `error_message`, `matched_dn`,
    /// `response_controls`).
    pub fn modify_dn(&mut self, directory: &dyn Directory, event: ModifyDnEvent) -> OperationContext {
        let mut ctx = OperationContext::new(event);
        let mut locks: Option<DualLockGuard> = None;

        let outcome = self.run_core(&mut ctx, directory, &mut locks);

        // Phase 18: cleanup, always.
        drop(locks.take());
        self.env.synchronization_providers.run_post_operation(&mut ctx);
        ctx.latch_too_late();

        self.finalize(&mut ctx, outcome);
        ctx
    }

    /// Phases 1-17: DN resolution through commit. Returns the outcome that
    /// governs phases 18-20, run by the caller.
    fn run_core(
        &mut self,
        ctx: &mut OperationContext,
        directory: &dyn Directory,
        locks: &mut Option<DualLockGuard>,
    ) -> OperationOutcome {
        let entry_dn = ctx.event.entry_dn.clone();
        let new_rdn = ctx.event.new_rdn.clone();
        let is_internal = ctx.event.is_internal;
        let is_synchronization = ctx.event.is_synchronization;

        // --- Phase 1: resolve DNs. CP. ---
        let parent_dn = match &ctx.event.new_superior {
            Some(sup) => Some(sup.clone()),
            None => entry_dn.parent_in_suffix(),
        };
        let parent_dn = match parent_dn {
            Some(p) if !p.is_null() => p,
            _ => {
                return OperationOutcome::abort(OperationError::UnwillingToPerform(
                    "entry has no parent to rename into".to_string(),
                ))
            }
        };
        let new_dn = parent_dn.concat(new_rdn.clone());
        if ctx.poll_cancel() {
            return OperationOutcome::Cancelled;
        }

        // --- Phase 2: backend binding. ---
        let new_backend = match directory.get_backend(&new_dn) {
            Some(b) => b,
            None => return OperationOutcome::abort(OperationError::NoSuchObject),
        };
        let current_backend = match directory.get_backend(&entry_dn) {
            Some(b) => b,
            None => return OperationOutcome::abort(OperationError::NoSuchObject),
        };
        if new_backend.backend_id() != current_backend.backend_id() {
            return OperationOutcome::abort(OperationError::UnwillingToPerform(
                "cross-backend Modify-DN is not supported".to_string(),
            ));
        }

        // --- Phase 3: lock pair. ---
        match self.lock_coordinator.acquire_pair(&entry_dn, &new_dn, 3) {
            Ok(guard) => *locks = Some(guard),
            Err(_) => {
                return OperationOutcome::abort_skip_post(OperationError::ServerError(format!(
                    "failed to acquire write locks for {entry_dn} / {new_dn}"
                )))
            }
        }

        // --- Phase 4: fetch current entry. ---
        let current_entry = match current_backend.get_entry(&entry_dn) {
            Ok(e) => e.into_invalid(),
            Err(_) => return OperationOutcome::from(first_existing_ancestor(directory, &entry_dn)),
        };
        let current_rdn = entry_dn.leaf_rdn().cloned().unwrap_or_else(|| current_rdn_fallback(&current_entry));
        ctx.current_entry = Some(current_entry);

        // --- Phase 5: conflict resolution. ---
        match self.env.synchronization_providers.run_conflict_resolution(ctx) {
            Ok(SyncDirective::Continue) => {}
            Ok(SyncDirective::DoNotContinue) => {
                return OperationOutcome::StampedStop {
                    skip_post_operation: false,
                }
            }
            Err(e) => return OperationOutcome::from(e),
        }

        // --- Phase 6: control pipeline. ---
        {
            let current_entry_snapshot = ctx.current_entry.clone().expect("set in phase 4");
            try_outcome!(control_pipeline::process_request_controls(
                ctx,
                &current_entry_snapshot,
                self.env.access_control.as_ref(),
                self.env.control_codec.as_ref(),
                current_backend,
            ));
        }

        // --- Phase 7: access decision. ---
        match self.env.access_control.is_allowed(&ctx.event) {
            Ok(true) => {}
            Ok(false) => {
                return OperationOutcome::abort_skip_post(OperationError::InsufficientAccessRights(
                    "not permitted to rename this entry".to_string(),
                ))
            }
            Err(e) => return OperationOutcome::from(e),
        }

        // --- Phase 8: construct candidate. ---
        let mut new_entry = ctx
            .current_entry
            .as_ref()
            .expect("set in phase 4")
            .duplicate(false);
        new_entry.set_dn(new_dn.clone());
        new_entry.stamp_modify_timestamp();
        ctx.modifications.clear();

        let check_schema = directory.check_schema() && !is_synchronization;

        // --- Phase 9: RDN rewrite. CP. ---
        let rewrite_params = RdnRewriteParams {
            current_rdn: &current_rdn,
            new_rdn: &new_rdn,
            delete_old_rdn: ctx.event.delete_old_rdn,
            is_internal,
            is_synchronization,
        };
        try_outcome!(rdn_rewrite::apply(
            &mut new_entry,
            &mut ctx.modifications,
            rewrite_params,
            self.env.schema.as_ref(),
            check_schema,
        ));
        if ctx.poll_cancel() {
            return OperationOutcome::Cancelled;
        }

        // --- Phase 10: pre-op plugins (non-sync only). ---
        let pre_plugin_mod_count = ctx.modifications.len();
        if !is_synchronization {
            ctx.new_entry = Some(new_entry);
            let mut taken = ctx.new_entry.take().expect("just set");
            let directive = self.env.plugins.run_pre_modify_dn(ctx, &mut taken);
            new_entry = taken;
            match directive {
                Ok(Directive::Continue) => {}
                Ok(Directive::ConnectionTerminated) => return OperationOutcome::ConnectionTerminated,
                Ok(Directive::SendResponseImmediately) => {
                    ctx.new_entry = Some(new_entry);
                    return OperationOutcome::StampedStop {
                        skip_post_operation: true,
                    };
                }
                Ok(Directive::SkipCoreProcessing) => {
                    ctx.new_entry = Some(new_entry);
                    return OperationOutcome::StampedStop {
                        skip_post_operation: false,
                    };
                }
                Err(e) => return OperationOutcome::from(e),
            }
        }

        // --- Phase 11: apply pre-op modifications. CP. ---
        try_outcome!(rdn_rewrite::apply_pre_op_modifications(
            &mut new_entry,
            &ctx.modifications,
            pre_plugin_mod_count,
            &new_rdn,
            self.env.schema.as_ref(),
            check_schema,
            is_synchronization,
        ));
        if ctx.poll_cancel() {
            ctx.new_entry = Some(new_entry);
            return OperationOutcome::Cancelled;
        }

        // --- Phase 12: writability gate. ---
        if !current_backend.is_private_backend() {
            if let Err(e) = check_writability(directory.writability_mode(), is_internal, is_synchronization) {
                ctx.new_entry = Some(new_entry);
                return OperationOutcome::from(e);
            }
            if let Err(e) = check_writability(current_backend.writability_mode(), is_internal, is_synchronization) {
                ctx.new_entry = Some(new_entry);
                return OperationOutcome::from(e);
            }
        }

        // --- Phase 13: no-op short-circuit. ---
        if ctx.no_op {
            ctx.error_message = Some("no-op requested; no changes were applied".to_string());
            ctx.result_code = Some(LdapResultCode::NoOperation);
            ctx.new_entry = Some(new_entry);
            attach_read_controls(ctx);
            return OperationOutcome::Continue;
        }

        // --- Phase 14: sync pre-op. ---
        match self.env.synchronization_providers.run_pre_operation(ctx) {
            Ok(SyncDirective::Continue) => {}
            Ok(SyncDirective::DoNotContinue) => {
                ctx.new_entry = Some(new_entry);
                return OperationOutcome::StampedStop {
                    skip_post_operation: false,
                };
            }
            Err(e) => {
                ctx.new_entry = Some(new_entry);
                return OperationOutcome::from(e);
            }
        }

        // --- Phase 15: commit. ---
        let snapshot = new_entry.duplicate(false);
        let sealed = if check_schema {
            match new_entry.seal(self.env.schema.as_ref()) {
                Ok(s) => s,
                Err(e) => {
                    ctx.new_entry = Some(snapshot);
                    return OperationOutcome::from(OperationError::SchemaViolation(e.0));
                }
            }
        } else {
            new_entry.force_seal()
        };
        ctx.new_entry = Some(snapshot);

        match current_backend.rename_entry(&entry_dn, sealed, &*ctx) {
            Ok(()) => {}
            Err(RenameError::Cancelled(_)) => return OperationOutcome::Cancelled,
            Err(RenameError::Directory(e)) => return OperationOutcome::from(e),
        }

        // --- Phase 16: attach read-entry controls. ---
        attach_read_controls(ctx);

        // --- Phase 17: success if not no-op. ---
        ctx.result_code = Some(LdapResultCode::Success);

        OperationOutcome::Continue
    }

    /// Phases 19-20: post-operation dispatch, run unconditionally after
    /// cleanup (phase 18), gated by what phases 1-17 produced.
    fn finalize(&self, ctx: &mut OperationContext, outcome: OperationOutcome) {
        match outcome {
            OperationOutcome::Continue => {}
            OperationOutcome::Abort {
                error,
                skip_post_operation,
            } => {
                ctx.set_failure(error);
                ctx.skip_post_operation = ctx.skip_post_operation || skip_post_operation;
            }
            OperationOutcome::StampedStop { skip_post_operation } => {
                ctx.skip_post_operation = ctx.skip_post_operation || skip_post_operation;
            }
            OperationOutcome::Cancelled => {
                ctx.result_code = Some(LdapResultCode::Canceled);
                return;
            }
            OperationOutcome::ConnectionTerminated => {
                ctx.result_code = Some(LdapResultCode::Canceled);
                return;
            }
        }

        // --- Phase 19: post-op or post-sync plugins. ---
        if ctx.event.is_synchronization && ctx.result_code == Some(LdapResultCode::Success) {
            self.env.plugins.run_post_synchronization_modify_dn(ctx);
        } else if !ctx.skip_post_operation {
            match self.env.plugins.run_post_modify_dn(ctx) {
                Ok(Directive::ConnectionTerminated) => {
                    ctx.result_code = Some(LdapResultCode::Canceled);
                    return;
                }
                Ok(_) => {}
                Err(e) => ctx.set_failure(e),
            }
        }

        // --- Phase 20: change notification. ---
        if ctx.result_code == Some(LdapResultCode::Success) {
            if let (Some(old), Some(new)) = (ctx.current_entry.clone(), ctx.new_entry.clone()) {
                self.change_notification.dispatch(&ctx.event, &old, &new);
            }
        }
    }
}

fn check_writability(mode: WritabilityMode, is_internal: bool, is_synchronization: bool) -> Result<(), OperationError> {
    match mode {
        WritabilityMode::Enabled => Ok(()),
        WritabilityMode::Disabled => Err(OperationError::UnwillingToPerform(
            "the directory is not currently writable".to_string(),
        )),
        WritabilityMode::InternalOnly => {
            if is_internal || is_synchronization {
                Ok(())
            } else {
                Err(OperationError::UnwillingToPerform(
                    "the directory only accepts internal writes".to_string(),
                ))
            }
        }
    }
}

fn attach_read_controls(ctx: &mut OperationContext) {
    let current = ctx.current_entry.clone();
    let new = ctx.new_entry.clone();
    control_pipeline::attach_read_entry_controls(ctx, current.as_ref(), new.as_ref());
}

/// Walks `entry_dn`'s ancestors within its naming context looking for the
/// first one that actually exists, to populate `matchedDN` (spec.md §4.1
/// phase 4).
fn first_existing_ancestor(directory: &dyn Directory, entry_dn: &Dn) -> OperationError {
    let mut walk = entry_dn.parent_in_suffix();
    while let Some(candidate) = walk {
        if directory.entry_exists(&candidate) {
            return OperationError::NoSuchObjectMatched(candidate);
        }
        walk = candidate.parent_in_suffix();
    }
    OperationError::NoSuchObject
}

/// Defensive fallback for a null `entryDN` (no RDN of its own); not
/// reachable in practice since a null DN fails phase 1's parent check first,
/// but keeps `leaf_rdn()`'s `Option` honest without an `unwrap`.
fn current_rdn_fallback(current_entry: &Entry<EntryInvalid>) -> Rdn {
    current_entry
        .dn()
        .leaf_rdn()
        .cloned()
        .expect("an entry fetched by DN always has a leaf RDN")
}

/// End-to-end scenarios from spec.md §8, driven through the full
/// `QueryServerWriteTransaction::modify_dn` state machine against the mock
/// collaborators in `crate::test_support`.
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::config::DirectoryEnvironmentConfig;
    use crate::control::{oid, Control, ResponseControl};
    use crate::entry::{Attribute, EntryInit};
    use crate::event::ModifyDnEvent;
    use crate::plugins::{Plugin, PluginRegistry};
    use crate::schema::test_impls::PermissiveSchema;
    use crate::schema::AttributeTypeProperties;
    use crate::server::DirectoryEnvironment;
    use crate::sync::SynchronizationProviderRegistry;
    use crate::test_support::{AllowAllAccess, TestBackend, TestControlCodec, TestDirectory};
    use crate::value::{AttributeType, AttributeValue};

    fn rdn(pair: &str) -> Rdn {
        let (t, v) = pair.split_once('=').unwrap();
        Rdn::single(t, v)
    }

    fn dn(parts: &[&str]) -> Dn {
        Dn::new(parts.iter().map(|p| rdn(p)).collect())
    }

    fn people_entry() -> Entry<EntryInit> {
        Entry::new(
            dn(&["cn=alice", "ou=people", "dc=ex", "dc=com"]),
            vec![
                Attribute::single("cn", "alice"),
                Attribute::single("sn", "a"),
                Attribute::single("entryuuid", uuid::Uuid::new_v4()),
            ],
        )
    }

    struct Fixture {
        txn: QueryServerWriteTransaction,
        directory: TestDirectory,
    }

    fn fixture(schema: PermissiveSchema) -> Fixture {
        let env = DirectoryEnvironment {
            access_control: Arc::new(AllowAllAccess),
            schema: Arc::new(schema),
            control_codec: Arc::new(TestControlCodec),
            plugins: PluginRegistry::new(),
            synchronization_providers: SynchronizationProviderRegistry::new(),
            config: DirectoryEnvironmentConfig::default(),
        };
        let txn = QueryServerWriteTransaction::new(env);
        let directory = TestDirectory::new().with_backend(
            dn(&["dc=ex", "dc=com"]),
            TestBackend::new("primary").with_entry(people_entry()),
        );
        Fixture { txn, directory }
    }

    fn event(new_rdn: Rdn, delete_old_rdn: bool) -> ModifyDnEvent {
        ModifyDnEvent::new_internal(dn(&["cn=alice", "ou=people", "dc=ex", "dc=com"]), new_rdn, delete_old_rdn)
    }

    /// Scenario 1: simple rename, `deleteOldRDN=true`.
    #[test]
    fn scenario_1_simple_rename_deletes_old_rdn_value() {
        let f = fixture(PermissiveSchema::default());
        let mut txn = f.txn;
        let ctx = txn.modify_dn(&f.directory, event(rdn("cn=allie"), true));

        assert_eq!(ctx.result_code, Some(LdapResultCode::Success));
        let backend = f.directory.backend("primary");
        assert_eq!(backend.rename_count(), 1);
        let new_dn = dn(&["cn=allie", "ou=people", "dc=ex", "dc=com"]);
        let stored = backend.entry_at(&new_dn).expect("renamed entry is stored under its new DN");
        assert!(stored.attribute_equality(&AttributeType::new("cn"), &AttributeValue::new("allie")));
        assert!(!stored.attribute_equality(&AttributeType::new("cn"), &AttributeValue::new("alice")));
        assert!(stored.attribute_equality(&AttributeType::new("sn"), &AttributeValue::new("a")));
    }

    /// Scenario 2: rename into a different backend is rejected outright.
    #[test]
    fn scenario_2_cross_backend_rename_is_unwilling_to_perform() {
        let env = DirectoryEnvironment {
            access_control: Arc::new(AllowAllAccess),
            schema: Arc::new(PermissiveSchema::default()),
            control_codec: Arc::new(TestControlCodec),
            plugins: PluginRegistry::new(),
            synchronization_providers: SynchronizationProviderRegistry::new(),
            config: DirectoryEnvironmentConfig::default(),
        };
        let mut txn = QueryServerWriteTransaction::new(env);
        let directory = TestDirectory::new()
            .with_backend(dn(&["dc=ex", "dc=com"]), TestBackend::new("primary").with_entry(people_entry()))
            .with_backend(dn(&["dc=other", "dc=com"]), TestBackend::new("secondary"));

        let new_superior = dn(&["ou=other", "dc=other", "dc=com"]);
        let mut ev = event(rdn("cn=alice"), true);
        ev.new_superior = Some(new_superior);
        let ctx = txn.modify_dn(&directory, ev);

        assert_eq!(ctx.result_code, Some(LdapResultCode::UnwillingToPerform));
        assert_eq!(directory.backend("primary").rename_count(), 0);
        assert_eq!(directory.backend("secondary").rename_count(), 0);
    }

    /// Scenario 3: assertion control, matching and mismatching filters.
    #[test]
    fn scenario_3_assertion_control_matching_current_entry_succeeds() {
        let f = fixture(PermissiveSchema::default());
        let mut txn = f.txn;
        let mut ev = event(rdn("cn=allie"), true);
        ev.request_controls.push(Control {
            oid: oid::LDAP_ASSERTION.to_string(),
            critical: true,
            payload: b"alice".to_vec(),
        });
        let ctx = txn.modify_dn(&f.directory, ev);
        assert_eq!(ctx.result_code, Some(LdapResultCode::Success));
    }

    #[test]
    fn scenario_3_assertion_control_mismatch_fails_without_renaming() {
        let f = fixture(PermissiveSchema::default());
        let mut txn = f.txn;
        let mut ev = event(rdn("cn=allie"), true);
        ev.request_controls.push(Control {
            oid: oid::LDAP_ASSERTION.to_string(),
            critical: true,
            payload: b"carol".to_vec(),
        });
        let ctx = txn.modify_dn(&f.directory, ev);
        assert_eq!(ctx.result_code, Some(LdapResultCode::AssertionFailed));
        assert_eq!(f.directory.backend("primary").rename_count(), 0);
    }

    /// Scenario 4: the no-op control runs every check but skips the write,
    /// still attaching the would-be post-read entry.
    #[test]
    fn scenario_4_no_op_control_skips_the_write_but_attaches_post_read() {
        let f = fixture(PermissiveSchema::default());
        let mut txn = f.txn;
        let mut ev = event(rdn("cn=allie"), true);
        ev.request_controls.push(Control {
            oid: oid::LDAP_NOOP_OPENLDAP_ASSIGNED.to_string(),
            critical: false,
            payload: Vec::new(),
        });
        ev.request_controls.push(Control {
            oid: oid::LDAP_READENTRY_POSTREAD.to_string(),
            critical: false,
            payload: Vec::new(),
        });
        let ctx = txn.modify_dn(&f.directory, ev);

        assert_eq!(ctx.result_code, Some(LdapResultCode::NoOperation));
        assert_eq!(f.directory.backend("primary").rename_count(), 0);
        assert_eq!(ctx.response_controls.len(), 1);
        match &ctx.response_controls[0] {
            ResponseControl::PostRead(r) => {
                assert!(r.entry.attribute_equality(&AttributeType::new("cn"), &AttributeValue::new("allie")));
            }
            other => panic!("expected a post-read response control, got {other:?}"),
        }
    }

    /// Scenario 5: a pre-operation plugin requesting cancellation stops the
    /// operation before commit and skips post-operation plugins.
    #[test]
    fn scenario_5_cancellation_before_commit_skips_post_op_plugins_and_the_write() {
        struct CancellingPlugin {
            post_calls: Arc<AtomicUsize>,
        }
        impl Plugin for CancellingPlugin {
            fn id(&self) -> &'static str {
                "test_cancelling_plugin"
            }
            fn pre_modify_dn(
                &self,
                ctx: &mut OperationContext,
                _new_entry: &mut Entry<EntryInvalid>,
            ) -> Result<crate::plugins::Directive, OperationError> {
                ctx.cancel_handle().request_cancel();
                Ok(crate::plugins::Directive::Continue)
            }
            fn post_modify_dn(&self, _ctx: &mut OperationContext) -> Result<crate::plugins::Directive, OperationError> {
                self.post_calls.fetch_add(1, Ordering::SeqCst);
                Ok(crate::plugins::Directive::Continue)
            }
        }

        let post_calls = Arc::new(AtomicUsize::new(0));
        let mut env = DirectoryEnvironment {
            access_control: Arc::new(AllowAllAccess),
            schema: Arc::new(PermissiveSchema::default()),
            control_codec: Arc::new(TestControlCodec),
            plugins: PluginRegistry::new(),
            synchronization_providers: SynchronizationProviderRegistry::new(),
            config: DirectoryEnvironmentConfig::default(),
        };
        env.plugins.register(Box::new(CancellingPlugin {
            post_calls: post_calls.clone(),
        }));
        let mut txn = QueryServerWriteTransaction::new(env);
        let directory = TestDirectory::new()
            .with_backend(dn(&["dc=ex", "dc=com"]), TestBackend::new("primary").with_entry(people_entry()));

        let ctx = txn.modify_dn(&directory, event(rdn("cn=allie"), true));

        assert_eq!(ctx.result_code, Some(LdapResultCode::Canceled));
        assert_eq!(directory.backend("primary").rename_count(), 0);
        assert_eq!(post_calls.load(Ordering::SeqCst), 0, "post-op plugins must not run after cancellation");
    }

    /// Scenario 6: an obsolete attribute type named by the new RDN fails
    /// schema validation before any backend call.
    #[test]
    fn scenario_6_obsolete_new_rdn_attribute_is_rejected_before_commit() {
        let mut schema = PermissiveSchema::default();
        schema.properties.insert(
            "oldattr".to_string(),
            AttributeTypeProperties {
                no_user_modification: false,
                obsolete: true,
            },
        );
        let f = fixture(schema);
        let mut txn = f.txn;
        let ev = event(Rdn::single("oldattr", "x"), true);
        let ctx = txn.modify_dn(&f.directory, ev);

        assert_eq!(ctx.result_code, Some(LdapResultCode::UnwillingToPerform));
        assert!(ctx.error_message.unwrap_or_default().contains("oldattr"));
        assert_eq!(f.directory.backend("primary").rename_count(), 0);
    }
}
