//! Synchronization-provider dispatch (spec.md §4.1 phases 5/14/18, §4.5).
//!
//! Real multi-master conflict resolution is delegated to these providers
//! and is itself out of scope (spec.md §1 Non-goals); the pipeline only
//! owns calling them in the right order at the right phases.

use crate::context::OperationContext;
use crate::error::OperationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirective {
    Continue,
    /// The provider has already stamped `ctx.result_code`/`error_message`;
    /// stop dispatching further providers and, for conflict resolution,
    /// abort the operation without treating this as an error.
    DoNotContinue,
}

pub trait SynchronizationProvider: Send + Sync {
    fn id(&self) -> &'static str;

    fn handle_conflict_resolution(&self, _ctx: &mut OperationContext) -> Result<SyncDirective, OperationError> {
        Ok(SyncDirective::Continue)
    }

    fn do_pre_operation(&self, _ctx: &mut OperationContext) -> Result<SyncDirective, OperationError> {
        Ok(SyncDirective::Continue)
    }

    /// Run during cleanup, fire-and-forget with respect to the loop, but
    /// per the documented divergence in spec.md §9: a `DirectoryException`
    /// here sets response data *and* stops dispatching further providers,
    /// which can overwrite an already-successful result. This is kept
    /// deliberately (it is security-visible - a sync provider vetoing a
    /// commit after the fact must be observable).
    fn do_post_operation(&self, _ctx: &mut OperationContext) -> Result<(), OperationError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct SynchronizationProviderRegistry {
    providers: Vec<Box<dyn SynchronizationProvider>>,
}

impl SynchronizationProviderRegistry {
    pub fn new() -> Self {
        SynchronizationProviderRegistry::default()
    }

    pub fn register(&mut self, provider: Box<dyn SynchronizationProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Box<dyn SynchronizationProvider>] {
        &self.providers
    }

    pub fn run_conflict_resolution(&self, ctx: &mut OperationContext) -> Result<SyncDirective, OperationError> {
        for provider in &self.providers {
            if provider.handle_conflict_resolution(ctx)? == SyncDirective::DoNotContinue {
                return Ok(SyncDirective::DoNotContinue);
            }
        }
        Ok(SyncDirective::Continue)
    }

    pub fn run_pre_operation(&self, ctx: &mut OperationContext) -> Result<SyncDirective, OperationError> {
        for provider in &self.providers {
            if provider.do_pre_operation(ctx)? == SyncDirective::DoNotContinue {
                return Ok(SyncDirective::DoNotContinue);
            }
        }
        Ok(SyncDirective::Continue)
    }

    /// Runs every provider's post-operation hook even after one fails,
    /// matching the reference source's cleanup-block loop (spec.md §9 Open
    /// Question): the *last* error encountered, if any, is what ends up on
    /// the context, so a later provider's success does not un-clobber it,
    /// but an earlier provider's failure is never silently dropped either.
    pub fn run_post_operation(&self, ctx: &mut OperationContext) {
        for provider in &self.providers {
            if let Err(e) = provider.do_post_operation(ctx) {
                crate::admin_error!(provider = provider.id(), error = ?e, "post-operation sync provider failed");
                ctx.set_failure(e);
            }
        }
    }
}

/// A usable default: never vetoes, never stamps a result. Real conflict
/// resolution is out of scope.
pub struct PassthroughSyncProvider;

impl SynchronizationProvider for PassthroughSyncProvider {
    fn id(&self) -> &'static str {
        "sync_passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::{Dn, Rdn};
    use crate::event::ModifyDnEvent;

    fn ctx() -> OperationContext {
        OperationContext::new(ModifyDnEvent::new_internal(
            Dn::new(vec![Rdn::single("cn", "a")]),
            Rdn::single("cn", "b"),
            true,
        ))
    }

    struct FailingProvider;
    impl SynchronizationProvider for FailingProvider {
        fn id(&self) -> &'static str {
            "failing"
        }
        fn do_post_operation(&self, _ctx: &mut OperationContext) -> Result<(), OperationError> {
            Err(OperationError::Backend("disk full".to_string()))
        }
    }

    #[test]
    fn a_post_operation_failure_can_overwrite_a_prior_success() {
        let mut ctx = ctx();
        ctx.result_code = Some(crate::error::LdapResultCode::Success);
        let mut registry = SynchronizationProviderRegistry::new();
        registry.register(Box::new(FailingProvider));
        registry.run_post_operation(&mut ctx);
        assert_eq!(ctx.result_code, Some(crate::error::LdapResultCode::Other));
    }

    #[test]
    fn passthrough_never_vetoes() {
        let mut ctx = ctx();
        let mut registry = SynchronizationProviderRegistry::new();
        registry.register(Box::new(PassthroughSyncProvider));
        assert_eq!(
            registry.run_conflict_resolution(&mut ctx).unwrap(),
            SyncDirective::Continue
        );
    }
}
