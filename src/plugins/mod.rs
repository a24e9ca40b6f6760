//! Pre/post-operation plugin dispatch (spec.md §4.5, the `ExtensionBus`
//! component).
//!
//! A `Directive` replaces the reference implementation's ambiguous pair of
//! boolean flags (`skipCoreProcessing` / `sendResponseImmediately`) with an
//! explicit enum, per the redesign spec.md §9 calls for.

pub mod protected;

use crate::context::OperationContext;
use crate::entry::{Entry, EntryInvalid};
use crate::error::OperationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Continue,
    /// The client connection is gone; abandon without a response.
    ConnectionTerminated,
    /// A result has already been stamped on the context; stop core
    /// processing and respond with it now.
    SendResponseImmediately,
    /// Stop core processing but still run post-operation plugins and send a
    /// normal response (the plugin has already mutated `ctx` as needed).
    SkipCoreProcessing,
}

pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;

    fn pre_modify_dn(
        &self,
        _ctx: &mut OperationContext,
        _new_entry: &mut Entry<EntryInvalid>,
    ) -> Result<Directive, OperationError> {
        Ok(Directive::Continue)
    }

    fn post_modify_dn(&self, _ctx: &mut OperationContext) -> Result<Directive, OperationError> {
        Ok(Directive::Continue)
    }

    /// Runs in place of `post_modify_dn` when the operation is itself a
    /// synchronization operation that committed successfully (spec.md §4.1
    /// phase 19, §4.5's `postSynchronizationModifyDN`): a distinct hook, not
    /// an alias for the ordinary post-operation one.
    fn post_synchronization_modify_dn(&self, _ctx: &mut OperationContext) -> Result<(), OperationError> {
        Ok(())
    }
}

/// An ordered collection of plugins. `ModifyDnStateMachine` takes a
/// snapshot (a `&[Box<dyn Plugin>]` slice) at the start of each dispatch
/// phase, per spec.md §5's "provider lists ... stable iteration order; the
/// core takes a snapshot at the start of each dispatch phase to avoid
/// registration races".
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn plugins(&self) -> &[Box<dyn Plugin>] {
        &self.plugins
    }

    /// Dispatches `pre_modify_dn` to every registered plugin in order,
    /// stopping at the first non-`Continue` directive (spec.md §4.1 phase
    /// 10: `connectionTerminated` / `sendResponseImmediately` /
    /// `skipCoreProcessing` all short-circuit the remaining plugins).
    pub fn run_pre_modify_dn(
        &self,
        ctx: &mut OperationContext,
        new_entry: &mut Entry<EntryInvalid>,
    ) -> Result<Directive, OperationError> {
        for plugin in &self.plugins {
            match plugin.pre_modify_dn(ctx, new_entry)? {
                Directive::Continue => {}
                other => return Ok(other),
            }
        }
        Ok(Directive::Continue)
    }

    pub fn run_post_modify_dn(&self, ctx: &mut OperationContext) -> Result<Directive, OperationError> {
        for plugin in &self.plugins {
            match plugin.post_modify_dn(ctx)? {
                Directive::Continue => {}
                other => return Ok(other),
            }
        }
        Ok(Directive::Continue)
    }

    /// Post-sync plugins run fire-and-forget: spec.md §4.1 phase 19 says
    /// only that they run when `isSynchronization && resultCode ==
    /// SUCCESS`, with no directive to act on.
    pub fn run_post_synchronization_modify_dn(&self, ctx: &mut OperationContext) {
        for plugin in &self.plugins {
            if let Err(e) = plugin.post_synchronization_modify_dn(ctx) {
                crate::admin_warn!(plugin = plugin.id(), error = ?e, "post-synchronization plugin failed");
            }
        }
    }
}
