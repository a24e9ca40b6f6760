//! The explicit dependency bundle a Modify-DN operation runs against, and
//! the write-transaction wrapper that owns the shared, long-lived pieces
//! (lock coordinator, plugin/sync registries) across many operations.
//!
//! spec.md §9: "No global mutable singletons in the core: pass the
//! `DirectoryEnvironment` ... as an explicit dependency bundle."

pub mod modify_dn;

use std::sync::Arc;

use crate::access::AccessControlHandler;
use crate::config::DirectoryEnvironmentConfig;
use crate::control_pipeline::ControlCodec;
use crate::lock::LockCoordinator;
use crate::notify::ChangeNotificationBus;
use crate::plugins::PluginRegistry;
use crate::schema::SchemaHandle;
use crate::sync::SynchronizationProviderRegistry;

/// Everything a Modify-DN operation needs beyond the request itself and the
/// backend/directory pair it is addressed to.
pub struct DirectoryEnvironment {
    pub access_control: Arc<dyn AccessControlHandler>,
    pub schema: Arc<dyn SchemaHandle>,
    pub control_codec: Arc<dyn ControlCodec>,
    pub plugins: PluginRegistry,
    pub synchronization_providers: SynchronizationProviderRegistry,
    pub config: DirectoryEnvironmentConfig,
}

/// Owns the lock coordinator (the one piece of state that must outlive any
/// single operation) and exposes `modify_dn` as the sole entry point,
/// mirroring the reference architecture's `QueryServerWriteTransaction`
/// wrapping a single logical write against the directory.
pub struct QueryServerWriteTransaction {
    pub lock_coordinator: LockCoordinator,
    pub env: DirectoryEnvironment,
    pub change_notification: ChangeNotificationBus,
}

impl QueryServerWriteTransaction {
    pub fn new(env: DirectoryEnvironment) -> Self {
        QueryServerWriteTransaction {
            lock_coordinator: LockCoordinator::new(),
            env,
            change_notification: ChangeNotificationBus::new(),
        }
    }

    pub fn with_change_notification(env: DirectoryEnvironment, change_notification: ChangeNotificationBus) -> Self {
        QueryServerWriteTransaction {
            lock_coordinator: LockCoordinator::new(),
            env,
            change_notification,
        }
    }
}
