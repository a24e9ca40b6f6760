//! Thin logging macros layered over `tracing`.
//!
//! The reference architecture keeps a small vocabulary of logging macros
//! (`admin_error!`, `security_info!`, ...) in a dedicated crate so that every
//! call site reads by *audience* (an administrator debugging a deployment, a
//! security reviewer auditing access decisions, a protocol-level request
//! error) rather than by raw tracing level. That crate is not part of this
//! pipeline's dependency surface, so the same small vocabulary is
//! reimplemented here directly over `tracing`.

/// Something went wrong that an administrator needs to know about.
#[macro_export]
macro_rules! admin_error {
    ($($arg:tt)*) => {
        ::tracing::error!($($arg)*)
    };
}

/// A condition worth an administrator's attention but not fatal.
#[macro_export]
macro_rules! admin_warn {
    ($($arg:tt)*) => {
        ::tracing::warn!($($arg)*)
    };
}

/// Routine informational admin-facing event.
#[macro_export]
macro_rules! admin_info {
    ($($arg:tt)*) => {
        ::tracing::info!($($arg)*)
    };
}

/// An access-control or identity decision worth a dedicated audit trail.
#[macro_export]
macro_rules! security_info {
    ($($arg:tt)*) => {
        ::tracing::info!(security = true, $($arg)*)
    };
}

/// A denied or otherwise notable access decision.
#[macro_export]
macro_rules! security_access {
    ($($arg:tt)*) => {
        ::tracing::warn!(security = true, $($arg)*)
    };
}

/// A malformed or otherwise rejected request, independent of access control.
#[macro_export]
macro_rules! request_error {
    ($($arg:tt)*) => {
        ::tracing::warn!(request = true, $($arg)*)
    };
}

/// A control-specific decode or evaluation failure.
#[macro_export]
macro_rules! filter_error {
    ($($arg:tt)*) => {
        ::tracing::warn!(filter = true, $($arg)*)
    };
}
