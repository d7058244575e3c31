//! crates/logging/src/tracing_macros.rs
//! Convenience macros for sink-specific tracing.
//!
//! These macros wrap the standard tracing macros with the targets listed in
//! [`targets`](crate::targets). Callers must depend on `tracing` themselves.

/// Emit a bridge lifecycle trace.
///
/// # Example
/// ```ignore
/// trace_bridge!(destination = %path.display(), "bridge open");
/// ```
#[macro_export]
macro_rules! trace_bridge {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "sink::bridge", $($arg)*)
    };
}

/// Emit a consumer executor trace.
///
/// # Example
/// ```ignore
/// trace_exec!(pid = child.as_raw(), "consumer process started");
/// ```
#[macro_export]
macro_rules! trace_exec {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "sink::exec", $($arg)*)
    };
}
