//! Logging infrastructure for cellfilter.
//!
//! Events are emitted through `tracing` with target "cellfilter" and carry an
//! `event` field for filtering.
//!
//! ## Library Integration
//!
//! cellfilter never initializes a global subscriber. Applications configure
//! tracing via `tracing_subscriber` or similar.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem (`"bind"`, `"evaluate"`, `"apply"`, `"read"`)
//! - Use `%` for Display, `?` for Debug formatting
//! - Never log from per-cell loops

/// Target for all cellfilter log events.
pub(crate) const CELLFILTER_TARGET: &str = "cellfilter";

/// Macro for debug-level log events.
///
/// # Example
/// ```ignore
/// log_debug!(
///     component = "read",
///     event = "read_submitted",
///     tiles = tiles.len(),
///     condition = %condition,
/// );
/// ```
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::CELLFILTER_TARGET, $($field)*)
    };
}

/// Macro for trace-level log events.
macro_rules! log_trace {
    ($($field:tt)*) => {
        ::tracing::trace!(target: $crate::observability::CELLFILTER_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_trace;
