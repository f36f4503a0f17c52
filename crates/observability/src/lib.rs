//! Process-wide tracing/logging setup shared by the binaries.

/// Initialize process-wide observability (tracing/logging).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Logging for interactive terminal programs; keeps stdout clean.
pub fn init_terminal() {
    tracing::init_terminal();
}

/// Tracing configuration (filters, output format).
pub mod tracing;
