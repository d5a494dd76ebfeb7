//! Tracing/logging setup shared by processes embedding the gate.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{LogFormat, ObservabilityConfig};

/// Initialize process-wide tracing from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    self::tracing::init(&ObservabilityConfig::from_env());
}

/// Initialize with an explicit configuration.
pub fn init_with(config: &ObservabilityConfig) {
    self::tracing::init(config);
}
