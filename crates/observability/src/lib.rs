//! Logging setup shared by the tenantkit binaries.

/// Initialize process-wide logging with the default configuration.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filter, output format).
pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat, init_with};
