//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from the environment (`RUST_LOG`)
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a fallback filter
///
/// An explicit `RUST_LOG` in the environment still takes precedence.
pub fn init_with_default(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
