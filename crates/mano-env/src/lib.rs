//! Thin wrappers over `std::env` for knobs read across the workspace.
//!
//! Kept as a single leaf crate (no async runtime, no logging) so every other
//! crate can depend on it without pulling in heavier machinery just to read
//! an environment variable.

use std::env;

#[must_use]
pub fn log_level() -> Option<String> {
    env::var("MANO_LOG_LEVEL").ok()
}

#[must_use]
pub fn data_dir() -> Option<String> {
    env::var("MANO_DATA_DIR").ok()
}

#[must_use]
pub fn overlay_dir() -> Option<String> {
    env::var("MANO_OVERLAY_DIR").ok()
}

#[must_use]
pub fn cluster_context() -> Option<String> {
    env::var("MANO_CLUSTER_CONTEXT").ok()
}

#[must_use]
pub fn config_file() -> Option<String> {
    env::var("MANO_CONFIG_FILE").ok()
}

/// Used by tests and CI to widen timeouts on slow shared runners.
#[must_use]
pub fn slow_test_env() -> bool {
    env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true")
}

#[must_use]
pub fn debug_tracing() -> bool {
    env::var("MANO_DEBUG_TRACING").is_ok_and(|v| v.eq_ignore_ascii_case("true"))
}
