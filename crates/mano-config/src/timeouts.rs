//! Timeout constants from `spec.md` §5, overridable via environment
//! variables the way the teacher's `testing-framework-config::timeouts`
//! module overrides its constants.

use std::{env, time::Duration};

pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const SUBPROCESS_DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const SUBPROCESS_IPERF3_TIMEOUT_SECS: u64 = 5 * 60;
pub const SUBPROCESS_PING_TIMEOUT_SECS: u64 = 30;
pub const SUBPROCESS_TC_IP_BRIDGE_TIMEOUT_SECS: u64 = 10;
pub const PLACEMENT_DECISION_BUDGET_SECS: u64 = 5;
pub const TUNNEL_SLOT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
pub const VXLAN_BATCH_WINDOW_MILLIS: u64 = 100;
pub const VXLAN_STATS_REFRESH_SECS: u64 = 30;
pub const ANALYZER_PASS_INTERVAL_SECS: u64 = 30;
pub const ANALYZER_RETENTION_TRIM_INTERVAL_SECS: u64 = 60 * 60;
pub const ANALYZER_RETENTION_HORIZON_SECS: u64 = 24 * 60 * 60;
pub const RECONCILE_POLL_INTERVAL_SECS: u64 = 5;
pub const RECONCILE_MAX_RETRIES: u32 = 3;

fn env_duration(key: &str, default_secs: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

/// In slow test environments, widen timeouts 2x, matching the teacher's
/// `adjust_timeout` idiom.
#[must_use]
pub fn adjust_timeout(d: Duration) -> Duration {
    if mano_env::slow_test_env() { d * 2 } else { d }
}

#[must_use]
pub fn heartbeat_interval() -> Duration {
    adjust_timeout(env_duration(
        "MANO_HEARTBEAT_INTERVAL_SECS",
        HEARTBEAT_INTERVAL_SECS,
    ))
}

#[must_use]
pub fn subprocess_default_timeout() -> Duration {
    adjust_timeout(env_duration(
        "MANO_SUBPROCESS_TIMEOUT_SECS",
        SUBPROCESS_DEFAULT_TIMEOUT_SECS,
    ))
}

#[must_use]
pub fn placement_decision_budget() -> Duration {
    adjust_timeout(env_duration(
        "MANO_PLACEMENT_BUDGET_SECS",
        PLACEMENT_DECISION_BUDGET_SECS,
    ))
}

#[must_use]
pub fn reconcile_poll_interval() -> Duration {
    adjust_timeout(env_duration(
        "MANO_RECONCILE_POLL_INTERVAL_SECS",
        RECONCILE_POLL_INTERVAL_SECS,
    ))
}
