//! Asynchronous interface statistics refresh (`spec.md` §4.6e): reads
//! `/sys/class/net/<iface>/statistics/*`, validated against the
//! allow-listed sysfs directory before any file is opened.

use std::path::{Path, PathBuf};

use mano_core::TunnelCounters;

const SYSFS_NET_ROOT: &str = "/sys/class/net";

/// Rejects anything that would escape `/sys/class/net/<iface>/statistics`
/// — no path separators, no `..`, only the interface-name character set
/// `mano-subprocess` already accepts for `ip`/`tc` arguments.
fn validated_stats_dir(iface: &str) -> Option<PathBuf> {
    let is_safe = !iface.is_empty()
        && iface.len() <= 15
        && iface
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
    if !is_safe {
        return None;
    }
    Some(Path::new(SYSFS_NET_ROOT).join(iface).join("statistics"))
}

async fn read_counter(stats_dir: &Path, file: &str) -> u64 {
    tokio::fs::read_to_string(stats_dir.join(file))
        .await
        .ok()
        .and_then(|contents| contents.trim().parse().ok())
        .unwrap_or(0)
}

/// Returns `None` when `iface` fails path validation or the statistics
/// directory does not exist (interface not yet up).
pub async fn read_interface_counters(iface: &str) -> Option<TunnelCounters> {
    let stats_dir = validated_stats_dir(iface)?;
    if tokio::fs::metadata(&stats_dir).await.is_err() {
        return None;
    }
    Some(TunnelCounters {
        rx_bytes: read_counter(&stats_dir, "rx_bytes").await,
        tx_bytes: read_counter(&stats_dir, "tx_bytes").await,
        rx_packets: read_counter(&stats_dir, "rx_packets").await,
        tx_packets: read_counter(&stats_dir, "tx_packets").await,
        errors: read_counter(&stats_dir, "rx_errors").await + read_counter(&stats_dir, "tx_errors").await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_traversal_in_interface_name() {
        assert!(validated_stats_dir("../../etc").is_none());
        assert!(validated_stats_dir("eth0/../../etc").is_none());
    }

    #[test]
    fn accepts_well_formed_interface_name() {
        assert!(validated_stats_dir("vxlan500").is_some());
    }

    #[tokio::test]
    async fn missing_interface_yields_none() {
        assert!(read_interface_counters("mano-test-nonexistent-iface").await.is_none());
    }
}
