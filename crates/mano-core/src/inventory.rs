//! Cluster inventory: the live capacity view the placement engine scores
//! against (`spec.md` §3, "Cluster inventory").

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::VnfKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterClass {
    Edge,
    Regional,
    Central,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    pub vnf_kinds: Vec<VnfKind>,
    pub qos_classes: Vec<crate::SliceClass>,
    pub hardware_flags: Vec<String>,
}

impl Capabilities {
    #[must_use]
    pub fn supports_vnf(&self, kind: VnfKind) -> bool {
        self.vnf_kinds.contains(&kind)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    pub cpu_cores_free: f64,
    pub memory_gib_free: f64,
    pub storage_gib_free: f64,
    pub utilisation_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub id: String,
    pub class: ClusterClass,
    pub region: String,
    pub capabilities: Capabilities,
    pub capacity: Capacity,
    /// Underlay IP the site's TN agent binds tunnels to; feeds VXLAN
    /// overlay-IP derivation and TN activation (`spec.md` §4.4 step 3,
    /// §4.6).
    #[serde(default)]
    pub underlay_ip: std::net::Ipv4Addr,
    /// Base URL of the TN agent running on this cluster, `None` for
    /// clusters that never host a TN placement.
    #[serde(default)]
    pub tn_agent_base_url: Option<String>,
}

/// A point-in-time view of the whole inventory, versioned so the
/// placement cache and `InventoryStale` checks can reason about
/// freshness without holding the registry lock (`spec.md` §4.3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub version: u64,
    pub clusters: Vec<ClusterRecord>,
}

impl InventorySnapshot {
    #[must_use]
    pub fn fingerprint_input(&self) -> String {
        self.version.to_string()
    }
}

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const MISSED_HEARTBEATS_BEFORE_EVICTION: u32 = 3;

struct Entry {
    record: ClusterRecord,
    last_heartbeat: Instant,
}

/// Single-writer registry of cluster inventory. Reads dominate (every
/// placement decision reads a snapshot); writes come from registration
/// and heartbeat refresh, so a plain `Mutex` around a `HashMap` (the
/// same shape the teacher uses for `ConfigRepo::waiting_hosts`) is
/// adequate — lock hold times are microseconds, never across an await.
pub struct InventoryRegistry {
    clusters: Mutex<HashMap<String, Entry>>,
    version: std::sync::atomic::AtomicU64,
}

impl Default for InventoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clusters: Mutex::new(HashMap::new()),
            version: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn register(&self, record: ClusterRecord) {
        let mut clusters = self.clusters.lock().unwrap_or_else(|e| e.into_inner());
        clusters.insert(
            record.id.clone(),
            Entry {
                record,
                last_heartbeat: Instant::now(),
            },
        );
        self.bump_version();
    }

    pub fn heartbeat(&self, id: &str, capacity: Capacity) -> bool {
        let mut clusters = self.clusters.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = clusters.get_mut(id) else {
            return false;
        };
        entry.record.capacity = capacity;
        entry.last_heartbeat = Instant::now();
        drop(clusters);
        self.bump_version();
        true
    }

    /// Drops clusters that have missed three heartbeat windows
    /// (`spec.md` §3 cluster-inventory lifecycle).
    pub fn evict_stale(&self) -> Vec<String> {
        let mut clusters = self.clusters.lock().unwrap_or_else(|e| e.into_inner());
        let cutoff = HEARTBEAT_INTERVAL * MISSED_HEARTBEATS_BEFORE_EVICTION;
        let now = Instant::now();
        let stale: Vec<String> = clusters
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_heartbeat) > cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            clusters.remove(id);
        }
        if !stale.is_empty() {
            drop(clusters);
            self.bump_version();
        }
        stale
    }

    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        let clusters = self.clusters.lock().unwrap_or_else(|e| e.into_inner());
        InventorySnapshot {
            version: self.version.load(std::sync::atomic::Ordering::SeqCst),
            clusters: clusters.values().map(|e| e.record.clone()).collect(),
        }
    }

    fn bump_version(&self) {
        self.version
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

/// A snapshot is stale once it is older than the heartbeat timeout
/// relative to the registry's current version having moved on.
#[must_use]
pub fn is_stale(snapshot_version: u64, current_version: u64) -> bool {
    current_version.saturating_sub(snapshot_version) > 0
        && current_version - snapshot_version > MISSED_HEARTBEATS_BEFORE_EVICTION as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(id: &str) -> ClusterRecord {
        ClusterRecord {
            id: id.to_owned(),
            class: ClusterClass::Edge,
            region: "eu-west".to_owned(),
            capabilities: Capabilities::default(),
            capacity: Capacity::default(),
            underlay_ip: std::net::Ipv4Addr::new(10, 0, 0, 1),
            tn_agent_base_url: Some(format!("http://{id}.tn-agent.svc:9100")),
        }
    }

    #[test]
    fn register_then_snapshot_contains_cluster() {
        let registry = InventoryRegistry::new();
        registry.register(cluster("edge-1"));
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.clusters.len(), 1);
        assert_eq!(snapshot.clusters[0].id, "edge-1");
    }

    #[test]
    fn heartbeat_on_unknown_cluster_is_noop() {
        let registry = InventoryRegistry::new();
        assert!(!registry.heartbeat("missing", Capacity::default()));
    }
}
