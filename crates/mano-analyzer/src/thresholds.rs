//! Declarative warning/critical thresholds per component/signal
//! (`spec.md` §4.8 component table). Every signal is published already
//! oriented "higher is worse" (e.g. a cache's miss rate, not its hit
//! rate), so the scoring formula in `analyzer.rs` needs no per-signal
//! direction flag.

use mano_core::BottleneckKind;

#[derive(Debug, Clone, Copy)]
pub struct SignalThreshold {
    pub metric: &'static str,
    pub warning: f64,
    pub critical: f64,
    pub kind: BottleneckKind,
}

#[derive(Debug, Clone, Copy)]
pub struct ComponentThresholds {
    pub component: &'static str,
    pub signals: &'static [SignalThreshold],
}

const INTENT_COMPILER: ComponentThresholds = ComponentThresholds {
    component: "intent-compiler",
    signals: &[
        SignalThreshold {
            metric: "processing_time_ms",
            warning: 20.0,
            critical: 100.0,
            kind: BottleneckKind::IntentProcessing,
        },
        SignalThreshold {
            metric: "cache_miss_pct",
            warning: 40.0,
            critical: 80.0,
            kind: BottleneckKind::ConfigSuboptimal,
        },
    ],
};

const PLACEMENT_ENGINE: ComponentThresholds = ComponentThresholds {
    component: "placement-engine",
    signals: &[
        SignalThreshold {
            metric: "decision_time_ms",
            warning: 1000.0,
            critical: 2000.0,
            kind: BottleneckKind::PlacementCalc,
        },
        SignalThreshold {
            metric: "sites_evaluated",
            warning: 30.0,
            critical: 50.0,
            kind: BottleneckKind::Algorithmic,
        },
        SignalThreshold {
            metric: "cache_miss_pct",
            warning: 40.0,
            critical: 80.0,
            kind: BottleneckKind::ConfigSuboptimal,
        },
    ],
};

const VNF_CONTROLLER: ComponentThresholds = ComponentThresholds {
    component: "vnf-controller",
    signals: &[
        SignalThreshold {
            metric: "deploy_time_ms",
            warning: 60_000.0,
            critical: 180_000.0,
            kind: BottleneckKind::DependencySlowdown,
        },
        SignalThreshold {
            metric: "reconcile_time_ms",
            warning: 30_000.0,
            critical: 90_000.0,
            kind: BottleneckKind::DependencySlowdown,
        },
        SignalThreshold {
            metric: "concurrent_ops",
            warning: 8.0,
            critical: 10.0,
            kind: BottleneckKind::ConcurrencyLimit,
        },
    ],
};

const TN_AGENT: ComponentThresholds = ComponentThresholds {
    component: "tn-agent",
    signals: &[
        SignalThreshold {
            metric: "vxlan_setup_time_ms",
            warning: 1000.0,
            critical: 5000.0,
            kind: BottleneckKind::VxlanSetup,
        },
        SignalThreshold {
            metric: "command_cache_miss_pct",
            warning: 40.0,
            critical: 80.0,
            kind: BottleneckKind::ConfigSuboptimal,
        },
    ],
};

/// `spec.md` §4.8: SMF init-time critical at >= 60s.
const SMF: ComponentThresholds = ComponentThresholds {
    component: "smf",
    signals: &[
        SignalThreshold {
            metric: "init_time_ms",
            warning: 30_000.0,
            critical: 60_000.0,
            kind: BottleneckKind::SmfInit,
        },
        SignalThreshold {
            metric: "cpu_pct",
            warning: 70.0,
            critical: 90.0,
            kind: BottleneckKind::Cpu,
        },
    ],
};

const GENERIC: ComponentThresholds = ComponentThresholds {
    component: "generic",
    signals: &[
        SignalThreshold {
            metric: "cpu_pct",
            warning: 70.0,
            critical: 90.0,
            kind: BottleneckKind::Cpu,
        },
        SignalThreshold {
            metric: "memory_pct",
            warning: 75.0,
            critical: 90.0,
            kind: BottleneckKind::Memory,
        },
        SignalThreshold {
            metric: "network_latency_ms",
            warning: 50.0,
            critical: 150.0,
            kind: BottleneckKind::Network,
        },
    ],
};

pub const KNOWN_COMPONENTS: &[ComponentThresholds] =
    &[INTENT_COMPILER, PLACEMENT_ENGINE, VNF_CONTROLLER, TN_AGENT, SMF, GENERIC];

#[must_use]
pub fn for_component(component: &str) -> Option<&'static ComponentThresholds> {
    KNOWN_COMPONENTS.iter().find(|c| c.component == component)
}
