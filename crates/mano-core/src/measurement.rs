//! Measurement samples and analyzer outputs (`spec.md` §3, "Measurement
//! sample" and "Analysis result").

use std::{collections::HashMap, time::SystemTime};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSample {
    pub timestamp: SystemTime,
    pub component: String,
    pub metric: String,
    pub value: f64,
    pub labels: HashMap<String, String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BottleneckKind {
    Cpu,
    Memory,
    Network,
    Disk,
    Concurrency,
    Algorithmic,
    Config,
    Dependency,
    SmfInit,
    IntentProcessing,
    PlacementCalc,
    VxlanSetup,
    ConfigSuboptimal,
    DependencySlowdown,
    ConcurrencyLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Degrading,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub timestamp: SystemTime,
    pub component: String,
    pub kind: BottleneckKind,
    pub severity: Severity,
    pub score: f64,
    pub description: String,
    pub remediation_hints: Vec<String>,
    pub metrics_snapshot: HashMap<String, f64>,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub generated_at: SystemTime,
    pub component: String,
    pub kind: BottleneckKind,
    pub severity: Severity,
    pub description: String,
}

impl Alert {
    /// `bottleneck_<component>_<unix-ts>` (`spec.md` §4.8).
    #[must_use]
    pub fn new_id(component: &str, unix_ts: u64) -> String {
        format!("bottleneck_{component}_{unix_ts}")
    }
}
