//! Per-component classification pass: primary signals in, scored
//! [`AnalysisResult`]s out (`spec.md` §4.8).

use std::collections::HashMap;

use mano_core::{AnalysisResult, BottleneckKind, Severity};

use crate::{
    thresholds::{ComponentThresholds, SignalThreshold},
    trend::classify as classify_trend,
};

/// `score = min(100, value / critical * 100)` (`spec.md` §4.8).
#[must_use]
pub fn score(value: f64, critical: f64) -> f64 {
    if critical <= 0.0 {
        return 0.0;
    }
    (value / critical * 100.0).min(100.0).max(0.0)
}

/// Score bands map onto severities; a score of exactly 100 (value at or
/// past the critical threshold) is always `Critical`, matching the SMF
/// init-time scenario in `spec.md` §8.
#[must_use]
pub fn severity_for_score(score: f64) -> Severity {
    if score >= 100.0 {
        Severity::Critical
    } else if score >= 75.0 {
        Severity::High
    } else if score >= 50.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn remediation_hint(signal: &SignalThreshold, value: f64) -> String {
    match signal.kind {
        BottleneckKind::SmfInit => "profile SMF session-establishment init path; check N4 association latency".to_owned(),
        BottleneckKind::PlacementCalc | BottleneckKind::Algorithmic => {
            format!("{} exceeded its budget ({value:.1}); widen the candidate filter or raise the decision budget", signal.metric)
        }
        BottleneckKind::VxlanSetup => "check kernel netlink contention or worker-pool saturation on the agent".to_owned(),
        BottleneckKind::ConcurrencyLimit => "raise the worker-pool cap or shed load across more agents".to_owned(),
        BottleneckKind::DependencySlowdown => "check the cluster client's apply/wait-ready latency".to_owned(),
        BottleneckKind::ConfigSuboptimal => format!("{} is trending poorly; review cache sizing and TTLs", signal.metric),
        BottleneckKind::Cpu => "CPU saturation; consider scaling the workload or tightening limits".to_owned(),
        BottleneckKind::Memory => "memory pressure; check for leaks or raise the memory limit".to_owned(),
        BottleneckKind::Network => "elevated network latency; check the TN overlay and underlay path".to_owned(),
        _ => format!("{} is degraded", signal.metric),
    }
}

/// Classifies the latest sample for every known signal of `thresholds`'
/// component that has a value in `latest`, recording the score into
/// `windows` for trend classification.
pub fn classify(
    thresholds: &ComponentThresholds,
    latest: &HashMap<String, f64>,
    windows: &crate::history::ScoreWindows,
    now: std::time::SystemTime,
) -> Vec<AnalysisResult> {
    let mut results = Vec::new();

    for signal in thresholds.signals {
        let Some(&value) = latest.get(signal.metric) else {
            continue;
        };

        let signal_score = score(value, signal.critical);
        let severity = severity_for_score(signal_score);
        let kind_key = format!("{:?}", signal.kind);
        let window = windows.record(thresholds.component, &kind_key, signal_score);
        let trend = classify_trend(&window);

        let mut metrics_snapshot = HashMap::new();
        metrics_snapshot.insert(signal.metric.to_owned(), value);

        results.push(AnalysisResult {
            timestamp: now,
            component: thresholds.component.to_owned(),
            kind: signal.kind,
            severity,
            score: signal_score,
            description: format!(
                "{} on {} is {value:.2} (warning {}, critical {})",
                signal.metric, thresholds.component, signal.warning, signal.critical
            ),
            remediation_hints: vec![remediation_hint(signal, value)],
            metrics_snapshot,
            trend,
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::for_component;

    #[test]
    fn smf_init_time_at_65s_scores_100_and_critical() {
        let thresholds = for_component("smf").unwrap();
        let mut latest = HashMap::new();
        latest.insert("init_time_ms".to_owned(), 65_000.0);
        latest.insert("cpu_pct".to_owned(), 90.0);
        let windows = crate::history::ScoreWindows::new();
        let results = classify(thresholds, &latest, &windows, std::time::SystemTime::now());

        let init = results.iter().find(|r| r.kind == BottleneckKind::SmfInit).unwrap();
        assert_eq!(init.score, 100.0);
        assert_eq!(init.severity, Severity::Critical);
    }

    #[test]
    fn score_caps_at_100_past_critical() {
        assert_eq!(score(200.0, 100.0), 100.0);
    }

    #[test]
    fn missing_signal_is_skipped() {
        let thresholds = for_component("generic").unwrap();
        let latest = HashMap::new();
        let windows = crate::history::ScoreWindows::new();
        let results = classify(thresholds, &latest, &windows, std::time::SystemTime::now());
        assert!(results.is_empty());
    }
}
