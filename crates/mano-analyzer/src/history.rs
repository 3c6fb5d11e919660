//! Rolling score windows, analysis history, and the active-alert map
//! (`spec.md` §3, §4.8, §5 "shared resources").

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, Instant, SystemTime},
};

use mano_core::{Alert, AnalysisResult};

const TREND_WINDOW: Duration = Duration::from_secs(10 * 60);
const TREND_SAMPLES: usize = 3;

/// Per `(component, kind)` rolling window of scores, used to classify
/// the trend of the next analysis pass.
#[derive(Default)]
pub struct ScoreWindows {
    windows: Mutex<HashMap<(String, String), VecDeque<(Instant, f64)>>>,
}

impl ScoreWindows {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `score` for `(component, kind)` and returns the up-to-3
    /// most recent scores within the trailing 10-minute window, oldest
    /// first, including the one just recorded.
    pub fn record(&self, component: &str, kind: &str, score: f64) -> Vec<f64> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let key = (component.to_owned(), kind.to_owned());
        let entry = windows.entry(key).or_default();
        let now = Instant::now();
        entry.push_back((now, score));
        while entry.front().is_some_and(|(t, _)| now.duration_since(*t) > TREND_WINDOW) {
            entry.pop_front();
        }
        while entry.len() > TREND_SAMPLES {
            entry.pop_front();
        }
        entry.iter().map(|(_, score)| *score).collect()
    }
}

/// 24h-retention analysis history plus the active-alert map
/// (`spec.md` §3 "Measurement sample", §4.8).
#[derive(Default)]
pub struct AnalysisHistory {
    results: Mutex<VecDeque<AnalysisResult>>,
    alerts: Mutex<HashMap<String, Alert>>,
}

impl AnalysisHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: AnalysisResult) {
        self.results.lock().unwrap_or_else(|e| e.into_inner()).push_back(result);
    }

    pub fn push_alert(&self, alert: Alert) {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(alert.id.clone(), alert);
    }

    #[must_use]
    pub fn results(&self) -> Vec<AnalysisResult> {
        self.results.lock().unwrap_or_else(|e| e.into_inner()).iter().cloned().collect()
    }

    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).values().cloned().collect()
    }

    /// Trims results and alerts older than the retention horizon
    /// (`spec.md` §3 invariant (d), §4.8 "1h cadence").
    pub fn trim_older_than(&self, horizon: Duration) {
        let Ok(cutoff) = SystemTime::now().duration_since(std::time::UNIX_EPOCH) else {
            return;
        };
        let cutoff_secs = cutoff.as_secs().saturating_sub(horizon.as_secs());

        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|result| unix_secs(result.timestamp) >= cutoff_secs);
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|_, alert| unix_secs(alert.generated_at) >= cutoff_secs);
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_window_caps_at_three_samples() {
        let windows = ScoreWindows::new();
        windows.record("placement-engine", "placement-calc", 10.0);
        windows.record("placement-engine", "placement-calc", 20.0);
        windows.record("placement-engine", "placement-calc", 30.0);
        let recorded = windows.record("placement-engine", "placement-calc", 40.0);
        assert_eq!(recorded, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn trim_drops_results_past_retention_horizon() {
        let history = AnalysisHistory::new();
        history.push_result(AnalysisResult {
            timestamp: SystemTime::now() - Duration::from_secs(25 * 60 * 60),
            component: "generic".to_owned(),
            kind: mano_core::BottleneckKind::Cpu,
            severity: mano_core::Severity::Low,
            score: 10.0,
            description: "old".to_owned(),
            remediation_hints: vec![],
            metrics_snapshot: HashMap::new(),
            trend: mano_core::Trend::Stable,
        });
        history.push_result(AnalysisResult {
            timestamp: SystemTime::now(),
            component: "generic".to_owned(),
            kind: mano_core::BottleneckKind::Cpu,
            severity: mano_core::Severity::Low,
            score: 10.0,
            description: "fresh".to_owned(),
            remediation_hints: vec![],
            metrics_snapshot: HashMap::new(),
            trend: mano_core::Trend::Stable,
        });
        history.trim_older_than(Duration::from_secs(24 * 60 * 60));
        let remaining = history.results();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].description, "fresh");
    }
}
