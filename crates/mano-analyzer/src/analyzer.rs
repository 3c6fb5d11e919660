//! Wires the ingestion queue, rolling score windows, and analysis
//! history into the worker set and periodic passes `spec.md` §4.8
//! describes.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::SystemTime,
};

use mano_core::{Alert, AnalysisResult, MeasurementSample, Severity};
use tokio_util::sync::CancellationToken;

use crate::{
    classifier,
    history::{AnalysisHistory, ScoreWindows},
    ingest::SampleQueue,
    thresholds,
};

const ANALYSIS_PASS_INTERVAL: std::time::Duration =
    std::time::Duration::from_secs(mano_config::timeouts::ANALYZER_PASS_INTERVAL_SECS);
const RETENTION_TRIM_INTERVAL: std::time::Duration =
    std::time::Duration::from_secs(mano_config::timeouts::ANALYZER_RETENTION_TRIM_INTERVAL_SECS);
const RETENTION_HORIZON: std::time::Duration =
    std::time::Duration::from_secs(mano_config::timeouts::ANALYZER_RETENTION_HORIZON_SECS);

/// The most recently observed value per `(component, metric)`, the
/// input the periodic analysis pass classifies (`spec.md` §4.8).
#[derive(Default)]
struct LatestValues {
    values: Mutex<HashMap<(String, String), f64>>,
}

impl LatestValues {
    fn update(&self, sample: &MeasurementSample) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((sample.component.clone(), sample.metric.clone()), sample.value);
    }

    fn snapshot_for(&self, component: &str) -> HashMap<String, f64> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|((c, _), _)| c == component)
            .map(|((_, metric), value)| (metric.clone(), *value))
            .collect()
    }
}

pub struct BottleneckAnalyzer {
    queue: Arc<SampleQueue>,
    latest: Arc<LatestValues>,
    windows: Arc<ScoreWindows>,
    history: Arc<AnalysisHistory>,
}

impl Default for BottleneckAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl BottleneckAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Arc::new(SampleQueue::new()),
            latest: Arc::new(LatestValues::default()),
            windows: Arc::new(ScoreWindows::new()),
            history: Arc::new(AnalysisHistory::new()),
        }
    }

    /// Never blocks; drops the oldest queued sample once the ingestion
    /// queue is saturated (`spec.md` §5: analysis observes, never
    /// blocks, the producing components).
    pub fn ingest(&self, sample: MeasurementSample) {
        self.queue.push(sample);
    }

    #[must_use]
    pub fn history(&self) -> Arc<AnalysisHistory> {
        self.history.clone()
    }

    /// Spawns the fixed worker set draining the ingestion queue, the
    /// 30s periodic analysis pass, and the 1h retention trim. Returns
    /// immediately; tasks run until `cancel` fires.
    pub fn spawn(&self, worker_count: usize, cancel: CancellationToken) {
        for worker_id in 0..worker_count.max(1) {
            let queue = self.queue.clone();
            let latest = self.latest.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        batch = queue.recv_batch() => {
                            for sample in batch {
                                latest.update(&sample);
                            }
                        }
                    }
                }
            });
            tracing::debug!(worker_id, "analyzer ingestion worker started");
        }

        {
            let latest = self.latest.clone();
            let windows = self.windows.clone();
            let history = self.history.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(ANALYSIS_PASS_INTERVAL);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        _ = interval.tick() => run_analysis_pass(&latest, &windows, &history),
                    }
                }
            });
        }

        {
            let history = self.history.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(RETENTION_TRIM_INTERVAL);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        _ = interval.tick() => history.trim_older_than(RETENTION_HORIZON),
                    }
                }
            });
        }
    }
}

fn run_analysis_pass(latest: &LatestValues, windows: &ScoreWindows, history: &AnalysisHistory) {
    let now = SystemTime::now();
    for component in thresholds::KNOWN_COMPONENTS {
        let snapshot = latest.snapshot_for(component.component);
        if snapshot.is_empty() {
            continue;
        }
        let results = classifier::classify(component, &snapshot, windows, now);
        for result in results {
            if matches!(result.severity, Severity::High | Severity::Critical) {
                history.push_alert(alert_from(&result, now));
            }
            history.push_result(result);
        }
    }
}

fn alert_from(result: &AnalysisResult, now: SystemTime) -> Alert {
    let unix_ts = now.duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    Alert {
        id: Alert::new_id(&result.component, unix_ts),
        generated_at: now,
        component: result.component.clone(),
        kind: result.kind,
        severity: result.severity,
        description: result.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;

    use super::*;

    fn sample(component: &str, metric: &str, value: f64) -> MeasurementSample {
        MeasurementSample {
            timestamp: SystemTime::now(),
            component: component.to_owned(),
            metric: metric.to_owned(),
            value,
            labels: StdHashMap::new(),
            severity: Severity::Low,
        }
    }

    #[tokio::test]
    async fn ingest_and_pass_produce_alert_for_smf_critical() {
        let analyzer = BottleneckAnalyzer::new();

        analyzer.ingest(sample("smf", "init_time_ms", 65_000.0));
        analyzer.ingest(sample("smf", "cpu_pct", 90.0));

        for s in analyzer.queue.recv_batch().await {
            analyzer.latest.update(&s);
        }
        run_analysis_pass(&analyzer.latest, &analyzer.windows, &analyzer.history);

        let alerts = analyzer.history().alerts();
        assert!(alerts.iter().any(|a| a.kind == mano_core::BottleneckKind::SmfInit));
    }

    #[tokio::test]
    async fn spawn_starts_workers_without_panicking() {
        let analyzer = BottleneckAnalyzer::new();
        let cancel = CancellationToken::new();
        analyzer.spawn(2, cancel.clone());
        analyzer.ingest(sample("generic", "cpu_pct", 10.0));
        tokio::task::yield_now().await;
        cancel.cancel();
    }
}
