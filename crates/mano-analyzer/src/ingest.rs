//! The bounded, drop-oldest ingestion queue measurement samples arrive
//! through (`spec.md` §4.8, §5: "the sample channel is drop-oldest-on-
//! full"). `tokio::sync::mpsc` alone blocks the producer once full, so
//! the queue is a [`mano_core::cache::Ring`] (genuinely drop-oldest)
//! paired with a [`tokio::sync::Notify`] that wakes the worker set
//! without busy-polling.

use std::sync::Arc;

use mano_core::{MeasurementSample, cache::Ring};
use tokio::sync::Notify;

pub const CAPACITY: usize = 1000;

pub struct SampleQueue {
    ring: Ring<MeasurementSample>,
    notify: Notify,
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ring: Ring::new(CAPACITY),
            notify: Notify::new(),
        }
    }

    /// Never blocks the producer; drops the oldest queued sample once
    /// the queue is at capacity, logging [`crate::error::AnalyzerError::Overload`]
    /// as informational (`spec.md` §7).
    pub fn push(&self, sample: MeasurementSample) {
        if let Some(dropped) = self.ring.push(sample) {
            let err = crate::error::AnalyzerError::Overload { component: dropped.component };
            tracing::warn!(error = %err, "analyzer ingestion queue overloaded");
        }
        self.notify.notify_one();
    }

    /// Waits for at least one sample to be available, then drains and
    /// returns everything currently queued.
    pub async fn recv_batch(self: &Arc<Self>) -> Vec<MeasurementSample> {
        loop {
            let mut batch = Vec::new();
            while let Some(sample) = self.ring.pop_front() {
                batch.push(sample);
            }
            if !batch.is_empty() {
                return batch;
            }
            self.notify.notified().await;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn sample(component: &str) -> MeasurementSample {
        MeasurementSample {
            timestamp: SystemTime::now(),
            component: component.to_owned(),
            metric: "cpu_pct".to_owned(),
            value: 10.0,
            labels: std::collections::HashMap::new(),
            severity: mano_core::Severity::Low,
        }
    }

    #[tokio::test]
    async fn recv_batch_drains_everything_queued() {
        let queue = Arc::new(SampleQueue::new());
        queue.push(sample("generic"));
        queue.push(sample("generic"));
        let batch = queue.recv_batch().await;
        assert_eq!(batch.len(), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn drops_oldest_past_capacity() {
        let queue = SampleQueue::new();
        for _ in 0..(CAPACITY + 10) {
            queue.push(sample("generic"));
        }
        assert_eq!(queue.len(), CAPACITY);
    }
}
