//! Batches non-critical operations on VNIs > 1000 behind a 100 ms timer
//! (`spec.md` §4.6b): a single task owns the pending queue and, at each
//! deadline, drains up to 5 queued operations concurrently.

use std::{sync::Arc, time::Duration};

use mano_core::Vni;
use tokio::sync::mpsc;
use tracing::debug;

use crate::manager::VxlanManager;

const BATCH_WINDOW: Duration = Duration::from_millis(100);
const MAX_CONCURRENT_PER_TICK: usize = 5;

/// A handle callers use to enqueue a batchable stats refresh; dropping
/// every clone stops the background actor.
#[derive(Clone)]
pub struct BatchHandle {
    sender: mpsc::Sender<Vni>,
}

impl BatchHandle {
    /// Enqueues `vni` for the next batch window. Only meaningful for
    /// `vni.is_batchable()`; callers are expected to check that first
    /// and execute non-batchable VNIs directly.
    pub async fn submit(&self, vni: Vni) {
        let _ = self.sender.send(vni).await;
    }
}

/// Spawns the batching actor and returns a handle to feed it.
#[must_use]
pub fn spawn(manager: Arc<VxlanManager>) -> BatchHandle {
    let (sender, receiver) = mpsc::channel(1024);
    tokio::spawn(run(manager, receiver));
    BatchHandle { sender }
}

async fn run(manager: Arc<VxlanManager>, mut receiver: mpsc::Receiver<Vni>) {
    let mut pending: Vec<Vni> = Vec::new();

    loop {
        tokio::select! {
            maybe_vni = receiver.recv() => {
                match maybe_vni {
                    Some(vni) => pending.push(vni),
                    None => return,
                }
            }
            () = tokio::time::sleep(BATCH_WINDOW), if !pending.is_empty() => {
                let batch: Vec<Vni> = pending.drain(..MAX_CONCURRENT_PER_TICK.min(pending.len())).collect();
                debug!(batch_size = batch.len(), remaining = pending.len(), "flushing VNI batch");
                let jobs = batch.into_iter().map(|vni| {
                    let manager = Arc::clone(&manager);
                    async move {
                        if let Err(err) = manager.refresh_stats(vni).await {
                            tracing::warn!(vni = vni.get(), error = %err, "batched stats refresh failed");
                        }
                    }
                });
                futures::future::join_all(jobs).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_can_be_cloned_and_submitted() {
        let manager = Arc::new(VxlanManager::new());
        let handle = spawn(manager);
        let other = handle.clone();
        handle.submit(Vni::new(2000).unwrap()).await;
        other.submit(Vni::new(3000).unwrap()).await;
    }
}
