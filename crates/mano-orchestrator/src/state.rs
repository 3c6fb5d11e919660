//! Shared state the REST handlers and reconciliation tasks read or
//! mutate through (`spec.md` §4.4, §5 "Shared resources").

use std::sync::Arc;

use mano_analyzer::BottleneckAnalyzer;
use mano_config::AppConfig;
use mano_core::{InventoryRegistry, MeasurementSample, SliceRegistry};
use mano_gitops::{ClusterClient, ImageCatalog};
use mano_placement::PlacementEngine;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{tn_activation::TnActivator, validation::ValidationProbe};

/// Capacity of the channel the placement engine's own feedback bridges
/// into the analyzer's ingestion queue (`spec.md` §4.3, "pushes a
/// `MeasurementSample` onto the analyzer's channel").
const FEEDBACK_CHANNEL_CAPACITY: usize = 256;

pub struct OrchestratorState {
    pub slices: Arc<SliceRegistry>,
    pub inventory: Arc<InventoryRegistry>,
    pub placement_engine: Arc<PlacementEngine>,
    pub cluster_client: Arc<dyn ClusterClient>,
    pub tn_activator: Arc<dyn TnActivator>,
    pub validation_probe: Arc<dyn ValidationProbe>,
    pub analyzer: Arc<BottleneckAnalyzer>,
    pub feedback_tx: mpsc::Sender<MeasurementSample>,
    pub config: AppConfig,
    pub image_catalog: ImageCatalog,
    pub cancel: CancellationToken,
}

impl OrchestratorState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        cluster_client: Arc<dyn ClusterClient>,
        tn_activator: Arc<dyn TnActivator>,
        validation_probe: Arc<dyn ValidationProbe>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let analyzer = Arc::new(BottleneckAnalyzer::new());
        analyzer.spawn(mano_analyzer::thresholds::KNOWN_COMPONENTS.len(), cancel.clone());

        let (feedback_tx, mut feedback_rx) = mpsc::channel(FEEDBACK_CHANNEL_CAPACITY);
        {
            let analyzer = analyzer.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        sample = feedback_rx.recv() => {
                            match sample {
                                Some(sample) => analyzer.ingest(sample),
                                None => return,
                            }
                        }
                    }
                }
            });
        }

        Arc::new(Self {
            slices: Arc::new(SliceRegistry::new()),
            inventory: Arc::new(InventoryRegistry::new()),
            placement_engine: Arc::new(PlacementEngine::new(config.placement_weights)),
            cluster_client,
            tn_activator,
            validation_probe,
            analyzer,
            feedback_tx,
            config,
            image_catalog: ImageCatalog::default(),
            cancel,
        })
    }
}
