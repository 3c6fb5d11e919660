use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use mano_gitops::{ClusterClient, FakeClusterClient, KubeClusterClient};
use mano_orchestrator::{HttpTnActivator, HttpValidationProbe, OrchestratorState, build_router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(about = "mano-orchestrator: intent-driven control plane for RAN network slices")]
struct Args {
    /// Port the HTTP API listens on.
    #[arg(long, default_value_t = 8400)]
    port: u16,

    /// Base URL of the TN manager dispatched to for slice validation.
    #[arg(long, default_value = "http://mano-tn-manager:9200")]
    tn_manager_url: String,

    /// Drives an in-memory cluster client instead of talking to a real
    /// Kubernetes API; for local development and demos only.
    #[arg(long, default_value_t = false)]
    fake_cluster_client: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                format!("mano_orchestrator={}", mano_env::log_level().unwrap_or_else(|| "info".to_owned()))
                    .parse()
                    .context("invalid MANO_LOG_LEVEL directive")?,
            ),
        )
        .init();

    let config = mano_config::AppConfig::load().context("failed to load orchestrator configuration")?;

    let cluster_client: Arc<dyn ClusterClient> = if args.fake_cluster_client {
        tracing::warn!("running with an in-memory cluster client, no workload is actually deployed");
        Arc::new(FakeClusterClient::new(Duration::from_millis(50)))
    } else {
        let kube_client = match &config.cluster_context {
            Some(context) => kube::Client::try_default()
                .await
                .with_context(|| format!("failed to build a Kubernetes client for context '{context}'"))?,
            None => kube::Client::try_default().await.context("failed to build a Kubernetes client")?,
        };
        Arc::new(KubeClusterClient::new(kube_client))
    };

    let http_client = reqwest::Client::new();
    let tn_activator = Arc::new(HttpTnActivator::new(http_client.clone()));
    let validation_probe = Arc::new(HttpValidationProbe::new(http_client, args.tn_manager_url));

    let cancel = CancellationToken::new();
    let state = OrchestratorState::new(config, cluster_client, tn_activator, validation_probe, cancel.clone());
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!(%addr, "mano-orchestrator listening");
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;

    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel.cancel();
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await.context("mano-orchestrator terminated unexpectedly")?;

    Ok(())
}
