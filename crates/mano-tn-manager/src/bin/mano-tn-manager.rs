use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use mano_tn_manager::{ManagerState, build_router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(about = "mano-tn-manager: registers TN agents and dispatches synchronised multi-site tests")]
struct Args {
    /// Port the HTTP API listens on.
    #[arg(long, default_value_t = 9200)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                format!("mano_tn_manager={}", mano_env::log_level().unwrap_or_else(|| "info".to_owned()))
                    .parse()
                    .context("invalid MANO_LOG_LEVEL directive")?,
            ),
        )
        .init();

    let cancel = CancellationToken::new();
    let state = Arc::new(ManagerState::new(cancel.clone()));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!(%addr, "mano-tn-manager listening");
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;

    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel.cancel();
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await.context("mano-tn-manager terminated unexpectedly")?;

    Ok(())
}
