use std::{net::Ipv4Addr, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use mano_tn_agent::{AgentState, build_router};
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(about = "mano-tn-agent: per-node VXLAN/TC control surface")]
struct Args {
    /// Port the HTTP API listens on.
    #[arg(long, default_value_t = 9100)]
    port: u16,

    /// Underlay IPv4 address this node reaches other agents on.
    #[arg(long)]
    local_underlay_ip: Ipv4Addr,

    /// Physical interface VXLAN tunnels and TC shaping are installed on.
    #[arg(long)]
    phys_interface: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(
                    format!("mano_tn_agent={}", mano_env::log_level().unwrap_or_else(|| "info".to_owned()))
                        .parse()
                        .context("invalid MANO_LOG_LEVEL directive")?,
                ),
        )
        .init();

    let state = Arc::new(AgentState::new(args.local_underlay_ip, args.phys_interface));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!(%addr, "mano-tn-agent listening");
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app).await.context("mano-tn-agent terminated unexpectedly")?;

    Ok(())
}
