//! Operator-facing CLI: submits intent text to the orchestrator, polls a
//! slice to completion, and reports the outcome through the exit codes
//! `spec.md` §6 assigns to every CLI entry point in this system.

use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use mano_core::{SliceId, SliceInstance, SliceState};
use serde_json::json;

/// 0 success; 1 validation failure; 2 cluster-side failure; 3 timeout; 4
/// partial success (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    ValidationFailure = 1,
    ClusterFailure = 2,
    Timeout = 3,
    PartialSuccess = 4,
}

#[derive(Parser, Debug)]
#[command(name = "mano")]
#[command(about = "Operator CLI for the intent-driven slice control plane")]
struct Cli {
    /// Base URL of the orchestrator's REST API.
    #[arg(long, global = true, default_value = "http://localhost:8400")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile an intent and submit it as a new slice.
    Submit(SubmitArgs),
    /// Fetch a single slice by id.
    Get(GetArgs),
    /// List every known slice.
    List,
    /// Request termination of a running slice.
    Terminate(GetArgs),
}

#[derive(Args, Debug, Clone)]
struct SubmitArgs {
    /// Free-form operator intent text, e.g. "autonomous driving needs
    /// ultra-low latency 1ms, reliability five nines, 10 Mbps".
    text: String,

    /// Restrict placement to this region.
    #[arg(long)]
    region: Option<String>,

    /// Reject sites over this cost ceiling.
    #[arg(long)]
    cost_ceiling: Option<f64>,

    /// Cluster ids the placement engine must never select.
    #[arg(long = "forbid", value_delimiter = ',')]
    forbidden_sites: Vec<String>,

    /// Block until the slice reaches a terminal state (or `--timeout-secs`
    /// elapses) instead of returning immediately after submission.
    #[arg(long)]
    wait: bool,

    /// Deadline for `--wait`, in seconds.
    #[arg(long, default_value_t = 600)]
    timeout_secs: u64,

    /// Interval between status polls while waiting, in seconds.
    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,
}

#[derive(Args, Debug, Clone)]
struct GetArgs {
    slice_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let code = match cli.command {
        Command::Submit(args) => submit(&client, &cli.server, args).await?,
        Command::Get(args) => get_slice(&client, &cli.server, &args.slice_id).await?,
        Command::List => list_slices(&client, &cli.server).await?,
        Command::Terminate(args) => terminate(&client, &cli.server, &args.slice_id).await?,
    };

    std::process::exit(code as i32);
}

async fn submit(client: &reqwest::Client, server: &str, args: SubmitArgs) -> anyhow::Result<ExitCode> {
    let body = json!({
        "text": args.text,
        "region": args.region,
        "cost_ceiling": args.cost_ceiling,
        "forbidden_sites": args.forbidden_sites,
    });

    let response = client
        .post(format!("{server}/api/v1/intents"))
        .json(&body)
        .send()
        .await
        .context("failed to reach the orchestrator")?;

    if response.status() == reqwest::StatusCode::BAD_REQUEST {
        let message: serde_json::Value = response.json().await.unwrap_or_default();
        eprintln!("intent rejected: {message}");
        return Ok(ExitCode::ValidationFailure);
    }
    if !response.status().is_success() {
        bail!("orchestrator returned {}: {}", response.status(), response.text().await.unwrap_or_default());
    }

    let accepted: serde_json::Value = response.json().await.context("malformed submission response")?;
    let slice_id = accepted["slice_id"].as_str().context("response missing slice_id")?.to_owned();
    println!("{}", serde_json::to_string_pretty(&accepted)?);

    if !args.wait {
        return Ok(ExitCode::Success);
    }

    wait_for_terminal(client, server, &slice_id, Duration::from_secs(args.timeout_secs), Duration::from_secs(args.poll_interval_secs)).await
}

async fn wait_for_terminal(
    client: &reqwest::Client,
    server: &str,
    slice_id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> anyhow::Result<ExitCode> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let instance = fetch_slice(client, server, slice_id).await?;
        if let Some(code) = classify_settled_state(&instance) {
            println!("{}", serde_json::to_string_pretty(&instance)?);
            return Ok(code);
        }
        if tokio::time::Instant::now() >= deadline {
            eprintln!("timed out waiting for slice {slice_id} to settle");
            return Ok(ExitCode::Timeout);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// A slice never leaves `Running` on its own — it is the steady state of
/// a live network slice, not a batch job's completion. So waiting on
/// submission settles on `Running` (deployment succeeded, now serving)
/// just as much as on the terminal `Succeeded` reached after an explicit
/// termination. `None` while still `Pending`/`Scheduling`/`Terminating`.
fn classify_settled_state(instance: &SliceInstance) -> Option<ExitCode> {
    match instance.state {
        SliceState::Running | SliceState::Succeeded => Some(ExitCode::Success),
        SliceState::Failed => Some(classify_failure_step(instance)),
        SliceState::Pending | SliceState::Scheduling | SliceState::Terminating => None,
    }
}

/// A failure whose last recorded violation came from the validation step
/// means every workload deployed and the transport network activated;
/// only the measured QoS fell short — a partial success, not an outright
/// cluster failure.
fn classify_failure_step(instance: &SliceInstance) -> ExitCode {
    match instance.violations.last() {
        Some(violation) if violation.step == "validation" => ExitCode::PartialSuccess,
        _ => ExitCode::ClusterFailure,
    }
}

async fn fetch_slice(client: &reqwest::Client, server: &str, slice_id: &str) -> anyhow::Result<SliceInstance> {
    let response = client
        .get(format!("{server}/api/v1/slices/{slice_id}"))
        .send()
        .await
        .context("failed to reach the orchestrator")?;
    if !response.status().is_success() {
        bail!("orchestrator returned {}: {}", response.status(), response.text().await.unwrap_or_default());
    }
    response.json().await.context("malformed slice response")
}

async fn get_slice(client: &reqwest::Client, server: &str, slice_id: &str) -> anyhow::Result<ExitCode> {
    let _: SliceId = slice_id.parse().context("malformed slice id")?;
    let instance = fetch_slice(client, server, slice_id).await?;
    println!("{}", serde_json::to_string_pretty(&instance)?);
    Ok(ExitCode::Success)
}

async fn list_slices(client: &reqwest::Client, server: &str) -> anyhow::Result<ExitCode> {
    let response = client.get(format!("{server}/api/v1/slices")).send().await.context("failed to reach the orchestrator")?;
    if !response.status().is_success() {
        bail!("orchestrator returned {}: {}", response.status(), response.text().await.unwrap_or_default());
    }
    let body: serde_json::Value = response.json().await.context("malformed list response")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(ExitCode::Success)
}

async fn terminate(client: &reqwest::Client, server: &str, slice_id: &str) -> anyhow::Result<ExitCode> {
    let _: SliceId = slice_id.parse().context("malformed slice id")?;
    let response = client
        .post(format!("{server}/api/v1/slices/{slice_id}/terminate"))
        .send()
        .await
        .context("failed to reach the orchestrator")?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        eprintln!("no such slice: {slice_id}");
        return Ok(ExitCode::ValidationFailure);
    }
    if !response.status().is_success() {
        bail!("orchestrator returned {}: {}", response.status(), response.text().await.unwrap_or_default());
    }
    let body: serde_json::Value = response.json().await.context("malformed terminate response")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use mano_core::{PlanFingerprint, QosViolation};

    use super::*;

    fn instance(state: SliceState, violations: Vec<QosViolation>) -> SliceInstance {
        let mut instance = SliceInstance::new(PlanFingerprint([0; 32]));
        instance.state = state;
        instance.violations = violations;
        instance
    }

    #[test]
    fn scheduling_slice_has_not_settled_yet() {
        assert_eq!(classify_settled_state(&instance(SliceState::Scheduling, vec![])), None);
    }

    #[test]
    fn running_slice_exits_zero() {
        assert_eq!(classify_settled_state(&instance(SliceState::Running, vec![])), Some(ExitCode::Success));
    }

    #[test]
    fn succeeded_slice_exits_zero() {
        assert_eq!(classify_settled_state(&instance(SliceState::Succeeded, vec![])), Some(ExitCode::Success));
    }

    #[test]
    fn validation_failure_is_partial_success() {
        let violation = QosViolation { step: "validation".to_owned(), reason: "loss too high".to_owned(), attempt: 3 };
        assert_eq!(classify_settled_state(&instance(SliceState::Failed, vec![violation])), Some(ExitCode::PartialSuccess));
    }

    #[test]
    fn cluster_apply_failure_is_a_cluster_failure() {
        let violation = QosViolation { step: "cluster_apply".to_owned(), reason: "timed out".to_owned(), attempt: 0 };
        assert_eq!(classify_settled_state(&instance(SliceState::Failed, vec![violation])), Some(ExitCode::ClusterFailure));
    }

    #[test]
    fn failure_with_no_recorded_violation_defaults_to_cluster_failure() {
        assert_eq!(classify_settled_state(&instance(SliceState::Failed, vec![])), Some(ExitCode::ClusterFailure));
    }
}
