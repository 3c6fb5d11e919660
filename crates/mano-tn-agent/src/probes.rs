//! Active iperf3/ping probes (`spec.md` §4.7.4). Arguments are validated
//! by the domain validators already registered in `mano-subprocess`;
//! this module only builds the argument list and parses output.

use std::sync::LazyLock;

use mano_subprocess::{SecureExecutor, validate_iperf3, validate_ping};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputResult {
    pub sent_mbps: f64,
    pub received_mbps: f64,
}

/// Runs an iperf3 client against `target_ip:port` for `duration_secs`
/// and parses the `-J` JSON summary.
pub async fn run_iperf3_client(
    executor: &SecureExecutor,
    target_ip: &str,
    port: u16,
    duration_secs: u32,
) -> Result<ThroughputResult, mano_subprocess::SubprocessError> {
    let args = vec![
        "-c".to_owned(),
        target_ip.to_owned(),
        "-p".to_owned(),
        port.to_string(),
        "-t".to_owned(),
        duration_secs.to_string(),
        "-J".to_owned(),
    ];
    let output = executor.execute_with_validator("iperf3", &validate_iperf3, &args).await?;
    Ok(parse_iperf3_json(&output.stdout).unwrap_or(ThroughputResult {
        sent_mbps: 0.0,
        received_mbps: 0.0,
    }))
}

fn parse_iperf3_json(stdout: &[u8]) -> Option<ThroughputResult> {
    let value: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    let end = value.get("end")?;
    let sent_bps = end.pointer("/sum_sent/bits_per_second")?.as_f64()?;
    let received_bps = end.pointer("/sum_received/bits_per_second")?.as_f64()?;
    Some(ThroughputResult {
        sent_mbps: sent_bps / 1_000_000.0,
        received_mbps: received_bps / 1_000_000.0,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PingResult {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub mdev_ms: f64,
    pub loss_ratio: f64,
}

static RTT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rtt min/avg/max/mdev = ([\d.]+)/([\d.]+)/([\d.]+)/([\d.]+) ms").expect("static regex")
});

static LOSS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)% packet loss").expect("static regex"));

/// Runs a `ping -c <count>` burst against `target_ip` and parses the
/// kernel's summary line.
pub async fn run_ping(
    executor: &SecureExecutor,
    target_ip: &str,
    count: u32,
) -> Result<PingResult, mano_subprocess::SubprocessError> {
    let args = vec!["-c".to_owned(), count.to_string(), target_ip.to_owned()];
    let output = executor.execute_with_validator("ping", &validate_ping, &args).await?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_ping_output(&stdout))
}

fn parse_ping_output(stdout: &str) -> PingResult {
    let rtt = RTT_LINE.captures(stdout).and_then(|caps| {
        Some((
            caps.get(1)?.as_str().parse::<f64>().ok()?,
            caps.get(2)?.as_str().parse::<f64>().ok()?,
            caps.get(3)?.as_str().parse::<f64>().ok()?,
            caps.get(4)?.as_str().parse::<f64>().ok()?,
        ))
    });
    let loss_ratio = LOSS_LINE
        .captures(stdout)
        .and_then(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .map(|percent| percent / 100.0)
        .unwrap_or(1.0);

    let (min_ms, avg_ms, max_ms, mdev_ms) = rtt.unwrap_or((0.0, 0.0, 0.0, 0.0));
    PingResult {
        min_ms,
        avg_ms,
        max_ms,
        mdev_ms,
        loss_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ping_summary_line() {
        let stdout = "PING 10.0.0.1 (10.0.0.1): 56 data bytes\n\
--- 10.0.0.1 ping statistics ---\n\
4 packets transmitted, 4 received, 0% packet loss, time 3003ms\n\
rtt min/avg/max/mdev = 0.123/0.456/0.789/0.012 ms\n";
        let result = parse_ping_output(stdout);
        assert_eq!(result.min_ms, 0.123);
        assert_eq!(result.avg_ms, 0.456);
        assert_eq!(result.max_ms, 0.789);
        assert_eq!(result.mdev_ms, 0.012);
        assert_eq!(result.loss_ratio, 0.0);
    }

    #[test]
    fn parses_iperf3_json_summary() {
        let json = br#"{"end":{"sum_sent":{"bits_per_second":95000000.0},"sum_received":{"bits_per_second":94000000.0}}}"#;
        let result = parse_iperf3_json(json).unwrap();
        assert_eq!(result.sent_mbps, 95.0);
        assert_eq!(result.received_mbps, 94.0);
    }

    #[test]
    fn missing_rtt_line_defaults_to_zero() {
        let result = parse_ping_output("unknown output");
        assert_eq!(result.avg_ms, 0.0);
        assert_eq!(result.loss_ratio, 1.0);
    }
}
