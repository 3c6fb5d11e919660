//! Byte-counter monitoring from `/proc/net/dev` on a caller-set interval
//! (`spec.md` §4.7.1).

use std::{collections::HashMap, time::SystemTime};

use mano_core::{MeasurementSample, Severity};

/// One parsed line of `/proc/net/dev` for a single interface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InterfaceCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

fn parse_proc_net_dev(contents: &str, interface: &str) -> Option<InterfaceCounters> {
    for line in contents.lines().skip(2) {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != interface {
            continue;
        }
        let mut fields = rest.split_whitespace();
        let rx_bytes = fields.next()?.parse().ok()?;
        // skip rx packets/errs/drop/fifo/frame/compressed/multicast
        for _ in 0..7 {
            fields.next()?;
        }
        let tx_bytes = fields.next()?.parse().ok()?;
        return Some(InterfaceCounters { rx_bytes, tx_bytes });
    }
    None
}

/// Reads `/proc/net/dev` and returns `interface`'s current counters, or
/// `None` if the interface is not present.
pub async fn read_counters(interface: &str) -> Option<InterfaceCounters> {
    let contents = tokio::fs::read_to_string("/proc/net/dev").await.ok()?;
    parse_proc_net_dev(&contents, interface)
}

/// Wraps a reading as a [`MeasurementSample`] for the analyzer.
#[must_use]
pub fn to_samples(interface: &str, counters: InterfaceCounters) -> Vec<MeasurementSample> {
    let timestamp = SystemTime::now();
    let mut labels = HashMap::new();
    labels.insert("interface".to_owned(), interface.to_owned());
    vec![
        MeasurementSample {
            timestamp,
            component: "tn-agent".to_owned(),
            metric: "rx_bytes".to_owned(),
            value: counters.rx_bytes as f64,
            labels: labels.clone(),
            severity: Severity::Low,
        },
        MeasurementSample {
            timestamp,
            component: "tn-agent".to_owned(),
            metric: "tx_bytes".to_owned(),
            value: counters.tx_bytes as f64,
            labels,
            severity: Severity::Low,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Inter-|   Receive                                                |  Transmit\n\
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n\
    lo:  123456     100    0    0    0     0          0         0   654321     200    0    0    0     0       0          0\n\
  eth0:  999000     500    0    0    0     0          0         0   111000     300    0    0    0     0       0          0\n";

    #[test]
    fn parses_named_interface() {
        let counters = parse_proc_net_dev(SAMPLE, "eth0").unwrap();
        assert_eq!(counters.rx_bytes, 999_000);
        assert_eq!(counters.tx_bytes, 111_000);
    }

    #[test]
    fn missing_interface_yields_none() {
        assert!(parse_proc_net_dev(SAMPLE, "vxlan500").is_none());
    }
}
