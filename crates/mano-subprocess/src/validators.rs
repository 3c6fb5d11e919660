//! Domain validators applied ahead of the generic allow-list
//! (`spec.md` §4.1, §4.7.4).

use crate::error::SubprocessError;

/// `ip link add ... type vxlan id <vni> ...` must carry exactly one
/// `type vxlan` pair and a VNI within the 24-bit range.
pub fn validate_ip_link_add_vxlan(args: &[String]) -> Result<(), SubprocessError> {
    let type_idx = args.iter().position(|a| a == "type");
    let Some(type_idx) = type_idx else {
        return Err(SubprocessError::ArgRejected {
            index: 0,
            reason: "ip link add requires 'type vxlan'".to_owned(),
        });
    };
    if args.get(type_idx + 1).map(String::as_str) != Some("vxlan") {
        return Err(SubprocessError::ArgRejected {
            index: type_idx + 1,
            reason: "only 'type vxlan' is permitted".to_owned(),
        });
    }
    let id_idx = args.iter().position(|a| a == "id").ok_or_else(|| SubprocessError::ArgRejected {
        index: type_idx,
        reason: "vxlan link must carry an 'id' (VNI)".to_owned(),
    })?;
    let vni_str = args.get(id_idx + 1).ok_or_else(|| SubprocessError::ArgRejected {
        index: id_idx,
        reason: "missing VNI value after 'id'".to_owned(),
    })?;
    let vni: u32 = vni_str.parse().map_err(|_| SubprocessError::ArgRejected {
        index: id_idx + 1,
        reason: "VNI is not numeric".to_owned(),
    })?;
    mano_core::Vni::new(vni).map_err(|_| SubprocessError::ArgRejected {
        index: id_idx + 1,
        reason: "VNI out of the 24-bit range".to_owned(),
    })?;
    Ok(())
}

/// iperf3 must be exactly client (`-c <host>`) XOR server (`-s`), with a
/// valid port, duration, and bandwidth when present (`spec.md` §4.7.4).
pub fn validate_iperf3(args: &[String]) -> Result<(), SubprocessError> {
    let is_client = args.iter().any(|a| a == "-c");
    let is_server = args.iter().any(|a| a == "-s");
    if is_client == is_server {
        return Err(SubprocessError::ArgRejected {
            index: 0,
            reason: "iperf3 must be either client xor server, never both or neither".to_owned(),
        });
    }

    if let Some(port_idx) = args.iter().position(|a| a == "-p") {
        let port: u16 = args
            .get(port_idx + 1)
            .and_then(|v| v.parse().ok())
            .filter(|p| *p >= 1)
            .ok_or_else(|| SubprocessError::ArgRejected {
                index: port_idx + 1,
                reason: "port must be within 1..=65535".to_owned(),
            })?;
        let _ = port;
    }

    if let Some(duration_idx) = args.iter().position(|a| a == "-t") {
        let duration: u32 = args
            .get(duration_idx + 1)
            .and_then(|v| v.parse().ok())
            .filter(|d| (1..=3600).contains(d))
            .ok_or_else(|| SubprocessError::ArgRejected {
                index: duration_idx + 1,
                reason: "duration must be within 1..=3600 seconds".to_owned(),
            })?;
        let _ = duration;
    }

    if let Some(bw_idx) = args.iter().position(|a| a == "-b") {
        let value = args.get(bw_idx + 1).ok_or_else(|| SubprocessError::ArgRejected {
            index: bw_idx,
            reason: "missing bandwidth value after -b".to_owned(),
        })?;
        parse_bandwidth_mbps(value).ok_or_else(|| SubprocessError::ArgRejected {
            index: bw_idx + 1,
            reason: "bandwidth must parse as Mbps or Gbps".to_owned(),
        })?;
    }

    Ok(())
}

/// Parses `"100M"`, `"1G"`, or a bare number, returning Mbps.
#[must_use]
pub fn parse_bandwidth_mbps(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Some(stripped) = value.strip_suffix('G') {
        return stripped.parse::<f64>().ok().map(|v| v * 1000.0);
    }
    if let Some(stripped) = value.strip_suffix('M') {
        return stripped.parse::<f64>().ok();
    }
    if let Some(stripped) = value.strip_suffix('K') {
        return stripped.parse::<f64>().ok().map(|v| v / 1000.0);
    }
    value.parse::<f64>().ok()
}

/// ping burst: `-c <count>` required, bounded.
pub fn validate_ping(args: &[String]) -> Result<(), SubprocessError> {
    let count_idx = args.iter().position(|a| a == "-c").ok_or_else(|| SubprocessError::ArgRejected {
        index: 0,
        reason: "ping requires -c <count>".to_owned(),
    })?;
    args.get(count_idx + 1)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|c| (1..=3600).contains(c))
        .ok_or_else(|| SubprocessError::ArgRejected {
            index: count_idx + 1,
            reason: "ping count must be within 1..=3600".to_owned(),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_iperf3_without_client_or_server_flag() {
        let args = vec!["-p".to_owned(), "5201".to_owned()];
        assert!(validate_iperf3(&args).is_err());
    }

    #[test]
    fn rejects_iperf3_with_both_client_and_server_flags() {
        let args = vec!["-c".to_owned(), "10.0.0.1".to_owned(), "-s".to_owned()];
        assert!(validate_iperf3(&args).is_err());
    }

    #[test]
    fn accepts_valid_iperf3_client() {
        let args = vec![
            "-c".to_owned(),
            "10.0.0.1".to_owned(),
            "-p".to_owned(),
            "5201".to_owned(),
            "-t".to_owned(),
            "10".to_owned(),
        ];
        assert!(validate_iperf3(&args).is_ok());
    }

    #[test]
    fn validates_vxlan_link_add() {
        let args = vec![
            "link", "add", "vxlan500", "type", "vxlan", "id", "500",
        ]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
        assert!(validate_ip_link_add_vxlan(&args).is_ok());
    }

    #[test]
    fn rejects_vxlan_link_add_with_out_of_range_vni() {
        let args = vec![
            "link", "add", "vxlan0", "type", "vxlan", "id", "99999999",
        ]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
        assert!(validate_ip_link_add_vxlan(&args).is_err());
    }

    #[test]
    fn parses_bandwidth_units() {
        assert_eq!(parse_bandwidth_mbps("100M"), Some(100.0));
        assert_eq!(parse_bandwidth_mbps("1G"), Some(1000.0));
    }
}
