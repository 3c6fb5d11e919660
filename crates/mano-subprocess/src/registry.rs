//! The allow-list: one entry per permitted binary (`spec.md` §4.1).

use std::{collections::HashSet, sync::LazyLock, time::Duration};

use regex::Regex;

/// Everything a binary is allowed to be invoked with.
pub struct BinarySpec {
    pub name: &'static str,
    pub literal_switches: HashSet<&'static str>,
    pub patterns: Vec<Regex>,
    pub max_args: usize,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl BinarySpec {
    /// An argument is accepted if it is a literal allow-listed switch or
    /// matches at least one regex pattern (`spec.md` §4.1 contract, step
    /// 2).
    #[must_use]
    pub fn accepts(&self, arg: &str) -> bool {
        self.literal_switches.contains(arg) || self.patterns.iter().any(|p| p.is_match(arg))
    }
}

/// Pattern fragments reused across multiple binaries.
fn ipv4_pattern() -> &'static str {
    r"^(\d{1,3}\.){3}\d{1,3}(/\d{1,2})?$"
}

fn iface_pattern() -> &'static str {
    r"^[a-zA-Z][a-zA-Z0-9_.\-]{0,14}$"
}

fn numeric_pattern() -> &'static str {
    r"^[0-9]{1,10}$"
}

/// The default, immutable-after-initialisation registry. This is the one
/// permitted global mutable singleton the spec allows (`spec.md` §9,
/// Design Notes) — and it is not actually mutable once built.
pub static DEFAULT_REGISTRY: LazyLock<Vec<BinarySpec>> = LazyLock::new(build_default_registry);

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("registry regex patterns are compile-time constants")
}

fn build_default_registry() -> Vec<BinarySpec> {
    vec![
        BinarySpec {
            name: "ip",
            literal_switches: [
                "link", "add", "set", "delete", "show", "type", "vxlan", "up", "down", "dev",
                "id", "remote", "local", "dstport", "nolearning", "addr", "route",
            ]
            .into_iter()
            .collect(),
            patterns: vec![re(iface_pattern()), re(ipv4_pattern()), re(numeric_pattern())],
            max_args: 24,
            timeout: Duration::from_secs(10),
            max_output_bytes: 64 * 1024,
        },
        BinarySpec {
            name: "tc",
            literal_switches: [
                "qdisc", "class", "filter", "add", "del", "change", "replace", "dev", "root",
                "parent", "handle", "htb", "netem", "default", "rate", "ceil", "burst", "prio",
                "u32", "match", "flowid", "delay", "loss", "protocol", "ip",
            ]
            .into_iter()
            .collect(),
            patterns: vec![
                re(iface_pattern()),
                re(r"^[0-9a-fA-F]{1,4}:[0-9a-fA-F]{0,4}$"),
                re(r"^[0-9]{1,10}(kbit|mbit|gbit|kbps|mbps)$"),
                re(r"^[0-9]{1,10}(ms|%)?$"),
                re(numeric_pattern()),
            ],
            max_args: 32,
            timeout: Duration::from_secs(10),
            max_output_bytes: 64 * 1024,
        },
        BinarySpec {
            name: "bridge",
            literal_switches: ["fdb", "add", "del", "append", "to", "dev", "dst", "self"]
                .into_iter()
                .collect(),
            patterns: vec![
                re(iface_pattern()),
                re(ipv4_pattern()),
                re(r"^([0-9a-fA-F]{2}:){5}[0-9a-fA-F]{2}$"),
            ],
            max_args: 16,
            timeout: Duration::from_secs(10),
            max_output_bytes: 32 * 1024,
        },
        BinarySpec {
            name: "iperf3",
            literal_switches: [
                "-c", "-s", "-p", "-t", "-b", "-J", "-D", "-1", "--connect-timeout",
            ]
            .into_iter()
            .collect(),
            patterns: vec![
                re(ipv4_pattern()),
                re(iface_pattern()),
                re(r"^[0-9]{1,5}$"),
                re(r"^[0-9]{1,4}$"),
                re(r"^[0-9]{1,6}(K|M|G)?$"),
            ],
            max_args: 16,
            timeout: Duration::from_secs(5 * 60),
            max_output_bytes: 256 * 1024,
        },
        BinarySpec {
            name: "ping",
            literal_switches: ["-c", "-W", "-i", "-q"].into_iter().collect(),
            patterns: vec![re(ipv4_pattern()), re(numeric_pattern())],
            max_args: 8,
            timeout: Duration::from_secs(30),
            max_output_bytes: 32 * 1024,
        },
    ]
}

#[must_use]
pub fn lookup(binary: &str) -> Option<&'static BinarySpec> {
    DEFAULT_REGISTRY.iter().find(|spec| spec.name == binary)
}
