//! Pre-compiled regex banks. Compiled exactly once behind `LazyLock`, never
//! per call, so the compiler stays `Send + Sync` and cheap to share behind
//! an `Arc` (`spec.md` §4.2).

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("intent compiler regex patterns are compile-time constants")
}

pub static EMBB_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| ci(r"\b(video|streaming|4k|broadband)\b"));

pub static URLLC_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| ci(r"\b(autonomous|industrial|low-latency|ultra-low latency|robot)\b"));

pub static MMTC_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| ci(r"\b(iot|sensor|sensors|massive|smart-city|meter)\b"));

pub static BANDWIDTH: LazyLock<Regex> =
    LazyLock::new(|| ci(r"(\d+(?:\.\d+)?)\s*(mbps|gbps)"));

pub static LATENCY: LazyLock<Regex> = LazyLock::new(|| ci(r"(\d+(?:\.\d+)?)\s*ms\b"));

pub static JITTER: LazyLock<Regex> =
    LazyLock::new(|| ci(r"jitter[:\s]+(\d+(?:\.\d+)?)\s*ms"));

pub static LOSS: LazyLock<Regex> =
    LazyLock::new(|| ci(r"(?:packet-?loss|loss)[:\s]+(\d+(?:\.\d+)?)\s*%"));

pub static RELIABILITY_NINES: LazyLock<Regex> =
    LazyLock::new(|| ci(r"(one|two|three|four|five|six|seven|eight|nine)\s+nines?"));

pub static RELIABILITY_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| ci(r"reliability[:\s]+(\d+(?:\.\d+)?)\s*%"));

pub static RELIABILITY_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| ci(r"reliability[:\s]+(0?\.\d+)"));

#[must_use]
pub fn nines_to_reliability(word: &str) -> Option<f64> {
    let count = match word.to_ascii_lowercase().as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        _ => return None,
    };
    Some(1.0 - 10f64.powi(-count))
}
