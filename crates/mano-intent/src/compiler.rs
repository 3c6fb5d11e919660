//! Pattern-driven natural-language → QoS descriptor compiler
//! (`spec.md` §4.2).

use mano_core::{QosDescriptor, SliceClass};

use crate::{
    error::IntentError,
    patterns::{
        BANDWIDTH, EMBB_KEYWORDS, JITTER, LATENCY, LOSS, MMTC_KEYWORDS, RELIABILITY_DECIMAL,
        RELIABILITY_NINES, RELIABILITY_PERCENT, URLLC_KEYWORDS, nines_to_reliability,
    },
    source_map::SourceMap,
};

const MAX_INTENT_BYTES: usize = 4 * 1024;

/// Field weights used for the confidence score (`spec.md` §4.2: "class =
/// 2, BW = 2, latency = 2, others = 1").
const WEIGHT_CLASS: u32 = 2;
const WEIGHT_BANDWIDTH: u32 = 2;
const WEIGHT_LATENCY: u32 = 2;
const WEIGHT_JITTER: u32 = 1;
const WEIGHT_LOSS: u32 = 1;
const WEIGHT_RELIABILITY: u32 = 1;
const TOTAL_WEIGHT: u32 =
    WEIGHT_CLASS + WEIGHT_BANDWIDTH + WEIGHT_LATENCY + WEIGHT_JITTER + WEIGHT_LOSS + WEIGHT_RELIABILITY;

/// Result of compiling an operator's free-form intent text.
#[derive(Debug, Clone)]
pub struct CompiledIntent {
    pub descriptor: QosDescriptor,
    pub confidence: u8,
    pub source_map: SourceMap,
}

/// Stateless, thread-safe compiler. Holds no per-instance data; all
/// regex patterns live in `LazyLock` statics shared across every clone.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentCompiler;

impl IntentCompiler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub fn compile(&self, text: &str) -> Result<CompiledIntent, IntentError> {
        compile(text)
    }
}

/// Pure function form, usable without constructing a compiler.
pub fn compile(text: &str) -> Result<CompiledIntent, IntentError> {
    if text.trim().is_empty() {
        return Err(IntentError::EmptyInput);
    }
    if text.len() > MAX_INTENT_BYTES {
        return Err(IntentError::TooLong { len: text.len() });
    }

    let mut source_map = SourceMap::new();
    let mut matched_weight = 0u32;

    let class = detect_class(text, &mut source_map, &mut matched_weight);
    let profile = mano_config::profile_for(class);

    let bandwidth_mbps = extract_bandwidth(text, &mut source_map, &mut matched_weight)
        .unwrap_or(profile.bandwidth_mbps);
    let latency_ms =
        extract_latency(text, &mut source_map, &mut matched_weight).unwrap_or(profile.latency_ms);
    let jitter_ms =
        extract_jitter(text, &mut source_map, &mut matched_weight).unwrap_or(profile.jitter_ms);
    let loss_ratio =
        extract_loss(text, &mut source_map, &mut matched_weight).unwrap_or(profile.loss_ratio);
    let reliability = extract_reliability(text, &mut source_map, &mut matched_weight)
        .or(profile.reliability);

    let descriptor = QosDescriptor::new(
        class,
        bandwidth_mbps,
        latency_ms,
        jitter_ms,
        loss_ratio,
        reliability,
        5,
        class.as_str().to_owned(),
    )?;

    let confidence = ((matched_weight * 100) / TOTAL_WEIGHT).min(100) as u8;

    Ok(CompiledIntent {
        descriptor,
        confidence,
        source_map,
    })
}

fn detect_class(text: &str, source_map: &mut SourceMap, matched_weight: &mut u32) -> SliceClass {
    if let Some(m) = EMBB_KEYWORDS.find(text) {
        source_map.record("class", (m.start(), m.end()));
        *matched_weight += WEIGHT_CLASS;
        return SliceClass::Embb;
    }
    if let Some(m) = URLLC_KEYWORDS.find(text) {
        source_map.record("class", (m.start(), m.end()));
        *matched_weight += WEIGHT_CLASS;
        return SliceClass::Urllc;
    }
    if let Some(m) = MMTC_KEYWORDS.find(text) {
        source_map.record("class", (m.start(), m.end()));
        *matched_weight += WEIGHT_CLASS;
        return SliceClass::Mmtc;
    }
    SliceClass::Balanced
}

fn extract_bandwidth(text: &str, source_map: &mut SourceMap, matched_weight: &mut u32) -> Option<f64> {
    let caps = BANDWIDTH.captures(text)?;
    let whole = caps.get(0)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let normalised = if unit == "gbps" { value * 1000.0 } else { value };
    source_map.record("bandwidth_mbps", (whole.start(), whole.end()));
    *matched_weight += WEIGHT_BANDWIDTH;
    Some(normalised)
}

fn extract_latency(text: &str, source_map: &mut SourceMap, matched_weight: &mut u32) -> Option<f64> {
    let caps = LATENCY.captures(text)?;
    let whole = caps.get(0)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    source_map.record("latency_ms", (whole.start(), whole.end()));
    *matched_weight += WEIGHT_LATENCY;
    Some(value)
}

fn extract_jitter(text: &str, source_map: &mut SourceMap, matched_weight: &mut u32) -> Option<f64> {
    let caps = JITTER.captures(text)?;
    let whole = caps.get(0)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    source_map.record("jitter_ms", (whole.start(), whole.end()));
    *matched_weight += WEIGHT_JITTER;
    Some(value)
}

fn extract_loss(text: &str, source_map: &mut SourceMap, matched_weight: &mut u32) -> Option<f64> {
    let caps = LOSS.captures(text)?;
    let whole = caps.get(0)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    source_map.record("loss_ratio", (whole.start(), whole.end()));
    *matched_weight += WEIGHT_LOSS;
    Some(value / 100.0)
}

fn extract_reliability(text: &str, source_map: &mut SourceMap, matched_weight: &mut u32) -> Option<f64> {
    if let Some(caps) = RELIABILITY_NINES.captures(text) {
        let whole = caps.get(0)?;
        let value = nines_to_reliability(caps.get(1)?.as_str())?;
        source_map.record("reliability", (whole.start(), whole.end()));
        *matched_weight += WEIGHT_RELIABILITY;
        return Some(value);
    }
    if let Some(caps) = RELIABILITY_PERCENT.captures(text) {
        let whole = caps.get(0)?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        source_map.record("reliability", (whole.start(), whole.end()));
        *matched_weight += WEIGHT_RELIABILITY;
        return Some(value / 100.0);
    }
    if let Some(caps) = RELIABILITY_DECIMAL.captures(text) {
        let whole = caps.get(0)?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        source_map.record("reliability", (whole.start(), whole.end()));
        *matched_weight += WEIGHT_RELIABILITY;
        return Some(value);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_intent() {
        assert_eq!(compile("").unwrap_err(), IntentError::EmptyInput);
        assert_eq!(compile("   ").unwrap_err(), IntentError::EmptyInput);
    }

    #[test]
    fn rejects_intent_over_four_kib() {
        let text = "a".repeat(4 * 1024 + 1);
        match compile(&text).unwrap_err() {
            IntentError::TooLong { len } => assert_eq!(len, 4 * 1024 + 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn accepts_intent_at_exactly_four_kib() {
        let text = format!("streaming video {}", "a".repeat(4 * 1024 - 17));
        assert!(text.len() <= 4 * 1024);
        assert!(compile(&text).is_ok());
    }

    #[test]
    fn compiles_urllc_autonomous_driving_scenario() {
        let intent = compile(
            "autonomous driving needs ultra-low latency 1ms, reliability five nines, 10 Mbps",
        )
        .unwrap();
        assert_eq!(intent.descriptor.class, SliceClass::Urllc);
        assert!((intent.descriptor.bandwidth_mbps - 10.0).abs() < f64::EPSILON);
        assert!((intent.descriptor.latency_ms - 1.0).abs() < f64::EPSILON);
        assert!((intent.descriptor.reliability.unwrap() - 0.99999).abs() < 1e-9);
        assert!(intent.source_map.is_sourced("class"));
        assert!(intent.source_map.is_sourced("reliability"));
    }

    #[test]
    fn compiles_embb_streaming_scenario() {
        let intent = compile("deliver 4K streaming, 100 Mbps, latency under 20 ms").unwrap();
        assert_eq!(intent.descriptor.class, SliceClass::Embb);
        assert!((intent.descriptor.bandwidth_mbps - 100.0).abs() < f64::EPSILON);
        assert!((intent.descriptor.latency_ms - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn compiles_mmtc_sensor_scenario() {
        let intent = compile("10000 smart-city sensors, 1 Mbps each, 100 ms acceptable").unwrap();
        assert_eq!(intent.descriptor.class, SliceClass::Mmtc);
        assert!((intent.descriptor.bandwidth_mbps - 1.0).abs() < f64::EPSILON);
        assert!((intent.descriptor.latency_ms - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrecognised_class_defaults_to_balanced_with_low_confidence() {
        let intent = compile("please set something up").unwrap();
        assert_eq!(intent.descriptor.class, SliceClass::Balanced);
        assert!(intent.confidence < 50);
    }

    #[test]
    fn fully_sourced_intent_has_high_confidence() {
        let intent = compile(
            "autonomous driving needs ultra-low latency 1ms, reliability five nines, 10 Mbps, \
             jitter 0.5ms, loss 0.01%",
        )
        .unwrap();
        assert!(intent.confidence >= 88);
    }
}
