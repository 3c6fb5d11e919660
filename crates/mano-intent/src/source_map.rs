//! Byte spans of the input text each extracted field was sourced from
//! (`spec.md` §4.2 expansion: debug aid for the orchestrator API).

use std::collections::HashMap;

/// Maps a field name (`"class"`, `"bandwidth_mbps"`, `"latency_ms"`,
/// `"jitter_ms"`, `"loss_ratio"`, `"reliability"`) to the `[start, end)`
/// byte span in the original text it was extracted from. Fields filled
/// from the class default profile are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap(HashMap<&'static str, (usize, usize)>);

impl SourceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field: &'static str, span: (usize, usize)) {
        self.0.insert(field, span);
    }

    #[must_use]
    pub fn span_of(&self, field: &str) -> Option<(usize, usize)> {
        self.0.get(field).copied()
    }

    #[must_use]
    pub fn is_sourced(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn sourced_fields(&self) -> usize {
        self.0.len()
    }
}
