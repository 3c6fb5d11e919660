//! `AnalyzerOverload` (`spec.md` §7): informational only, logged and
//! dropped, never propagated to producers.

#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyzerError {
    #[error("ingestion queue saturated, dropped oldest sample for component {component:?}")]
    Overload { component: String },
}
