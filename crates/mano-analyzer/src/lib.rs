//! Bottleneck analyzer: correlates per-component measurement samples,
//! classifies degradation modes, and emits severity-ranked alerts
//! (`spec.md` §4.8).

pub mod analyzer;
pub mod classifier;
pub mod error;
pub mod history;
pub mod ingest;
pub mod thresholds;
pub mod trend;

pub use analyzer::BottleneckAnalyzer;
pub use error::AnalyzerError;
pub use history::AnalysisHistory;
pub use ingest::SampleQueue;
