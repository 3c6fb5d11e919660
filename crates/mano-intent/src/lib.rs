//! Natural-language intent compiler: free-form operator text → validated
//! QoS descriptor with a confidence score (`spec.md` §4.2).

pub mod compiler;
pub mod error;
pub mod patterns;
pub mod source_map;

pub use compiler::{CompiledIntent, IntentCompiler, compile};
pub use error::IntentError;
pub use source_map::SourceMap;
