//! Per-agent VXLAN tunnel manager (`spec.md` §4.6): idempotent
//! create/delete, a bounded worker pool, VNI batching for non-critical
//! ops, and asynchronous statistics refresh.

pub mod batching;
pub mod error;
pub mod manager;
pub mod stats;

pub use batching::{BatchHandle, spawn as spawn_batcher};
pub use error::VxlanError;
pub use manager::VxlanManager;
