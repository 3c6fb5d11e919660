//! Per-interface HTB/netem traffic-control manager (`spec.md` §4.7.1).

pub mod error;
pub mod manager;
pub mod monitor;

pub use error::TcError;
pub use manager::TcManager;
pub use monitor::{InterfaceCounters, read_counters, to_samples};
