//! Secure subprocess layer: the single gate through which every external
//! binary invocation must pass (`spec.md` §4.1).

pub mod error;
pub mod executor;
pub mod registry;
pub mod validate;
pub mod validators;

pub use error::SubprocessError;
pub use executor::{CommandValidator, SecureExecutor, validate_single};
pub use registry::{BinarySpec, DEFAULT_REGISTRY, lookup};
pub use validators::{parse_bandwidth_mbps, validate_ip_link_add_vxlan, validate_iperf3, validate_ping};
