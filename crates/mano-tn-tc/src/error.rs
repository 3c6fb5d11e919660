//! Failure kinds for the traffic-control manager (`spec.md` §4.7.1).

#[derive(Debug, thiserror::Error)]
pub enum TcError {
    #[error("interface name rejected: {0}")]
    ValidationFailure(#[from] mano_subprocess::SubprocessError),
    #[error("shaping for interface {interface} was torn down but could not be re-applied: {message}")]
    ShapingLost { interface: String, message: String },
    #[error("tc operation on {interface} failed: {message}")]
    KernelError { interface: String, message: String },
}
