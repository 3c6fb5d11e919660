//! Failure kinds for the VXLAN manager (`spec.md` §4.6).

#[derive(Debug, thiserror::Error)]
pub enum VxlanError {
    #[error("rejected by the secure subprocess layer: {0}")]
    ValidationFailure(#[from] mano_subprocess::SubprocessError),
    #[error("worker pool slot not acquired within {0:?}")]
    OperationTimeout(std::time::Duration),
    #[error("kernel operation failed for VNI {vni}: {message}")]
    KernelError { vni: u32, message: String },
    #[error("permission denied operating on VNI {vni}: {message}")]
    PermissionDenied { vni: u32, message: String },
    #[error("overlay IP computed for VNI {vni} is invalid: {source}")]
    InvalidOverlay {
        vni: u32,
        #[source]
        source: mano_core::OverlayIpError,
    },
}

impl VxlanError {
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}
