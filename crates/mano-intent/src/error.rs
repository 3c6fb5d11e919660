//! Failure kinds for the intent compiler (`spec.md` §4.2).

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum IntentError {
    #[error("intent text is empty")]
    EmptyInput,
    #[error("intent text length {len} exceeds the 4 KiB limit")]
    TooLong { len: usize },
    #[error("derived QoS descriptor is invalid: {0}")]
    Descriptor(#[from] mano_core::QosError),
}
