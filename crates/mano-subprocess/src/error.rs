//! Failure kinds for the secure subprocess layer (`spec.md` §4.1).

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SubprocessError {
    #[error("binary {binary} is not registered in the secure subprocess allow-list")]
    NotAllowed { binary: String },
    #[error("argument {index} rejected: {reason}")]
    ArgRejected { index: usize, reason: String },
    #[error("command {command} timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
    #[error("command {command} produced output larger than the {limit_bytes} byte cap")]
    OutputTooLarge { command: String, limit_bytes: usize },
    #[error("command {command} exited with status {code:?}")]
    ExitNonZero {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("failed to spawn {command}: {message}")]
    Spawn { command: String, message: String },
}
