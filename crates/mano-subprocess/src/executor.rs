//! The single gate for all external-process execution (`spec.md` §4.1).

use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    error::SubprocessError,
    registry::{BinarySpec, lookup},
    validate::{validate_arg, validate_args},
};

/// A domain validator runs *before* the generic allow-list check
/// (`spec.md` §4.1: "iperf3 must be either client xor server"; "ip link
/// add must be `type vxlan` with a 24-bit VNI").
pub trait CommandValidator {
    fn validate(&self, args: &[String]) -> Result<(), SubprocessError>;
}

impl<F> CommandValidator for F
where
    F: Fn(&[String]) -> Result<(), SubprocessError>,
{
    fn validate(&self, args: &[String]) -> Result<(), SubprocessError> {
        self(args)
    }
}

#[derive(Clone, Copy, Default)]
pub struct SecureExecutor;

impl SecureExecutor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub async fn execute(&self, cmd: &str, args: &[String]) -> Result<Output, SubprocessError> {
        let spec = lookup(cmd).ok_or_else(|| SubprocessError::NotAllowed {
            binary: cmd.to_owned(),
        })?;
        validate_args(spec, args)?;
        run(spec, args).await
    }

    pub async fn execute_with_validator(
        &self,
        cmd: &str,
        validator: &dyn CommandValidator,
        args: &[String],
    ) -> Result<Output, SubprocessError> {
        let spec = lookup(cmd).ok_or_else(|| SubprocessError::NotAllowed {
            binary: cmd.to_owned(),
        })?;
        // Dangerous-character rejection always runs first, even ahead of
        // the domain validator, matching the layered contract in
        // `spec.md` §4.1.
        for (index, arg) in args.iter().enumerate() {
            crate::validate::reject_dangerous_chars(index, arg)?;
        }
        validator.validate(args)?;
        validate_args(spec, args)?;
        run(spec, args).await
    }
}

async fn run(spec: &BinarySpec, args: &[String]) -> Result<Output, SubprocessError> {
    let command_line = format!("{} {}", spec.name, args.join(" "));

    let mut command = Command::new(spec.name);
    command
        .args(args)
        .env_clear()
        .env("PATH", "/usr/sbin:/usr/bin:/sbin:/bin")
        .env("LANG", "C")
        .env("LC_ALL", "C")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(command = %command_line, "executing subprocess");

    let output = tokio::time::timeout(spec.timeout, command.output())
        .await
        .map_err(|_| {
            warn!(command = %command_line, timeout_secs = spec.timeout.as_secs(), "subprocess timed out");
            SubprocessError::Timeout {
                command: command_line.clone(),
                timeout_secs: spec.timeout.as_secs(),
            }
        })?
        .map_err(|source| SubprocessError::Spawn {
            command: command_line.clone(),
            message: source.to_string(),
        })?;

    if output.stdout.len() + output.stderr.len() > spec.max_output_bytes {
        warn!(command = %command_line, limit_bytes = spec.max_output_bytes, "subprocess output too large");
        return Err(SubprocessError::OutputTooLarge {
            command: command_line,
            limit_bytes: spec.max_output_bytes,
        });
    }

    if !output.status.success() {
        return Err(SubprocessError::ExitNonZero {
            command: command_line,
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    debug!(command = %command_line, "subprocess completed");
    Ok(output)
}

/// Helper for domain validators that only need to check one argument's
/// shape without the generic allow-list (used when composing several
/// per-field regex checks before the generic pass runs).
pub fn validate_single(spec_name: &str, index: usize, arg: &str) -> Result<(), SubprocessError> {
    let spec = lookup(spec_name).ok_or_else(|| SubprocessError::NotAllowed {
        binary: spec_name.to_owned(),
    })?;
    validate_arg(spec, index, arg)
}
