//! Argument validation shared by the generic allow-list check and any
//! domain validator that runs ahead of it (`spec.md` §4.1 contract).

use crate::{error::SubprocessError, registry::BinarySpec};

/// Rejects shell metacharacters, NUL bytes, and control characters. This
/// runs *before* anything else — even a domain validator is not allowed
/// to see an argument that fails this check.
pub fn reject_dangerous_chars(index: usize, arg: &str) -> Result<(), SubprocessError> {
    const METACHARACTERS: &[char] = &[
        ';', '&', '|', '$', '`', '\\', '\n', '\r', '(', ')', '<', '>', '"', '\'', '{', '}', '*',
        '?', '~', '#', '!',
    ];
    if let Some(bad) = arg.chars().find(|c| METACHARACTERS.contains(c)) {
        return Err(SubprocessError::ArgRejected {
            index,
            reason: format!("contains shell metacharacter '{bad}'"),
        });
    }
    if arg.chars().any(|c| c == '\0') {
        return Err(SubprocessError::ArgRejected {
            index,
            reason: "contains a NUL byte".to_owned(),
        });
    }
    if arg.chars().any(|c| c.is_control()) {
        return Err(SubprocessError::ArgRejected {
            index,
            reason: "contains a control character".to_owned(),
        });
    }
    Ok(())
}

/// Full per-argument validation: dangerous characters, then the
/// literal-or-pattern allow-list (`spec.md` §4.1 contract, steps 1-2).
/// Arguments are never truncated: an over-length argument fails closed
/// rather than being shortened to fit.
pub fn validate_arg(spec: &BinarySpec, index: usize, arg: &str) -> Result<(), SubprocessError> {
    reject_dangerous_chars(index, arg)?;
    if !spec.accepts(arg) {
        return Err(SubprocessError::ArgRejected {
            index,
            reason: format!("'{arg}' is not an allow-listed literal or pattern match"),
        });
    }
    Ok(())
}

pub fn validate_args(spec: &BinarySpec, args: &[String]) -> Result<(), SubprocessError> {
    if args.len() > spec.max_args {
        return Err(SubprocessError::ArgRejected {
            index: spec.max_args,
            reason: format!("argument count {} exceeds max {}", args.len(), spec.max_args),
        });
    }
    for (index, arg) in args.iter().enumerate() {
        validate_arg(spec, index, arg)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::lookup;

    #[test]
    fn rejects_shell_injection_attempt() {
        let spec = lookup("ip").unwrap();
        let args: Vec<String> = vec![
            "link".into(),
            "add".into(),
            "eth0; rm -rf /".into(),
        ];
        let err = validate_args(spec, &args).unwrap_err();
        match err {
            SubprocessError::ArgRejected { index, .. } => assert_eq!(index, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_ip_link_add_vxlan() {
        let spec = lookup("ip").unwrap();
        let args: Vec<String> = vec![
            "link", "add", "vxlan500", "type", "vxlan", "id", "500", "dev", "eth0",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert!(validate_args(spec, &args).is_ok());
    }
}
