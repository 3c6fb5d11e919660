//! Cryptographically secure randomness for backoff jitter, alert ids, and
//! any token derivation (`spec.md` §9, "Cryptographic randomness is
//! required ... no predictable PRNG is permitted on control-plane paths").

use std::time::Duration;

use rand::{Rng, RngCore, rngs::OsRng};

#[must_use]
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Exponential backoff with up to 25% jitter (`spec.md` §4.4 step 4):
/// 1s / 2s / 4s base, jitter drawn from the CSPRNG.
#[must_use]
pub fn backoff_with_jitter(attempt: u32) -> Duration {
    let base_secs = 1u64 << attempt.min(10);
    let base = Duration::from_secs(base_secs);
    let jitter_fraction = OsRng.r#gen::<f64>() * 0.25;
    base.mul_f64(1.0 + jitter_fraction)
}

/// A lowercase hex alert id such as `bottleneck_placement-calc_1732550400`
/// callers compose from this random suffix plus their own prefix.
#[must_use]
pub fn random_hex_suffix(len_bytes: usize) -> String {
    let mut bytes = vec![0u8; len_bytes];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_with_attempt() {
        let first = backoff_with_jitter(0);
        let third = backoff_with_jitter(2);
        assert!(first.as_secs_f64() < third.as_secs_f64());
    }

    #[test]
    fn backoff_jitter_stays_within_25_percent() {
        for attempt in 0..3 {
            let base = 1u64 << attempt;
            let d = backoff_with_jitter(attempt);
            assert!(d.as_secs_f64() >= base as f64);
            assert!(d.as_secs_f64() <= base as f64 * 1.25 + 0.001);
        }
    }
}
