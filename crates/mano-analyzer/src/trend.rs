//! Trend classification over a rolling window of scores
//! (`spec.md` §4.8).

use mano_core::Trend;

/// Classifies the trend from the last up-to-three scores of a 10-minute
/// window, oldest first.
///
/// - strictly increasing by >= 20% per step -> `Critical`
/// - increasing by >= 10% overall (first to last) -> `Degrading`
/// - decreasing by >= 10% overall -> `Improving`
/// - otherwise -> `Stable`
#[must_use]
pub fn classify(scores: &[f64]) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }

    let strictly_rising_20pct = scores.windows(2).all(|pair| {
        let [prev, next] = pair else { return false };
        *next > *prev && step_change(*prev, *next) >= 0.20
    });
    if scores.len() >= 3 && strictly_rising_20pct {
        return Trend::Critical;
    }

    let first = scores[0];
    let last = scores[scores.len() - 1];
    let overall_change = step_change(first, last);

    if last > first && overall_change >= 0.10 {
        Trend::Degrading
    } else if last < first && overall_change >= 0.10 {
        Trend::Improving
    } else {
        Trend::Stable
    }
}

fn step_change(prev: f64, next: f64) -> f64 {
    if prev.abs() < f64::EPSILON {
        if next.abs() < f64::EPSILON { 0.0 } else { 1.0 }
    } else {
        (next - prev).abs() / prev.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_consecutive_20pct_rises_are_critical() {
        assert_eq!(classify(&[10.0, 12.5, 16.0]), Trend::Critical);
    }

    #[test]
    fn ten_percent_overall_rise_is_degrading() {
        assert_eq!(classify(&[50.0, 52.0, 56.0]), Trend::Degrading);
    }

    #[test]
    fn ten_percent_overall_fall_is_improving() {
        assert_eq!(classify(&[56.0, 52.0, 50.0]), Trend::Improving);
    }

    #[test]
    fn flat_scores_are_stable() {
        assert_eq!(classify(&[50.0, 50.5, 49.8]), Trend::Stable);
    }

    #[test]
    fn single_sample_is_stable() {
        assert_eq!(classify(&[50.0]), Trend::Stable);
    }
}
