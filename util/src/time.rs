//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a frequency in Hz into a period in seconds.
///
/// Returns `None` for non-positive or non-finite frequencies.
pub fn hz_to_period_s(frequency_hz: f64) -> Option<f64> {
    if frequency_hz.is_finite() && frequency_hz > 0.0 {
        Some(1.0 / frequency_hz)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }

    #[test]
    fn test_hz_to_period() {
        assert_eq!(hz_to_period_s(4.0), Some(0.25));
        assert_eq!(hz_to_period_s(0.0), None);
        assert_eq!(hz_to_period_s(-2.0), None);
    }
}
