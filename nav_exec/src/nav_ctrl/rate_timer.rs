//! Fixed rate trigger

use util::time::hz_to_period_s;

/// Decides when a periodic task is due, given a monotonic time in seconds.
#[derive(Debug, Clone)]
pub struct RateTimer {
    period_s: f64,
    last_s: Option<f64>,
}

impl RateTimer {
    /// `None` if the rate is not a positive finite number.
    pub fn new(rate_hz: f64) -> Option<Self> {
        hz_to_period_s(rate_hz).map(|period_s| Self {
            period_s,
            last_s: None,
        })
    }

    pub fn period_s(&self) -> f64 {
        self.period_s
    }

    /// Returns true (and restarts the period) if at least one period has passed since the last
    /// time this returned true. Always true on the first call.
    pub fn is_due(&mut self, now_s: f64) -> bool {
        match self.last_s {
            Some(last_s) if now_s - last_s < self.period_s => false,
            _ => {
                self.last_s = Some(now_s);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_s = None;
    }
}
