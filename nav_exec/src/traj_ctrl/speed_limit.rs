//! # Speed limits
//!
//! A speed limit is either an absolute cap on the forward speed or a percentage of the nominal
//! maximum speed. Only the forward speed is limited, when it is clamped the turn rate is scaled by
//! the same ratio so the robot follows the same arc, just slower.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{Twist, TrajCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command after the speed limit has been applied.
#[derive(Debug, Copy, Clone)]
pub struct LimitedTwist {
    pub twist: Twist,

    /// Ratio applied to both speeds, 1.0 when no clamping happened.
    pub ratio: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpeedLimit {
    /// Only the nominal maximum speed applies.
    Unlimited,

    /// Absolute cap on the forward speed in m/s
    Absolute(f64),

    /// Cap as a percentage (0, 100] of the nominal maximum speed
    Percentage(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SpeedLimit {
    fn default() -> Self {
        SpeedLimit::Unlimited
    }
}

impl SpeedLimit {
    /// Interpret a speed limit request.
    ///
    /// A value of exactly zero removes the limit. Negative values, and percentages above 100, are
    /// rejected.
    pub fn from_value(value: f64, is_percentage: bool) -> Result<Self, TrajCtrlError> {
        if !value.is_finite() || value < 0.0 {
            return Err(TrajCtrlError::InvalidConfig(format!(
                "speed limit must be a non-negative number, got {}",
                value
            )));
        }

        if value == 0.0 {
            return Ok(SpeedLimit::Unlimited);
        }

        if is_percentage {
            if value > 100.0 {
                return Err(TrajCtrlError::InvalidConfig(format!(
                    "speed limit percentage must be at most 100, got {}",
                    value
                )));
            }
            Ok(SpeedLimit::Percentage(value))
        } else {
            Ok(SpeedLimit::Absolute(value))
        }
    }

    /// The forward speed cap given the nominal maximum speed. No limit can raise the cap above
    /// the nominal maximum.
    pub fn cap_ms(&self, nominal_max_ms: f64) -> f64 {
        match self {
            SpeedLimit::Unlimited => nominal_max_ms,
            SpeedLimit::Absolute(v) => v.min(nominal_max_ms),
            SpeedLimit::Percentage(p) => nominal_max_ms * p / 100.0,
        }
    }

    /// Clamp the command's forward speed to the cap, scaling the turn rate by the same ratio.
    pub fn apply(&self, twist: Twist, nominal_max_ms: f64) -> LimitedTwist {
        let cap_ms = self.cap_ms(nominal_max_ms);
        let speed_ms = twist.linear_ms.abs();

        if speed_ms <= cap_ms {
            return LimitedTwist { twist, ratio: 1.0 };
        }

        let ratio = cap_ms / speed_ms;

        LimitedTwist {
            twist: Twist {
                linear_ms: twist.linear_ms * ratio,
                angular_rads: twist.angular_rads * ratio,
            },
            ratio,
        }
    }
}
