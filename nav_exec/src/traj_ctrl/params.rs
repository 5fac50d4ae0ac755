//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::TrajCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Distance ahead of the rotation centre of the controlled point. Must be strictly positive,
    /// and small compared to the robot footprint.
    pub epsilon_m: f64,

    /// Gain on the map X error of the controlled point
    pub k_x: f64,

    /// Gain on the map Y error of the controlled point
    pub k_y: f64,

    /// Nominal maximum forward speed. Percentage speed limits are relative to this, and it caps
    /// the speed when no limit is set.
    pub max_linear_speed_ms: f64,

    /// Plan poses closer to the robot than this are skipped when choosing the target.
    pub lookahead_dist_m: f64,

    /// Once the robot is this close to the last pose of the plan the target locks onto it.
    pub final_tolerance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters, so that bad configuration is caught before the first command.
    pub fn validate(&self) -> Result<(), TrajCtrlError> {
        let positive = [
            ("epsilon_m", self.epsilon_m),
            ("k_x", self.k_x),
            ("k_y", self.k_y),
            ("max_linear_speed_ms", self.max_linear_speed_ms),
        ];

        for (name, value) in positive.iter() {
            if !(*value > 0.0) || !value.is_finite() {
                return Err(TrajCtrlError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("lookahead_dist_m", self.lookahead_dist_m),
            ("final_tolerance_m", self.final_tolerance_m),
        ];

        for (name, value) in non_negative.iter() {
            if !(*value >= 0.0) || !value.is_finite() {
                return Err(TrajCtrlError::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
