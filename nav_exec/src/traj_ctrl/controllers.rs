//! # Trajectory controllers module
//!
//! This module provides the feedback linearisation controller used by TrajCtrl, and the
//! velocity command it produces.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

// Internal
use super::{Params, TrajCtrlError};
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A body frame velocity command for a unicycle (differential drive) robot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    /// Forward speed, positive forwards
    pub linear_ms: f64,

    /// Turn rate, positive anticlockwise
    pub angular_rads: f64,
}

/// Feedback linearisation controller.
///
/// With the controlled point `P = position + epsilon * forward`, the control law is
///
/// ```text
/// e = target - P
/// u = K e
/// v = u_x cos(h) + u_y sin(h)
/// w = (-u_x sin(h) + u_y cos(h)) / epsilon
/// ```
///
/// where `K` is the positive diagonal gain matrix and `h` the robot heading.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackLin {
    epsilon_m: f64,

    gain: Matrix2<f64>,
}

/// The result of one controller evaluation.
#[derive(Debug, Copy, Clone)]
pub struct FeedbackLinOutput {
    pub twist: Twist,

    /// Position error of the controlled point in the map frame
    pub error_m: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Twist {
    pub fn new(linear_ms: f64, angular_rads: f64) -> Self {
        Self {
            linear_ms,
            angular_rads,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

impl FeedbackLin {
    /// Create a new controller.
    ///
    /// Epsilon and both gains must be strictly positive, otherwise an `InvalidConfig` error is
    /// returned.
    pub fn new(epsilon_m: f64, k_x: f64, k_y: f64) -> Result<Self, TrajCtrlError> {
        if !(epsilon_m > 0.0) {
            return Err(TrajCtrlError::InvalidConfig(format!(
                "epsilon must be positive, got {}",
                epsilon_m
            )));
        }
        if !(k_x > 0.0) || !(k_y > 0.0) {
            return Err(TrajCtrlError::InvalidConfig(format!(
                "gains must be positive, got k_x = {}, k_y = {}",
                k_x, k_y
            )));
        }

        Ok(Self {
            epsilon_m,
            gain: Matrix2::from_diagonal(&Vector2::new(k_x, k_y)),
        })
    }

    pub fn from_params(params: &Params) -> Result<Self, TrajCtrlError> {
        Self::new(params.epsilon_m, params.k_x, params.k_y)
    }

    pub fn epsilon_m(&self) -> f64 {
        self.epsilon_m
    }

    /// The point actually being controlled.
    pub fn controlled_point(&self, pose: &Pose) -> Vector2<f64> {
        pose.point_ahead(self.epsilon_m)
    }

    /// Compute the raw (unlimited) command driving the robot towards the target.
    pub fn compute(&self, pose: &Pose, target: &Pose) -> FeedbackLinOutput {
        let error_m = target.position_m - self.controlled_point(pose);

        // World frame velocity demand on the controlled point
        let u = self.gain * error_m;

        let (sin_h, cos_h) = pose.heading().sin_cos();
        let twist = Twist {
            linear_ms: u.x * cos_h + u.y * sin_h,
            angular_rads: (-u.x * sin_h + u.y * cos_h) / self.epsilon_m,
        };

        trace!(
            "FeedbackLin: error = ({:.3}, {:.3}) m, v = {:.3} m/s, w = {:.3} rad/s",
            error_m.x,
            error_m.y,
            twist.linear_ms,
            twist.angular_rads
        );

        FeedbackLinOutput { twist, error_m }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_zero_error() {
        let ctrl = FeedbackLin::new(0.2, 1.5, 0.7).unwrap();

        for &heading in [0.0, 1.0, -2.5, FRAC_PI_2].iter() {
            let pose = Pose::new(3.0, -1.0, heading);
            let target = Pose::from_position(pose.point_ahead(0.2), 0.0);

            let out = ctrl.compute(&pose, &target);

            assert!(out.twist.linear_ms.abs() < 1e-12);
            assert!(out.twist.angular_rads.abs() < 1e-12);
            assert!(out.error_m.norm() < 1e-12);
        }
    }

    #[test]
    fn test_straight_ahead() {
        let ctrl = FeedbackLin::new(0.1, 2.0, 2.0).unwrap();
        let pose = Pose::new(0.0, 0.0, 0.0);
        let target = Pose::new(1.1, 0.0, 0.0);

        let out = ctrl.compute(&pose, &target);

        // e = (1, 0), u = (2, 0)
        assert!((out.twist.linear_ms - 2.0).abs() < 1e-12);
        assert!(out.twist.angular_rads.abs() < 1e-12);
    }

    #[test]
    fn test_target_to_the_left() {
        let ctrl = FeedbackLin::new(0.5, 1.0, 1.0).unwrap();
        let pose = Pose::new(0.0, 0.0, 0.0);
        let target = Pose::new(0.5, 1.0, 0.0);

        let out = ctrl.compute(&pose, &target);

        // e = (0, 1), no forward speed, turn left at 1 / epsilon
        assert!(out.twist.linear_ms.abs() < 1e-12);
        assert!((out.twist.angular_rads - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotated_frame() {
        // Facing +Y, target straight ahead
        let ctrl = FeedbackLin::new(0.1, 1.0, 1.0).unwrap();
        let pose = Pose::new(0.0, 0.0, FRAC_PI_2);
        let target = Pose::new(0.0, 1.1, 0.0);

        let out = ctrl.compute(&pose, &target);

        assert!((out.twist.linear_ms - 1.0).abs() < 1e-12);
        assert!(out.twist.angular_rads.abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            FeedbackLin::new(0.0, 1.0, 1.0),
            Err(TrajCtrlError::InvalidConfig(_))
        ));
        assert!(matches!(
            FeedbackLin::new(0.1, -1.0, 1.0),
            Err(TrajCtrlError::InvalidConfig(_))
        ));
        assert!(FeedbackLin::new(f64::NAN, 1.0, 1.0).is_err());
    }
}
