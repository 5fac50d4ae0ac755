//! # Localisation module
//!
//! Planar pose types used throughout the controller. Localisation itself is provided by an
//! external source, which delivers [`PoseWithCovariance`] updates. Only the mean pose is used.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use nalgebra::{Matrix3, Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the map frame) of the robot, or of a path point.
///
/// The heading is the angle to the positive map X axis, always kept in (-pi, pi].
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PoseSpec", into = "PoseSpec")]
pub struct Pose {
    /// The position in the map frame
    pub position_m: Vector2<f64>,

    heading_rad: f64,
}

/// Flat representation of a pose used in parameter files and archives.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct PoseSpec {
    pub x_m: f64,
    pub y_m: f64,
    #[serde(default)]
    pub heading_rad: f64,
}

/// A pose estimate as delivered by the localisation source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseWithCovariance {
    /// Time at which the estimate is valid
    pub stamp: DateTime<Utc>,

    /// Mean pose
    pub pose: Pose,

    /// Covariance of (x, y, heading). Carried for completeness, not used by the controller.
    pub covariance: Matrix3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Create a new pose, wrapping the heading into (-pi, pi].
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self::from_position(Vector2::new(x_m, y_m), heading_rad)
    }

    pub fn from_position(position_m: Vector2<f64>, heading_rad: f64) -> Self {
        Self {
            position_m,
            heading_rad: wrap_to_pi(heading_rad),
        }
    }

    /// Return the heading (angle to the positive X axis) in radians, in (-pi, pi].
    pub fn heading(&self) -> f64 {
        self.heading_rad
    }

    pub fn set_heading(&mut self, heading_rad: f64) {
        self.heading_rad = wrap_to_pi(heading_rad);
    }

    /// Rotate the pose by the given angle about its own position.
    pub fn rotate(&mut self, delta_rad: f64) {
        self.set_heading(self.heading_rad + delta_rad);
    }

    /// Return the 2D position of the pose.
    pub fn position2(&self) -> Vector2<f64> {
        self.position_m
    }

    /// Unit vector pointing along the heading, in the map frame.
    pub fn forward2(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// The point `dist_m` ahead of the pose along its heading.
    pub fn point_ahead(&self, dist_m: f64) -> Vector2<f64> {
        self.position_m + dist_m * self.forward2()
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        self.distance_to_point(&other.position_m)
    }

    pub fn distance_to_point(&self, point_m: &Vector2<f64>) -> f64 {
        (point_m - self.position_m).norm()
    }

    /// Bearing from this pose's position to the point, measured from the map X axis.
    pub fn bearing_to(&self, point_m: &Vector2<f64>) -> f64 {
        let d = point_m - self.position_m;
        d.y.atan2(d.x)
    }

    /// Bearing to the point relative to the pose heading, positive anticlockwise.
    pub fn relative_bearing_to(&self, point_m: &Vector2<f64>) -> f64 {
        wrap_to_pi(self.bearing_to(point_m) - self.heading_rad)
    }

    /// Rotate a map-frame vector into the body frame of this pose.
    pub fn to_body(&self, vec_m: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(-self.heading_rad) * *vec_m
    }

    /// Rotate a body-frame vector into the map frame.
    pub fn to_world(&self, vec_b: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(self.heading_rad) * *vec_b
    }

    /// Express a map-frame point relative to this pose (translation then rotation).
    pub fn point_to_body(&self, point_m: &Vector2<f64>) -> Vector2<f64> {
        self.to_body(&(point_m - self.position_m))
    }
}

impl From<PoseSpec> for Pose {
    fn from(spec: PoseSpec) -> Self {
        Pose::new(spec.x_m, spec.y_m, spec.heading_rad)
    }
}

impl From<Pose> for PoseSpec {
    fn from(pose: Pose) -> Self {
        PoseSpec {
            x_m: pose.position_m.x,
            y_m: pose.position_m.y,
            heading_rad: pose.heading_rad,
        }
    }
}

impl PoseWithCovariance {
    /// Wrap a pose with zero covariance, stamped now.
    pub fn new(pose: Pose) -> Self {
        Self {
            stamp: Utc::now(),
            pose,
            covariance: Matrix3::zeros(),
        }
    }

    /// The mean pose of the estimate.
    pub fn mean(&self) -> Pose {
        self.pose
    }
}
