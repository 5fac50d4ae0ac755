//! # Path
//!
//! This module defines the path followed by the controller: an ordered sequence of poses in the
//! map frame, traversed in insertion order.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A path defining the desired trajectory of the robot.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Path {
    pub poses: Vec<Pose>,
}

/// A segment between two path points
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct PathSegment {
    /// The target of the segment
    pub target_m: Vector2<f64>,

    /// The start point of the segment
    pub start_m: Vector2<f64>,

    /// The length of the segment
    pub length_m: f64,

    /// The heading (angle to the +ve x axis) of the segment
    pub heading_rad: f64,

    /// Unit vector pointing in the direction of the segment, zero for degenerate segments
    pub direction: Vector2<f64>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Attempted to create a path from an empty sequence")]
    EmptyPath,

    #[error("Path point separation must be positive, got {0}")]
    InvalidSeparation(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Create a new empty path
    pub fn new_empty() -> Self {
        Path { poses: Vec::new() }
    }

    pub fn new(poses: Vec<Pose>) -> Self {
        Path { poses }
    }

    /// Build a path from bare points. Each pose faces the next point, the last pose keeps the
    /// heading of the final segment.
    pub fn from_points(points_m: &[Vector2<f64>]) -> Self {
        let mut poses = Vec::with_capacity(points_m.len());
        let mut heading_rad = 0f64;

        for (i, p) in points_m.iter().enumerate() {
            if let Some(next) = points_m.get(i + 1) {
                let d = next - p;
                if d.norm() > std::f64::EPSILON {
                    heading_rad = d.y.atan2(d.x);
                }
            }
            poses.push(Pose::from_position(*p, heading_rad));
        }

        Path { poses }
    }

    /// Produces a direct path between the two position vectors, with each point in the path having
    /// at most the given separation.
    pub fn direct(
        from: Vector2<f64>,
        to: Vector2<f64>,
        point_sep_m: f64,
    ) -> Result<Self, PathError> {
        if !(point_sep_m > 0.0) {
            return Err(PathError::InvalidSeparation(point_sep_m));
        }

        let diff_vec = to - from;
        let dist = diff_vec.norm();

        // If the points are closer than the separation just produce a new path with the from and
        // to being the only points.
        if dist <= point_sep_m {
            return Ok(Self::from_points(&[from, to]));
        }

        // Number of whole separations along the line, the final point is always `to` so the last
        // gap may be shorter than the separation.
        let num_steps = (dist / point_sep_m).ceil() as usize;
        let delta = diff_vec / num_steps as f64;

        let points: Vec<Vector2<f64>> = (0..=num_steps)
            .map(|i| from + delta * i as f64)
            .collect();

        Ok(Self::from_points(&points))
    }

    /// Produces a path through each of the given points in turn, using `direct` between each
    /// neighbouring pair.
    pub fn through(points_m: &[Vector2<f64>], point_sep_m: f64) -> Result<Self, PathError> {
        if points_m.is_empty() {
            return Err(PathError::EmptyPath);
        }

        if !(point_sep_m > 0.0) {
            return Err(PathError::InvalidSeparation(point_sep_m));
        }

        let mut points = vec![points_m[0]];

        for pair in points_m.windows(2) {
            let leg = Self::direct(pair[0], pair[1], point_sep_m)?;

            // The first point of each leg is the last point of the previous one
            points.extend(leg.poses.iter().skip(1).map(|p| p.position_m));
        }

        Ok(Self::from_points(&points))
    }

    /// Returns the path segment connecting the target point and the previous
    /// point.
    ///
    /// If no segment exists (the target is the first point in the sequence or
    /// is beyond the end of the sequence) then `None` will be returned
    pub fn get_segment_to_target(&self, target_index: usize) -> Option<PathSegment> {
        if target_index == 0 || target_index >= self.poses.len() {
            return None;
        }

        let target_m = self.poses[target_index].position_m;
        let start_m = self.poses[target_index - 1].position_m;
        let diff = target_m - start_m;
        let length_m = diff.norm();

        let direction = if length_m > std::f64::EPSILON {
            diff / length_m
        } else {
            Vector2::zeros()
        };

        Some(PathSegment {
            target_m,
            start_m,
            length_m,
            heading_rad: diff.y.atan2(diff.x),
            direction,
        })
    }

    /// Return the length of the path in meters.
    ///
    /// If the path has less than two points then `None` is returned.
    pub fn get_length(&self) -> Option<f64> {
        if self.poses.len() < 2 {
            return None;
        }

        Some(
            (1..self.poses.len())
                .filter_map(|i| self.get_segment_to_target(i))
                .map(|s| s.length_m)
                .sum(),
        )
    }

    /// Shortest distance from the point to the path.
    ///
    /// A single-pose path is treated as a point. `None` if the path is empty.
    pub fn distance_to_point(&self, point_m: &Vector2<f64>) -> Option<f64> {
        match self.poses.len() {
            0 => None,
            1 => Some((point_m - self.poses[0].position_m).norm()),
            n => (1..n)
                .filter_map(|i| self.get_segment_to_target(i))
                .map(|s| s.distance_to_point(point_m))
                .fold(None, |min: Option<f64>, d| Some(min.map_or(d, |m| m.min(d)))),
        }
    }

    /// Get the number of points in the path
    pub fn get_num_points(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pose> {
        self.poses.get(index)
    }

    pub fn last(&self) -> Option<&Pose> {
        self.poses.last()
    }
}

impl PathSegment {
    /// Shortest distance from the point to this segment (not the infinite line through it).
    pub fn distance_to_point(&self, point_m: &Vector2<f64>) -> f64 {
        let rel = point_m - self.start_m;

        // Projection of the point onto the segment, clamped to the segment ends
        let along_m = rel.dot(&self.direction).max(0.0).min(self.length_m);
        let closest = self.start_m + self.direction * along_m;

        (point_m - closest).norm()
    }
}
