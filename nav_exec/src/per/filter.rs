//! # Obstacle polygon filter
//!
//! Decides which obstacles are relevant to the robot this cycle. The filter holds no memory, an
//! obstacle which leaves and re-enters the radius is simply relevant again.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};

use super::{Centroid, PerError};
use crate::{loc::Pose, path::Path};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone)]
pub struct PolygonFilter {
    radius_m: f64,
    policy: RelevancePolicy,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the relevance radius is measured from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelevancePolicy {
    /// Distance from the centroid to the robot's position
    DistanceFromRobot,

    /// Shortest distance from the centroid to the stored plan. Falls back to the robot distance
    /// when there is no plan.
    DistanceFromPath,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RelevancePolicy {
    fn default() -> Self {
        RelevancePolicy::DistanceFromRobot
    }
}

impl PolygonFilter {
    pub fn new(radius_m: f64, policy: RelevancePolicy) -> Result<Self, PerError> {
        if !(radius_m > 0.0) {
            return Err(PerError::InvalidConfig(format!(
                "relevance radius must be positive, got {}",
                radius_m
            )));
        }

        Ok(Self { radius_m, policy })
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn policy(&self) -> RelevancePolicy {
        self.policy
    }

    /// Return the centroids which lie strictly inside the relevance radius.
    pub fn filter(&self, centroids: &[Centroid], pose: &Pose, path: Option<&Path>) -> Vec<Centroid> {
        centroids
            .iter()
            .filter(|c| {
                let dist_m = self.distance(c, pose, path);
                trace!("Obstacle {} at {:.3} m", c.obstacle_id, dist_m);
                dist_m < self.radius_m
            })
            .copied()
            .collect()
    }

    fn distance(&self, centroid: &Centroid, pose: &Pose, path: Option<&Path>) -> f64 {
        let robot_dist_m = pose.distance_to_point(&centroid.position_m);

        match self.policy {
            RelevancePolicy::DistanceFromRobot => robot_dist_m,
            RelevancePolicy::DistanceFromPath => path
                .and_then(|p| p.distance_to_point(&centroid.position_m))
                .unwrap_or(robot_dist_m),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector2;

    fn centroid(id: u32, x: f64, y: f64) -> Centroid {
        Centroid {
            obstacle_id: id,
            position_m: Vector2::new(x, y),
        }
    }

    #[test]
    fn test_radius_boundary() {
        let filter = PolygonFilter::new(2.0, RelevancePolicy::DistanceFromRobot).unwrap();
        let pose = Pose::new(1.0, 1.0, 0.3);

        let centroids = vec![
            centroid(0, 1.0 + 2.0 - 1e-6, 1.0),
            centroid(1, 1.0, 1.0 + 2.0 + 1e-6),
            centroid(2, 1.0, 1.0),
        ];

        let ids: Vec<_> = filter
            .filter(&centroids, &pose, None)
            .iter()
            .map(|c| c.obstacle_id)
            .collect();

        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_path_policy() {
        let filter = PolygonFilter::new(1.0, RelevancePolicy::DistanceFromPath).unwrap();
        let pose = Pose::new(0.0, 0.0, 0.0);
        let path = Path::from_points(&[Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0)]);

        // Far from the robot but close to the path
        let centroids = vec![centroid(0, 8.0, 0.5), centroid(1, 8.0, 1.5)];

        let kept = filter.filter(&centroids, &pose, Some(&path));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].obstacle_id, 0);

        // Without a path the robot distance is used
        assert!(filter.filter(&centroids, &pose, None).is_empty());
    }

    #[test]
    fn test_invalid_radius() {
        assert!(PolygonFilter::new(0.0, RelevancePolicy::DistanceFromRobot).is_err());
        assert!(PolygonFilter::new(f64::NAN, RelevancePolicy::DistanceFromRobot).is_err());
    }
}
