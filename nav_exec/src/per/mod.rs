//! # Perception module
//!
//! Turns occupancy grid snapshots into obstacles, and obstacles into the set of centroids that
//! matter to the robot right now.
//!
//! The pipeline for one clustering cycle is:
//!  1. An [`ObstacleClusterer`](cluster::ObstacleClusterer) groups the occupied cells of the
//!     grid into an [`ObstacleSet`].
//!  2. [`centroid::compute_centroids`] reduces every obstacle to its mean point.
//!  3. [`filter::PolygonFilter`] keeps only the centroids within the relevance radius.
//!
//! Nothing is carried between cycles, each [`ObstacleView`] is built from scratch and replaces
//! the previous one.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod centroid;
pub mod cluster;
pub mod filter;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::{loc::Pose, map::cost_values, path::Path};
pub use centroid::{centroid, compute_centroids};
pub use cluster::{ClustererParams, DbscanClusterer, ObstacleClusterer, PointClusterer};
pub use filter::{PolygonFilter, RelevancePolicy};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single obstacle produced by clustering.
///
/// `points_m` is the polygon boundary in the map frame. A single point denotes a point obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,

    pub points_m: Vec<Vector2<f64>>,

    /// Estimated velocity of the obstacle, if the clusterer tracks it
    pub velocity_ms: Option<Vector2<f64>>,
}

/// All obstacles produced by one clustering cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleSet {
    pub stamp: DateTime<Utc>,
    pub obstacles: Vec<Obstacle>,
}

/// The representative location of an obstacle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub obstacle_id: u32,
    pub position_m: Vector2<f64>,
}

/// Output of one full perception cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleView {
    pub stamp: DateTime<Utc>,

    /// Every obstacle from the cycle
    pub obstacles: Vec<Obstacle>,

    /// One centroid per entry of `obstacles`
    pub centroids: Vec<Centroid>,

    /// The centroids which passed the relevance filter
    pub relevant: Vec<Centroid>,
}

/// Perception parameters
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Rate at which the occupancy grid is clustered, independent of the control rate.
    pub clustering_rate_hz: f64,

    /// Obstacles further than this from the robot (or path) are discarded.
    pub relevance_radius_m: f64,

    #[serde(default)]
    pub relevance_policy: RelevancePolicy,

    /// Cells with a cost at or above this value are treated as occupied.
    #[serde(default = "default_min_occupied_cost")]
    pub min_occupied_cost: u8,

    pub clusterer: ClustererParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error)]
pub enum PerError {
    #[error("Obstacle {0} has no boundary points")]
    EmptyObstacle(u32),

    #[error("Invalid perception configuration: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObstacleSet {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self {
            stamp: Utc::now(),
            obstacles,
        }
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl ObstacleView {
    /// Run the centroid and filter stages over a clustered set.
    ///
    /// The same set may be filtered many times as the robot moves between clustering cycles.
    pub fn build(
        set: &ObstacleSet,
        filter: &PolygonFilter,
        pose: &Pose,
        path: Option<&Path>,
    ) -> Result<Self, PerError> {
        let centroids = compute_centroids(&set)?;
        let relevant = filter.filter(&centroids, pose, path);

        debug!(
            "Obstacle view: {} obstacles, {} relevant",
            centroids.len(),
            relevant.len()
        );

        Ok(Self {
            stamp: set.stamp,
            obstacles: set.obstacles.clone(),
            centroids,
            relevant,
        })
    }

    /// A view with no obstacles.
    pub fn empty() -> Self {
        Self {
            stamp: Utc::now(),
            obstacles: Vec::new(),
            centroids: Vec::new(),
            relevant: Vec::new(),
        }
    }

    /// Iterate over the obstacles whose centroid is relevant.
    pub fn relevant_obstacles(&self) -> impl Iterator<Item = &Obstacle> + '_ {
        self.obstacles
            .iter()
            .filter(move |o| self.relevant.iter().any(|c| c.obstacle_id == o.id))
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), PerError> {
        if !(self.clustering_rate_hz > 0.0) || !self.clustering_rate_hz.is_finite() {
            return Err(PerError::InvalidConfig(format!(
                "clustering_rate_hz must be positive, got {}",
                self.clustering_rate_hz
            )));
        }

        if !(self.relevance_radius_m > 0.0) {
            return Err(PerError::InvalidConfig(format!(
                "relevance_radius_m must be positive, got {}",
                self.relevance_radius_m
            )));
        }

        if self.min_occupied_cost == cost_values::FREE
            || self.min_occupied_cost == cost_values::UNKNOWN
        {
            return Err(PerError::InvalidConfig(format!(
                "min_occupied_cost must be between 1 and {}, got {}",
                cost_values::LETHAL,
                self.min_occupied_cost
            )));
        }

        self.clusterer.validate()
    }
}

fn default_min_occupied_cost() -> u8 {
    cost_values::LETHAL
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> Params {
        Params {
            clustering_rate_hz: 2.0,
            relevance_radius_m: 3.0,
            relevance_policy: RelevancePolicy::DistanceFromRobot,
            min_occupied_cost: cost_values::LETHAL,
            clusterer: ClustererParams::Points,
        }
    }

    #[test]
    fn test_params_validation() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.clustering_rate_hz = 0.0;
        assert!(matches!(p.validate(), Err(PerError::InvalidConfig(_))));

        let mut p = params();
        p.relevance_radius_m = -1.0;
        assert!(matches!(p.validate(), Err(PerError::InvalidConfig(_))));

        let mut p = params();
        p.min_occupied_cost = cost_values::UNKNOWN;
        assert!(matches!(p.validate(), Err(PerError::InvalidConfig(_))));
    }

    #[test]
    fn test_params_from_toml() {
        let p: Params = util::params::load_str(
            r#"
            clustering_rate_hz = 5.0
            relevance_radius_m = 2.5
            relevance_policy = "DistanceFromPath"

            [clusterer]
            kind = "Dbscan"
            max_distance_m = 0.15
            min_points = 2
            "#,
        )
        .unwrap();

        assert_eq!(p.relevance_policy, RelevancePolicy::DistanceFromPath);
        assert_eq!(p.min_occupied_cost, cost_values::LETHAL);
        assert!(matches!(
            p.clusterer,
            ClustererParams::Dbscan { min_points: 2, .. }
        ));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_view_build() {
        let set = ObstacleSet::new(vec![
            Obstacle {
                id: 0,
                points_m: vec![Vector2::new(1.0, 0.0)],
                velocity_ms: None,
            },
            Obstacle {
                id: 1,
                points_m: vec![Vector2::new(10.0, 0.0), Vector2::new(12.0, 0.0)],
                velocity_ms: None,
            },
        ]);

        let filter = PolygonFilter::new(3.0, RelevancePolicy::DistanceFromRobot).unwrap();
        let view = ObstacleView::build(&set, &filter, &Pose::default(), None).unwrap();

        assert_eq!(view.centroids.len(), 2);
        assert_eq!(view.relevant.len(), 1);
        assert_eq!(view.relevant[0].obstacle_id, 0);

        let relevant: Vec<_> = view.relevant_obstacles().map(|o| o.id).collect();
        assert_eq!(relevant, vec![0]);
    }

    #[test]
    fn test_view_build_empty_obstacle() {
        let set = ObstacleSet::new(vec![Obstacle {
            id: 7,
            points_m: vec![],
            velocity_ms: None,
        }]);

        let filter = PolygonFilter::new(3.0, RelevancePolicy::DistanceFromRobot).unwrap();
        assert!(matches!(
            ObstacleView::build(&set, &filter, &Pose::default(), None),
            Err(PerError::EmptyObstacle(7))
        ));
    }
}
