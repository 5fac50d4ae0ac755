//! # Obstacle clustering
//!
//! Clusterers group the occupied cells of an [`OccupancyGrid`] into obstacles. The concrete
//! clusterer is chosen by the `[per.clusterer]` parameter table and used through the
//! [`ObstacleClusterer`] trait.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dbscan;
mod hull;
mod points;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{ObstacleSet, PerError};
use crate::map::OccupancyGrid;

pub use dbscan::DbscanClusterer;
pub use hull::convex_hull;
pub use points::PointClusterer;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which can turn an occupancy grid into a set of obstacles.
///
/// Obstacle ids are only unique within the returned set.
pub trait ObstacleClusterer: Send + Sync {
    fn cluster(&self, grid: &OccupancyGrid) -> ObstacleSet;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Selects and configures the clusterer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum ClustererParams {
    /// Every occupied cell becomes a point obstacle.
    Points,

    /// Density based clustering of occupied cell centres, each cluster becoming the convex hull
    /// of its cells.
    Dbscan {
        /// Maximum distance between two cells for them to be neighbours
        max_distance_m: f64,

        /// Minimum number of neighbours (including itself) for a cell to seed a cluster
        min_points: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ClustererParams {
    pub fn validate(&self) -> Result<(), PerError> {
        match self {
            ClustererParams::Points => Ok(()),
            ClustererParams::Dbscan {
                max_distance_m,
                min_points,
            } => {
                if !(*max_distance_m > 0.0) {
                    return Err(PerError::InvalidConfig(format!(
                        "clusterer max_distance_m must be positive, got {}",
                        max_distance_m
                    )));
                }
                if *min_points == 0 {
                    return Err(PerError::InvalidConfig(
                        "clusterer min_points must be at least 1".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the clusterer described by the parameters.
pub fn from_params(
    params: &ClustererParams,
    min_occupied_cost: u8,
) -> Result<Box<dyn ObstacleClusterer>, PerError> {
    params.validate()?;

    Ok(match params {
        ClustererParams::Points => Box::new(PointClusterer::new(min_occupied_cost)),
        ClustererParams::Dbscan {
            max_distance_m,
            min_points,
        } => Box::new(DbscanClusterer::new(
            *max_distance_m,
            *min_points,
            min_occupied_cost,
        )?),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::cost_values;

    #[test]
    fn test_from_params() {
        let points = from_params(&ClustererParams::Points, cost_values::LETHAL).unwrap();
        assert_eq!(points.name(), "points");

        let dbscan = from_params(
            &ClustererParams::Dbscan {
                max_distance_m: 0.2,
                min_points: 3,
            },
            cost_values::LETHAL,
        )
        .unwrap();
        assert_eq!(dbscan.name(), "dbscan");

        assert!(from_params(
            &ClustererParams::Dbscan {
                max_distance_m: 0.0,
                min_points: 3,
            },
            cost_values::LETHAL,
        )
        .is_err());
    }
}
