//! # Obstacle centroids

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::{Centroid, Obstacle, ObstacleSet, PerError};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the centroid of every obstacle in the set, in the same order as the set.
///
/// Fails on the first obstacle with no points.
pub fn compute_centroids(set: &ObstacleSet) -> Result<Vec<Centroid>, PerError> {
    set.obstacles.iter().map(centroid).collect()
}

/// Compute the centroid of a single obstacle.
///
/// This is the arithmetic mean of the boundary points, not the area-weighted centroid of the
/// polygon. For the small clusters produced from a costmap the two are close.
pub fn centroid(obstacle: &Obstacle) -> Result<Centroid, PerError> {
    if obstacle.points_m.is_empty() {
        return Err(PerError::EmptyObstacle(obstacle.id));
    }

    let sum_m = obstacle
        .points_m
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f64>, p| acc + p);

    Ok(Centroid {
        obstacle_id: obstacle.id,
        position_m: sum_m / obstacle.points_m.len() as f64,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn obstacle(id: u32, points: &[(f64, f64)]) -> Obstacle {
        Obstacle {
            id,
            points_m: points.iter().map(|&(x, y)| Vector2::new(x, y)).collect(),
            velocity_ms: None,
        }
    }

    #[test]
    fn test_square_centroid() {
        let c = centroid(&obstacle(3, &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)])).unwrap();

        assert_eq!(c.obstacle_id, 3);
        assert!((c.position_m - Vector2::new(1.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_degenerate_centroids() {
        let single = centroid(&obstacle(0, &[(1.5, -2.0)])).unwrap();
        assert!((single.position_m - Vector2::new(1.5, -2.0)).norm() < 1e-12);

        let pair = centroid(&obstacle(1, &[(0.0, 0.0), (3.0, 1.0)])).unwrap();
        assert!((pair.position_m - Vector2::new(1.5, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn test_empty_obstacle() {
        assert!(matches!(
            centroid(&obstacle(9, &[])),
            Err(PerError::EmptyObstacle(9))
        ));

        let set = ObstacleSet::new(vec![obstacle(0, &[(0.0, 0.0)]), obstacle(1, &[])]);
        assert!(matches!(
            compute_centroids(&set),
            Err(PerError::EmptyObstacle(1))
        ));
    }

    #[test]
    fn test_one_centroid_per_obstacle() {
        let set = ObstacleSet::new(vec![
            obstacle(0, &[(0.0, 0.0)]),
            obstacle(1, &[(1.0, 1.0), (3.0, 1.0), (2.0, 4.0)]),
        ]);

        let centroids = compute_centroids(&set).unwrap();
        assert_eq!(centroids.len(), 2);
        assert_eq!(centroids[1].obstacle_id, 1);
        assert!((centroids[1].position_m - Vector2::new(2.0, 2.0)).norm() < 1e-12);
    }
}
