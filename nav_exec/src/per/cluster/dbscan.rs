//! DBSCAN clusterer
//!
//! Occupied cell centres are binned into a hash grid with a bin size equal to the neighbour
//! distance, so neighbour queries only need to look at the 3x3 surrounding bins. Core cells are
//! merged with a union-find, border cells join the cluster of their first core neighbour and
//! noise cells are dropped.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use log::trace;
use nalgebra::Vector2;

use super::{convex_hull, ObstacleClusterer};
use crate::{
    map::OccupancyGrid,
    per::{Obstacle, ObstacleSet, PerError},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DbscanClusterer {
    max_distance_m: f64,
    min_points: usize,
    min_occupied_cost: u8,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DbscanClusterer {
    pub fn new(
        max_distance_m: f64,
        min_points: usize,
        min_occupied_cost: u8,
    ) -> Result<Self, PerError> {
        if !(max_distance_m > 0.0) || min_points == 0 {
            return Err(PerError::InvalidConfig(format!(
                "invalid DBSCAN settings (max_distance_m = {}, min_points = {})",
                max_distance_m, min_points
            )));
        }

        Ok(Self {
            max_distance_m,
            min_points,
            min_occupied_cost,
        })
    }

    /// Cluster the points, returning the member indices of each cluster.
    ///
    /// Clusters are ordered by their lowest member index, members are in ascending order.
    pub fn cluster_points(&self, points: &[Vector2<f64>]) -> Vec<Vec<usize>> {
        let bins = self.bin(points);
        let neighbours: Vec<Vec<usize>> = (0..points.len())
            .map(|i| self.neighbours(points, &bins, i))
            .collect();

        // Neighbour lists include the point itself
        let is_core: Vec<bool> = neighbours
            .iter()
            .map(|n| n.len() >= self.min_points)
            .collect();

        let mut parent: Vec<usize> = (0..points.len()).collect();
        for i in (0..points.len()).filter(|&i| is_core[i]) {
            for &j in neighbours[i].iter().filter(|&&j| is_core[j]) {
                union(&mut parent, i, j);
            }
        }

        // Assign every core or border point to a root, noise stays unassigned
        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..points.len() {
            let root = if is_core[i] {
                Some(find(&mut parent, i))
            } else {
                neighbours[i]
                    .iter()
                    .copied()
                    .find(|&j| is_core[j])
                    .map(|j| find(&mut parent, j))
            };

            if let Some(r) = root {
                groups.entry(r).or_default().push(i);
            }
        }

        let mut clusters: Vec<Vec<usize>> = groups.into_iter().map(|(_, v)| v).collect();
        clusters.sort_by_key(|c| c[0]);
        clusters
    }

    fn bin(&self, points: &[Vector2<f64>]) -> HashMap<(i64, i64), Vec<usize>> {
        let mut bins: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            bins.entry(self.bin_key(p)).or_default().push(i);
        }
        bins
    }

    fn bin_key(&self, p: &Vector2<f64>) -> (i64, i64) {
        (
            (p.x / self.max_distance_m).floor() as i64,
            (p.y / self.max_distance_m).floor() as i64,
        )
    }

    fn neighbours(
        &self,
        points: &[Vector2<f64>],
        bins: &HashMap<(i64, i64), Vec<usize>>,
        i: usize,
    ) -> Vec<usize> {
        let (bx, by) = self.bin_key(&points[i]);
        let mut out = Vec::new();

        for dx in -1..=1_i64 {
            for dy in -1..=1_i64 {
                if let Some(members) = bins.get(&(bx + dx, by + dy)) {
                    out.extend(
                        members
                            .iter()
                            .copied()
                            .filter(|&j| (points[j] - points[i]).norm() <= self.max_distance_m),
                    );
                }
            }
        }

        out.sort_unstable();
        out
    }
}

impl ObstacleClusterer for DbscanClusterer {
    fn cluster(&self, grid: &OccupancyGrid) -> ObstacleSet {
        let points = grid.occupied_points(self.min_occupied_cost);
        let clusters = self.cluster_points(&points);

        trace!(
            "DBSCAN: {} occupied cells in {} clusters",
            points.len(),
            clusters.len()
        );

        ObstacleSet::new(
            clusters
                .iter()
                .enumerate()
                .map(|(id, members)| {
                    let member_points: Vec<Vector2<f64>> =
                        members.iter().map(|&i| points[i]).collect();

                    Obstacle {
                        id: id as u32,
                        points_m: convex_hull(&member_points),
                        velocity_ms: None,
                    }
                })
                .collect(),
        )
    }

    fn name(&self) -> &'static str {
        "dbscan"
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::cost_values;

    #[test]
    fn test_cluster_points() {
        let points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(0.1, 0.0),
            Vector2::new(0.2, 0.0),
            Vector2::new(5.0, 5.0),
            Vector2::new(5.0, 5.1),
            Vector2::new(20.0, 0.0),
        ];

        let dbscan = DbscanClusterer::new(0.15, 2, cost_values::LETHAL).unwrap();
        let clusters = dbscan.cluster_points(&points);

        // The isolated point is noise
        assert_eq!(clusters, vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_border_points() {
        // With min_points = 3 only the middle point is core, both ends join as border points
        let points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
        ];

        let dbscan = DbscanClusterer::new(1.0, 3, cost_values::LETHAL).unwrap();
        assert_eq!(dbscan.cluster_points(&points), vec![vec![0, 1, 2]]);

        let dbscan = DbscanClusterer::new(1.0, 4, cost_values::LETHAL).unwrap();
        assert!(dbscan.cluster_points(&points).is_empty());
    }

    #[test]
    fn test_grid_clusters() {
        let mut grid = OccupancyGrid::new(Vector2::new(20, 20), 0.1, Vector2::zeros()).unwrap();
        grid.fill_rect(Vector2::new(0.0, 0.0), Vector2::new(0.3, 0.3), cost_values::LETHAL);
        grid.fill_rect(Vector2::new(1.0, 1.0), Vector2::new(1.2, 1.5), cost_values::LETHAL);

        let set = DbscanClusterer::new(0.15, 2, cost_values::LETHAL)
            .unwrap()
            .cluster(&grid);

        assert_eq!(set.len(), 2);
        assert_eq!(set.obstacles[0].id, 0);
        assert_eq!(set.obstacles[1].id, 1);

        // First block covers cells centred on 0.05 .. 0.25, its hull is the four corners
        let hull = &set.obstacles[0].points_m;
        assert_eq!(hull.len(), 4);
        assert!((hull[0] - Vector2::new(0.05, 0.05)).norm() < 1e-9);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(DbscanClusterer::new(0.0, 2, cost_values::LETHAL).is_err());
        assert!(DbscanClusterer::new(0.1, 0, cost_values::LETHAL).is_err());
    }
}
