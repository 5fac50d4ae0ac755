//! Point clusterer, one obstacle per occupied cell

use super::ObstacleClusterer;
use crate::{
    map::OccupancyGrid,
    per::{Obstacle, ObstacleSet},
};

#[derive(Debug, Clone)]
pub struct PointClusterer {
    min_occupied_cost: u8,
}

impl PointClusterer {
    pub fn new(min_occupied_cost: u8) -> Self {
        Self { min_occupied_cost }
    }
}

impl ObstacleClusterer for PointClusterer {
    fn cluster(&self, grid: &OccupancyGrid) -> ObstacleSet {
        ObstacleSet::new(
            grid.occupied_points(self.min_occupied_cost)
                .into_iter()
                .enumerate()
                .map(|(i, p)| Obstacle {
                    id: i as u32,
                    points_m: vec![p],
                    velocity_ms: None,
                })
                .collect(),
        )
    }

    fn name(&self) -> &'static str {
        "points"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::cost_values;
    use nalgebra::Vector2;

    #[test]
    fn test_point_obstacles() {
        let mut grid = OccupancyGrid::new(Vector2::new(4, 4), 1.0, Vector2::zeros()).unwrap();
        grid.set_cost(Vector2::new(0, 0), cost_values::LETHAL);
        grid.set_cost(Vector2::new(3, 2), cost_values::LETHAL);
        grid.set_cost(Vector2::new(1, 1), cost_values::UNKNOWN);

        let set = PointClusterer::new(cost_values::LETHAL).cluster(&grid);

        assert_eq!(set.len(), 2);
        assert_eq!(set.obstacles[0].id, 0);
        assert_eq!(set.obstacles[1].id, 1);
        assert_eq!(set.obstacles[1].points_m, vec![Vector2::new(3.5, 2.5)]);
    }
}
