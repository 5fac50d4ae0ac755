//! # Occupancy Grid

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::cost_values;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A row-major grid of cell costs in the map frame.
///
/// Cell `(x, y)` covers `origin + resolution * [x, x + 1) x [y, y + 1)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OccupancyGrid {
    /// Number of cells along X and Y
    size: Vector2<usize>,

    /// Side length of a (square) cell
    resolution_m: f64,

    /// Map-frame position of the lower-left corner of cell (0, 0)
    origin_m: Vector2<f64>,

    data: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("Grid resolution must be positive, got {0}")]
    InvalidResolution(f64),

    #[error("Expected {0} cells of data for the grid shape, found {1}")]
    ShapeMismatch(usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl OccupancyGrid {
    /// Create a new grid with every cell free.
    pub fn new(
        size: Vector2<usize>,
        resolution_m: f64,
        origin_m: Vector2<f64>,
    ) -> Result<Self, GridError> {
        Self::from_data(
            size,
            resolution_m,
            origin_m,
            vec![cost_values::FREE; size.x * size.y],
        )
    }

    /// Create a grid from existing row-major cost data.
    pub fn from_data(
        size: Vector2<usize>,
        resolution_m: f64,
        origin_m: Vector2<f64>,
        data: Vec<u8>,
    ) -> Result<Self, GridError> {
        if !(resolution_m > 0.0) {
            return Err(GridError::InvalidResolution(resolution_m));
        }
        if data.len() != size.x * size.y {
            return Err(GridError::ShapeMismatch(size.x * size.y, data.len()));
        }

        Ok(Self {
            size,
            resolution_m,
            origin_m,
            data,
        })
    }

    pub fn size(&self) -> Vector2<usize> {
        self.size
    }

    pub fn resolution_m(&self) -> f64 {
        self.resolution_m
    }

    pub fn origin_m(&self) -> Vector2<f64> {
        self.origin_m
    }

    /// Get the cost of a cell, `None` if outside the grid.
    pub fn get_cost(&self, cell: Vector2<usize>) -> Option<u8> {
        self.index(cell).map(|i| self.data[i])
    }

    /// Set the cost of a cell, returning `false` if the cell is outside the grid.
    pub fn set_cost(&mut self, cell: Vector2<usize>, cost: u8) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.data[i] = cost;
                true
            }
            None => false,
        }
    }

    /// Get the cell containing the map-frame point, `None` if outside the grid.
    pub fn world_to_cell(&self, point_m: &Vector2<f64>) -> Option<Vector2<usize>> {
        let rel = (point_m - self.origin_m) / self.resolution_m;

        if rel.x < 0.0 || rel.y < 0.0 {
            return None;
        }

        let cell = Vector2::new(rel.x.floor() as usize, rel.y.floor() as usize);

        if cell.x < self.size.x && cell.y < self.size.y {
            Some(cell)
        } else {
            None
        }
    }

    /// Map-frame position of the centre of the cell.
    pub fn cell_to_world(&self, cell: Vector2<usize>) -> Vector2<f64> {
        self.origin_m
            + Vector2::new(cell.x as f64 + 0.5, cell.y as f64 + 0.5) * self.resolution_m
    }

    /// Set every cell whose centre lies inside the axis-aligned rectangle to `cost`.
    pub fn fill_rect(&mut self, min_m: Vector2<f64>, max_m: Vector2<f64>, cost: u8) {
        for y in 0..self.size.y {
            for x in 0..self.size.x {
                let c = self.cell_to_world(Vector2::new(x, y));
                if c.x >= min_m.x && c.x <= max_m.x && c.y >= min_m.y && c.y <= max_m.y {
                    self.data[y * self.size.x + x] = cost;
                }
            }
        }
    }

    /// Iterate over the cells considered occupied, i.e. those with cost at least `min_cost`.
    ///
    /// Unknown cells are never occupied.
    pub fn occupied_cells(&self, min_cost: u8) -> impl Iterator<Item = Vector2<usize>> + '_ {
        let size_x = self.size.x;
        self.data
            .iter()
            .enumerate()
            .filter(move |(_, &c)| c != cost_values::UNKNOWN && c >= min_cost)
            .map(move |(i, _)| Vector2::new(i % size_x, i / size_x))
    }

    /// Map-frame centres of all occupied cells.
    pub fn occupied_points(&self, min_cost: u8) -> Vec<Vector2<f64>> {
        self.occupied_cells(min_cost)
            .map(|c| self.cell_to_world(c))
            .collect()
    }

    fn index(&self, cell: Vector2<usize>) -> Option<usize> {
        if cell.x < self.size.x && cell.y < self.size.y {
            Some(cell.y * self.size.x + cell.x)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(Vector2::new(10, 5), 0.5, Vector2::new(-1.0, 0.0)).unwrap()
    }

    #[test]
    fn test_cell_conversion() {
        let g = grid();

        assert_eq!(g.world_to_cell(&Vector2::new(-1.0, 0.0)), Some(Vector2::new(0, 0)));
        assert_eq!(g.world_to_cell(&Vector2::new(0.74, 1.2)), Some(Vector2::new(3, 2)));
        assert_eq!(g.world_to_cell(&Vector2::new(-1.1, 0.0)), None);
        assert_eq!(g.world_to_cell(&Vector2::new(4.0, 0.0)), None);

        let c = g.cell_to_world(Vector2::new(3, 2));
        assert!((c - Vector2::new(0.75, 1.25)).norm() < 1e-12);
    }

    #[test]
    fn test_occupied_cells() {
        let mut g = grid();
        assert!(g.set_cost(Vector2::new(1, 1), cost_values::LETHAL));
        assert!(g.set_cost(Vector2::new(2, 1), cost_values::INSCRIBED));
        assert!(g.set_cost(Vector2::new(3, 1), cost_values::UNKNOWN));
        assert!(!g.set_cost(Vector2::new(30, 1), cost_values::LETHAL));

        let lethal: Vec<_> = g.occupied_cells(cost_values::LETHAL).collect();
        assert_eq!(lethal, vec![Vector2::new(1, 1)]);

        let inscribed: Vec<_> = g.occupied_cells(cost_values::INSCRIBED).collect();
        assert_eq!(inscribed.len(), 2);
    }

    #[test]
    fn test_fill_rect() {
        let mut g = grid();
        g.fill_rect(Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0), cost_values::LETHAL);

        // Cell centres at x in {0.25, 0.75}, y in {0.25, 0.75}
        assert_eq!(g.occupied_points(cost_values::LETHAL).len(), 4);
    }

    #[test]
    fn test_shape_checks() {
        assert!(matches!(
            OccupancyGrid::from_data(Vector2::new(2, 2), 0.1, Vector2::zeros(), vec![0; 3]),
            Err(GridError::ShapeMismatch(4, 3))
        ));
        assert!(matches!(
            OccupancyGrid::new(Vector2::new(2, 2), 0.0, Vector2::zeros()),
            Err(GridError::InvalidResolution(_))
        ));
    }
}
