//! # Map
//!
//! This module implements the [`OccupancyGrid`] snapshot consumed by obstacle clustering. Grids
//! are produced by an external costmap provider, the controller only reads them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Implements the [`OccupancyGrid`] type
mod occupancy_grid;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use occupancy_grid::{GridError, OccupancyGrid};

/// Cell cost values, following the usual costmap convention.
pub mod cost_values {
    /// Free space
    pub const FREE: u8 = 0;

    /// Inside the robot's inscribed radius of a lethal obstacle
    pub const INSCRIBED: u8 = 253;

    /// Lethal obstacle
    pub const LETHAL: u8 = 254;

    /// No information about this cell
    pub const UNKNOWN: u8 = 255;
}
