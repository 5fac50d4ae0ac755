//! # Navigation Executable Parameters
//!
//! This module provides the parameters of the simulated run performed by the executable. The
//! controller's own parameters are in `nav_ctrl.toml`, see [`crate::nav_ctrl::Params`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

use crate::{
    loc::Pose,
    map::{cost_values, GridError, OccupancyGrid},
    nav_ctrl::SimpleGoalChecker,
    path::{Path, PathError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NavExecParams {
    /// Target period of one control cycle
    pub cycle_period_s: f64,

    /// The run stops after this many cycles even if the goal has not been reached
    pub max_cycles: u64,

    /// If true each cycle sleeps until its period has elapsed, otherwise cycles run back to back
    #[serde(default)]
    pub realtime: bool,

    /// Publish markers every this many clustering cycles, 0 to disable
    #[serde(default)]
    pub markers_every_n: u64,

    /// Initial pose of the simulated robot
    pub start: Pose,

    /// Points the plan passes through after the start position
    pub waypoints_m: Vec<[f64; 2]>,

    /// Maximum separation between plan points
    pub path_separation_m: f64,

    pub goal_checker: SimpleGoalChecker,

    /// Speed limit applied before the run starts
    #[serde(default)]
    pub speed_limit: Option<SpeedLimitSpec>,

    pub grid: GridParams,
}

#[derive(Debug, Copy, Clone, Deserialize)]
pub struct SpeedLimitSpec {
    pub value: f64,

    #[serde(default)]
    pub is_percentage: bool,
}

/// The simulated occupancy grid.
#[derive(Debug, Clone, Deserialize)]
pub struct GridParams {
    pub size_x: usize,
    pub size_y: usize,
    pub resolution_m: f64,
    pub origin_m: [f64; 2],

    /// Rectangles of lethal cells
    #[serde(default)]
    pub obstacles: Vec<RectObstacle>,
}

#[derive(Debug, Copy, Clone, Deserialize)]
pub struct RectObstacle {
    pub min_m: [f64; 2],
    pub max_m: [f64; 2],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NavExecParamsError {
    #[error("cycle_period_s must be positive, got {0}")]
    InvalidCyclePeriod(f64),

    #[error("Cannot build the plan: {0}")]
    Path(#[from] PathError),

    #[error("Cannot build the occupancy grid: {0}")]
    Grid(#[from] GridError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavExecParams {
    pub fn validate(&self) -> Result<(), NavExecParamsError> {
        if !(self.cycle_period_s > 0.0) {
            return Err(NavExecParamsError::InvalidCyclePeriod(self.cycle_period_s));
        }

        self.build_plan()?;
        self.build_grid()?;

        Ok(())
    }

    /// Build the plan from the start position through every waypoint.
    pub fn build_plan(&self) -> Result<Path, NavExecParamsError> {
        if self.waypoints_m.is_empty() {
            return Err(PathError::EmptyPath.into());
        }

        let points: Vec<Vector2<f64>> = std::iter::once(self.start.position_m)
            .chain(self.waypoints_m.iter().map(|w| Vector2::new(w[0], w[1])))
            .collect();

        Ok(Path::through(&points, self.path_separation_m)?)
    }

    /// The final pose of the plan, used as the goal.
    pub fn goal(&self) -> Result<Pose, NavExecParamsError> {
        let plan = self.build_plan()?;
        plan.last().copied().ok_or(NavExecParamsError::Path(PathError::EmptyPath))
    }

    pub fn build_grid(&self) -> Result<OccupancyGrid, NavExecParamsError> {
        let g = &self.grid;
        let mut grid = OccupancyGrid::new(
            Vector2::new(g.size_x, g.size_y),
            g.resolution_m,
            Vector2::new(g.origin_m[0], g.origin_m[1]),
        )?;

        for rect in g.obstacles.iter() {
            grid.fill_rect(
                Vector2::new(rect.min_m[0], rect.min_m[1]),
                Vector2::new(rect.max_m[0], rect.max_m[1]),
                cost_values::LETHAL,
            );
        }

        Ok(grid)
    }
}
