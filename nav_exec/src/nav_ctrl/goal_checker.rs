//! Goal checking
//!
//! The controller does not decide when the goal is reached. Callers hand it a [`GoalChecker`]
//! and the controller only records the checker's verdict in its status report.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::{loc::Pose, traj_ctrl::Twist};
use util::maths::get_ang_dist;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait GoalChecker {
    /// Return true if the robot, at `pose` and moving with `velocity`, has reached `goal`.
    fn is_goal_reached(&self, pose: &Pose, goal: &Pose, velocity: &Twist) -> bool;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position and heading tolerance check.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct SimpleGoalChecker {
    pub xy_goal_tolerance_m: f64,

    pub yaw_goal_tolerance_rad: f64,

    /// If true the heading tolerance is ignored
    #[serde(default)]
    pub ignore_heading: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimpleGoalChecker {
    pub fn new(xy_goal_tolerance_m: f64, yaw_goal_tolerance_rad: f64) -> Self {
        Self {
            xy_goal_tolerance_m,
            yaw_goal_tolerance_rad,
            ignore_heading: false,
        }
    }
}

impl GoalChecker for SimpleGoalChecker {
    fn is_goal_reached(&self, pose: &Pose, goal: &Pose, _velocity: &Twist) -> bool {
        if pose.distance_to(goal) > self.xy_goal_tolerance_m {
            return false;
        }

        self.ignore_heading
            || get_ang_dist(pose.heading(), goal.heading()).abs() <= self.yaw_goal_tolerance_rad
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_simple_goal_checker() {
        let checker = SimpleGoalChecker::new(0.1, 0.2);
        let goal = Pose::new(1.0, 1.0, PI - 0.05);
        let v = Twist::zero();

        assert!(checker.is_goal_reached(&Pose::new(1.05, 1.0, -PI + 0.05), &goal, &v));
        assert!(!checker.is_goal_reached(&Pose::new(1.2, 1.0, PI - 0.05), &goal, &v));
        assert!(!checker.is_goal_reached(&Pose::new(1.0, 1.0, 0.0), &goal, &v));

        let relaxed = SimpleGoalChecker {
            ignore_heading: true,
            ..checker
        };
        assert!(relaxed.is_goal_reached(&Pose::new(1.0, 1.0, 0.0), &goal, &v));
    }
}
