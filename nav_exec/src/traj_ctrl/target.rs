//! # Plan tracking
//!
//! Holds the current plan and selects the target pose from it each cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};

use super::{Params, TrajCtrlError};
use crate::{loc::Pose, path::Path};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PlanTracker {
    plan: Option<Path>,

    /// Index of the target pose within the plan, never decreases for a given plan
    target_index: usize,

    /// True once the robot has come within tolerance of the last pose
    final_locked: bool,

    lookahead_dist_m: f64,
    final_tolerance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlanTracker {
    pub fn new(lookahead_dist_m: f64, final_tolerance_m: f64) -> Self {
        Self {
            plan: None,
            target_index: 0,
            final_locked: false,
            lookahead_dist_m,
            final_tolerance_m,
        }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(params.lookahead_dist_m, params.final_tolerance_m)
    }

    /// Replace the stored plan, resetting the target to the first pose.
    ///
    /// An empty plan is rejected and the previous plan (if any) is kept.
    pub fn set_plan(&mut self, plan: Path) -> Result<(), TrajCtrlError> {
        if plan.is_empty() {
            return Err(TrajCtrlError::EmptyPath);
        }

        info!("New plan with {} poses", plan.get_num_points());

        self.plan = Some(plan);
        self.target_index = 0;
        self.final_locked = false;

        Ok(())
    }

    /// Drop the stored plan.
    pub fn clear(&mut self) {
        self.plan = None;
        self.target_index = 0;
        self.final_locked = false;
    }

    /// Advance the target given the robot's current pose, returning the new target index.
    ///
    /// The target first walks forward while the next plan pose is no farther from the robot than
    /// the current one, then skips poses closer than the lookahead distance. It never moves
    /// backwards. Once the robot is within the final tolerance of the last pose the target locks
    /// on to it.
    pub fn update_target(&mut self, pose: &Pose) -> Result<usize, TrajCtrlError> {
        let plan = self.plan.as_ref().ok_or(TrajCtrlError::NoActivePlan)?;
        let last = plan.get_num_points() - 1;

        if self.final_locked {
            return Ok(self.target_index);
        }

        let dist = |i: usize| pose.distance_to(&plan.poses[i]);

        if dist(last) <= self.final_tolerance_m {
            debug!("Within tolerance of the final pose, target locked");
            self.target_index = last;
            self.final_locked = true;
            return Ok(last);
        }

        let mut index = self.target_index;

        while index < last && dist(index + 1) <= dist(index) {
            index += 1;
        }

        while index < last && dist(index) < self.lookahead_dist_m {
            index += 1;
        }

        if index != self.target_index {
            debug!("Target advanced from {} to {}", self.target_index, index);
        }

        self.target_index = index;
        Ok(index)
    }

    /// The current target pose.
    pub fn target_pose(&self) -> Result<Pose, TrajCtrlError> {
        self.plan
            .as_ref()
            .and_then(|p| p.get(self.target_index))
            .copied()
            .ok_or(TrajCtrlError::NoActivePlan)
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn is_final(&self) -> bool {
        self.final_locked
    }

    pub fn plan(&self) -> Option<&Path> {
        self.plan.as_ref()
    }

    pub fn has_plan(&self) -> bool {
        self.plan.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector2;

    fn straight_plan() -> Path {
        Path::direct(Vector2::new(0.0, 0.0), Vector2::new(5.0, 0.0), 0.25).unwrap()
    }

    #[test]
    fn test_first_pose_after_set_plan() {
        let mut tracker = PlanTracker::new(0.3, 0.05);
        let plan = Path::from_points(&[
            Vector2::new(2.0, 1.0),
            Vector2::new(3.0, 1.0),
            Vector2::new(4.0, 2.0),
        ]);

        tracker.set_plan(plan.clone()).unwrap();
        assert_eq!(tracker.target_pose().unwrap(), plan.poses[0]);
        assert_eq!(tracker.target_index(), 0);

        // Advance, then a new plan resets the target
        tracker.update_target(&Pose::new(3.0, 1.0, 0.0)).unwrap();
        assert!(tracker.target_index() > 0);

        tracker.set_plan(plan.clone()).unwrap();
        assert_eq!(tracker.target_pose().unwrap(), plan.poses[0]);
    }

    #[test]
    fn test_empty_plan() {
        let mut tracker = PlanTracker::new(0.3, 0.05);

        assert!(matches!(
            tracker.set_plan(Path::new_empty()),
            Err(TrajCtrlError::EmptyPath)
        ));
        assert!(matches!(
            tracker.target_pose(),
            Err(TrajCtrlError::NoActivePlan)
        ));
        assert!(matches!(
            tracker.update_target(&Pose::default()),
            Err(TrajCtrlError::NoActivePlan)
        ));

        // A rejected plan keeps the previous one
        tracker.set_plan(straight_plan()).unwrap();
        assert!(tracker.set_plan(Path::new_empty()).is_err());
        assert!(tracker.has_plan());
    }

    #[test]
    fn test_monotonic_on_straight_path() {
        let mut tracker = PlanTracker::new(0.3, 0.05);
        tracker.set_plan(straight_plan()).unwrap();

        let mut prev = tracker.target_index();
        let mut x = 0.0;
        while x <= 5.0 {
            let index = tracker.update_target(&Pose::new(x, 0.0, 0.0)).unwrap();
            assert!(index >= prev);

            // Target stays ahead of the robot unless at the end
            let target = tracker.target_pose().unwrap();
            assert!(target.position_m.x >= x || tracker.is_final());

            prev = index;
            x += 0.05;
        }

        assert_eq!(prev, straight_plan().get_num_points() - 1);
    }

    #[test]
    fn test_never_regresses() {
        let mut tracker = PlanTracker::new(0.3, 0.05);
        tracker.set_plan(straight_plan()).unwrap();

        let forward = tracker.update_target(&Pose::new(3.0, 0.0, 0.0)).unwrap();
        let back = tracker.update_target(&Pose::new(0.0, 0.0, 0.0)).unwrap();

        assert_eq!(forward, back);
    }

    #[test]
    fn test_final_lock() {
        let mut tracker = PlanTracker::new(0.3, 0.1);
        tracker.set_plan(straight_plan()).unwrap();

        let last = straight_plan().get_num_points() - 1;
        assert_eq!(tracker.update_target(&Pose::new(4.95, 0.0, 0.0)).unwrap(), last);
        assert!(tracker.is_final());

        // Stays locked even if the robot drifts away
        assert_eq!(tracker.update_target(&Pose::new(3.0, 1.0, 0.0)).unwrap(), last);
    }
}
