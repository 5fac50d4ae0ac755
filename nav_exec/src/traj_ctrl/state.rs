//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::*;
use crate::{loc::Pose, path::Path};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct TrajCtrl {
    params: Params,

    /// Holds the plan and current target
    tracker: PlanTracker,

    /// Control law
    controller: FeedbackLin,
}

/// Input data for one trajectory control cycle.
#[derive(Debug, Copy, Clone)]
pub struct InputData {
    pub pose: Pose,
    pub speed_limit: SpeedLimit,
}

/// The status report containing the monitoring quantities of one cycle.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Index of the target pose within the plan
    pub target_index: usize,

    /// True if the target has locked onto the last pose of the plan
    pub final_target: bool,

    /// Distance from the controlled point to the target
    pub pos_error_m: f64,

    /// Forward speed before the speed limit was applied
    pub raw_linear_ms: f64,

    /// Ratio applied by the speed limit to both speeds
    pub limit_ratio: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TrajCtrl {
    type InitData = Params;
    type InitError = TrajCtrlError;

    type InputData = InputData;
    type OutputData = Twist;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Initialise the TrajCtrl module from (already loaded) parameters.
    fn init(params: Params) -> Result<Self, TrajCtrlError> {
        params.validate()?;

        let controller = FeedbackLin::from_params(&params)?;
        let tracker = PlanTracker::from_params(&params);

        Ok(Self {
            params,
            tracker,
            controller,
        })
    }

    /// Process trajectory control.
    ///
    /// Processing involves:
    ///  1. Refreshing the target pose from the robot's pose.
    ///  1. Evaluating the control law towards the target.
    ///  1. Applying the speed limit.
    fn proc(&mut self, input: &InputData) -> Result<(Twist, StatusReport), TrajCtrlError> {
        let target_index = self.tracker.update_target(&input.pose)?;
        let target = self.tracker.target_pose()?;

        let raw = self.controller.compute(&input.pose, &target);
        let limited = input
            .speed_limit
            .apply(raw.twist, self.params.max_linear_speed_ms);

        let report = StatusReport {
            target_index,
            final_target: self.tracker.is_final(),
            pos_error_m: raw.error_m.norm(),
            raw_linear_ms: raw.twist.linear_ms,
            limit_ratio: limited.ratio,
        };

        trace!(
            "TrajCtrl: target {}, cmd = ({:.3} m/s, {:.3} rad/s)",
            target_index,
            limited.twist.linear_ms,
            limited.twist.angular_rads
        );

        Ok((limited.twist, report))
    }
}

impl TrajCtrl {
    /// Replace the plan being followed. Execution towards its first pose starts on the next
    /// call to `proc`.
    pub fn set_plan(&mut self, plan: Path) -> Result<(), TrajCtrlError> {
        self.tracker.set_plan(plan)
    }

    /// Move the target on from the given pose, returning `None` if there is no plan.
    pub fn refresh_target(&mut self, pose: &Pose) -> Result<Option<usize>, TrajCtrlError> {
        match self.tracker.has_plan() {
            true => self.tracker.update_target(pose).map(Some),
            false => Ok(None),
        }
    }

    pub fn clear_plan(&mut self) {
        self.tracker.clear()
    }

    pub fn tracker(&self) -> &PlanTracker {
        &self.tracker
    }

    pub fn controller(&self) -> &FeedbackLin {
        &self.controller
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj_ctrl::params::test::params;
    use nalgebra::Vector2;

    #[test]
    fn test_init_rejects_bad_epsilon() {
        let mut p = params();
        p.epsilon_m = 0.0;

        assert!(matches!(
            TrajCtrl::init(p),
            Err(TrajCtrlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_proc_without_plan() {
        let mut tc = TrajCtrl::init(params()).unwrap();
        let input = InputData {
            pose: Pose::default(),
            speed_limit: SpeedLimit::Unlimited,
        };

        assert!(matches!(tc.proc(&input), Err(TrajCtrlError::NoActivePlan)));
    }

    #[test]
    fn test_proc_limits_speed() {
        let mut tc = TrajCtrl::init(params()).unwrap();
        tc.set_plan(Path::from_points(&[
            Vector2::new(0.0, 0.0),
            Vector2::new(4.0, 0.0),
        ]))
        .unwrap();

        let input = InputData {
            pose: Pose::new(0.0, 0.0, 0.0),
            speed_limit: SpeedLimit::Absolute(0.2),
        };

        let (twist, report) = tc.proc(&input).unwrap();

        // Target is the far point, raw speed k_x * (4 - epsilon)
        assert_eq!(report.target_index, 1);
        assert!((report.raw_linear_ms - 3.9).abs() < 1e-9);
        assert!((twist.linear_ms - 0.2).abs() < 1e-12);
        assert!((report.limit_ratio - 0.2 / 3.9).abs() < 1e-12);
    }
}
