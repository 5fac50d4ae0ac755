//! # Unicycle simulation
//!
//! Kinematic simulation of a unicycle robot, used by the executive in place of a real robot and
//! localisation source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Matrix3;
use serde::Serialize;

use crate::{
    loc::{Pose, PoseWithCovariance},
    traj_ctrl::Twist,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UnicycleSim {
    pose: Pose,

    /// Last command applied
    velocity: Twist,

    /// Simulated time
    time_s: f64,
}

/// One row of the simulation archive.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct SimRecord {
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,
    pub linear_ms: f64,
    pub angular_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl UnicycleSim {
    pub fn new(start: Pose) -> Self {
        Self {
            pose: start,
            velocity: Twist::zero(),
            time_s: 0.0,
        }
    }

    /// Integrate the command over `dt_s`.
    ///
    /// The heading is advanced first, then the position along the new heading.
    pub fn step(&mut self, cmd: &Twist, dt_s: f64) {
        self.pose.rotate(cmd.angular_rads * dt_s);

        let forward = self.pose.forward2();
        self.pose.position_m += forward * cmd.linear_ms * dt_s;

        self.velocity = *cmd;
        self.time_s += dt_s;
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn velocity(&self) -> Twist {
        self.velocity
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// The current pose as a localisation estimate, with a small fixed covariance.
    pub fn pose_estimate(&self) -> PoseWithCovariance {
        let mut estimate = PoseWithCovariance::new(self.pose);
        estimate.covariance = Matrix3::from_diagonal_element(1e-4);
        estimate
    }

    pub fn record(&self) -> SimRecord {
        SimRecord {
            time_s: self.time_s,
            x_m: self.pose.position_m.x,
            y_m: self.pose.position_m.y,
            heading_rad: self.pose.heading(),
            linear_ms: self.velocity.linear_ms,
            angular_rads: self.velocity.angular_rads,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        nav_ctrl::{test::params, NavCtrl},
        path::Path,
    };
    use nalgebra::Vector2;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_straight_and_turn() {
        let mut sim = UnicycleSim::new(Pose::new(0.0, 0.0, 0.0));

        sim.step(&Twist::new(1.0, 0.0), 0.5);
        assert!((sim.pose().position_m - Vector2::new(0.5, 0.0)).norm() < 1e-12);

        sim.step(&Twist::new(0.0, FRAC_PI_2), 1.0);
        assert!((sim.pose().heading() - FRAC_PI_2).abs() < 1e-12);
        assert!((sim.pose().position_m - Vector2::new(0.5, 0.0)).norm() < 1e-12);

        assert!((sim.time_s() - 1.5).abs() < 1e-12);
        assert_eq!(sim.record().angular_rads, FRAC_PI_2);
    }

    #[test]
    fn test_closed_loop_reaches_goal() {
        let nav = NavCtrl::initialize(params()).unwrap();
        let goal = Vector2::new(3.0, 2.0);
        let plan = Path::direct(Vector2::zeros(), goal, 0.1).unwrap();
        let last = plan.get_num_points() - 1;
        nav.set_plan(plan).unwrap();

        let mut sim = UnicycleSim::new(Pose::new(0.0, 0.0, -1.0));
        for _ in 0..2000 {
            nav.on_pose_update(&sim.pose_estimate()).unwrap();
            let cmd = nav
                .compute_velocity_command(&sim.pose(), &sim.velocity(), None)
                .unwrap();
            sim.step(&cmd, 0.05);
        }

        // The controlled point settles on the final pose
        let point = sim.pose().point_ahead(params().traj_ctrl.epsilon_m);
        assert!((point - goal).norm() < 0.02);
        assert_eq!(nav.status_report().unwrap().unwrap().target_index, last);
    }
}
