//! # Lifecycle adapter
//!
//! Hosts manage controllers through configure / activate / deactivate / cleanup transitions.
//! [`ControllerPlugin`] maps those transitions onto [`NavCtrl::initialize`] and
//! [`NavCtrl::shutdown`], and refuses commands unless the controller is active. The core itself
//! knows nothing about lifecycles.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    loc::{Pose, PoseWithCovariance},
    map::OccupancyGrid,
    nav_ctrl::{GoalChecker, NavCtrl, NavCtrlError, Params, Twist},
    path::Path,
    per::ObstacleView,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct ControllerPlugin {
    name: String,
    state: LifecycleState,
    core: Option<Arc<NavCtrl>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Unconfigured,
    Inactive,
    Active,
    Finalized,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Cannot transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("The controller is not active")]
    NotActive,

    #[error(transparent)]
    Core(#[from] NavCtrlError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControllerPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: LifecycleState::Unconfigured,
            core: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Build the core from the parameters. On failure the plugin stays unconfigured.
    pub fn configure(&mut self, params: Params) -> Result<(), LifecycleError> {
        self.expect_state(LifecycleState::Unconfigured, LifecycleState::Inactive)?;

        self.core = Some(Arc::new(NavCtrl::initialize(params)?));
        self.transition(LifecycleState::Inactive);
        Ok(())
    }

    pub fn activate(&mut self) -> Result<(), LifecycleError> {
        self.expect_state(LifecycleState::Inactive, LifecycleState::Active)?;
        self.transition(LifecycleState::Active);
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<(), LifecycleError> {
        self.expect_state(LifecycleState::Active, LifecycleState::Inactive)?;
        self.transition(LifecycleState::Inactive);
        Ok(())
    }

    /// Shut the core down and drop it.
    pub fn cleanup(&mut self) -> Result<(), LifecycleError> {
        self.expect_state(LifecycleState::Inactive, LifecycleState::Unconfigured)?;
        self.release_core()?;
        self.transition(LifecycleState::Unconfigured);
        Ok(())
    }

    /// Final transition, allowed from any state except `Finalized`.
    pub fn finalize(&mut self) -> Result<(), LifecycleError> {
        if self.state == LifecycleState::Finalized {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: LifecycleState::Finalized,
            });
        }

        self.release_core()?;
        self.transition(LifecycleState::Finalized);
        Ok(())
    }

    /// Shared handle on the core, available once configured.
    ///
    /// Background tasks such as clustering use this handle directly.
    pub fn core(&self) -> Result<Arc<NavCtrl>, LifecycleError> {
        match (self.state, &self.core) {
            (LifecycleState::Inactive, Some(c)) | (LifecycleState::Active, Some(c)) => {
                Ok(c.clone())
            }
            _ => Err(LifecycleError::NotActive),
        }
    }

    pub fn set_plan(&self, plan: Path) -> Result<(), LifecycleError> {
        Ok(self.active_core()?.set_plan(plan)?)
    }

    pub fn set_speed_limit(&self, value: f64, is_percentage: bool) -> Result<(), LifecycleError> {
        Ok(self.active_core()?.set_speed_limit(value, is_percentage)?)
    }

    pub fn on_pose_update(&self, estimate: &PoseWithCovariance) -> Result<(), LifecycleError> {
        Ok(self.active_core()?.on_pose_update(estimate)?)
    }

    pub fn on_clustering_tick(
        &self,
        grid: &OccupancyGrid,
    ) -> Result<Arc<ObstacleView>, LifecycleError> {
        Ok(self.active_core()?.on_clustering_tick(grid)?)
    }

    pub fn compute_velocity_command(
        &self,
        pose: &Pose,
        velocity: &Twist,
        goal_checker: Option<&dyn GoalChecker>,
    ) -> Result<Twist, LifecycleError> {
        Ok(self
            .active_core()?
            .compute_velocity_command(pose, velocity, goal_checker)?)
    }

    fn active_core(&self) -> Result<&NavCtrl, LifecycleError> {
        match (self.state, &self.core) {
            (LifecycleState::Active, Some(c)) => Ok(c.as_ref()),
            _ => Err(LifecycleError::NotActive),
        }
    }

    fn release_core(&mut self) -> Result<(), LifecycleError> {
        if let Some(core) = self.core.take() {
            core.shutdown()?;
        }
        Ok(())
    }

    fn expect_state(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleError> {
        if self.state == from {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    fn transition(&mut self, to: LifecycleState) {
        info!("{}: {:?} -> {:?}", self.name, self.state, to);
        self.state = to;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nav_ctrl::test::params;
    use crate::traj_ctrl::TrajCtrlError;
    use nalgebra::Vector2;

    #[test]
    fn test_lifecycle() {
        let mut plugin = ControllerPlugin::new("fb_lin");
        assert_eq!(plugin.state(), LifecycleState::Unconfigured);
        assert!(matches!(plugin.activate(), Err(LifecycleError::InvalidTransition { .. })));

        plugin.configure(params()).unwrap();
        assert_eq!(plugin.state(), LifecycleState::Inactive);

        // Commands refused until active
        let plan = Path::direct(Vector2::zeros(), Vector2::new(2.0, 0.0), 0.1).unwrap();
        assert!(matches!(plugin.set_plan(plan.clone()), Err(LifecycleError::NotActive)));

        plugin.activate().unwrap();
        plugin.set_plan(plan).unwrap();
        let twist = plugin
            .compute_velocity_command(&Pose::default(), &Twist::zero(), None)
            .unwrap();
        assert!(twist.linear_ms > 0.0);

        plugin.deactivate().unwrap();
        assert!(matches!(
            plugin.compute_velocity_command(&Pose::default(), &Twist::zero(), None),
            Err(LifecycleError::NotActive)
        ));

        plugin.cleanup().unwrap();
        assert_eq!(plugin.state(), LifecycleState::Unconfigured);
        assert!(plugin.core().is_err());

        plugin.finalize().unwrap();
        assert!(plugin.finalize().is_err());
    }

    #[test]
    fn test_bad_configuration_prevents_activation() {
        let mut plugin = ControllerPlugin::new("fb_lin");
        let mut p = params();
        p.traj_ctrl.epsilon_m = 0.0;

        assert!(matches!(
            plugin.configure(p),
            Err(LifecycleError::Core(NavCtrlError::TrajCtrl(
                TrajCtrlError::InvalidConfig(_)
            )))
        ));
        assert_eq!(plugin.state(), LifecycleState::Unconfigured);
        assert!(plugin.activate().is_err());
    }

    #[test]
    fn test_reconfigure_drops_plan() {
        let mut plugin = ControllerPlugin::new("fb_lin");
        plugin.configure(params()).unwrap();
        plugin.activate().unwrap();
        plugin
            .set_plan(Path::direct(Vector2::zeros(), Vector2::new(2.0, 0.0), 0.1).unwrap())
            .unwrap();

        plugin.deactivate().unwrap();
        plugin.cleanup().unwrap();
        plugin.configure(params()).unwrap();
        plugin.activate().unwrap();

        assert!(matches!(
            plugin.compute_velocity_command(&Pose::default(), &Twist::zero(), None),
            Err(LifecycleError::Core(NavCtrlError::TrajCtrl(
                TrajCtrlError::NoActivePlan
            )))
        ));
    }
}
