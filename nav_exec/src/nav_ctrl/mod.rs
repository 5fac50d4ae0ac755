//! # Navigation control module
//!
//! [`NavCtrl`] is the controller core. It is driven by three independent triggers:
//!
//! - pose updates from localisation ([`NavCtrl::on_pose_update`]), which refresh the target,
//! - clustering ticks at the clustering rate ([`NavCtrl::on_clustering_tick`]), which replace the
//!   obstacle set by clustering an occupancy grid,
//! - command requests at the control rate ([`NavCtrl::compute_velocity_command`]).
//!
//! Centroids and the relevance filter are rerun over the latest obstacle set on every pose update
//! and command request, so the obstacle view always matches the latest pose.
//!
//! The triggers may come from different threads. Each piece of shared state sits behind its own
//! lock so all methods take `&self`, and a `NavCtrl` can be shared in an `Arc`. No method holds
//! two locks at once.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod goal_checker;
mod rate_timer;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

// Internal
use crate::{
    loc::{Pose, PoseWithCovariance},
    map::OccupancyGrid,
    path::Path,
    per::{
        self, cluster, ObstacleClusterer, ObstacleSet, ObstacleView, PerError, PolygonFilter,
        RelevancePolicy,
    },
    traj_ctrl::{self, SpeedLimit, TrajCtrl, TrajCtrlError},
};
use util::{module::State, params::LoadError};

pub use crate::traj_ctrl::Twist;
pub use goal_checker::{GoalChecker, SimpleGoalChecker};
pub use rate_timer::RateTimer;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the whole controller, as found in `nav_ctrl.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    pub traj_ctrl: traj_ctrl::Params,
    pub per: per::Params,
}

pub struct NavCtrl {
    params: Params,

    /// Plan, target and control law
    traj_ctrl: Mutex<TrajCtrl>,

    /// Latest known pose of the robot
    pose: RwLock<Option<Pose>>,

    speed_limit: RwLock<SpeedLimit>,

    /// Output of the latest clustering cycle
    obstacle_set: RwLock<Arc<ObstacleSet>>,

    /// The latest obstacle set filtered against the latest pose
    obstacles: RwLock<Arc<ObstacleView>>,

    /// Report of the latest command computation
    report: RwLock<Option<StatusReport>>,

    clusterer: Box<dyn ObstacleClusterer>,

    filter: PolygonFilter,
}

/// Monitoring quantities of one command computation, flat so it can be archived to CSV.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,

    pub target_index: usize,
    pub final_target: bool,
    pub pos_error_m: f64,

    pub raw_linear_ms: f64,
    pub linear_ms: f64,
    pub angular_rads: f64,
    pub limit_ratio: f64,

    pub num_obstacles: usize,
    pub num_relevant: usize,

    /// Verdict of the caller's goal checker, if one was given
    pub goal_reached: Option<bool>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NavCtrlError {
    #[error(transparent)]
    TrajCtrl(#[from] TrajCtrlError),

    #[error(transparent)]
    Per(#[from] PerError),

    #[error("Could not load the controller parameters: {0}")]
    ParamLoad(#[from] LoadError),

    #[error("The {0} lock is poisoned")]
    LockPoisoned(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), NavCtrlError> {
        self.traj_ctrl.validate()?;
        self.per.validate()?;
        Ok(())
    }
}

impl NavCtrl {
    /// Build the controller from its parameters.
    ///
    /// All parameters are validated here, so a bad configuration is reported before the
    /// controller can be used.
    pub fn initialize(params: Params) -> Result<Self, NavCtrlError> {
        params.validate()?;

        let traj_ctrl = TrajCtrl::init(params.traj_ctrl.clone())?;
        let clusterer = cluster::from_params(&params.per.clusterer, params.per.min_occupied_cost)?;
        let filter = PolygonFilter::new(params.per.relevance_radius_m, params.per.relevance_policy)?;

        info!(
            "NavCtrl initialised: epsilon = {} m, K = diag({}, {}), max speed = {} m/s",
            params.traj_ctrl.epsilon_m,
            params.traj_ctrl.k_x,
            params.traj_ctrl.k_y,
            params.traj_ctrl.max_linear_speed_ms
        );
        info!(
            "Obstacles: {} clusterer at {} Hz, relevance radius {} m ({:?})",
            clusterer.name(),
            params.per.clustering_rate_hz,
            params.per.relevance_radius_m,
            params.per.relevance_policy
        );

        Ok(Self {
            params,
            traj_ctrl: Mutex::new(traj_ctrl),
            pose: RwLock::new(None),
            speed_limit: RwLock::new(SpeedLimit::default()),
            obstacle_set: RwLock::new(Arc::new(ObstacleSet::new(Vec::new()))),
            obstacles: RwLock::new(Arc::new(ObstacleView::empty())),
            report: RwLock::new(None),
            clusterer,
            filter,
        })
    }

    /// Load the parameters from a file relative to the parameters directory, then initialise.
    pub fn initialize_from_file(param_file_path: &str) -> Result<Self, NavCtrlError> {
        let params: Params = util::params::load(param_file_path)?;
        Self::initialize(params)
    }

    /// Drop all run time state: the plan, the pose, the speed limit and the obstacles.
    pub fn shutdown(&self) -> Result<(), NavCtrlError> {
        self.lock_traj_ctrl()?.clear_plan();

        *self.pose.write().map_err(|_| NavCtrlError::LockPoisoned("pose"))? = None;
        *self
            .speed_limit
            .write()
            .map_err(|_| NavCtrlError::LockPoisoned("speed limit"))? = SpeedLimit::default();
        *self
            .obstacle_set
            .write()
            .map_err(|_| NavCtrlError::LockPoisoned("obstacle set"))? =
            Arc::new(ObstacleSet::new(Vec::new()));
        *self
            .obstacles
            .write()
            .map_err(|_| NavCtrlError::LockPoisoned("obstacles"))? = Arc::new(ObstacleView::empty());
        *self
            .report
            .write()
            .map_err(|_| NavCtrlError::LockPoisoned("report"))? = None;

        info!("NavCtrl shut down");

        Ok(())
    }

    /// Replace the plan being followed.
    pub fn set_plan(&self, plan: Path) -> Result<(), NavCtrlError> {
        self.lock_traj_ctrl()?.set_plan(plan)?;
        Ok(())
    }

    /// Set the speed limit, either in m/s or as a percentage of the nominal maximum speed. A value
    /// of zero removes the limit.
    pub fn set_speed_limit(&self, value: f64, is_percentage: bool) -> Result<(), NavCtrlError> {
        let limit = SpeedLimit::from_value(value, is_percentage)?;

        info!("Speed limit set to {:?}", limit);

        *self
            .speed_limit
            .write()
            .map_err(|_| NavCtrlError::LockPoisoned("speed limit"))? = limit;

        Ok(())
    }

    /// Handle a new pose estimate from localisation.
    ///
    /// The mean pose is stored and, if a plan is set, the target is refreshed from it. The
    /// latest obstacle set is filtered again from the new pose.
    pub fn on_pose_update(&self, estimate: &PoseWithCovariance) -> Result<(), NavCtrlError> {
        let pose = estimate.mean();
        self.store_pose(pose)?;

        let target_index = self.lock_traj_ctrl()?.refresh_target(&pose)?;
        if let Some(index) = target_index {
            debug!("Pose update, target index {}", index);
        }

        self.refresh_obstacles(Some(pose))?;

        Ok(())
    }

    /// Run one clustering cycle over the grid, replacing the obstacle set and its view.
    pub fn on_clustering_tick(&self, grid: &OccupancyGrid) -> Result<Arc<ObstacleView>, NavCtrlError> {
        let set = Arc::new(self.clusterer.cluster(grid));

        *self
            .obstacle_set
            .write()
            .map_err(|_| NavCtrlError::LockPoisoned("obstacle set"))? = set;

        let pose = self.current_pose()?;
        self.refresh_obstacles(pose)
    }

    /// Compute the velocity command for the current cycle.
    ///
    /// The pose is stored as the latest known pose, the target refreshed and the control law and
    /// speed limit applied. The latest obstacle set is filtered from the pose. If `goal_checker`
    /// is given it is evaluated against the last pose of the plan, its verdict only appears in the
    /// status report.
    ///
    /// Fails with `NoActivePlan` if no plan has been set. No fallback command is produced on error.
    pub fn compute_velocity_command(
        &self,
        pose: &Pose,
        velocity: &Twist,
        goal_checker: Option<&dyn GoalChecker>,
    ) -> Result<Twist, NavCtrlError> {
        self.store_pose(*pose)?;

        let speed_limit = *self
            .speed_limit
            .read()
            .map_err(|_| NavCtrlError::LockPoisoned("speed limit"))?;

        let (twist, traj_report, goal) = {
            let mut traj_ctrl = self.lock_traj_ctrl()?;
            let (twist, report) = traj_ctrl.proc(&traj_ctrl::InputData {
                pose: *pose,
                speed_limit,
            })?;
            let goal = traj_ctrl.tracker().plan().and_then(|p| p.last()).copied();
            (twist, report, goal)
        };

        let view = self.refresh_obstacles(Some(*pose))?;
        let (num_obstacles, num_relevant) = (view.centroids.len(), view.relevant.len());

        let goal_reached = match (goal_checker, goal) {
            (Some(c), Some(g)) => Some(c.is_goal_reached(pose, &g, velocity)),
            _ => None,
        };

        let report = StatusReport {
            x_m: pose.position_m.x,
            y_m: pose.position_m.y,
            heading_rad: pose.heading(),
            target_index: traj_report.target_index,
            final_target: traj_report.final_target,
            pos_error_m: traj_report.pos_error_m,
            raw_linear_ms: traj_report.raw_linear_ms,
            linear_ms: twist.linear_ms,
            angular_rads: twist.angular_rads,
            limit_ratio: traj_report.limit_ratio,
            num_obstacles,
            num_relevant,
            goal_reached,
        };

        debug!(
            "Cmd: v = {:.3} m/s, w = {:.3} rad/s, target {}",
            twist.linear_ms, twist.angular_rads, report.target_index
        );

        *self
            .report
            .write()
            .map_err(|_| NavCtrlError::LockPoisoned("report"))? = Some(report);

        Ok(twist)
    }

    /// The obstacle view of the latest clustering cycle.
    pub fn obstacle_view(&self) -> Result<Arc<ObstacleView>, NavCtrlError> {
        self.obstacles
            .read()
            .map(|v| v.clone())
            .map_err(|_| NavCtrlError::LockPoisoned("obstacles"))
    }

    /// The report of the latest successful command computation.
    pub fn status_report(&self) -> Result<Option<StatusReport>, NavCtrlError> {
        self.report
            .read()
            .map(|r| *r)
            .map_err(|_| NavCtrlError::LockPoisoned("report"))
    }

    pub fn target_pose(&self) -> Result<Pose, NavCtrlError> {
        Ok(self.lock_traj_ctrl()?.tracker().target_pose()?)
    }

    pub fn current_pose(&self) -> Result<Option<Pose>, NavCtrlError> {
        self.pose
            .read()
            .map(|p| *p)
            .map_err(|_| NavCtrlError::LockPoisoned("pose"))
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Build a timer for the clustering rate.
    pub fn clustering_timer(&self) -> Result<RateTimer, NavCtrlError> {
        RateTimer::new(self.params.per.clustering_rate_hz).ok_or_else(|| {
            NavCtrlError::Per(PerError::InvalidConfig(format!(
                "invalid clustering rate {}",
                self.params.per.clustering_rate_hz
            )))
        })
    }

    /// Filter the latest obstacle set from `pose` and publish the resulting view.
    ///
    /// Without a pose nothing can be judged relevant.
    fn refresh_obstacles(&self, pose: Option<Pose>) -> Result<Arc<ObstacleView>, NavCtrlError> {
        let set = self
            .obstacle_set
            .read()
            .map_err(|_| NavCtrlError::LockPoisoned("obstacle set"))?
            .clone();

        let plan = match self.filter.policy() {
            RelevancePolicy::DistanceFromPath => self.lock_traj_ctrl()?.tracker().plan().cloned(),
            RelevancePolicy::DistanceFromRobot => None,
        };

        let view = match pose {
            Some(p) => ObstacleView::build(&set, &self.filter, &p, plan.as_ref())?,
            None => {
                let mut view = ObstacleView::build(&set, &self.filter, &Pose::default(), None)?;
                view.relevant.clear();
                view
            }
        };

        let view = Arc::new(view);

        *self
            .obstacles
            .write()
            .map_err(|_| NavCtrlError::LockPoisoned("obstacles"))? = view.clone();

        Ok(view)
    }

    fn store_pose(&self, pose: Pose) -> Result<(), NavCtrlError> {
        *self.pose.write().map_err(|_| NavCtrlError::LockPoisoned("pose"))? = Some(pose);
        Ok(())
    }

    fn lock_traj_ctrl(&self) -> Result<MutexGuard<'_, TrajCtrl>, NavCtrlError> {
        self.traj_ctrl
            .lock()
            .map_err(|_| NavCtrlError::LockPoisoned("traj_ctrl"))
    }
}
