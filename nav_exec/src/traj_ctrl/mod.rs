//! # Trajectory control module
//!
//! Trajectory control keeps the robot on the current plan. It is made of three parts:
//!
//! - The [`PlanTracker`] holds the plan and picks the target pose from it. The target only ever
//!   moves forward along the plan, so the robot cannot oscillate between nearby points.
//! - The [`FeedbackLin`] controller tracks a point a small distance `epsilon` ahead of the
//!   robot's rotation centre. Controlling this offset point instead of the centre itself removes
//!   the singularity of the unicycle model at zero forward speed, and gives a simple linear map
//!   from world frame velocity demands to forward and angular speed.
//! - The [`SpeedLimit`] clamps the forward speed, scaling the angular speed by the same ratio so
//!   that the commanded curvature is kept.
//!
//! [`TrajCtrl`] ties these together behind the [`util::module::State`] interface.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod speed_limit;
pub mod state;
pub mod target;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::Params;
pub use speed_limit::*;
pub use state::*;
pub use target::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur in trajectory control.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TrajCtrlError {
    /// Attempted to set a plan with no poses in it. The previous plan is kept.
    #[error("Attempted to set an empty plan")]
    EmptyPath,

    /// A command was requested but no plan has been set.
    #[error("No plan has been set")]
    NoActivePlan,

    #[error("Invalid trajectory control configuration: {0}")]
    InvalidConfig(String),
}
