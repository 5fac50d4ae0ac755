//! # Navigation library.
//!
//! This library provides the trajectory tracking controller and its obstacle pipeline, so that
//! the executable, the benchmarks and other crates in the workspace can use them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Lifecycle adapter - maps configure/activate/deactivate/cleanup onto the controller core
pub mod lifecycle;

/// Localisation module - planar poses and pose estimates
pub mod loc;

/// Occupancy grid snapshots consumed by obstacle clustering
pub mod map;

/// Navigation control - the controller core tying trajectory control and perception together
pub mod nav_ctrl;

/// Parameters of the navigation executable
pub mod params;

/// Paths made of poses
pub mod path;

/// Perception - obstacle clustering, centroids and relevance filtering
pub mod per;

/// Kinematic unicycle simulation
pub mod sim;

/// Trajectory control module - keeps the robot on the given path
pub mod traj_ctrl;

/// Visualisation markers and sinks
pub mod viz;
