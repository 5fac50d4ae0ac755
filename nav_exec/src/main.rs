//! Navigation executable entry point.
//!
//! # Architecture
//!
//! The executable runs the controller against a simulated unicycle robot:
//!
//!     - Initialise the session, logging and parameters
//!     - Configure and activate the controller through its lifecycle adapter
//!     - Start obstacle clustering, either on its own thread (realtime) or on simulated time
//!     - Main loop:
//!         - Pose update from the simulation
//!         - Velocity command computation
//!         - Simulation step
//!         - Archiving
//!     - Stop clustering, shut the controller down and close the session
//!
//! An optional single argument gives the path to the executable's parameter file, otherwise
//! `nav_exec.toml` from the parameters directory is used.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use nav_lib::{
    lifecycle::{ControllerPlugin, LifecycleState},
    map::OccupancyGrid,
    nav_ctrl::{self, NavCtrl, RateTimer, Twist},
    params::NavExecParams,
    sim::UnicycleSim,
    viz::{build_markers, SessionVizSink, VizSink},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// How often the clustering thread checks whether clustering is due.
const CLUSTERING_POLL_PERIOD: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let exec_params: NavExecParams = match args.len() {
        1 => util::params::load("nav_exec.toml"),
        2 => {
            info!("Loading executable parameters from \"{}\"", &args[1]);
            util::params::load_path(&args[1])
        }
        n => return Err(eyre!("Expected either zero or one argument, found {}", n - 1)),
    }
    .wrap_err("Could not load the executable parameters")?;

    exec_params
        .validate()
        .wrap_err("Invalid executable parameters")?;

    let ctrl_params: nav_ctrl::Params =
        util::params::load("nav_ctrl.toml").wrap_err("Could not load the controller parameters")?;

    info!("Parameters loaded");

    // ---- INITIALISE CONTROLLER ----

    let mut plugin = ControllerPlugin::new("feedback_lin");
    plugin
        .configure(ctrl_params)
        .wrap_err("Failed to configure the controller")?;
    plugin
        .activate()
        .wrap_err("Failed to activate the controller")?;

    if let Some(limit) = exec_params.speed_limit {
        plugin
            .set_speed_limit(limit.value, limit.is_percentage)
            .wrap_err("Invalid speed limit")?;
    }

    let plan = exec_params.build_plan()?;
    info!(
        "Plan has {} poses over {:.2} m",
        plan.get_num_points(),
        plan.get_length().unwrap_or(0.0)
    );
    plugin.set_plan(plan).wrap_err("Failed to set the plan")?;

    // ---- INITIALISE SIMULATION ----

    let grid = Arc::new(exec_params.build_grid()?);
    let mut sim = UnicycleSim::new(exec_params.start);
    let goal_checker = exec_params.goal_checker;

    let viz_sink = SessionVizSink::new(&session, "viz");

    let mut status_arch = Archiver::from_path(&session, "nav_ctrl/status.csv")
        .wrap_err("Failed to create the status archive")?;
    let mut sim_arch = Archiver::from_path(&session, "sim/pose.csv")
        .wrap_err("Failed to create the simulation archive")?;

    // ---- START CLUSTERING ----

    let nav = plugin.core()?;
    let mut clustering_timer = nav.clustering_timer()?;
    let clustering_stop = Arc::new(AtomicBool::new(false));

    let clustering_handle = match exec_params.realtime {
        true => Some(spawn_clustering(
            nav.clone(),
            grid.clone(),
            clustering_timer.clone(),
            clustering_stop.clone(),
            SessionVizSink::new(&session, "viz"),
            exec_params.markers_every_n,
        )),
        false => None,
    };

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut num_clustering_cycles = 0u64;

    // Errors end the loop, the shutdown below must still run
    let run_result = (|| -> Result<(), Report> {
        for cycle in 0..exec_params.max_cycles {
            let cycle_start_instant = Instant::now();

            // ---- DATA INPUT ----

            plugin.on_pose_update(&sim.pose_estimate())?;

            // Clustering on simulated time when not running in realtime
            if !exec_params.realtime && clustering_timer.is_due(sim.time_s()) {
                let view = plugin.on_clustering_tick(&grid)?;
                publish_markers(&viz_sink, &view, num_clustering_cycles, exec_params.markers_every_n);
                num_clustering_cycles += 1;
            }

            // ---- CONTROL ----

            let (cmd, report) = match plugin.compute_velocity_command(
                &sim.pose(),
                &sim.velocity(),
                Some(&goal_checker),
            ) {
                Ok(c) => (c, nav.status_report()?),
                Err(e) => {
                    // Stop the robot
                    warn!("Could not compute a velocity command: {}", e);
                    (Twist::zero(), None)
                }
            };

            sim.step(&cmd, exec_params.cycle_period_s);

            // ---- WRITE ARCHIVES ----

            sim_arch.serialise(sim.record())?;

            if let Some(r) = report {
                status_arch.serialise(r)?;

                if r.goal_reached == Some(true) {
                    info!(
                        "Goal reached after {} cycles ({:.2} s simulated)",
                        cycle + 1,
                        sim.time_s()
                    );
                    return Ok(());
                }
            }

            // ---- CYCLE MANAGEMENT ----

            if exec_params.realtime {
                let cycle_dur = Instant::now() - cycle_start_instant;

                match Duration::from_secs_f64(exec_params.cycle_period_s).checked_sub(cycle_dur) {
                    Some(d) => thread::sleep(d),
                    None => warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - exec_params.cycle_period_s
                    ),
                }
            }
        }

        Ok(())
    })();

    if let Err(e) = &run_result {
        warn!("Main loop stopped on error: {}", e);
    }

    // ---- SHUTDOWN ----

    clustering_stop.store(true, Ordering::Relaxed);
    if let Some(h) = clustering_handle {
        if h.join().is_err() {
            warn!("Clustering thread panicked");
        }
    }

    let final_pose = sim.pose();
    info!(
        "Final pose: ({:.3}, {:.3}) m, {:.3} rad",
        final_pose.position_m.x,
        final_pose.position_m.y,
        final_pose.heading()
    );

    drop(nav);
    let shutdown_result = shutdown_plugin(&mut plugin);

    info!("End of execution");

    session.exit();

    first_error(run_result, shutdown_result)
}

/// Walk the plugin back through its lifecycle, from whatever state the run left it in.
fn shutdown_plugin(plugin: &mut ControllerPlugin) -> Result<(), Report> {
    if plugin.state() == LifecycleState::Active {
        plugin.deactivate()?;
    }
    if plugin.state() == LifecycleState::Inactive {
        plugin.cleanup()?;
    }
    plugin.finalize()?;
    Ok(())
}

/// Combine the outcome of the run with the outcome of the shutdown, the run's error first.
fn first_error(run: Result<(), Report>, shutdown: Result<(), Report>) -> Result<(), Report> {
    match (run, shutdown) {
        (Err(e), Err(s)) => {
            warn!("Shutdown also failed: {}", s);
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// Run clustering at the clustering rate on its own thread until `stop` is set.
fn spawn_clustering(
    nav: Arc<NavCtrl>,
    grid: Arc<OccupancyGrid>,
    mut timer: RateTimer,
    stop: Arc<AtomicBool>,
    viz_sink: SessionVizSink,
    markers_every_n: u64,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut num_cycles = 0u64;

        while !stop.load(Ordering::Relaxed) {
            if timer.is_due(session::get_elapsed_seconds()) {
                match nav.on_clustering_tick(&grid) {
                    Ok(view) => {
                        publish_markers(&viz_sink, &view, num_cycles, markers_every_n);
                        num_cycles += 1;
                    }
                    Err(e) => warn!("Clustering failed: {}", e),
                }
            }

            thread::sleep(CLUSTERING_POLL_PERIOD);
        }

        debug!("Clustering thread stopped after {} cycles", num_cycles);
    })
}

fn publish_markers<S: VizSink>(
    sink: &S,
    view: &nav_lib::per::ObstacleView,
    cycle: u64,
    every_n: u64,
) {
    if every_n == 0 || cycle % every_n != 0 {
        return;
    }

    if let Err(e) = sink.publish(&build_markers(view)) {
        warn!("Could not publish markers: {}", e);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctrl_params() -> nav_ctrl::Params {
        util::params::load_str(include_str!("../../params/nav_ctrl.toml")).unwrap()
    }

    #[test]
    fn test_first_error() {
        assert!(first_error(Ok(()), Ok(())).is_ok());

        let e = first_error(Err(eyre!("run")), Ok(())).unwrap_err();
        assert_eq!(e.to_string(), "run");

        let e = first_error(Ok(()), Err(eyre!("shutdown"))).unwrap_err();
        assert_eq!(e.to_string(), "shutdown");

        let e = first_error(Err(eyre!("run")), Err(eyre!("shutdown"))).unwrap_err();
        assert_eq!(e.to_string(), "run");
    }

    #[test]
    fn test_shutdown_plugin() {
        let mut plugin = ControllerPlugin::new("fb_lin");
        plugin.configure(ctrl_params()).unwrap();
        plugin.activate().unwrap();

        shutdown_plugin(&mut plugin).unwrap();
        assert_eq!(plugin.state(), LifecycleState::Finalized);

        // A run which never got past configuration still shuts down
        let mut plugin = ControllerPlugin::new("fb_lin");
        shutdown_plugin(&mut plugin).unwrap();
        assert_eq!(plugin.state(), LifecycleState::Finalized);
    }
}
