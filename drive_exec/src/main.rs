//! Main swerve drive executable entry point.
//!
//! # Architecture
//!
//! The executable plays a single trajectory back on the simulated drivetrain:
//!
//!     - Parse the command line
//!     - Initialise the session, logging and parameters
//!     - Build the drivetrain backend, limiter chain and drive
//!     - Main loop:
//!         - Start the tick, computing the robot state once
//!         - Start reference control on the playback tick
//!         - Reference control processing
//!         - Archive the tick
//!     - Stop the drive

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::Serialize;
use std::{
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use drive_if::eqpt::VoltageSource;
use drive_lib::{
    drive::{self, DriveSubsystem, DriverSkill, Level, SwerveDrive},
    limiter::VelocityLimiterChain,
    ref_ctrl::{
        self, FullStateController, ReferenceController, Trajectory, TrajectoryReference,
    },
    sim::{self, Backend, SimGyro, SimModules, SimPlatform, SimPoseEstimator, SimVoltage},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    logger::{logger_init, LevelFilter},
    session::Session,
    time::CycleClock,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tick on which trajectory playback starts, leaving time for the estimate to settle.
const PLAYBACK_START_TICK: u64 = 5;

/// Time allowed after the end of the trajectory for the controller to reach the reference.
///
/// Units: seconds
const PLAYBACK_TIMEOUT_S: f64 = 2.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Play a trajectory back on the simulated swerve drive")]
struct Args {
    /// Trajectory to play, relative to the params directory
    #[structopt(long, default_value = "trajectory.toml")]
    trajectory: String,

    /// Driver skill level, overriding the drive parameters
    #[structopt(long)]
    skill: Option<Level>,
}

type SimDrive = SwerveDrive<SimPoseEstimator, SimGyro, SimModules, VelocityLimiterChain<SimVoltage>>;

/// One row of the drive archive.
#[derive(Debug, Default, Serialize)]
struct DriveRecord {
    tick: u64,
    time_s: f64,
    x_m: f64,
    y_m: f64,
    heading_rad: f64,
    vx_ms: f64,
    vy_ms: f64,
    omega_rads: f64,
    mode: String,
    driving: bool,
    target_vx_ms: f64,
    target_vy_ms: f64,
    target_omega_rads: f64,
    limit_linear_ms: f64,
    limit_angular_rads: f64,
}

/// Archive of the drive state at every tick.
struct DriveArchive {
    archiver: Archiver,
    record: DriveRecord,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Swerve Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let drive_params: drive::Params =
        util::params::load("drive.toml").wrap_err("Could not load drive params")?;
    let ref_ctrl_params: ref_ctrl::Params =
        util::params::load("ref_ctrl.toml").wrap_err("Could not load reference control params")?;
    let sim_params: sim::Params =
        util::params::load("sim.toml").wrap_err("Could not load sim params")?;
    let trajectory: Trajectory =
        util::params::load(&args.trajectory).wrap_err("Could not load the trajectory")?;

    drive_params
        .kinodynamics
        .validate()
        .wrap_err("Invalid kinodynamics")?;
    drive_params
        .limiter
        .validate()
        .wrap_err("Invalid limiter params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE DRIVE ----

    let platform = match sim_params.backend {
        Backend::Sim => SimPlatform::new(
            drive_params.kinodynamics,
            &sim_params,
            drive_params.cycle_period_s,
        ),
    };

    let skill = DriverSkill::global();
    skill.set_level(args.skill.unwrap_or(drive_params.initial_skill));
    info!("Driver skill: {:?}", skill.level());

    let limiter = VelocityLimiterChain::from_params(
        drive_params.kinodynamics,
        platform.voltage,
        &drive_params.limiter,
    );

    let mut drive: SimDrive = SwerveDrive::new(
        drive_params.cycle_period_s,
        platform.estimator,
        platform.gyro,
        platform.modules,
        limiter,
        skill,
    );

    let mut archive = DriveArchive::new(&session).wrap_err("Failed to create the drive archive")?;

    // ---- MAIN LOOP ----

    let mut clock = CycleClock::new(drive_params.cycle_period_s);
    let mut reference = Some(TrajectoryReference::new(trajectory, ref_ctrl_params.lookahead_s));
    let mut ref_ctrl: Option<ReferenceController<FullStateController, TrajectoryReference>> = None;
    let mut end_time_s = f64::INFINITY;

    info!("Begining main loop\n");

    loop {
        let cycle_start_instant = Instant::now();
        let tick = clock.advance();

        drive.periodic(tick);

        // Playback must start from the state of this tick
        if tick == PLAYBACK_START_TICK {
            if let Some(r) = reference.take() {
                end_time_s = clock.now_s() + r.trajectory().duration_s() + PLAYBACK_TIMEOUT_S;

                ref_ctrl = Some(
                    ReferenceController::new(
                        &mut drive,
                        FullStateController::new(&ref_ctrl_params),
                        r,
                        ref_ctrl_params.options(),
                    )
                    .wrap_err("Failed to start reference control")?,
                );
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ref_ctrl {
            Some(ref mut rc) => {
                if let Err(e) = rc.execute(&mut drive) {
                    warn!("Error during reference control processing: {}", e);
                }

                if rc.is_finished() {
                    info!("Trajectory finished at {:.3} s", clock.now_s());
                    break;
                }
                if clock.now_s() > end_time_s {
                    warn!(
                        "Trajectory timed out at {:.3} s (done: {}, at reference: {})",
                        clock.now_s(),
                        rc.is_done(),
                        rc.at_reference()
                    );
                    break;
                }
            }
            None => drive.stop(),
        }

        // ---- WRITE ARCHIVES ----

        archive.update(&mut drive, ref_ctrl.as_ref());
        if let Err(e) = archive.write() {
            warn!("Could not write the drive archive: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(clock.period_s()).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - clock.period_s()
            ),
        }
    }

    // ---- SHUTDOWN ----

    drive.stop();

    let final_pose = drive.pose().wrap_err("No final pose available")?;
    info!("Final pose: {:?}", final_pose);

    let volts = drive
        .limiter_mut()
        .battery_sag_mut()
        .voltage_source_mut()
        .voltage()
        .unwrap_or(f64::NAN);
    info!("Battery at {:.2} V", volts);

    info!("End of execution");

    Ok(())
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveArchive {
    fn new(session: &Session) -> Result<Self, ArchiveError> {
        Ok(Self {
            archiver: Archiver::from_path(session, "drive/drive.csv")?,
            record: DriveRecord::default(),
        })
    }

    /// Capture the drive's state for this tick.
    fn update(
        &mut self,
        drive: &mut SimDrive,
        ref_ctrl: Option<&ReferenceController<FullStateController, TrajectoryReference>>,
    ) {
        let mut record = DriveRecord {
            mode: format!("{:?}", drive.last_mode()),
            ..Default::default()
        };

        if let Ok(s) = drive.state() {
            record.tick = s.tick;
            record.time_s = s.timestamp_s;
            record.x_m = s.pose.position_m[0];
            record.y_m = s.pose.position_m[1];
            record.heading_rad = s.pose.heading_rad;
            record.vx_ms = s.velocity.vx_ms;
            record.vy_ms = s.velocity.vy_ms;
            record.omega_rads = s.velocity.omega_rads;
        }

        if let Some(rc) = ref_ctrl {
            let report = rc.report();
            record.driving = report.driving;
            record.target_vx_ms = report.target.vx_ms;
            record.target_vy_ms = report.target.vy_ms;
            record.target_omega_rads = report.target.omega_rads;
        }

        let limit = drive.limiter().last_limit().unwrap_or_default();
        record.limit_linear_ms = limit.max_linear_ms;
        record.limit_angular_rads = limit.max_angular_rads;

        self.record = record;
    }
}

impl Archived for DriveArchive {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.archiver.serialise(&self.record)
    }
}
