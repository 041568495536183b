//! Drive actuation module
//!
//! Routes velocity commands to the swerve modules in one of several modes, shaping driver
//! commands through the skill level and the velocity limiter chain. The module owns the
//! robot's per-tick state estimate, computed once per tick through a [`TickCache`].
//!
//! [`TickCache`]: crate::tick_cache::TickCache

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod skill;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use params::*;
pub use skill::*;
pub use state::*;

use drive_if::{
    eqpt::{ActuatorError, EstimatorError},
    FieldRelativeVelocity, RobotState,
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The drive operations a closed loop controller needs.
pub trait DriveSubsystem {
    /// The robot state for the current tick.
    fn state(&mut self) -> Result<RobotState, DriveError>;

    /// True if every module is pointing the way `v` needs it to.
    fn aligned(&mut self, v: FieldRelativeVelocity) -> bool;

    /// Point the modules for `v` without driving.
    fn steer_at_rest(&mut self, v: FieldRelativeVelocity);

    /// Drive at `v`, scaled by the driver skill and limited.
    fn drive_in_field_coords(&mut self, v: FieldRelativeVelocity);

    /// Drive at `v` exactly as given.
    fn drive_in_field_coords_verbatim(&mut self, v: FieldRelativeVelocity);

    /// Forget any transient limiter memory.
    fn reset_limiter(&mut self);

    fn stop(&mut self);
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors during drive operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Could not estimate the robot state: {0}")]
    EstimatorError(#[from] EstimatorError),

    #[error("Module actuation failed: {0}")]
    ActuatorError(#[from] ActuatorError),
}

/// The mode the modules were last commanded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriveMode {
    /// Field relative, skill scaled and limited.
    ScaledFieldRelative,

    /// Field relative, as given.
    VerbatimFieldRelative,

    /// Steering only, drive motors at rest.
    SteerAtRest,

    /// Robot relative, skill scaled.
    RobotRelative,

    /// Robot relative, as given.
    RobotRelativeVerbatim,

    /// Individual module states.
    RawModuleStates,

    /// Wheels in an X to resist being pushed.
    Defense,

    /// All wheels pointing forward.
    Steer0,

    /// All wheels pointing left.
    Steer90,

    Stop,
}
