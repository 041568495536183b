//! # Reference control module
//!
//! Plays back a time indexed reference by combining its feedforward velocity with feedback on
//! the measured state. Playback begins with the wheels steered towards the first target while the
//! platform is held at rest, drive only begins once every module is aligned.
//!
//! A [`ReferenceController`] is bound to a single playback. It must be constructed on the tick
//! playback starts, since construction captures the live measurement.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod params;
mod reference;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use controllers::*;
pub use params::*;
pub use reference::*;
pub use state::*;

use crate::drive::DriveError;
use drive_if::{FieldRelativeVelocity, Pose2, RobotState};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A time indexed reference which owns its own clock.
///
/// `now_s` is always the timestamp of the measurement being controlled.
pub trait SwerveReference {
    /// Start (or restart) the clock from the given measurement.
    fn initialize(&mut self, measurement: &RobotState);

    /// The reference at the current time.
    fn current(&self, now_s: f64) -> TimedState;

    /// The reference one step ahead, used for feedforward.
    fn next(&self, now_s: f64) -> TimedState;

    /// True once the reference has run out of time.
    fn done(&self, now_s: f64) -> bool;
}

/// Feedback controller combining the reference feedforward with the measured error.
pub trait FeedbackController {
    /// Clear accumulated error.
    fn reset(&mut self);

    /// Field relative velocity to command for this measurement.
    fn calculate(
        &mut self,
        measurement: &RobotState,
        current: &TimedState,
        next: &TimedState,
    ) -> FieldRelativeVelocity;

    /// True if the latest error was within tolerance.
    fn at_reference(&self) -> bool;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimedState {
    /// Time since the start of the reference.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub pose: Pose2,

    #[serde(default)]
    pub velocity: FieldRelativeVelocity,
}

/// Options fixed for one playback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefCtrlOptions {
    /// Drive exactly the computed velocity rather than shaping it through the driver skill and
    /// the limiter chain.
    pub verbatim: bool,

    /// Hold the platform at rest while steering the wheels towards the first target.
    pub steer_at_rest: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Whether the wheels have reached the commanded direction.
///
/// Only ever moves from `NotAligned` to `Aligned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlignmentState {
    NotAligned,
    Aligned,
}

/// Possible errors during reference control.
#[derive(Debug, thiserror::Error)]
pub enum RefCtrlError {
    #[error("Drive state is unavailable: {0}")]
    DriveError(#[from] DriveError),

    #[error("The trajectory contains no states")]
    EmptyTrajectory,

    #[error("Trajectory state {0} has a non-finite time")]
    InvalidTrajectoryTime(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RefCtrlOptions {
    fn default() -> Self {
        Self {
            verbatim: false,
            steer_at_rest: true,
        }
    }
}
