//! # Trajectory reference
//!
//! A trajectory is a list of timed states, sampled with linear interpolation and held at its ends.
//! The reference keeps the wall-clock start of playback so that sampling follows the measurement
//! timestamps.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Deserialize;
use std::convert::TryFrom;

// Internal
use super::{RefCtrlError, SwerveReference, TimedState};
use drive_if::{Pose2, RobotState};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A time ordered sequence of states.
///
/// Deserialised trajectories go through [`Trajectory::new`], so they are always sorted and valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "TrajectoryFile")]
pub struct Trajectory {
    states: Vec<TimedState>,
}

/// On-disk form of a trajectory, before validation.
#[derive(Deserialize)]
pub struct TrajectoryFile {
    states: Vec<TimedState>,
}

/// Plays back a [`Trajectory`] against measurement time.
#[derive(Debug, Clone)]
pub struct TrajectoryReference {
    trajectory: Trajectory,

    /// Units: seconds
    lookahead_s: f64,

    /// Measurement timestamp at which playback started.
    ///
    /// Units: seconds
    start_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build a trajectory, sorting the states by time.
    pub fn new(mut states: Vec<TimedState>) -> Result<Self, RefCtrlError> {
        if states.is_empty() {
            return Err(RefCtrlError::EmptyTrajectory);
        }

        if let Some(i) = states.iter().position(|s| !s.time_s.is_finite()) {
            return Err(RefCtrlError::InvalidTrajectoryTime(i));
        }

        states.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));

        Ok(Self { states })
    }

    pub fn states(&self) -> &[TimedState] {
        &self.states
    }

    pub fn start_time_s(&self) -> f64 {
        self.states.first().map(|s| s.time_s).unwrap_or(0.0)
    }

    pub fn end_time_s(&self) -> f64 {
        self.states.last().map(|s| s.time_s).unwrap_or(0.0)
    }

    /// Units: seconds
    pub fn duration_s(&self) -> f64 {
        self.end_time_s() - self.start_time_s()
    }

    /// The state at `time_s`, interpolated between neighbours and clamped to the ends.
    pub fn sample(&self, time_s: f64) -> TimedState {
        let (first, last) = match (self.states.first(), self.states.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return TimedState::default(),
        };

        if time_s <= first.time_s {
            return first;
        }
        if time_s >= last.time_s {
            return last;
        }

        // Index of the first state after time_s, which must exist and not be the first
        let i = self.states.partition_point(|s| s.time_s <= time_s);
        let before = self.states[i - 1];
        let after = self.states[i];

        let span = after.time_s - before.time_s;
        if span <= 0.0 {
            return after;
        }
        let frac = (time_s - before.time_s) / span;

        TimedState {
            time_s,
            pose: Pose2 {
                position_m: before.pose.position_m
                    + (after.pose.position_m - before.pose.position_m) * frac,
                heading_rad: wrap_pi(
                    before.pose.heading_rad
                        + frac * wrap_pi(after.pose.heading_rad - before.pose.heading_rad),
                ),
            },
            velocity: before
                .velocity
                .plus(&after.velocity.minus(&before.velocity).times(frac)),
        }
    }
}

impl TryFrom<TrajectoryFile> for Trajectory {
    type Error = RefCtrlError;

    fn try_from(file: TrajectoryFile) -> Result<Self, Self::Error> {
        Self::new(file.states)
    }
}

impl TrajectoryReference {
    pub fn new(trajectory: Trajectory, lookahead_s: f64) -> Self {
        Self {
            trajectory,
            lookahead_s,
            start_s: None,
        }
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Time since playback started, zero before initialisation.
    ///
    /// Units: seconds
    pub fn elapsed_s(&self, now_s: f64) -> f64 {
        match self.start_s {
            Some(t) => (now_s - t).max(0.0),
            None => 0.0,
        }
    }
}

impl SwerveReference for TrajectoryReference {
    fn initialize(&mut self, measurement: &RobotState) {
        if self.start_s.is_none() {
            debug!(
                "Trajectory of {:.2} s starting at {:.3} s",
                self.trajectory.duration_s(),
                measurement.timestamp_s
            );
        }
        self.start_s = Some(measurement.timestamp_s);
    }

    fn current(&self, now_s: f64) -> TimedState {
        self.trajectory
            .sample(self.trajectory.start_time_s() + self.elapsed_s(now_s))
    }

    fn next(&self, now_s: f64) -> TimedState {
        self.trajectory.sample(
            self.trajectory.start_time_s() + self.elapsed_s(now_s) + self.lookahead_s,
        )
    }

    fn done(&self, now_s: f64) -> bool {
        self.start_s.is_some() && self.elapsed_s(now_s) >= self.trajectory.duration_s()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
