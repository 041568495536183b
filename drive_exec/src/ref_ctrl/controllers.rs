//! # Reference controllers module
//!
//! This module provides the PID controllers used for reference control, and the full state
//! controller built from them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{FeedbackController, Params, TimedState};
use drive_if::{FieldRelativeVelocity, RobotState};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// Per-axis PID on the pose error, with velocity feedback and feedforward.
#[derive(Debug, Serialize, Clone)]
pub struct FullStateController {
    x_ctrl: PidController,
    y_ctrl: PidController,
    head_ctrl: PidController,

    /// Gain on the velocity error
    vel_k: f64,

    tolerances: Tolerances,

    /// Timestamp of the previous measurement
    prev_time_s: Option<f64>,

    /// Errors from the latest calculation
    error: Option<StateError>,
}

/// Error between the reference and the measurement.
#[derive(Debug, Serialize, Clone, Copy, Default)]
pub struct StateError {
    /// Units: meters
    pub pos_error_m: f64,

    /// Units: radians
    pub head_error_rad: f64,

    /// Units: meters/second
    pub vel_error_ms: f64,

    /// Units: radians/second
    pub omega_error_rads: f64,
}

#[derive(Debug, Serialize, Clone, Copy)]
struct Tolerances {
    pos_m: f64,
    head_rad: f64,
    vel_ms: f64,
    omega_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error.
    ///
    /// `dt_s` is the time since the previous call, or `None` on the first call after a reset.
    pub fn get(&mut self, error: f64, dt_s: Option<f64>) -> f64 {
        // A zero or unknown time difference would spike the integral and
        // derivative terms, so they are only updated with a positive dt.
        let dt_s = dt_s.filter(|t| *t > 0.0);

        // Accumulate the integral term.
        self.integral += match dt_s {
            Some(t) => error * t,
            None => 0f64,
        };

        // Calculate the derivative.
        let deriv = match (self.prev_error, dt_s) {
            (Some(e), Some(t)) => (error - e) / t,
            _ => 0f64,
        };

        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        self.prev_error = Some(error);

        out
    }

    /// Clear the integral and derivative memory.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }
}

impl FullStateController {
    /// Create a new instance of the controller from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            x_ctrl: PidController::new(params.trans_k_p, params.trans_k_i, params.trans_k_d),
            y_ctrl: PidController::new(params.trans_k_p, params.trans_k_i, params.trans_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
            vel_k: params.vel_k,
            tolerances: Tolerances {
                pos_m: params.pos_tolerance_m,
                head_rad: params.head_tolerance_rad,
                vel_ms: params.vel_tolerance_ms,
                omega_rads: params.omega_tolerance_rads,
            },
            prev_time_s: None,
            error: None,
        }
    }

    /// The error from the latest calculation.
    pub fn error(&self) -> Option<StateError> {
        self.error
    }
}

impl FeedbackController for FullStateController {
    fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.head_ctrl.reset();
        self.prev_time_s = None;
        self.error = None;
    }

    fn calculate(
        &mut self,
        measurement: &RobotState,
        current: &TimedState,
        next: &TimedState,
    ) -> FieldRelativeVelocity {
        let dt_s = self.prev_time_s.map(|t| measurement.timestamp_s - t);
        self.prev_time_s = Some(measurement.timestamp_s);

        let pos_error_m = current.pose.position_m - measurement.pose.position_m;
        let head_error_rad = wrap_pi(current.pose.heading_rad - measurement.pose.heading_rad);
        let vel_error = current.velocity.minus(&measurement.velocity);

        let feedback = FieldRelativeVelocity::new(
            self.x_ctrl.get(pos_error_m[0], dt_s),
            self.y_ctrl.get(pos_error_m[1], dt_s),
            self.head_ctrl.get(head_error_rad, dt_s),
        );

        let error = StateError {
            pos_error_m: pos_error_m.norm(),
            head_error_rad,
            vel_error_ms: vel_error.norm(),
            omega_error_rads: vel_error.omega_rads,
        };
        self.error = Some(error);

        trace!("Reference error: {:?}", error);

        next.velocity
            .plus(&feedback)
            .plus(&vel_error.times(self.vel_k))
    }

    fn at_reference(&self) -> bool {
        match self.error {
            Some(e) => {
                e.pos_error_m <= self.tolerances.pos_m
                    && e.head_error_rad.abs() <= self.tolerances.head_rad
                    && e.vel_error_ms <= self.tolerances.vel_ms
                    && e.omega_error_rads.abs() <= self.tolerances.omega_rads
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use drive_if::Pose2;
    use std::f64::consts::PI;

    pub(crate) fn test_params() -> Params {
        Params {
            trans_k_p: 2.0,
            trans_k_i: 0.0,
            trans_k_d: 0.0,
            head_k_p: 1.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
            vel_k: 0.0,
            pos_tolerance_m: 0.05,
            head_tolerance_rad: 0.05,
            vel_tolerance_ms: 0.1,
            omega_tolerance_rads: 0.1,
            lookahead_s: 0.02,
            steer_at_rest: true,
            verbatim: false,
        }
    }

    #[test]
    fn test_pid_explicit_dt() {
        let mut pid = PidController::new(1.0, 0.5, 0.1);

        // First call: proportional only
        assert_abs_diff_eq!(pid.get(2.0, None), 2.0);

        // 1 + 0.5 * (1 * 0.5) + 0.1 * (1 - 2) / 0.5
        assert_abs_diff_eq!(pid.get(1.0, Some(0.5)), 1.05, epsilon = 1e-12);

        // Zero dt leaves integral and derivative alone
        assert_abs_diff_eq!(pid.get(1.0, Some(0.0)), 1.0 + 0.25, epsilon = 1e-12);

        pid.reset();
        assert_abs_diff_eq!(pid.get(1.0, Some(1.0)), 1.0 + 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_feedforward_plus_feedback() {
        let mut ctrl = FullStateController::new(&test_params());
        let measurement = RobotState {
            timestamp_s: 1.0,
            pose: Pose2::new(0.0, 0.1, 0.0),
            ..Default::default()
        };
        let current = TimedState {
            time_s: 0.0,
            pose: Pose2::new(0.0, 0.0, 0.0),
            velocity: FieldRelativeVelocity::new(1.0, 0.0, 0.0),
        };
        let next = TimedState {
            time_s: 0.02,
            velocity: FieldRelativeVelocity::new(1.2, 0.0, 0.0),
            ..current
        };

        let v = ctrl.calculate(&measurement, &current, &next);
        assert_abs_diff_eq!(v.vx_ms, 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vy_ms, -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(v.omega_rads, 0.0, epsilon = 1e-12);

        // 0.1 m off and not moving at the reference speed
        assert!(!ctrl.at_reference());
    }

    #[test]
    fn test_heading_error_wraps() {
        let mut ctrl = FullStateController::new(&test_params());
        let measurement = RobotState {
            pose: Pose2::new(0.0, 0.0, PI - 0.1),
            ..Default::default()
        };
        let reference = TimedState {
            pose: Pose2::new(0.0, 0.0, -PI + 0.1),
            ..Default::default()
        };

        // Shortest way round is +0.2 rad, not -2PI + 0.2
        let v = ctrl.calculate(&measurement, &reference, &reference);
        assert_abs_diff_eq!(v.omega_rads, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_at_reference() {
        let mut ctrl = FullStateController::new(&test_params());
        assert!(!ctrl.at_reference());

        let state = TimedState {
            pose: Pose2::new(1.0, 1.0, 0.5),
            velocity: FieldRelativeVelocity::new(0.5, 0.0, 0.0),
            ..Default::default()
        };
        let measurement = RobotState {
            pose: Pose2::new(1.01, 1.0, 0.49),
            velocity: FieldRelativeVelocity::new(0.45, 0.0, 0.0),
            ..Default::default()
        };
        ctrl.calculate(&measurement, &state, &state);
        assert!(ctrl.at_reference());

        ctrl.reset();
        assert!(!ctrl.at_reference());
        assert!(ctrl.error().is_none());
    }
}
