//! Kinodynamic feasibility limiter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use super::{FeasibilityLimiter, VelocityLimit};
use crate::kinodynamics::SwerveKinodynamics;
use drive_if::{FieldRelativeVelocity, RobotState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits requests to what the drivetrain can achieve from its current state.
///
/// Processing of each request:
///  1. Clip to the ceiling.
///  2. Desaturate the coupled wheel demand: translation and rotation share
///     the same wheel speed budget, so `|v|/v_max + |w|/w_max` may not
///     exceed one.
///  3. Limit the change from the previous setpoint (or the measured velocity
///     after a reset) to the maximum acceleration over the elapsed time.
///  4. Clip to the ceiling again, the previous setpoint may have been made
///     under a higher ceiling.
///
/// Non-finite request components are treated as zero, and the setpoint only
/// ever holds finite values. A second request at the same timestamp gets no
/// further acceleration budget.
#[derive(Debug, Clone)]
pub struct KinodynamicLimiter {
    kinodynamics: SwerveKinodynamics,

    /// Units: seconds
    nominal_period_s: f64,

    /// Timestamp and value of the previous output.
    prev_setpoint: Option<(f64, FieldRelativeVelocity)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinodynamicLimiter {
    pub fn new(kinodynamics: SwerveKinodynamics, nominal_period_s: f64) -> Self {
        Self {
            kinodynamics,
            nominal_period_s,
            prev_setpoint: None,
        }
    }

    /// The previous output, if any since the last reset.
    pub fn prev_setpoint(&self) -> Option<FieldRelativeVelocity> {
        self.prev_setpoint.map(|(_, v)| v)
    }

    /// Scale `v` down so that translation and rotation together fit within
    /// the wheel speed budget of `ceiling`.
    fn desaturate(ceiling: &VelocityLimit, v: FieldRelativeVelocity) -> FieldRelativeVelocity {
        let linear_frac = if ceiling.max_linear_ms > 0.0 {
            v.norm() / ceiling.max_linear_ms
        } else {
            0.0
        };
        let angular_frac = if ceiling.max_angular_rads > 0.0 {
            v.omega_rads.abs() / ceiling.max_angular_rads
        } else {
            0.0
        };

        let total = linear_frac + angular_frac;
        if total > 1.0 {
            v.times(1.0 / total)
        } else {
            v
        }
    }

    /// `v` with every non-finite component replaced by zero.
    fn finite_or_zero(v: FieldRelativeVelocity) -> FieldRelativeVelocity {
        let f = |x: f64| if x.is_finite() { x } else { 0.0 };
        FieldRelativeVelocity::new(f(v.vx_ms), f(v.vy_ms), f(v.omega_rads))
    }

    /// Move from `from` towards `to` by at most the acceleration limits over
    /// `dt_s`.
    fn accel_limit(
        &self,
        from: FieldRelativeVelocity,
        to: FieldRelativeVelocity,
        dt_s: f64,
    ) -> FieldRelativeVelocity {
        let max_dv = self.kinodynamics.max_drive_acceleration_mss * dt_s;
        let max_dw = self.kinodynamics.max_angle_acceleration_radss * dt_s;

        let delta = to.minus(&from);
        let dv = delta.norm();
        let linear_scale = if dv > max_dv { max_dv / dv } else { 1.0 };

        FieldRelativeVelocity::new(
            from.vx_ms + delta.vx_ms * linear_scale,
            from.vy_ms + delta.vy_ms * linear_scale,
            from.omega_rads + delta.omega_rads.clamp(-max_dw, max_dw),
        )
    }
}

impl FeasibilityLimiter for KinodynamicLimiter {
    fn apply(
        &mut self,
        ceiling: VelocityLimit,
        state: &RobotState,
        requested: FieldRelativeVelocity,
    ) -> FieldRelativeVelocity {
        let target = Self::desaturate(&ceiling, ceiling.clip(Self::finite_or_zero(requested)));

        // Start from the previous setpoint, or from the measurement after a
        // reset. Time which has not advanced allows no change.
        let (from, dt_s) = match self.prev_setpoint {
            Some((t, v)) => {
                let dt_s = state.timestamp_s - t;
                if dt_s.is_finite() && dt_s > 0.0 {
                    (v, dt_s)
                } else {
                    (v, 0.0)
                }
            }
            None => (
                Self::finite_or_zero(state.velocity),
                self.nominal_period_s,
            ),
        };

        let limited = self.accel_limit(ceiling.clip(from), target, dt_s);
        let output = Self::finite_or_zero(Self::desaturate(&ceiling, ceiling.clip(limited)));

        trace!(
            "Feasibility limit: requested {:?}, ceiling {:?}, output {:?}",
            requested,
            ceiling,
            output
        );

        // Keep the setpoint's time if the measurement time is unusable
        let time_s = match self.prev_setpoint {
            Some((t, _)) if !state.timestamp_s.is_finite() || state.timestamp_s < t => Some(t),
            _ if !state.timestamp_s.is_finite() => None,
            _ => Some(state.timestamp_s),
        };
        self.prev_setpoint = time_s.map(|t| (t, output));

        output
    }

    fn reset(&mut self) {
        self.prev_setpoint = None;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
