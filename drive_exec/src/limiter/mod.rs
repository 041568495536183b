//! # Velocity limiter module
//!
//! Produces one enforced velocity bound per tick and applies it to a requested field relative
//! velocity before it reaches the modules.
//!
//! Two limits are composed, always in this order:
//!
//!  1. Battery sag narrows the absolute ceiling. Top speed scales with the instantaneous battery
//!     voltage, and drops to zero before the battery browns out.
//!  2. Feasibility clips the request to within that ceiling given the current state, bounding
//!     coupled wheel demand and acceleration.
//!
//! Feasibility must see the derated ceiling, otherwise it would plan towards wheel speeds the
//! motors cannot reach. Infeasible requests are clipped silently, they are not an error.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod battery_sag;
mod chain;
mod feasibility;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use drive_if::{FieldRelativeVelocity, RobotState};

pub use battery_sag::*;
pub use chain::*;
pub use feasibility::*;
pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Speed bounds valid for the instant they were computed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VelocityLimit {
    /// Units: meters/second
    pub max_linear_ms: f64,

    /// Units: radians/second
    pub max_angular_rads: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A complete limiter applied to driver-initiated field relative commands.
pub trait VelocityLimiter {
    /// Limit `requested` given the current `state`.
    fn apply(
        &mut self,
        state: &RobotState,
        requested: FieldRelativeVelocity,
    ) -> FieldRelativeVelocity;

    /// Forget any transient state, such as the previous setpoint.
    fn reset(&mut self);
}

/// Kinodynamic feasibility limiting, given a ceiling computed for this tick.
pub trait FeasibilityLimiter {
    /// Limit `requested` so that it lies within `ceiling` and is reachable from `state`.
    fn apply(
        &mut self,
        ceiling: VelocityLimit,
        state: &RobotState,
        requested: FieldRelativeVelocity,
    ) -> FieldRelativeVelocity;

    /// Forget any transient state, such as the previous setpoint.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityLimit {
    /// Clip `v` so that its translational magnitude and rotational rate lie within the limit,
    /// keeping the direction of travel.
    pub fn clip(&self, v: FieldRelativeVelocity) -> FieldRelativeVelocity {
        let max_linear_ms = self.max_linear_ms.max(0.0);
        let max_angular_rads = self.max_angular_rads.max(0.0);

        let norm = v.norm();
        let linear_scale = if norm > max_linear_ms {
            max_linear_ms / norm
        } else {
            1.0
        };

        FieldRelativeVelocity::new(
            v.vx_ms * linear_scale,
            v.vy_ms * linear_scale,
            v.omega_rads.clamp(-max_angular_rads, max_angular_rads),
        )
    }

    /// True if `v` does not exceed either bound.
    pub fn contains(&self, v: &FieldRelativeVelocity) -> bool {
        v.norm() <= self.max_linear_ms && v.omega_rads.abs() <= self.max_angular_rads
    }
}
