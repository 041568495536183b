//! # Drive value types
//!
//! All quantities follow the right hand rule about the platform's Z+ (upwards) axis, so that a
//! positive heading or angular rate is anticlockwise when viewed from above.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of swerve modules on the platform.
pub const NUM_MODULES: usize = 4;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Index of a control cycle. Incremented once per fixed-period tick.
pub type Tick = u64;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position and heading of the platform in the field frame.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2 {
    /// Position of the platform centre.
    ///
    /// Units: meters,
    /// Frame: Field
    pub position_m: Vector2<f64>,

    /// Heading, the angle from the field X axis to the platform's forward axis.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// Velocity of the platform expressed in the fixed field frame.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldRelativeVelocity {
    /// Units: meters/second
    pub vx_ms: f64,

    /// Units: meters/second
    pub vy_ms: f64,

    /// Units: radians/second
    pub omega_rads: f64,
}

/// Acceleration of the platform expressed in the fixed field frame.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldRelativeAcceleration {
    /// Units: meters/second^2
    pub ax_mss: f64,

    /// Units: meters/second^2
    pub ay_mss: f64,

    /// Units: radians/second^2
    pub alpha_radss: f64,
}

/// Instantaneous velocity of the platform expressed in its own (robot) frame.
///
/// Derived from a field relative velocity and the heading at the moment of use, so it must not be
/// kept across heading changes.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    /// Forwards speed.
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Leftwards speed.
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Units: radians/second
    pub omega_rads: f64,
}

/// Snapshot of the platform's estimated state for a single tick.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotState {
    /// The tick this state was computed for.
    pub tick: Tick,

    /// Units: seconds
    pub timestamp_s: f64,

    pub pose: Pose2,

    pub velocity: FieldRelativeVelocity,

    /// Only provided by estimators which track it.
    pub acceleration: Option<FieldRelativeAcceleration>,
}

/// Demand (or measurement) for a single swerve module.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleState {
    /// Wheel surface speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Steering angle relative to the platform's forward axis.
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// Odometry reading for a single swerve module.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModulePosition {
    /// Total distance rolled by the wheel.
    ///
    /// Units: meters
    pub distance_m: f64,

    /// Units: radians
    pub angle_rad: f64,
}

/// A single synchronous gyro read.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct GyroReading {
    /// Units: radians
    pub heading_rad: f64,

    /// Units: radians/second
    pub heading_rate_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Pose2 {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }
}

impl FieldRelativeVelocity {
    pub fn new(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Magnitude of the translational part of the velocity.
    pub fn norm(&self) -> f64 {
        self.vx_ms.hypot(self.vy_ms)
    }

    /// Scale every component by `scale`.
    pub fn times(&self, scale: f64) -> Self {
        Self::new(
            self.vx_ms * scale,
            self.vy_ms * scale,
            self.omega_rads * scale,
        )
    }

    pub fn plus(&self, other: &Self) -> Self {
        Self::new(
            self.vx_ms + other.vx_ms,
            self.vy_ms + other.vy_ms,
            self.omega_rads + other.omega_rads,
        )
    }

    pub fn minus(&self, other: &Self) -> Self {
        self.plus(&other.times(-1.0))
    }

    /// Convert into robot frame speeds for the given platform heading.
    pub fn to_chassis_speeds(&self, heading_rad: f64) -> ChassisSpeeds {
        let v = Rotation2::new(-heading_rad) * Vector2::new(self.vx_ms, self.vy_ms);

        ChassisSpeeds {
            vx_ms: v[0],
            vy_ms: v[1],
            omega_rads: self.omega_rads,
        }
    }
}

impl ChassisSpeeds {
    pub fn new(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
        }
    }

    /// Scale every component by `scale`.
    pub fn times(&self, scale: f64) -> Self {
        Self::new(
            self.vx_ms * scale,
            self.vy_ms * scale,
            self.omega_rads * scale,
        )
    }

    /// Convert into field relative velocity for the given platform heading.
    pub fn to_field_relative(&self, heading_rad: f64) -> FieldRelativeVelocity {
        let v = Rotation2::new(heading_rad) * Vector2::new(self.vx_ms, self.vy_ms);

        FieldRelativeVelocity {
            vx_ms: v[0],
            vy_ms: v[1],
            omega_rads: self.omega_rads,
        }
    }
}

impl RobotState {
    /// Robot frame speeds derived from this state's own velocity and heading.
    pub fn chassis_speeds(&self) -> ChassisSpeeds {
        self.velocity.to_chassis_speeds(self.pose.heading_rad)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
