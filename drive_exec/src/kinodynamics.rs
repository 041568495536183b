//! # Swerve kinodynamics
//!
//! Rated capabilities and geometry of the drivetrain. The limiters use the rated maxima as the
//! ceiling they derate from, the simulation uses the geometry for the module kinematics.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use drive_if::{ChassisSpeeds, FieldRelativeVelocity, NUM_MODULES};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinodynamic model of the swerve drivetrain.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SwerveKinodynamics {
    // ---- CAPABILITIES ----

    /// Rated maximum translational speed at nominal battery voltage.
    ///
    /// Units: meters/second
    pub max_drive_velocity_ms: f64,

    /// Maximum translational acceleration.
    ///
    /// Units: meters/second^2
    pub max_drive_acceleration_mss: f64,

    /// Rated maximum rotational speed at nominal battery voltage.
    ///
    /// Units: radians/second
    pub max_angle_speed_rads: f64,

    /// Maximum rotational acceleration.
    ///
    /// Units: radians/second^2
    pub max_angle_acceleration_radss: f64,

    // ---- GEOMETRY ----

    /// Position of each module's steer axis, in the order front left, front right, rear left,
    /// rear right.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub module_pos_m_rb: [[f64; 2]; NUM_MODULES],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in the kinodynamic parameters.
#[derive(Debug, thiserror::Error)]
pub enum KinodynamicsError {
    #[error("Capability {0} must be finite and positive, found {1}")]
    InvalidCapability(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinodynamics {
    /// Check every capability is finite and strictly positive.
    pub fn validate(&self) -> Result<(), KinodynamicsError> {
        let caps = [
            ("max_drive_velocity_ms", self.max_drive_velocity_ms),
            ("max_drive_acceleration_mss", self.max_drive_acceleration_mss),
            ("max_angle_speed_rads", self.max_angle_speed_rads),
            ("max_angle_acceleration_radss", self.max_angle_acceleration_radss),
        ];

        for &(name, value) in caps.iter() {
            if !value.is_finite() || value <= 0.0 {
                return Err(KinodynamicsError::InvalidCapability(name, value));
            }
        }

        Ok(())
    }

    /// Robot frame speeds for a field relative velocity at the given heading.
    ///
    /// "Instantaneous" because no correction is made for the heading changing over the tick.
    pub fn to_instantaneous_chassis_speeds(
        v: &FieldRelativeVelocity,
        heading_rad: f64,
    ) -> ChassisSpeeds {
        v.to_chassis_speeds(heading_rad)
    }

    /// Field relative velocity for robot frame speeds at the given heading.
    pub fn to_field_relative(speeds: &ChassisSpeeds, heading_rad: f64) -> FieldRelativeVelocity {
        speeds.to_field_relative(heading_rad)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// A square 0.5 m platform used across the crate's tests.
    pub(crate) fn test_kinodynamics() -> SwerveKinodynamics {
        SwerveKinodynamics {
            max_drive_velocity_ms: 4.0,
            max_drive_acceleration_mss: 10.0,
            max_angle_speed_rads: 8.0,
            max_angle_acceleration_radss: 40.0,
            module_pos_m_rb: [[0.25, 0.25], [0.25, -0.25], [-0.25, 0.25], [-0.25, -0.25]],
        }
    }

    #[test]
    fn test_validate() {
        let mut k = test_kinodynamics();
        assert!(k.validate().is_ok());

        k.max_angle_speed_rads = -1.0;
        assert!(k.validate().is_err());

        k.max_angle_speed_rads = f64::NAN;
        assert!(k.validate().is_err());
    }
}
