//! Parameters structure for the drive

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::{kinodynamics::SwerveKinodynamics, limiter};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the swerve drive.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Skill level applied to driver commands at startup.
    #[serde(default)]
    pub initial_skill: super::Level,

    /// Rated capabilities and geometry of the drivetrain.
    pub kinodynamics: SwerveKinodynamics,

    /// Velocity limiter chain parameters.
    pub limiter: limiter::Params,
}
