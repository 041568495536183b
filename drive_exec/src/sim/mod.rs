//! # Simulated drivetrain
//!
//! Stand-ins for the drivetrain hardware, so the drive loop can run on a desk. The modules
//! integrate their own motion each tick and share the resulting body rotation with the gyro.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod estimator;
mod gyro;
mod modules;
mod voltage;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
pub use estimator::*;
pub use gyro::*;
pub use modules::*;
pub use voltage::*;

use crate::kinodynamics::SwerveKinodynamics;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated backend
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Which hardware backend to drive.
    #[serde(default)]
    pub backend: Backend,

    /// Maximum rate at which a module can steer.
    ///
    /// Units: radians/second
    pub steer_rate_rads: f64,

    /// Steering error within which a module is considered aligned.
    ///
    /// Units: radians
    pub steer_tolerance_rad: f64,

    /// Battery voltage at startup.
    ///
    /// Units: volts
    pub initial_voltage_v: f64,

    /// Steer angle every module starts at.
    ///
    /// Units: radians
    #[serde(default)]
    pub initial_steer_rad: f64,
}

/// A complete simulated drivetrain.
pub struct SimPlatform {
    pub estimator: SimPoseEstimator,
    pub gyro: SimGyro,
    pub modules: SimModules,
    pub voltage: SimVoltage,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The available hardware backends.
///
/// Selected once at startup from configuration.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sim,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Backend {
    fn default() -> Self {
        Backend::Sim
    }
}

impl SimPlatform {
    pub fn new(kinodynamics: SwerveKinodynamics, params: &Params, cycle_period_s: f64) -> Self {
        let modules = SimModules::new(kinodynamics, params, cycle_period_s);

        Self {
            estimator: SimPoseEstimator::new(),
            gyro: SimGyro::new(modules.body_reading()),
            modules,
            voltage: SimVoltage::new(params.initial_voltage_v),
        }
    }
}
