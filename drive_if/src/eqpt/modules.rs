//! # Swerve module collection
//!
//! The "local drive": steering and driving of the individual modules in the robot frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::types::{ChassisSpeeds, ModulePosition, ModuleState, NUM_MODULES};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur when commanding the modules.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("Module {0} is not responding")]
    ModuleNotResponding(usize),

    #[error("Demand for module {module} is not finite: {state:?}")]
    NonFiniteDemand { module: usize, state: ModuleState },
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Actuator interface for the collection of swerve modules.
pub trait ModuleActuator {
    /// Drive at the given robot frame speeds, applying the collection's own setpoint smoothing.
    fn set_chassis_speeds(&mut self, speeds: ChassisSpeeds) -> Result<(), ActuatorError>;

    /// Drive at the given robot frame speeds without any smoothing.
    fn set_chassis_speeds_normally(&mut self, speeds: ChassisSpeeds)
        -> Result<(), ActuatorError>;

    /// Steer every module to the angle required by `speeds` while holding zero drive.
    fn steer_at_rest(&mut self, speeds: ChassisSpeeds) -> Result<(), ActuatorError>;

    /// Command each module directly, without desaturation or optimisation.
    fn set_raw_module_states(
        &mut self,
        states: [ModuleState; NUM_MODULES],
    ) -> Result<(), ActuatorError>;

    /// Point the wheels in an X, stopped.
    fn defense(&mut self) -> Result<(), ActuatorError>;

    /// Wheels straight ahead, stopped.
    fn steer0(&mut self) -> Result<(), ActuatorError>;

    /// Wheels at 90 degrees, stopped.
    fn steer90(&mut self) -> Result<(), ActuatorError>;

    /// True if every module is within steering tolerance of the angle required by `speeds`.
    fn aligned(&self, speeds: ChassisSpeeds) -> bool;

    /// Odometry readings of all modules.
    fn positions(&self) -> [ModulePosition; NUM_MODULES];

    /// Zero drive output, holding the current steering.
    fn stop(&mut self);

    /// Reset the collection's internal state (setpoints, encoders offsets).
    fn reset(&mut self);

    /// Called once per tick, after the state has been computed.
    fn periodic(&mut self) {}
}
