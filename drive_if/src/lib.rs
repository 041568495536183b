//! # Drive interface crate.
//!
//! Provides the value types shared by every component of the drive loop, and the interfaces of
//! the equipment (gyro, pose estimator, swerve modules, battery) the drive loop consumes.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Pose, velocity and state value types
pub mod types;

/// Interfaces for the equipment driven or read by the drive loop
pub mod eqpt;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use types::*;
