//! # Swerve drive library.
//!
//! This library allows other crates in the workspace, and the drive executable's tests and
//! benchmarks, to access items defined inside the drive crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Once per tick memoisation of the robot state
pub mod tick_cache;

/// Rated capabilities and geometry of the drivetrain
pub mod kinodynamics;

/// Velocity limiters - battery sag derating and kinodynamic feasibility
pub mod limiter;

/// Drive actuation - routes velocity commands to the swerve modules
pub mod drive;

/// Reference control - plays back a trajectory through the drive
pub mod ref_ctrl;

/// Simulated drivetrain hardware
#[cfg(feature = "sim")]
pub mod sim;
