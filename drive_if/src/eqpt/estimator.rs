//! # Pose estimator
//!
//! The estimator fuses gyro and odometry (and, outside of this crate, vision) into a single
//! state. Its fusion algorithm is not defined here, only the contract the drive loop relies on.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::types::{GyroReading, ModulePosition, Pose2, RobotState, NUM_MODULES};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the pose estimator.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("Measurement at {new_s} s is older than the latest measurement at {latest_s} s")]
    NonMonotonic { latest_s: f64, new_s: f64 },

    #[error("No estimate is available for {0} s")]
    NoEstimate(f64),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Estimator of the platform's field relative pose and velocity.
///
/// Timestamps passed in must be monotonic. The drive loop calls `put` and `get` at most once per
/// tick.
pub trait PoseEstimator {
    /// Add a gyro and odometry measurement taken at `timestamp_s`.
    fn put(
        &mut self,
        timestamp_s: f64,
        gyro: GyroReading,
        positions: &[ModulePosition; NUM_MODULES],
    ) -> Result<(), EstimatorError>;

    /// Get the estimated state at `timestamp_s`.
    fn get(&mut self, timestamp_s: f64) -> Result<RobotState, EstimatorError>;

    /// Discard all history and restart the estimate from `pose`.
    fn reset(
        &mut self,
        gyro: GyroReading,
        positions: &[ModulePosition; NUM_MODULES],
        pose: Pose2,
        timestamp_s: f64,
    );
}
