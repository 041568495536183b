//! # Gyro

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::types::GyroReading;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while reading the gyro.
#[derive(Debug, thiserror::Error)]
pub enum GyroError {
    #[error("Gyro is not connected")]
    NotConnected,

    #[error("Gyro reported a transient fault: {0}")]
    Fault(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Heading sensor of the platform.
///
/// Reads have no side effects beyond the sensor I/O.
pub trait Gyro {
    /// Heading in the field frame, following the right hand rule about Z+.
    ///
    /// Units: radians
    fn heading_rad(&mut self) -> Result<f64, GyroError>;

    /// Units: radians/second
    fn heading_rate_rads(&mut self) -> Result<f64, GyroError>;

    /// Read both heading and rate.
    fn reading(&mut self) -> Result<GyroReading, GyroError> {
        Ok(GyroReading {
            heading_rad: self.heading_rad()?,
            heading_rate_rads: self.heading_rate_rads()?,
        })
    }
}
