//! # Battery voltage source

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while reading the battery voltage.
#[derive(Debug, thiserror::Error)]
pub enum VoltageError {
    #[error("Voltage sensor is not responding")]
    NotResponding,

    #[error("Voltage reading {0} V is not valid")]
    InvalidReading(f64),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A synchronous source of the instantaneous battery voltage.
pub trait VoltageSource {
    /// Read the battery voltage.
    ///
    /// Units: volts
    fn voltage(&mut self) -> Result<f64, VoltageError>;
}
