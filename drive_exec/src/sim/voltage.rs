//! Simulated battery

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use drive_if::eqpt::{VoltageError, VoltageSource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Battery with a settable voltage.
#[derive(Debug, Clone)]
pub struct SimVoltage {
    /// Units: volts
    volts: f64,

    /// Fail every read while set.
    failing: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimVoltage {
    pub fn new(volts: f64) -> Self {
        Self {
            volts,
            failing: false,
        }
    }

    pub fn set_voltage(&mut self, volts: f64) {
        self.volts = volts;
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl VoltageSource for SimVoltage {
    fn voltage(&mut self) -> Result<f64, VoltageError> {
        if self.failing {
            Err(VoltageError::NotResponding)
        } else if !self.volts.is_finite() || self.volts < 0.0 {
            Err(VoltageError::InvalidReading(self.volts))
        } else {
            Ok(self.volts)
        }
    }
}
