//! Simulated gyro

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{cell::Cell, rc::Rc};

// Internal
use drive_if::{
    eqpt::{Gyro, GyroError},
    GyroReading,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gyro reading the body rotation integrated by [`SimModules`](super::SimModules).
#[derive(Debug, Clone)]
pub struct SimGyro {
    body: Rc<Cell<GyroReading>>,

    /// Injected fault, returned by every read while set.
    fault: Option<String>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimGyro {
    pub fn new(body: Rc<Cell<GyroReading>>) -> Self {
        Self { body, fault: None }
    }

    /// Inject (or with `None`, clear) a fault.
    pub fn set_fault(&mut self, fault: Option<&str>) {
        self.fault = fault.map(String::from);
    }

    fn check(&self) -> Result<GyroReading, GyroError> {
        match &self.fault {
            Some(f) => Err(GyroError::Fault(f.clone())),
            None => Ok(self.body.get()),
        }
    }
}

impl Gyro for SimGyro {
    fn heading_rad(&mut self) -> Result<f64, GyroError> {
        Ok(self.check()?.heading_rad)
    }

    fn heading_rate_rads(&mut self) -> Result<f64, GyroError> {
        Ok(self.check()?.heading_rate_rads)
    }

    fn reading(&mut self) -> Result<GyroReading, GyroError> {
        self.check()
    }
}
