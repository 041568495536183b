//! Parameters structure for the velocity limiters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the velocity limiter chain.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Battery sag breakpoints as `[voltage, speed scale]` pairs.
    ///
    /// Units: [volts, -]
    #[serde(default = "default_battery_sag_table")]
    pub battery_sag_table: Vec<[f64; 2]>,

    /// Period assumed by the acceleration limit when no previous setpoint
    /// time is available.
    ///
    /// Units: seconds
    pub nominal_period_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in the limiter parameters.
#[derive(Debug, thiserror::Error)]
pub enum LimiterParamsError {
    #[error("The battery sag table has no breakpoints")]
    EmptyBatterySagTable,

    #[error("Battery sag breakpoint {0} is not finite: {1:?}")]
    NonFiniteBreakpoint(usize, [f64; 2]),

    #[error("Battery sag breakpoint {0} has a scale outside [0, 1]: {1}")]
    ScaleOutOfRange(usize, f64),

    #[error("Battery sag breakpoint {0} must have a higher voltage than the one before it")]
    VoltageNotIncreasing(usize),

    #[error("Battery sag breakpoint {0} has a lower scale than the one before it")]
    ScaleDecreasing(usize),

    #[error("The nominal period must be finite and positive, found {0}")]
    InvalidNominalPeriod(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the battery sag table gives a scale in [0, 1] that never falls as voltage rises.
    ///
    /// Breakpoints must be listed in order of increasing voltage.
    pub fn validate(&self) -> Result<(), LimiterParamsError> {
        if !self.nominal_period_s.is_finite() || self.nominal_period_s <= 0.0 {
            return Err(LimiterParamsError::InvalidNominalPeriod(
                self.nominal_period_s,
            ));
        }

        if self.battery_sag_table.is_empty() {
            return Err(LimiterParamsError::EmptyBatterySagTable);
        }

        let mut prev: Option<[f64; 2]> = None;
        for (i, &[volts, scale]) in self.battery_sag_table.iter().enumerate() {
            if !volts.is_finite() || !scale.is_finite() {
                return Err(LimiterParamsError::NonFiniteBreakpoint(i, [volts, scale]));
            }
            if !(0.0..=1.0).contains(&scale) {
                return Err(LimiterParamsError::ScaleOutOfRange(i, scale));
            }
            if let Some([prev_volts, prev_scale]) = prev {
                if volts <= prev_volts {
                    return Err(LimiterParamsError::VoltageNotIncreasing(i));
                }
                if scale < prev_scale {
                    return Err(LimiterParamsError::ScaleDecreasing(i));
                }
            }
            prev = Some([volts, scale]);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Rated speed at 12 V, proportional down to 7 V, and zero at 6 V to keep the
/// battery above its brown-out voltage.
pub fn default_battery_sag_table() -> Vec<[f64; 2]> {
    vec![[6.0, 0.0], [7.0, 7.0 / 12.0], [12.0, 1.0]]
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn params(table: Vec<[f64; 2]>) -> Params {
        Params {
            battery_sag_table: table,
            nominal_period_s: 0.02,
        }
    }

    #[test]
    fn test_default_table_is_valid() {
        assert!(params(default_battery_sag_table()).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(matches!(
            params(vec![]).validate(),
            Err(LimiterParamsError::EmptyBatterySagTable)
        ));
        assert!(matches!(
            params(vec![[6.0, 0.0], [f64::NAN, 0.5]]).validate(),
            Err(LimiterParamsError::NonFiniteBreakpoint(1, _))
        ));
        assert!(matches!(
            params(vec![[6.0, 0.0], [12.0, 1.5]]).validate(),
            Err(LimiterParamsError::ScaleOutOfRange(1, _))
        ));
        assert!(matches!(
            params(vec![[12.0, 1.0], [6.0, 0.0]]).validate(),
            Err(LimiterParamsError::VoltageNotIncreasing(1))
        ));
        assert!(matches!(
            params(vec![[6.0, 0.0], [7.0, 0.8], [12.0, 0.6]]).validate(),
            Err(LimiterParamsError::ScaleDecreasing(2))
        ));

        let mut p = params(default_battery_sag_table());
        p.nominal_period_s = 0.0;
        assert!(matches!(
            p.validate(),
            Err(LimiterParamsError::InvalidNominalPeriod(_))
        ));
    }
}
