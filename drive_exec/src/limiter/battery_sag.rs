//! Battery sag speed limit
//!
//! Maximum speed scales linearly with applied voltage, with an extra penalty at very low voltage
//! to avoid driving the battery below its brown-out limit. Wiring resistance between the battery
//! and the motors is neglected.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;

// Internal
use super::{default_battery_sag_table, VelocityLimit};
use crate::kinodynamics::SwerveKinodynamics;
use drive_if::eqpt::VoltageSource;
use util::maths::InterpTable;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Derates the drivetrain's rated speeds by the instantaneous battery voltage.
pub struct BatterySagSpeedLimit<V> {
    kinodynamics: SwerveKinodynamics,

    voltage: V,

    /// Voltage to speed scale lookup.
    table: InterpTable<f64>,

    /// The last scale computed from a good voltage reading. Zero until the
    /// first good reading, so a source which never reads never moves.
    last_scale: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<V> BatterySagSpeedLimit<V>
where
    V: VoltageSource,
{
    /// Create a new limit using the default breakpoints (12 V rated, 7 V
    /// proportional, 6 V cutoff).
    pub fn new(kinodynamics: SwerveKinodynamics, voltage: V) -> Self {
        Self::with_table(kinodynamics, voltage, &default_battery_sag_table())
    }

    /// Create a new limit from `[voltage, scale]` breakpoints.
    ///
    /// The breakpoints should have passed `Params::validate`.
    pub fn with_table(
        kinodynamics: SwerveKinodynamics,
        voltage: V,
        breakpoints: &[[f64; 2]],
    ) -> Self {
        Self {
            kinodynamics,
            voltage,
            table: InterpTable::from_points(breakpoints.iter().map(|p| (p[0], p[1]))),
            last_scale: 0.0,
        }
    }

    /// Read the voltage and return the speed scale in [0, 1].
    ///
    /// A failed or unusable reading falls back to the last good scale rather
    /// than full speed.
    pub fn scale(&mut self) -> f64 {
        let volts = match self.voltage.voltage() {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "Battery voltage read failed ({}), holding speed scale at {:.3}",
                    e, self.last_scale
                );
                return self.last_scale;
            }
        };

        match self.table.get(volts) {
            Some(s) => {
                self.last_scale = s.clamp(0.0, 1.0);
                self.last_scale
            }
            None => {
                warn!(
                    "Unusable battery voltage {}, holding speed scale at {:.3}",
                    volts, self.last_scale
                );
                self.last_scale
            }
        }
    }

    /// The derated speed limit for this instant.
    pub fn limit(&mut self) -> VelocityLimit {
        let scale = self.scale();

        VelocityLimit {
            max_linear_ms: scale * self.kinodynamics.max_drive_velocity_ms,
            max_angular_rads: scale * self.kinodynamics.max_angle_speed_rads,
        }
    }

    /// Derated maximum translational speed.
    ///
    /// Units: meters/second
    pub fn max_drive_velocity_ms(&mut self) -> f64 {
        self.limit().max_linear_ms
    }

    /// Derated maximum rotational speed.
    ///
    /// Units: radians/second
    pub fn max_angle_speed_rads(&mut self) -> f64 {
        self.limit().max_angular_rads
    }

    pub fn voltage_source_mut(&mut self) -> &mut V {
        &mut self.voltage
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinodynamics::test::test_kinodynamics;
    use approx::assert_abs_diff_eq;
    use drive_if::eqpt::VoltageError;

    /// Voltage source replaying a fixed reading, or failing.
    struct FixedVoltage(Option<f64>);

    impl VoltageSource for FixedVoltage {
        fn voltage(&mut self) -> Result<f64, VoltageError> {
            self.0.ok_or(VoltageError::NotResponding)
        }
    }

    fn scale_at(volts: f64) -> f64 {
        BatterySagSpeedLimit::new(test_kinodynamics(), FixedVoltage(Some(volts))).scale()
    }

    #[test]
    fn test_breakpoints() {
        assert_abs_diff_eq!(scale_at(12.0), 1.0);
        assert_abs_diff_eq!(scale_at(7.0), 7.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scale_at(6.0), 0.0);
    }

    #[test]
    fn test_interpolated_between_cutoff_and_derate() {
        // Halfway between 6 V (0) and 7 V (7/12)
        assert_abs_diff_eq!(scale_at(6.5), 0.5 * 7.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scale_at(6.5), 0.2917, epsilon = 1e-4);
    }

    #[test]
    fn test_clamped_outside_table() {
        assert_abs_diff_eq!(scale_at(0.0), 0.0);
        assert_abs_diff_eq!(scale_at(5.9), 0.0);
        assert_abs_diff_eq!(scale_at(13.5), 1.0);
        assert_abs_diff_eq!(scale_at(20.0), 1.0);
    }

    #[test]
    fn test_monotonic() {
        let mut prev = scale_at(6.0);
        let mut v = 6.0;
        while v <= 12.0 {
            let s = scale_at(v);
            assert!(s >= prev, "scale({}) = {} < {}", v, s, prev);
            assert!(s >= 0.0);
            prev = s;
            v += 0.01;
        }
    }

    #[test]
    fn test_limit_scales_both_speeds() {
        let mut sag = BatterySagSpeedLimit::new(test_kinodynamics(), FixedVoltage(Some(7.0)));
        let limit = sag.limit();
        assert_abs_diff_eq!(limit.max_linear_ms, 4.0 * 7.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(limit.max_angular_rads, 8.0 * 7.0 / 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_read_failure_holds_last_scale() {
        let mut sag = BatterySagSpeedLimit::new(test_kinodynamics(), FixedVoltage(None));

        // Never read: most conservative
        assert_eq!(sag.scale(), 0.0);

        sag.voltage_source_mut().0 = Some(12.0);
        assert_eq!(sag.scale(), 1.0);

        sag.voltage_source_mut().0 = Some(7.0);
        assert_abs_diff_eq!(sag.scale(), 7.0 / 12.0, epsilon = 1e-12);

        // Lost the sensor: hold the last known value, not full speed
        sag.voltage_source_mut().0 = None;
        assert_abs_diff_eq!(sag.scale(), 7.0 / 12.0, epsilon = 1e-12);

        // NaN readings are treated the same way
        sag.voltage_source_mut().0 = Some(f64::NAN);
        assert_abs_diff_eq!(sag.scale(), 7.0 / 12.0, epsilon = 1e-12);
    }
}
