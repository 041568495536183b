//! Velocity limiter chain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use super::{
    BatterySagSpeedLimit, FeasibilityLimiter, KinodynamicLimiter, Params, VelocityLimit,
    VelocityLimiter,
};
use crate::kinodynamics::SwerveKinodynamics;
use drive_if::{eqpt::VoltageSource, FieldRelativeVelocity, RobotState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Battery sag ceiling followed by feasibility limiting.
pub struct VelocityLimiterChain<V, F = KinodynamicLimiter> {
    battery_sag: BatterySagSpeedLimit<V>,

    feasibility: F,

    /// The ceiling used by the latest `apply`.
    last_limit: Option<VelocityLimit>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<V> VelocityLimiterChain<V, KinodynamicLimiter>
where
    V: VoltageSource,
{
    /// Build the standard chain from the parameters.
    pub fn from_params(kinodynamics: SwerveKinodynamics, voltage: V, params: &Params) -> Self {
        Self::new(
            BatterySagSpeedLimit::with_table(kinodynamics, voltage, &params.battery_sag_table),
            KinodynamicLimiter::new(kinodynamics, params.nominal_period_s),
        )
    }
}

impl<V, F> VelocityLimiterChain<V, F>
where
    V: VoltageSource,
    F: FeasibilityLimiter,
{
    pub fn new(battery_sag: BatterySagSpeedLimit<V>, feasibility: F) -> Self {
        Self {
            battery_sag,
            feasibility,
            last_limit: None,
        }
    }

    /// The ceiling used by the latest `apply`, if any.
    pub fn last_limit(&self) -> Option<VelocityLimit> {
        self.last_limit
    }

    pub fn battery_sag_mut(&mut self) -> &mut BatterySagSpeedLimit<V> {
        &mut self.battery_sag
    }
}

impl<V, F> VelocityLimiter for VelocityLimiterChain<V, F>
where
    V: VoltageSource,
    F: FeasibilityLimiter,
{
    fn apply(
        &mut self,
        state: &RobotState,
        requested: FieldRelativeVelocity,
    ) -> FieldRelativeVelocity {
        let ceiling = self.battery_sag.limit();
        self.last_limit = Some(ceiling);

        trace!("Limiter ceiling: {:?}", ceiling);

        self.feasibility.apply(ceiling, state, requested)
    }

    fn reset(&mut self) {
        self.feasibility.reset();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinodynamics::test::test_kinodynamics;
    use drive_if::eqpt::VoltageError;

    struct FixedVoltage(f64);

    impl VoltageSource for FixedVoltage {
        fn voltage(&mut self) -> Result<f64, VoltageError> {
            Ok(self.0)
        }
    }

    fn chain(volts: f64) -> VelocityLimiterChain<FixedVoltage> {
        let k = test_kinodynamics();
        VelocityLimiterChain::new(
            BatterySagSpeedLimit::new(k, FixedVoltage(volts)),
            KinodynamicLimiter::new(k, 0.02),
        )
    }

    #[test]
    fn test_output_never_exceeds_derated_ceiling() {
        let k = test_kinodynamics();
        let requests = [
            FieldRelativeVelocity::new(100.0, 0.0, 0.0),
            FieldRelativeVelocity::new(-3.0, 3.0, 0.0),
            FieldRelativeVelocity::new(0.0, 0.0, -50.0),
            FieldRelativeVelocity::new(2.0, -7.0, 9.0),
        ];

        let mut volts = 0.0;
        while volts <= 20.0 {
            let scale = BatterySagSpeedLimit::new(k, FixedVoltage(volts)).scale();

            for request in requests.iter() {
                let mut limiter = chain(volts);

                // Start from a measurement already moving at the request, so
                // acceleration does not hide an over-limit output.
                let state = RobotState {
                    timestamp_s: 1.0,
                    velocity: *request,
                    ..Default::default()
                };

                // Several ticks so the setpoint has time to converge
                for i in 0..200 {
                    let s = RobotState {
                        timestamp_s: state.timestamp_s + i as f64 * 0.02,
                        ..state
                    };
                    let out = limiter.apply(&s, *request);
                    assert!(out.norm() <= scale * k.max_drive_velocity_ms + 1e-9);
                    assert!(out.omega_rads.abs() <= scale * k.max_angle_speed_rads + 1e-9);
                }

                assert_eq!(
                    limiter.last_limit().map(|l| l.max_linear_ms),
                    Some(scale * k.max_drive_velocity_ms)
                );
            }

            volts += 0.25;
        }
    }

    #[test]
    fn test_below_cutoff_commands_nothing() {
        let mut limiter = chain(5.0);
        let state = RobotState::default();
        let out = limiter.apply(&state, FieldRelativeVelocity::new(1.0, 1.0, 1.0));
        assert_eq!(out, FieldRelativeVelocity::zero());
    }

    #[test]
    fn test_small_request_passes_untouched() {
        let mut limiter = chain(12.0);
        let request = FieldRelativeVelocity::new(0.1, -0.1, 0.2);
        let state = RobotState {
            velocity: request,
            ..Default::default()
        };
        assert_eq!(limiter.apply(&state, request), request);
    }
}
