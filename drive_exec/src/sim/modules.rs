//! # Simulated swerve modules
//!
//! Each module steers towards its demanded angle at a limited rate and drives at its demanded
//! speed. Motion is integrated once per tick in `periodic`, after which the body rotation measured
//! from the module states is published for the gyro.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use std::{cell::Cell, f64::consts::PI, rc::Rc};

// Internal
use super::Params;
use crate::kinodynamics::SwerveKinodynamics;
use drive_if::{
    eqpt::{ActuatorError, ModuleActuator},
    ChassisSpeeds, GyroReading, ModulePosition, ModuleState, NUM_MODULES,
};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Wheel speed under which a demand carries no direction.
///
/// Units: meters/second
const MIN_DIRECTED_SPEED_MS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Four simulated swerve modules.
#[derive(Debug)]
pub struct SimModules {
    kinodynamics: SwerveKinodynamics,

    /// Units: radians/second
    steer_rate_rads: f64,

    /// Units: radians
    steer_tolerance_rad: f64,

    /// Units: seconds
    cycle_period_s: f64,

    modules: [SimModule; NUM_MODULES],

    /// Integrated body rotation, read by the gyro.
    body: Rc<Cell<GyroReading>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimModule {
    /// Units: radians
    angle_rad: f64,

    /// Units: meters/second
    speed_ms: f64,

    /// Units: meters
    distance_m: f64,

    demand: ModuleState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimModules {
    pub fn new(kinodynamics: SwerveKinodynamics, params: &Params, cycle_period_s: f64) -> Self {
        let module = SimModule {
            angle_rad: params.initial_steer_rad,
            demand: ModuleState {
                speed_ms: 0.0,
                angle_rad: params.initial_steer_rad,
            },
            ..Default::default()
        };

        Self {
            kinodynamics,
            steer_rate_rads: params.steer_rate_rads,
            steer_tolerance_rad: params.steer_tolerance_rad,
            cycle_period_s,
            modules: [module; NUM_MODULES],
            body: Rc::new(Cell::new(GyroReading::default())),
        }
    }

    /// Shared handle to the integrated body rotation.
    pub fn body_reading(&self) -> Rc<Cell<GyroReading>> {
        self.body.clone()
    }

    /// The measured state of each module.
    pub fn states(&self) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];
        for (s, m) in states.iter_mut().zip(self.modules.iter()) {
            *s = ModuleState {
                speed_ms: m.speed_ms,
                angle_rad: m.angle_rad,
            };
        }
        states
    }

    /// Robot frame speeds measured from the module states.
    pub fn measured_speeds(&self) -> ChassisSpeeds {
        let mut vx_ms = 0.0;
        let mut vy_ms = 0.0;
        let mut moment = 0.0;
        let mut inertia = 0.0;

        for (m, p) in self.modules.iter().zip(self.kinodynamics.module_pos_m_rb.iter()) {
            let (sin, cos) = m.angle_rad.sin_cos();
            let (vxi, vyi) = (m.speed_ms * cos, m.speed_ms * sin);

            vx_ms += vxi;
            vy_ms += vyi;
            moment += p[0] * vyi - p[1] * vxi;
            inertia += p[0] * p[0] + p[1] * p[1];
        }

        let n = NUM_MODULES as f64;
        ChassisSpeeds::new(
            vx_ms / n,
            vy_ms / n,
            if inertia > 0.0 { moment / inertia } else { 0.0 },
        )
    }

    /// Inverse kinematics, optimised against the current steering angles.
    ///
    /// Modules with no speed demand keep their current angle.
    fn module_states(&self, speeds: &ChassisSpeeds) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];

        for ((s, m), p) in states
            .iter_mut()
            .zip(self.modules.iter())
            .zip(self.kinodynamics.module_pos_m_rb.iter())
        {
            let vxi = speeds.vx_ms - speeds.omega_rads * p[1];
            let vyi = speeds.vy_ms + speeds.omega_rads * p[0];
            let speed_ms = vxi.hypot(vyi);

            *s = if speed_ms < MIN_DIRECTED_SPEED_MS {
                ModuleState {
                    speed_ms: 0.0,
                    angle_rad: m.angle_rad,
                }
            } else {
                optimise(
                    ModuleState {
                        speed_ms,
                        angle_rad: vyi.atan2(vxi),
                    },
                    m.angle_rad,
                )
            };
        }

        states
    }

    /// Scale every wheel speed down so none exceeds the rated maximum.
    fn desaturate(&self, states: &mut [ModuleState; NUM_MODULES]) {
        let max = states.iter().map(|s| s.speed_ms.abs()).fold(0.0, f64::max);
        let limit = self.kinodynamics.max_drive_velocity_ms;

        if max > limit && max > 0.0 {
            for s in states.iter_mut() {
                s.speed_ms *= limit / max;
            }
        }
    }

    fn set_demands(&mut self, states: [ModuleState; NUM_MODULES]) -> Result<(), ActuatorError> {
        for (i, s) in states.iter().enumerate() {
            if !s.speed_ms.is_finite() || !s.angle_rad.is_finite() {
                return Err(ActuatorError::NonFiniteDemand {
                    module: i,
                    state: *s,
                });
            }
        }

        for (m, s) in self.modules.iter_mut().zip(states.iter()) {
            m.demand = *s;
        }

        Ok(())
    }

    /// Steer every module to the given angles with no drive.
    fn posture(&mut self, angles_rad: [f64; NUM_MODULES]) -> Result<(), ActuatorError> {
        let mut states = [ModuleState::default(); NUM_MODULES];
        for (s, a) in states.iter_mut().zip(angles_rad.iter()) {
            s.angle_rad = *a;
        }
        self.set_demands(states)
    }
}

impl ModuleActuator for SimModules {
    fn set_chassis_speeds(&mut self, speeds: ChassisSpeeds) -> Result<(), ActuatorError> {
        let mut states = self.module_states(&speeds);
        self.desaturate(&mut states);
        self.set_demands(states)
    }

    fn set_chassis_speeds_normally(
        &mut self,
        speeds: ChassisSpeeds,
    ) -> Result<(), ActuatorError> {
        let states = self.module_states(&speeds);
        self.set_demands(states)
    }

    fn steer_at_rest(&mut self, speeds: ChassisSpeeds) -> Result<(), ActuatorError> {
        let mut states = self.module_states(&speeds);
        for s in states.iter_mut() {
            s.speed_ms = 0.0;
        }
        self.set_demands(states)
    }

    fn set_raw_module_states(
        &mut self,
        states: [ModuleState; NUM_MODULES],
    ) -> Result<(), ActuatorError> {
        self.set_demands(states)
    }

    fn defense(&mut self) -> Result<(), ActuatorError> {
        // Each wheel across the line to the platform centre
        let mut angles = [0.0; NUM_MODULES];
        for (a, p) in angles.iter_mut().zip(self.kinodynamics.module_pos_m_rb.iter()) {
            *a = wrap_pi(p[1].atan2(p[0]) + PI / 2.0);
        }
        self.posture(angles)
    }

    fn steer0(&mut self) -> Result<(), ActuatorError> {
        self.posture([0.0; NUM_MODULES])
    }

    fn steer90(&mut self) -> Result<(), ActuatorError> {
        self.posture([PI / 2.0; NUM_MODULES])
    }

    fn aligned(&self, speeds: ChassisSpeeds) -> bool {
        self.module_states(&speeds)
            .iter()
            .zip(self.modules.iter())
            .all(|(s, m)| {
                // A wheel pointing backwards is as good as forwards
                let err = wrap_pi(s.angle_rad - m.angle_rad).abs();
                err.min(PI - err) <= self.steer_tolerance_rad
            })
    }

    fn positions(&self) -> [ModulePosition; NUM_MODULES] {
        let mut positions = [ModulePosition::default(); NUM_MODULES];
        for (p, m) in positions.iter_mut().zip(self.modules.iter()) {
            *p = ModulePosition {
                distance_m: m.distance_m,
                angle_rad: m.angle_rad,
            };
        }
        positions
    }

    fn stop(&mut self) {
        for m in self.modules.iter_mut() {
            m.demand.speed_ms = 0.0;
            m.speed_ms = 0.0;
        }
    }

    fn reset(&mut self) {
        for m in self.modules.iter_mut() {
            m.distance_m = 0.0;
        }
    }

    fn periodic(&mut self) {
        let dt_s = self.cycle_period_s;
        let max_step_rad = self.steer_rate_rads * dt_s;

        for m in self.modules.iter_mut() {
            let err = wrap_pi(m.demand.angle_rad - m.angle_rad);
            m.angle_rad = wrap_pi(m.angle_rad + err.clamp(-max_step_rad, max_step_rad));
            m.speed_ms = m.demand.speed_ms;
            m.distance_m += m.speed_ms * dt_s;
        }

        let omega_rads = self.measured_speeds().omega_rads;
        let prev = self.body.get();
        self.body.set(GyroReading {
            heading_rad: wrap_pi(prev.heading_rad + omega_rads * dt_s),
            heading_rate_rads: omega_rads,
        });

        trace!("Sim module states: {:?}", self.states());
    }
}

/// Flip a demand to the opposite direction with reversed speed if that steers less.
fn optimise(state: ModuleState, current_rad: f64) -> ModuleState {
    if wrap_pi(state.angle_rad - current_rad).abs() > PI / 2.0 {
        ModuleState {
            speed_ms: -state.speed_ms,
            angle_rad: wrap_pi(state.angle_rad + PI),
        }
    } else {
        state
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::{kinodynamics::test::test_kinodynamics, sim::Backend};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    pub(crate) fn test_sim_params() -> Params {
        Params {
            backend: Backend::Sim,
            steer_rate_rads: 10.0,
            steer_tolerance_rad: 0.05,
            initial_voltage_v: 12.0,
            initial_steer_rad: 0.0,
        }
    }

    fn modules() -> SimModules {
        SimModules::new(test_kinodynamics(), &test_sim_params(), 0.02)
    }

    #[test]
    fn test_steering_is_rate_limited() {
        let mut m = modules();
        let sideways = ChassisSpeeds::new(0.0, 1.0, 0.0);

        m.steer_at_rest(sideways).unwrap();
        assert!(!m.aligned(sideways));

        // 0.2 rad per tick to reach pi/2
        let mut ticks = 0;
        while !m.aligned(sideways) {
            m.periodic();
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(ticks, 8);

        // Steering at rest does not move the wheels
        assert!(m.positions().iter().all(|p| p.distance_m == 0.0));
        assert_abs_diff_eq!(m.states()[0].angle_rad, FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_reverse_is_aligned() {
        let mut m = modules();
        m.steer0().unwrap();

        // Straight back needs no steering, just reversed wheels
        let back = ChassisSpeeds::new(-1.0, 0.0, 0.0);
        assert!(m.aligned(back));

        m.set_chassis_speeds(back).unwrap();
        m.periodic();
        assert_abs_diff_eq!(m.measured_speeds().vx_ms, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.positions()[0].distance_m, -0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_integrates_heading() {
        let mut m = modules();
        let spin = ChassisSpeeds::new(0.0, 0.0, 1.0);

        m.steer_at_rest(spin).unwrap();
        for _ in 0..20 {
            m.periodic();
        }
        assert!(m.aligned(spin));
        assert_abs_diff_eq!(m.body_reading().get().heading_rad, 0.0);

        m.set_chassis_speeds(spin).unwrap();
        for _ in 0..50 {
            m.periodic();
        }
        let body = m.body_reading().get();
        assert_abs_diff_eq!(body.heading_rate_rads, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(body.heading_rad, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_desaturates_wheel_speeds() {
        let mut m = modules();
        m.set_chassis_speeds(ChassisSpeeds::new(10.0, 0.0, 0.0))
            .unwrap();
        m.periodic();
        assert_abs_diff_eq!(m.measured_speeds().vx_ms, 4.0, epsilon = 1e-12);

        // Not desaturated when driven normally
        m.set_chassis_speeds_normally(ChassisSpeeds::new(10.0, 0.0, 0.0))
            .unwrap();
        m.periodic();
        assert_abs_diff_eq!(m.measured_speeds().vx_ms, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_finite_demand() {
        let mut m = modules();
        let mut states = [ModuleState::default(); NUM_MODULES];
        states[3].speed_ms = f64::NAN;

        assert!(matches!(
            m.set_raw_module_states(states),
            Err(ActuatorError::NonFiniteDemand { module: 3, .. })
        ));
    }

    #[test]
    fn test_postures() {
        let mut m = modules();

        m.steer90().unwrap();
        for _ in 0..10 {
            m.periodic();
        }
        assert!(m
            .states()
            .iter()
            .all(|s| (s.angle_rad - FRAC_PI_2).abs() < 1e-9 && s.speed_ms == 0.0));

        m.defense().unwrap();
        for _ in 0..20 {
            m.periodic();
        }
        // Front left module at (+, +) points across its diagonal
        assert_abs_diff_eq!(m.states()[0].angle_rad, 3.0 * PI / 4.0, epsilon = 1e-9);
    }
}
