//! Implementations for the SwerveDrive state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};

// Internal
use super::{DriveError, DriveMode, DriveSubsystem, DriverSkill};
use crate::{kinodynamics::SwerveKinodynamics, limiter::VelocityLimiter, tick_cache::TickCache};
use drive_if::{
    eqpt::{ActuatorError, Gyro, ModuleActuator, PoseEstimator},
    ChassisSpeeds, FieldRelativeVelocity, GyroReading, ModuleState, Pose2, RobotState, Tick,
    NUM_MODULES,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Swerve drive actuation router.
///
/// Owns the pose estimator, gyro, module actuators and the velocity limiter chain. The robot
/// state is computed at most once per tick, all modes within a tick use the same state.
pub struct SwerveDrive<E, G, M, L> {
    /// Units: seconds
    cycle_period_s: f64,

    estimator: E,
    gyro: G,
    modules: M,
    limiter: L,

    skill: DriverSkill,

    state_cache: TickCache<RobotState>,

    /// The last good gyro reading, used if the gyro fails.
    last_gyro: GyroReading,

    /// The mode commanded during the current tick.
    mode: Option<DriveMode>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<E, G, M, L> SwerveDrive<E, G, M, L>
where
    E: PoseEstimator,
    G: Gyro,
    M: ModuleActuator,
    L: VelocityLimiter,
{
    /// Create a new drive. The modules are stopped.
    pub fn new(
        cycle_period_s: f64,
        estimator: E,
        gyro: G,
        modules: M,
        limiter: L,
        skill: DriverSkill,
    ) -> Self {
        let mut drive = Self {
            cycle_period_s,
            estimator,
            gyro,
            modules,
            limiter,
            skill,
            state_cache: TickCache::new(),
            last_gyro: GyroReading::default(),
            mode: None,
        };

        drive.modules.stop();

        drive
    }

    /// Start a new tick.
    ///
    /// Must be called once at the top of every tick before any other method. Computes the state
    /// for the tick but does not actuate.
    pub fn periodic(&mut self, tick: Tick) {
        self.state_cache.reset(tick);
        self.mode = None;

        match self.state() {
            Ok(s) => trace!("Tick {} state: {:?}", tick, s),
            Err(e) => warn!("Tick {} state unavailable: {}", tick, e),
        }

        self.modules.periodic();
    }

    /// The robot state for the current tick.
    pub fn state(&mut self) -> Result<RobotState, DriveError> {
        // Borrow the fields separately so the cache can call into the hardware
        let Self {
            cycle_period_s,
            estimator,
            gyro,
            modules,
            state_cache,
            last_gyro,
            ..
        } = self;

        state_cache
            .get_or_try_compute(|tick| {
                compute_state(tick, *cycle_period_s, estimator, gyro, modules, last_gyro)
            })
            .map(|s| *s)
    }

    pub fn pose(&mut self) -> Result<Pose2, DriveError> {
        Ok(self.state()?.pose)
    }

    pub fn velocity(&mut self) -> Result<FieldRelativeVelocity, DriveError> {
        Ok(self.state()?.velocity)
    }

    pub fn chassis_speeds(&mut self) -> Result<ChassisSpeeds, DriveError> {
        Ok(self.state()?.chassis_speeds())
    }

    /// Robot relative drive, scaled by the driver skill but not limited.
    pub fn set_chassis_speeds(&mut self, speeds: ChassisSpeeds) {
        let scale = self.skill.level().scale();
        let scaled = speeds.times(scale);

        trace!(
            "Robot relative input {:?} at skill {:?}",
            speeds,
            self.skill.level()
        );

        self.actuate(DriveMode::RobotRelative, |m| m.set_chassis_speeds(scaled));
    }

    /// Robot relative drive, exactly as given.
    pub fn set_chassis_speeds_normally(&mut self, speeds: ChassisSpeeds) {
        self.actuate(DriveMode::RobotRelativeVerbatim, |m| {
            m.set_chassis_speeds_normally(speeds)
        });
    }

    pub fn set_raw_module_states(&mut self, states: [ModuleState; NUM_MODULES]) {
        self.actuate(DriveMode::RawModuleStates, |m| {
            m.set_raw_module_states(states)
        });
    }

    /// Turn the wheels into an X so the robot resists being pushed.
    pub fn defense(&mut self) {
        self.actuate(DriveMode::Defense, |m| m.defense());
    }

    pub fn steer0(&mut self) {
        self.actuate(DriveMode::Steer0, |m| m.steer0());
    }

    pub fn steer90(&mut self) {
        self.actuate(DriveMode::Steer90, |m| m.steer90());
    }

    /// Reset the estimated pose.
    ///
    /// The state is recomputed on the next read, even within the same tick.
    pub fn reset_pose(&mut self, pose: Pose2) {
        warn!("Resetting pose to {:?}", pose);

        self.modules.reset();

        let reading = read_gyro(&mut self.gyro, &mut self.last_gyro);
        let positions = self.modules.positions();
        let tick = self.state_cache.epoch();

        self.estimator
            .reset(reading, &positions, pose, tick as f64 * self.cycle_period_s);

        self.state_cache.reset(tick);
    }

    /// The mode commanded during the current tick, if any.
    pub fn last_mode(&self) -> Option<DriveMode> {
        self.mode
    }

    pub fn skill(&self) -> &DriverSkill {
        &self.skill
    }

    pub fn modules(&self) -> &M {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut M {
        &mut self.modules
    }

    pub fn limiter(&self) -> &L {
        &self.limiter
    }

    pub fn limiter_mut(&mut self) -> &mut L {
        &mut self.limiter
    }

    pub fn gyro_mut(&mut self) -> &mut G {
        &mut self.gyro
    }

    /// Robot relative speeds for `v` at the current heading, or `None` if
    /// the state is unavailable, in which case the modules have been stopped.
    fn to_chassis_speeds_or_stop(&mut self, v: &FieldRelativeVelocity) -> Option<ChassisSpeeds> {
        match self.state() {
            Ok(s) => Some(SwerveKinodynamics::to_instantaneous_chassis_speeds(
                v,
                s.pose.heading_rad,
            )),
            Err(e) => {
                warn!("Cannot drive without a state ({}), stopping", e);
                self.mode = Some(DriveMode::Stop);
                self.modules.stop();
                None
            }
        }
    }

    /// Issue a command to the modules, stopping them if it fails.
    fn actuate<F>(&mut self, mode: DriveMode, command: F)
    where
        F: FnOnce(&mut M) -> Result<(), ActuatorError>,
    {
        self.mode = Some(mode);

        if let Err(e) = command(&mut self.modules) {
            warn!("{:?} command failed ({}), stopping", mode, e);
            self.mode = Some(DriveMode::Stop);
            self.modules.stop();
        }
    }
}

impl<E, G, M, L> DriveSubsystem for SwerveDrive<E, G, M, L>
where
    E: PoseEstimator,
    G: Gyro,
    M: ModuleActuator,
    L: VelocityLimiter,
{
    fn state(&mut self) -> Result<RobotState, DriveError> {
        SwerveDrive::state(self)
    }

    fn aligned(&mut self, v: FieldRelativeVelocity) -> bool {
        match self.state() {
            Ok(s) => self.modules.aligned(
                SwerveKinodynamics::to_instantaneous_chassis_speeds(&v, s.pose.heading_rad),
            ),
            Err(e) => {
                warn!("Cannot check alignment without a state: {}", e);
                false
            }
        }
    }

    fn steer_at_rest(&mut self, v: FieldRelativeVelocity) {
        if let Some(speeds) = self.to_chassis_speeds_or_stop(&v) {
            self.actuate(DriveMode::SteerAtRest, |m| m.steer_at_rest(speeds));
        }
    }

    fn drive_in_field_coords(&mut self, v: FieldRelativeVelocity) {
        let state = match self.state() {
            Ok(s) => s,
            Err(e) => {
                warn!("Cannot drive without a state ({}), stopping", e);
                self.mode = Some(DriveMode::Stop);
                self.modules.stop();
                return;
            }
        };

        let level = self.skill.level();
        trace!("Field relative input {:?} at skill {:?}", v, level);

        let target = self.limiter.apply(&state, v.times(level.scale()));
        let speeds =
            SwerveKinodynamics::to_instantaneous_chassis_speeds(&target, state.pose.heading_rad);

        self.actuate(DriveMode::ScaledFieldRelative, |m| m.set_chassis_speeds(speeds));
    }

    fn drive_in_field_coords_verbatim(&mut self, v: FieldRelativeVelocity) {
        if let Some(speeds) = self.to_chassis_speeds_or_stop(&v) {
            self.actuate(DriveMode::VerbatimFieldRelative, |m| {
                m.set_chassis_speeds_normally(speeds)
            });
        }
    }

    fn reset_limiter(&mut self) {
        self.limiter.reset();
    }

    fn stop(&mut self) {
        self.mode = Some(DriveMode::Stop);
        self.modules.stop();
    }
}

/// Read the gyro, falling back to the last good heading (with zero rate) on failure.
fn read_gyro<G: Gyro>(gyro: &mut G, last: &mut GyroReading) -> GyroReading {
    match gyro.reading() {
        Ok(r) => {
            *last = r;
            r
        }
        Err(e) => {
            warn!(
                "Gyro read failed ({}), using last heading {:.4} rad",
                e, last.heading_rad
            );
            GyroReading {
                heading_rad: last.heading_rad,
                heading_rate_rads: 0.0,
            }
        }
    }
}

fn compute_state<E, G, M>(
    tick: Tick,
    cycle_period_s: f64,
    estimator: &mut E,
    gyro: &mut G,
    modules: &M,
    last_gyro: &mut GyroReading,
) -> Result<RobotState, DriveError>
where
    E: PoseEstimator,
    G: Gyro,
    M: ModuleActuator,
{
    let now_s = tick as f64 * cycle_period_s;

    let reading = read_gyro(gyro, last_gyro);
    estimator.put(now_s, reading, &modules.positions())?;

    let mut state = estimator.get(now_s)?;
    state.tick = tick;

    Ok(state)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive::Level;
    use approx::assert_abs_diff_eq;
    use drive_if::{
        eqpt::{EstimatorError, GyroError},
        ModulePosition,
    };
    use std::f64::consts::FRAC_PI_2;

    #[derive(Default)]
    struct MockEstimator {
        puts: u32,
        resets: u32,
        heading_rad: f64,
        velocity: FieldRelativeVelocity,
        fail: bool,
    }

    impl PoseEstimator for MockEstimator {
        fn put(
            &mut self,
            _timestamp_s: f64,
            gyro: GyroReading,
            _positions: &[ModulePosition; NUM_MODULES],
        ) -> Result<(), EstimatorError> {
            self.puts += 1;
            self.heading_rad = gyro.heading_rad;
            Ok(())
        }

        fn get(&mut self, timestamp_s: f64) -> Result<RobotState, EstimatorError> {
            if self.fail {
                return Err(EstimatorError::NoEstimate(timestamp_s));
            }
            Ok(RobotState {
                timestamp_s,
                pose: Pose2::new(0.0, 0.0, self.heading_rad),
                velocity: self.velocity,
                ..Default::default()
            })
        }

        fn reset(
            &mut self,
            _gyro: GyroReading,
            _positions: &[ModulePosition; NUM_MODULES],
            _pose: Pose2,
            _timestamp_s: f64,
        ) {
            self.resets += 1;
        }
    }

    struct MockGyro(Option<f64>);

    impl Gyro for MockGyro {
        fn heading_rad(&mut self) -> Result<f64, GyroError> {
            self.0.ok_or(GyroError::NotConnected)
        }

        fn heading_rate_rads(&mut self) -> Result<f64, GyroError> {
            Ok(0.0)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Cmd {
        Speeds(ChassisSpeeds),
        Normally(ChassisSpeeds),
        AtRest(ChassisSpeeds),
        Raw,
        Defense,
        Steer0,
        Steer90,
    }

    #[derive(Default)]
    struct MockModules {
        last: Option<Cmd>,
        stops: u32,
        resets: u32,
        fail: bool,
    }

    impl MockModules {
        fn issue(&mut self, cmd: Cmd) -> Result<(), ActuatorError> {
            if self.fail {
                return Err(ActuatorError::ModuleNotResponding(2));
            }
            self.last = Some(cmd);
            Ok(())
        }
    }

    impl ModuleActuator for MockModules {
        fn set_chassis_speeds(&mut self, speeds: ChassisSpeeds) -> Result<(), ActuatorError> {
            self.issue(Cmd::Speeds(speeds))
        }

        fn set_chassis_speeds_normally(
            &mut self,
            speeds: ChassisSpeeds,
        ) -> Result<(), ActuatorError> {
            self.issue(Cmd::Normally(speeds))
        }

        fn steer_at_rest(&mut self, speeds: ChassisSpeeds) -> Result<(), ActuatorError> {
            self.issue(Cmd::AtRest(speeds))
        }

        fn set_raw_module_states(
            &mut self,
            _states: [ModuleState; NUM_MODULES],
        ) -> Result<(), ActuatorError> {
            self.issue(Cmd::Raw)
        }

        fn defense(&mut self) -> Result<(), ActuatorError> {
            self.issue(Cmd::Defense)
        }

        fn steer0(&mut self) -> Result<(), ActuatorError> {
            self.issue(Cmd::Steer0)
        }

        fn steer90(&mut self) -> Result<(), ActuatorError> {
            self.issue(Cmd::Steer90)
        }

        fn aligned(&self, speeds: ChassisSpeeds) -> bool {
            self.last == Some(Cmd::AtRest(speeds))
        }

        fn positions(&self) -> [ModulePosition; NUM_MODULES] {
            [ModulePosition::default(); NUM_MODULES]
        }

        fn stop(&mut self) {
            self.last = None;
            self.stops += 1;
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    /// Passes requests through, counting calls.
    #[derive(Default)]
    struct CountingLimiter {
        applied: u32,
        resets: u32,
    }

    impl VelocityLimiter for CountingLimiter {
        fn apply(
            &mut self,
            _state: &RobotState,
            requested: FieldRelativeVelocity,
        ) -> FieldRelativeVelocity {
            self.applied += 1;
            requested
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    type TestDrive = SwerveDrive<MockEstimator, MockGyro, MockModules, CountingLimiter>;

    fn drive(heading_rad: f64, level: Level) -> TestDrive {
        SwerveDrive::new(
            0.02,
            MockEstimator::default(),
            MockGyro(Some(heading_rad)),
            MockModules::default(),
            CountingLimiter::default(),
            DriverSkill::new(level),
        )
    }

    fn speeds_of(cmd: Option<Cmd>) -> ChassisSpeeds {
        match cmd {
            Some(Cmd::Speeds(s)) | Some(Cmd::Normally(s)) | Some(Cmd::AtRest(s)) => s,
            other => panic!("Expected a speeds command, found {:?}", other),
        }
    }

    #[test]
    fn test_state_computed_once_per_tick() {
        let mut d = drive(0.0, Level::Expert);
        assert_eq!(d.modules().stops, 1);

        d.periodic(1);
        assert_eq!(d.estimator.puts, 1);

        d.drive_in_field_coords(FieldRelativeVelocity::new(1.0, 0.0, 0.0));
        d.aligned(FieldRelativeVelocity::new(1.0, 0.0, 0.0));
        d.pose().unwrap();
        d.velocity().unwrap();
        assert_eq!(d.estimator.puts, 1);

        d.periodic(2);
        let s = d.state().unwrap();
        assert_eq!(d.estimator.puts, 2);
        assert_eq!(s.tick, 2);
        assert_abs_diff_eq!(s.timestamp_s, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_scaled_field_relative() {
        let mut d = drive(FRAC_PI_2, Level::Beginner);
        d.periodic(1);

        d.drive_in_field_coords(FieldRelativeVelocity::new(2.0, 0.0, 1.0));

        assert_eq!(d.last_mode(), Some(DriveMode::ScaledFieldRelative));
        assert_eq!(d.limiter().applied, 1);

        // Half speed, field +X is the robot's right when facing field +Y
        let s = speeds_of(d.modules().last);
        assert_abs_diff_eq!(s.vx_ms, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.vy_ms, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.omega_rads, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_verbatim_and_steer_at_rest_skip_shaping() {
        let mut d = drive(0.0, Level::Beginner);
        d.periodic(1);
        let v = FieldRelativeVelocity::new(2.0, 1.0, 0.0);

        d.drive_in_field_coords_verbatim(v);
        assert_eq!(d.last_mode(), Some(DriveMode::VerbatimFieldRelative));
        assert_eq!(d.modules().last, Some(Cmd::Normally(ChassisSpeeds::new(2.0, 1.0, 0.0))));

        d.steer_at_rest(v);
        assert_eq!(d.last_mode(), Some(DriveMode::SteerAtRest));
        assert!(d.aligned(v));

        assert_eq!(d.limiter().applied, 0);
    }

    #[test]
    fn test_postures_and_robot_relative() {
        let mut d = drive(0.3, Level::Intermediate);
        d.periodic(1);

        d.defense();
        assert_eq!(d.modules().last, Some(Cmd::Defense));
        d.steer0();
        assert_eq!(d.modules().last, Some(Cmd::Steer0));
        d.steer90();
        assert_eq!(d.modules().last, Some(Cmd::Steer90));
        assert_eq!(d.last_mode(), Some(DriveMode::Steer90));

        d.set_chassis_speeds(ChassisSpeeds::new(1.0, 0.0, 0.0));
        assert_eq!(
            d.modules().last,
            Some(Cmd::Speeds(ChassisSpeeds::new(0.75, 0.0, 0.0)))
        );

        d.set_chassis_speeds_normally(ChassisSpeeds::new(1.0, 0.0, 0.0));
        assert_eq!(
            d.modules().last,
            Some(Cmd::Normally(ChassisSpeeds::new(1.0, 0.0, 0.0)))
        );

        d.set_raw_module_states([ModuleState::default(); NUM_MODULES]);
        assert_eq!(d.last_mode(), Some(DriveMode::RawModuleStates));

        // A new tick clears the mode
        d.periodic(2);
        assert_eq!(d.last_mode(), None);
    }

    #[test]
    fn test_skill_change_applies_next_command() {
        let mut d = drive(0.0, Level::Beginner);
        let handle = d.skill().clone();
        d.periodic(1);

        d.drive_in_field_coords(FieldRelativeVelocity::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(speeds_of(d.modules().last).vx_ms, 0.5);

        handle.set_level(Level::Expert);
        d.drive_in_field_coords(FieldRelativeVelocity::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(speeds_of(d.modules().last).vx_ms, 1.0);
    }

    #[test]
    fn test_actuator_failure_stops() {
        let mut d = drive(0.0, Level::Expert);
        d.periodic(1);
        d.modules_mut().fail = true;

        d.drive_in_field_coords(FieldRelativeVelocity::new(1.0, 0.0, 0.0));
        assert_eq!(d.last_mode(), Some(DriveMode::Stop));
        assert_eq!(d.modules().stops, 2);
    }

    #[test]
    fn test_state_failure_stops() {
        let mut d = drive(0.0, Level::Expert);
        d.estimator.fail = true;
        d.periodic(1);

        assert!(d.state().is_err());

        d.drive_in_field_coords(FieldRelativeVelocity::new(1.0, 0.0, 0.0));
        assert_eq!(d.last_mode(), Some(DriveMode::Stop));
        assert_eq!(d.modules().last, None);
        assert_eq!(d.limiter().applied, 0);

        d.steer_at_rest(FieldRelativeVelocity::new(1.0, 0.0, 0.0));
        assert_eq!(d.last_mode(), Some(DriveMode::Stop));
        assert!(!d.aligned(FieldRelativeVelocity::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_gyro_failure_holds_last_heading() {
        let mut d = drive(0.7, Level::Expert);
        d.periodic(1);
        assert_abs_diff_eq!(d.pose().unwrap().heading_rad, 0.7);

        d.gyro_mut().0 = None;
        d.periodic(2);
        assert_abs_diff_eq!(d.pose().unwrap().heading_rad, 0.7);
    }

    #[test]
    fn test_reset_pose_recomputes_within_tick() {
        let mut d = drive(0.0, Level::Expert);
        d.periodic(3);
        assert_eq!(d.estimator.puts, 1);

        d.reset_pose(Pose2::new(1.0, 2.0, 0.0));
        assert_eq!(d.estimator.resets, 1);
        assert_eq!(d.modules().resets, 1);

        let s = d.state().unwrap();
        assert_eq!(d.estimator.puts, 2);
        assert_eq!(s.tick, 3);
    }

    #[test]
    fn test_reset_limiter() {
        let mut d = drive(0.0, Level::Expert);
        d.reset_limiter();
        assert_eq!(d.limiter().resets, 1);
    }
}
