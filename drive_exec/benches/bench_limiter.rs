//! # Velocity Limiter Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use drive_if::{
    eqpt::{VoltageError, VoltageSource},
    FieldRelativeVelocity, RobotState,
};
use drive_lib::{
    kinodynamics::SwerveKinodynamics,
    limiter::{Params, VelocityLimiter, VelocityLimiterChain},
};

/// Battery sagging slowly under load.
struct SaggingBattery {
    volts: f64,
}

impl VoltageSource for SaggingBattery {
    fn voltage(&mut self) -> Result<f64, VoltageError> {
        self.volts = (self.volts - 0.001).max(6.0);
        Ok(self.volts)
    }
}

fn limiter_benchmark(c: &mut Criterion) {
    // ---- Build the limiter chain ----

    let kinodynamics = SwerveKinodynamics {
        max_drive_velocity_ms: 4.0,
        max_drive_acceleration_mss: 10.0,
        max_angle_speed_rads: 8.0,
        max_angle_acceleration_radss: 40.0,
        module_pos_m_rb: [[0.25, 0.25], [0.25, -0.25], [-0.25, 0.25], [-0.25, -0.25]],
    };

    let params = Params {
        battery_sag_table: drive_lib::limiter::default_battery_sag_table(),
        nominal_period_s: 0.02,
    };

    let mut chain =
        VelocityLimiterChain::from_params(kinodynamics, SaggingBattery { volts: 12.5 }, &params);

    let mut state = RobotState::default();
    let request = FieldRelativeVelocity::new(3.0, -2.0, 5.0);

    // Bench one tick of limiting
    c.bench_function("VelocityLimiterChain::apply", |b| {
        b.iter(|| {
            state.timestamp_s += 0.02;
            let v = chain.apply(black_box(&state), black_box(request));
            state.velocity = v;
            v
        })
    });
}

criterion_group!(benches, limiter_benchmark);
criterion_main!(benches);
