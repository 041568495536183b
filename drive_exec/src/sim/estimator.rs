//! # Dead reckoning pose estimator
//!
//! Integrates the change in module positions between measurements, taking heading from the gyro.
//! Only the latest estimate is kept.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};

// Internal
use drive_if::{
    eqpt::{EstimatorError, PoseEstimator},
    FieldRelativeAcceleration, FieldRelativeVelocity, GyroReading, ModulePosition, Pose2,
    RobotState, NUM_MODULES,
};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Odometry only pose estimator.
#[derive(Debug, Clone, Default)]
pub struct SimPoseEstimator {
    /// The latest estimate, if any.
    latest: Option<RobotState>,

    /// Module positions at the latest estimate.
    positions: Option<[ModulePosition; NUM_MODULES]>,

    /// Added to the gyro heading to give the field heading.
    ///
    /// Units: radians
    heading_offset_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimPoseEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean displacement of the modules between two position readings.
    ///
    /// Frame: Robot body
    fn displacement_m_rb(
        prev: &[ModulePosition; NUM_MODULES],
        new: &[ModulePosition; NUM_MODULES],
    ) -> Vector2<f64> {
        let sum = prev
            .iter()
            .zip(new.iter())
            .fold(Vector2::zeros(), |acc: Vector2<f64>, (p, n)| {
                let (sin, cos) = n.angle_rad.sin_cos();
                acc + Vector2::new(cos, sin) * (n.distance_m - p.distance_m)
            });

        sum / NUM_MODULES as f64
    }
}

impl PoseEstimator for SimPoseEstimator {
    fn put(
        &mut self,
        timestamp_s: f64,
        gyro: GyroReading,
        positions: &[ModulePosition; NUM_MODULES],
    ) -> Result<(), EstimatorError> {
        let prev = self.latest.unwrap_or_default();
        if self.latest.is_some() && timestamp_s < prev.timestamp_s {
            return Err(EstimatorError::NonMonotonic {
                latest_s: prev.timestamp_s,
                new_s: timestamp_s,
            });
        }

        let heading_rad = wrap_pi(gyro.heading_rad + self.heading_offset_rad);

        let displacement_m = match &self.positions {
            Some(p) => {
                // Rotate by the mean heading over the interval
                let mean_rad =
                    prev.pose.heading_rad + wrap_pi(heading_rad - prev.pose.heading_rad) / 2.0;
                Rotation2::new(mean_rad) * Self::displacement_m_rb(p, positions)
            }
            None => Vector2::zeros(),
        };

        let dt_s = timestamp_s - prev.timestamp_s;
        let (velocity, acceleration) = if self.latest.is_some() && dt_s > 0.0 {
            let v = FieldRelativeVelocity::new(
                displacement_m[0] / dt_s,
                displacement_m[1] / dt_s,
                gyro.heading_rate_rads,
            );
            let dv = v.minus(&prev.velocity);
            let a = FieldRelativeAcceleration {
                ax_mss: dv.vx_ms / dt_s,
                ay_mss: dv.vy_ms / dt_s,
                alpha_radss: dv.omega_rads / dt_s,
            };
            (v, Some(a))
        } else {
            (prev.velocity, prev.acceleration)
        };

        self.latest = Some(RobotState {
            tick: prev.tick,
            timestamp_s,
            pose: Pose2 {
                position_m: prev.pose.position_m + displacement_m,
                heading_rad,
            },
            velocity,
            acceleration,
        });
        self.positions = Some(*positions);

        Ok(())
    }

    fn get(&mut self, timestamp_s: f64) -> Result<RobotState, EstimatorError> {
        match self.latest {
            Some(s) if timestamp_s >= s.timestamp_s => Ok(s),
            _ => Err(EstimatorError::NoEstimate(timestamp_s)),
        }
    }

    fn reset(
        &mut self,
        gyro: GyroReading,
        positions: &[ModulePosition; NUM_MODULES],
        pose: Pose2,
        timestamp_s: f64,
    ) {
        self.heading_offset_rad = wrap_pi(pose.heading_rad - gyro.heading_rad);
        self.positions = Some(*positions);
        self.latest = Some(RobotState {
            timestamp_s,
            pose,
            ..Default::default()
        });
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn positions(distance_m: f64, angle_rad: f64) -> [ModulePosition; NUM_MODULES] {
        [ModulePosition {
            distance_m,
            angle_rad,
        }; NUM_MODULES]
    }

    fn heading(heading_rad: f64) -> GyroReading {
        GyroReading {
            heading_rad,
            heading_rate_rads: 0.0,
        }
    }

    #[test]
    fn test_dead_reckoning() {
        let mut est = SimPoseEstimator::new();
        assert!(est.get(0.0).is_err());

        est.put(0.0, heading(0.0), &positions(0.0, 0.0)).unwrap();
        est.put(1.0, heading(0.0), &positions(0.5, 0.0)).unwrap();

        let s = est.get(1.0).unwrap();
        assert_abs_diff_eq!(s.pose.position_m[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.velocity.vx_ms, 0.5, epsilon = 1e-12);

        // Facing field +Y, wheels forward: moves along +Y
        est.put(2.0, heading(FRAC_PI_2), &positions(0.5, 0.0)).unwrap();
        est.put(3.0, heading(FRAC_PI_2), &positions(1.5, 0.0)).unwrap();
        let s = est.get(3.0).unwrap();
        assert_abs_diff_eq!(s.pose.position_m[0], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(s.pose.position_m[1], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.velocity.vy_ms, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_old_measurements() {
        let mut est = SimPoseEstimator::new();
        est.put(1.0, heading(0.0), &positions(0.0, 0.0)).unwrap();

        // Repeats at the same time are fine
        assert!(est.put(1.0, heading(0.0), &positions(0.0, 0.0)).is_ok());

        assert!(matches!(
            est.put(0.5, heading(0.0), &positions(0.0, 0.0)),
            Err(EstimatorError::NonMonotonic { .. })
        ));
        assert!(est.get(0.5).is_err());
    }

    #[test]
    fn test_reset() {
        let mut est = SimPoseEstimator::new();
        est.put(0.0, heading(0.3), &positions(2.0, 0.0)).unwrap();

        est.reset(heading(0.3), &positions(2.0, 0.0), Pose2::new(1.0, 1.0, 0.0), 0.5);
        let s = est.get(0.5).unwrap();
        assert_eq!(s.pose, Pose2::new(1.0, 1.0, 0.0));

        // Heading follows the gyro from the reset pose
        est.put(1.0, heading(0.4), &positions(2.0, 0.0)).unwrap();
        assert_abs_diff_eq!(est.get(1.0).unwrap().pose.heading_rad, 0.1, epsilon = 1e-12);
    }
}
