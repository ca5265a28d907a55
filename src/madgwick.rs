//! Gradient-descent orientation filter
//!
//! Corrects gyroscope integration with one normalized gradient-descent step
//! on the mismatch between measured and orientation-implied gravity. No
//! magnetometer, no gain ramping and no validity gating.

use nalgebra::{Quaternion, RealField, UnitQuaternion, Vector3};

use crate::estimator::AttitudeEstimator;
use crate::math::{QuaternionExt, scalar};
use crate::sensor::{Imu, Reading};

/// Madgwick IMU filter
///
/// # Example
/// ```
/// use attitude_fusion::Madgwick;
/// use nalgebra::Vector3;
///
/// let mut filter = Madgwick::new(0.1);
/// let gyroscope = Vector3::new(0.0, 0.0, 0.0);   // rad/s
/// let accelerometer = Vector3::new(0.0, 0.0, 1.0); // g
/// filter.update_imu(gyroscope, accelerometer, 0.01);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Madgwick<T: RealField + Copy = f64> {
    quaternion: UnitQuaternion<T>,
    beta: T,
}

impl<T: RealField + Copy> Madgwick<T> {
    /// Filter starting at the identity orientation with correction
    /// coefficient `beta`.
    pub fn new(beta: T) -> Self {
        Self::with_orientation(beta, UnitQuaternion::identity())
    }

    pub fn with_orientation(beta: T, quaternion: UnitQuaternion<T>) -> Self {
        Self { quaternion, beta }
    }

    pub fn beta(&self) -> T {
        self.beta
    }

    pub fn set_beta(&mut self, beta: T) {
        self.beta = beta;
    }

    pub fn quaternion(&self) -> UnitQuaternion<T> {
        self.quaternion
    }

    /// Advance by `dt` seconds with gyroscope (rad/s) and accelerometer
    /// readings.
    ///
    /// An all-zero accelerometer reading leaves the state untouched.
    pub fn update_imu(&mut self, gyroscope: Vector3<T>, accelerometer: Vector3<T>, dt: T) {
        let norm = accelerometer.norm();
        if norm == T::zero() {
            return;
        }
        let a = accelerometer / norm;

        let q = *self.quaternion.quaternion();
        let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);
        let two = T::one() + T::one();
        let four = two + two;
        let eight = four + four;

        let (_2q0, _2q1, _2q2, _2q3) = (two * q0, two * q1, two * q2, two * q3);
        let (_4q0, _4q1, _4q2) = (four * q0, four * q1, four * q2);
        let (_8q1, _8q2) = (eight * q1, eight * q2);
        let (q0q0, q1q1, q2q2, q3q3) = (q0 * q0, q1 * q1, q2 * q2, q3 * q3);

        // Gradient of the gravity-direction objective function.
        let s0 = _4q0 * q2q2 + _2q2 * a.x + _4q0 * q1q1 - _2q1 * a.y;
        let s1 = _4q1 * q3q3 - _2q3 * a.x + four * q0q0 * q1 - _2q0 * a.y - _4q1
            + _8q1 * q1q1
            + _8q1 * q2q2
            + _4q1 * a.z;
        let s2 = four * q0q0 * q2 + _2q0 * a.x + _4q2 * q3q3 - _2q3 * a.y - _4q2
            + _8q2 * q1q1
            + _8q2 * q2q2
            + _4q2 * a.z;
        let s3 = four * q1q1 * q3 - _2q1 * a.x + four * q2q2 * q3 - _2q2 * a.y;
        let step = Quaternion::new(s0, s1, s2, s3);

        // A zero gradient means the estimate already matches; skip the step
        // instead of dividing by zero.
        let step_norm = step.norm();
        let correction = if step_norm > T::zero() {
            step * (self.beta / step_norm)
        } else {
            Quaternion::new(T::zero(), T::zero(), T::zero(), T::zero())
        };

        let q_dot = q.mul_vector(&gyroscope) * scalar::<T>(0.5) - correction;
        self.quaternion = (q + q_dot * dt).normalize_unchecked();
    }

    /// Read one sample from `imu`, convert it to g and rad/s, and advance by
    /// `dt` seconds.
    pub fn update_from<I: Imu>(&mut self, imu: &mut I, dt: T) {
        let reading = Reading::<T>::from_raw(imu.acceleration(), imu.angular_velocity(), None);
        self.update_imu(reading.angular_velocity, reading.acceleration, dt);
    }
}

impl<T: RealField + Copy> AttitudeEstimator<T> for Madgwick<T> {
    fn quaternion(&self) -> UnitQuaternion<T> {
        self.quaternion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_acceleration_leaves_state() {
        let start = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let mut filter = Madgwick::with_orientation(0.1, start);
        filter.update_imu(Vector3::new(1.0, 1.0, 1.0), Vector3::zeros(), 0.01);
        assert_eq!(filter.quaternion(), start);
    }

    #[test]
    fn test_level_is_fixed_point() {
        let mut filter = Madgwick::new(0.1);
        for _ in 0..100 {
            filter.update_imu(Vector3::zeros(), Vector3::new(0.0, 0.0, 9.81), 0.01);
        }
        assert_relative_eq!(filter.quaternion(), UnitQuaternion::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_converges_to_tilt() {
        // Gravity measured along +Y: the body is rolled by -90 degrees.
        let mut filter = Madgwick::new(0.5);
        for _ in 0..2000 {
            filter.update_imu(Vector3::zeros(), Vector3::new(0.0, 1.0, 0.0), 0.01);
        }
        let up = filter.quaternion().inverse_transform_vector(&Vector3::z());
        // The normalized step keeps chattering by about beta * dt around the fixed point.
        assert_relative_eq!(up, Vector3::new(0.0, 1.0, 0.0), epsilon = 2e-2);
    }

    #[test]
    fn test_beta_zero_integrates_gyro() {
        let mut filter = Madgwick::new(0.0);
        for _ in 0..1000 {
            filter.update_imu(Vector3::new(0.0, 0.0, 0.5), Vector3::new(0.0, 0.0, 1.0), 0.001);
        }
        let (_, _, yaw) = filter.quaternion().euler_angles();
        assert_relative_eq!(yaw, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_update_from_sensor_units() {
        struct Spin;
        impl Imu for Spin {
            fn acceleration(&mut self) -> [i32; 3] {
                [0, 0, 1_000_000]
            }
            fn angular_velocity(&mut self) -> [i32; 3] {
                [0, 0, 500_000]
            }
        }

        let mut filter = Madgwick::<f32>::new(0.0);
        for _ in 0..100 {
            filter.update_from(&mut Spin, 0.01);
        }
        let (_, _, yaw) = filter.quaternion().euler_angles();
        assert_relative_eq!(yaw, 0.5, epsilon = 1e-3);
    }
}
