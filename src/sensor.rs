//! Sensor capability traits consumed by the filters
//!
//! Drivers expose raw integer counts in fixed units. The filters only depend
//! on the capability set they need: [`Imu`] for acceleration and angular
//! velocity, and [`ImuHeading`] when a magnetometer is also present. Which of
//! the two a filter was built with is fixed by its [`SensorSet`] variant and
//! never re-probed.

use nalgebra::{RealField, Vector3};

use crate::math::{scalar, scaled_vector};

/// Scale from micro-g counts to g.
pub const MICRO_G_TO_G: f64 = 1e-6;
/// Scale from micro-radian per second counts to rad/s.
pub const MICRO_RAD_TO_RAD: f64 = 1e-6;

/// Accelerometer and gyroscope, such as an MPU6050.
pub trait Imu {
    /// Linear acceleration in micro-g.
    fn acceleration(&mut self) -> [i32; 3];
    /// Angular velocity in micro-radians per second.
    fn angular_velocity(&mut self) -> [i32; 3];
}

/// Accelerometer, gyroscope and magnetometer, such as an MPU9250.
pub trait ImuHeading: Imu {
    /// Magnetic field in nanotesla.
    fn north(&mut self) -> [i32; 3];
}

impl<I: Imu + ?Sized> Imu for &mut I {
    fn acceleration(&mut self) -> [i32; 3] {
        (**self).acceleration()
    }

    fn angular_velocity(&mut self) -> [i32; 3] {
        (**self).angular_velocity()
    }
}

impl<H: ImuHeading + ?Sized> ImuHeading for &mut H {
    fn north(&mut self) -> [i32; 3] {
        (**self).north()
    }
}

/// One sample converted to physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading<T: RealField + Copy> {
    /// Acceleration in g.
    pub acceleration: Vector3<T>,
    /// Angular velocity in rad/s.
    pub angular_velocity: Vector3<T>,
    /// Magnetic field in nanotesla, `None` without a heading source.
    pub magnetic_field: Option<Vector3<T>>,
}

impl<T: RealField + Copy> Reading<T> {
    /// Convert raw counts. `north` is left unscaled.
    pub fn from_raw(acceleration: [i32; 3], angular_velocity: [i32; 3], north: Option<[i32; 3]>) -> Self {
        Self {
            acceleration: scaled_vector(scalar(MICRO_G_TO_G), acceleration),
            angular_velocity: scaled_vector(scalar(MICRO_RAD_TO_RAD), angular_velocity),
            magnetic_field: north.map(|raw| scaled_vector(T::one(), raw)),
        }
    }
}

/// The sensor capabilities a filter instance was built with.
pub trait SensorSet {
    /// Whether a magnetometer is available for the lifetime of the set.
    const HAS_HEADING: bool;

    /// Read one sample from every available sensor.
    fn read<T: RealField + Copy>(&mut self) -> Reading<T>;
}

/// Accelerometer and gyroscope only. Heading is not observable.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertialOnly<I>(pub I);

/// Accelerometer, gyroscope and magnetometer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithHeading<H>(pub H);

impl<I: Imu> SensorSet for InertialOnly<I> {
    const HAS_HEADING: bool = false;

    fn read<T: RealField + Copy>(&mut self) -> Reading<T> {
        Reading::from_raw(self.0.acceleration(), self.0.angular_velocity(), None)
    }
}

impl<H: ImuHeading> SensorSet for WithHeading<H> {
    const HAS_HEADING: bool = true;

    fn read<T: RealField + Copy>(&mut self) -> Reading<T> {
        let acceleration = self.0.acceleration();
        let angular_velocity = self.0.angular_velocity();
        let north = self.0.north();
        Reading::from_raw(acceleration, angular_velocity, Some(north))
    }
}
