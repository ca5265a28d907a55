//! Complementary fusion filter
//!
//! Integrates angular velocity and pulls the integrated orientation toward
//! the gravity direction measured by the accelerometer and, when a heading
//! source is available, the magnetic west direction derived from the
//! magnetometer.

use core::marker::PhantomData;
use core::time::Duration;

use log::{debug, trace, warn};
use nalgebra::{Quaternion, RealField, UnitQuaternion, Vector3};

use crate::error::{Error, Result};
use crate::estimator::AttitudeEstimator;
use crate::math::{QuaternionExt, Vector3Ext, scalar};
use crate::precision::{ExactMath, FastMath, Transcendental};
use crate::rotation::RotationMatrix;
use crate::sensor::{Imu, ImuHeading, InertialOnly, Reading, SensorSet, WithHeading};
use crate::types::{FusionFlags, FusionSettings, MagneticFieldWindow};

/// Gain the filter starts from, and the substitute for a non-positive gain
/// at construction.
pub const INITIAL_GAIN: f64 = 10.0;
/// Seconds for the ramped gain to settle from [`INITIAL_GAIN`] to the
/// configured gain.
pub const INITIALISATION_PERIOD: f64 = 3.0;

/// Double precision filter with exact transcendentals.
pub type FusionAhrs<S> = Fusion<S, f64, ExactMath>;
/// Single precision filter with the reduced-precision approximations.
pub type FusionAhrs32<S> = Fusion<S, f32, FastMath>;

/// Complementary fusion filter
///
/// Generic over the sensor capability set `S`, the scalar `T` and the
/// transcendental provider `M`. The two common instantiations are
/// [`FusionAhrs`] and [`FusionAhrs32`].
///
/// One update runs a fixed amount of arithmetic with no allocation. An
/// instance is not meant to be shared between execution contexts; calls to
/// [`Fusion::update`] on the same instance must be serialized by its owner.
///
/// # Example
/// ```
/// use attitude_fusion::{AttitudeEstimator, FusionAhrs, Imu, RotationOrder};
///
/// struct Level;
///
/// impl Imu for Level {
///     fn acceleration(&mut self) -> [i32; 3] {
///         [0, 0, 1_000_000] // 1 g along +Z
///     }
///     fn angular_velocity(&mut self) -> [i32; 3] {
///         [0, 0, 0]
///     }
/// }
///
/// let mut ahrs = FusionAhrs::inertial(1.0, Level);
/// for _ in 0..100 {
///     ahrs.update(0.01);
/// }
/// let angles = ahrs.euler(RotationOrder::Xyz);
/// assert!(angles.q.abs() < 1e-9 && angles.r.abs() < 1e-9 && angles.s == 0.0);
/// ```
pub struct Fusion<S, T: RealField + Copy = f64, M = ExactMath> {
    sensors: S,
    settings: FusionSettings<T>,
    /// Squared magnetic field bounds
    min_field_squared: T,
    max_field_squared: T,
    quaternion: UnitQuaternion<T>,
    linear_acceleration: Vector3<T>,
    ramped_gain: T,
    /// Half feedback error of the last update
    half_feedback_error: Vector3<T>,
    flags: FusionFlags,
    _math: PhantomData<M>,
}

impl<S: SensorSet, T: RealField + Copy, M: Transcendental<T>> Fusion<S, T, M> {
    /// Create a filter reading from `sensors`.
    ///
    /// A non-positive (or NaN) gain is replaced by [`INITIAL_GAIN`].
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn new(mut settings: FusionSettings<T>, sensors: S) -> Self {
        // Negated comparison so NaN is replaced too.
        if !(settings.gain > T::zero()) {
            warn!(
                "non-positive fusion gain {:?}, using initial gain {}",
                settings.gain, INITIAL_GAIN
            );
            settings.gain = scalar(INITIAL_GAIN);
        }
        let (min_field_squared, max_field_squared) = settings.magnetic_field.squared();

        debug!(
            "fusion filter ready: gain={:?} heading={} magnetic_field={:?}..{:?} ramped_feedback={}",
            settings.gain,
            S::HAS_HEADING,
            settings.magnetic_field.min,
            settings.magnetic_field.max,
            settings.ramped_feedback
        );

        Self {
            sensors,
            settings,
            min_field_squared,
            max_field_squared,
            quaternion: UnitQuaternion::identity(),
            linear_acceleration: Vector3::zeros(),
            ramped_gain: scalar(INITIAL_GAIN),
            half_feedback_error: Vector3::zeros(),
            flags: FusionFlags {
                initialising: true,
                accelerometer_ignored: false,
                magnetometer_ignored: !S::HAS_HEADING,
            },
            _math: PhantomData,
        }
    }

    /// Start configuring a filter. The sensor source must be attached before
    /// [`FusionBuilder::build`].
    pub fn builder() -> FusionBuilder<S, T, M> {
        FusionBuilder::new()
    }

    /// Restore the identity orientation and restart the gain ramp.
    pub fn reset(&mut self) {
        self.quaternion = UnitQuaternion::identity();
        self.linear_acceleration = Vector3::zeros();
        self.ramped_gain = scalar(INITIAL_GAIN);
        self.half_feedback_error = Vector3::zeros();
        self.flags = FusionFlags {
            initialising: true,
            accelerometer_ignored: false,
            magnetometer_ignored: !S::HAS_HEADING,
        };
    }

    /// Read one sample and advance the estimate by `dt` seconds.
    pub fn update(&mut self, dt: T) {
        let reading = self.sensors.read::<T>();
        self.fuse(&reading, dt);
    }

    /// [`Fusion::update`] with the elapsed time as a [`Duration`].
    pub fn update_duration(&mut self, dt: Duration) {
        self.update(scalar(dt.as_secs_f64()));
    }

    fn fuse(&mut self, reading: &Reading<T>, dt: T) {
        let half = scalar::<T>(0.5);
        let accelerometer = reading.acceleration;
        // Gravity implied by the orientation before this step's integration.
        let half_gravity = self.half_gravity();

        let mut half_feedback_error = Vector3::zeros();
        self.flags.accelerometer_ignored = accelerometer.is_exactly_zero();
        self.flags.magnetometer_ignored = true;

        if self.flags.accelerometer_ignored {
            trace!("all-zero accelerometer reading, skipping feedback");
        } else {
            // Precondition of normalize_unchecked: checked non-zero above.
            half_feedback_error = accelerometer.normalize_unchecked().cross(&half_gravity);

            if let Some(magnetometer) = reading.magnetic_field {
                let field_squared = magnetometer.norm_squared();
                if field_squared >= self.min_field_squared && field_squared <= self.max_field_squared {
                    // West is zero when the field is zero or parallel to gravity;
                    // it then contributes no correction.
                    let west = accelerometer.cross(&magnetometer).safe_normalize();
                    half_feedback_error += west.cross(&self.half_west());
                    self.flags.magnetometer_ignored = false;
                } else {
                    trace!("magnetic field {:?} outside window, skipping magnetometer", field_squared);
                }
            }
        }
        self.half_feedback_error = half_feedback_error;

        let feedback_gain = self.ramp_gain(dt);

        // First-order integration of q̇ = ½ q ⊗ ω
        let half_gyroscope = reading.angular_velocity * half + half_feedback_error * feedback_gain;
        let q = *self.quaternion.quaternion();
        // Precondition of normalize_unchecked: a small step from a unit quaternion.
        self.quaternion = (q + q.mul_vector(&(half_gyroscope * dt))).normalize_unchecked();

        self.linear_acceleration = accelerometer - half_gravity * scalar::<T>(2.0);

        if !S::HAS_HEADING {
            // No absolute heading reference: discard gyro-accumulated yaw.
            self.set_yaw(T::zero());
        }
    }

    /// Advance the ramped gain and return the gain applied to this step's
    /// feedback.
    fn ramp_gain(&mut self, dt: T) -> T {
        let gain = self.settings.gain;
        let period = scalar::<T>(INITIALISATION_PERIOD);

        if gain == T::zero() {
            self.ramped_gain = T::zero();
        }
        if self.ramped_gain > gain {
            let step = (scalar::<T>(INITIAL_GAIN) - gain) * dt / period;
            self.ramped_gain = (self.ramped_gain - step).max(gain);
        } else if self.ramped_gain < gain {
            // Coming back from a zero gain.
            self.ramped_gain = (self.ramped_gain + gain * dt / period).min(gain);
        }
        self.flags.initialising = self.ramped_gain != gain;

        if self.settings.ramped_feedback {
            self.ramped_gain
        } else {
            gain
        }
    }

    /// Half of the gravity direction in the body frame; third column of the
    /// rotation matrix scaled by 0.5.
    fn half_gravity(&self) -> Vector3<T> {
        let half = scalar::<T>(0.5);
        let (w, x, y, z) = (self.quaternion.w, self.quaternion.i, self.quaternion.j, self.quaternion.k);
        Vector3::new(x * z - w * y, w * x + y * z, w * w - half + z * z)
    }

    /// Half of the magnetic west direction in the body frame; second column
    /// of the rotation matrix scaled by 0.5.
    fn half_west(&self) -> Vector3<T> {
        let half = scalar::<T>(0.5);
        let (w, x, y, z) = (self.quaternion.w, self.quaternion.i, self.quaternion.j, self.quaternion.k);
        Vector3::new(x * y + w * z, w * w - half + y * y, y * z - w * x)
    }

    /// Rotate the orientation about the reference Z axis so its yaw becomes
    /// `yaw` radians, keeping roll and pitch.
    pub fn set_yaw(&mut self, yaw: T) {
        let half = scalar::<T>(0.5);
        let q = *self.quaternion.quaternion();
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);

        let current = M::atan2(x * y + w * z, w * w - half + x * x);
        let half_turn = half * (current - yaw);
        let correction = Quaternion::new(M::cos(half_turn), T::zero(), T::zero(), -M::sin(half_turn));
        // Renormalize: approximate sin/cos leave the correction slightly off unit.
        self.quaternion = (correction * q).normalize_unchecked();
    }

    /// Current orientation (body to reference frame).
    pub fn quaternion(&self) -> UnitQuaternion<T> {
        self.quaternion
    }

    /// Seed the orientation.
    pub fn set_quaternion(&mut self, quaternion: UnitQuaternion<T>) {
        self.quaternion = quaternion;
    }

    /// Acceleration minus gravity in g, body frame.
    ///
    /// Gravity is taken from the orientation at the start of the last update,
    /// so the cancellation lags the estimate by one step.
    pub fn linear_acceleration(&self) -> Vector3<T> {
        self.linear_acceleration
    }

    /// Linear acceleration rotated into the reference frame.
    pub fn earth_acceleration(&self) -> Vector3<T> {
        self.quaternion.transform_vector(&self.linear_acceleration)
    }

    /// Unit gravity direction in the body frame implied by the orientation.
    pub fn gravity(&self) -> Vector3<T> {
        self.half_gravity() * (T::one() + T::one())
    }

    pub fn rotation_matrix(&self) -> RotationMatrix<T> {
        RotationMatrix::from_quaternion(&self.quaternion)
    }

    /// Half feedback error applied in the last update, before gain scaling.
    pub fn feedback_error(&self) -> Vector3<T> {
        self.half_feedback_error
    }

    /// Startup gain, decaying from [`INITIAL_GAIN`] to the configured gain
    /// over [`INITIALISATION_PERIOD`] seconds.
    pub fn ramped_gain(&self) -> T {
        self.ramped_gain
    }

    pub fn flags(&self) -> FusionFlags {
        self.flags
    }

    pub fn has_heading(&self) -> bool {
        S::HAS_HEADING
    }

    pub fn settings(&self) -> FusionSettings<T> {
        self.settings
    }

    /// Replace every setting. The gain is stored as given.
    pub fn set_settings(&mut self, settings: FusionSettings<T>) -> Result<()> {
        settings.magnetic_field.validate()?;
        self.settings = settings;
        (self.min_field_squared, self.max_field_squared) = settings.magnetic_field.squared();
        Ok(())
    }

    /// Change the steady-state gain.
    ///
    /// Zero disables feedback entirely and pins the ramped gain to zero. A
    /// negative or NaN gain is clamped to zero.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn set_gain(&mut self, gain: T) {
        if !(gain >= T::zero()) {
            warn!("negative fusion gain {:?}, clamping to zero", gain);
            self.settings.gain = T::zero();
        } else {
            self.settings.gain = gain;
        }
    }

    /// Change the valid magnetic field magnitude range.
    pub fn set_magnetic_field(&mut self, min: T, max: T) -> Result<()> {
        let window = MagneticFieldWindow::new(min, max)?;
        self.settings.magnetic_field = window;
        (self.min_field_squared, self.max_field_squared) = window.squared();
        Ok(())
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn into_sensors(self) -> S {
        self.sensors
    }
}

impl<I: Imu, T: RealField + Copy, M: Transcendental<T>> Fusion<InertialOnly<I>, T, M> {
    /// Filter without a heading source. Yaw is held at zero.
    pub fn inertial(gain: T, imu: I) -> Self {
        let settings = FusionSettings {
            gain,
            ..FusionSettings::default()
        };
        Self::new(settings, InertialOnly(imu))
    }
}

impl<H: ImuHeading, T: RealField + Copy, M: Transcendental<T>> Fusion<WithHeading<H>, T, M> {
    /// Filter with magnetometer feedback.
    pub fn heading(gain: T, imu: H) -> Self {
        let settings = FusionSettings {
            gain,
            ..FusionSettings::default()
        };
        Self::new(settings, WithHeading(imu))
    }
}

impl<S: SensorSet, T: RealField + Copy, M: Transcendental<T>> AttitudeEstimator<T> for Fusion<S, T, M> {
    fn quaternion(&self) -> UnitQuaternion<T> {
        self.quaternion
    }
}

/// Fallible construction of a [`Fusion`] filter.
///
/// # Example
/// ```
/// use attitude_fusion::{Error, FusionAhrs, Imu, InertialOnly};
///
/// struct Level;
///
/// impl Imu for Level {
///     fn acceleration(&mut self) -> [i32; 3] {
///         [0, 0, 1_000_000]
///     }
///     fn angular_velocity(&mut self) -> [i32; 3] {
///         [0, 0, 0]
///     }
/// }
///
/// let missing = FusionAhrs::<InertialOnly<Level>>::builder().gain(0.5).build();
/// assert_eq!(missing.err(), Some(Error::MissingInertialSource));
///
/// let ahrs = FusionAhrs::builder().gain(0.5).inertial(Level).build().unwrap();
/// assert!(!ahrs.has_heading());
/// ```
pub struct FusionBuilder<S, T: RealField + Copy = f64, M = ExactMath> {
    settings: FusionSettings<T>,
    sensors: Option<S>,
    _math: PhantomData<M>,
}

impl<S: SensorSet, T: RealField + Copy, M: Transcendental<T>> FusionBuilder<S, T, M> {
    pub fn new() -> Self {
        Self {
            settings: FusionSettings::default(),
            sensors: None,
            _math: PhantomData,
        }
    }

    pub fn settings(mut self, settings: FusionSettings<T>) -> Self {
        self.settings = settings;
        self
    }

    pub fn gain(mut self, gain: T) -> Self {
        self.settings.gain = gain;
        self
    }

    /// Valid magnetic field magnitude range, checked by [`FusionBuilder::build`].
    pub fn magnetic_field(mut self, min: T, max: T) -> Self {
        self.settings.magnetic_field = MagneticFieldWindow { min, max };
        self
    }

    pub fn ramped_feedback(mut self, enabled: bool) -> Self {
        self.settings.ramped_feedback = enabled;
        self
    }

    pub fn sensors(mut self, sensors: S) -> Self {
        self.sensors = Some(sensors);
        self
    }

    pub fn build(self) -> Result<Fusion<S, T, M>> {
        let sensors = self.sensors.ok_or(Error::MissingInertialSource)?;
        self.settings.magnetic_field.validate()?;
        Ok(Fusion::new(self.settings, sensors))
    }
}

impl<I: Imu, T: RealField + Copy, M: Transcendental<T>> FusionBuilder<InertialOnly<I>, T, M> {
    pub fn inertial(self, imu: I) -> Self {
        self.sensors(InertialOnly(imu))
    }
}

impl<H: ImuHeading, T: RealField + Copy, M: Transcendental<T>> FusionBuilder<WithHeading<H>, T, M> {
    pub fn heading(self, imu: H) -> Self {
        self.sensors(WithHeading(imu))
    }
}

impl<S: SensorSet, T: RealField + Copy, M: Transcendental<T>> Default for FusionBuilder<S, T, M> {
    fn default() -> Self {
        Self::new()
    }
}
