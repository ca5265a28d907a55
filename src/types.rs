//! Settings and status types for the fusion filter

use nalgebra::RealField;

use crate::error::{Error, Result};
use crate::math::scalar;

/// Acceptable magnitude range of the magnetic field reading.
///
/// Bounds are in the heading source's unit (nanotesla). Readings whose
/// magnitude falls outside the window are ignored for that update only.
///
/// # Example
/// ```
/// use attitude_fusion::MagneticFieldWindow;
///
/// // Earth's field is roughly 25 to 65 µT.
/// let window = MagneticFieldWindow::new(20_000.0, 80_000.0).unwrap();
/// assert!(window.contains_squared(50_000.0 * 50_000.0));
/// assert!(!window.contains_squared(5_000.0 * 5_000.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagneticFieldWindow<T> {
    pub min: T,
    pub max: T,
}

impl<T: RealField + Copy> MagneticFieldWindow<T> {
    /// Validated window.
    pub fn new(min: T, max: T) -> Result<Self> {
        let window = Self { min, max };
        window.validate()?;
        Ok(window)
    }

    /// Window accepting every reading.
    pub fn unbounded() -> Self {
        Self {
            min: T::zero(),
            max: scalar(1e100),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min >= T::zero() && self.min <= self.max {
            Ok(())
        } else {
            Err(Error::InvalidMagneticFieldWindow)
        }
    }

    /// Squared bounds `(min², max²)`.
    pub fn squared(&self) -> (T, T) {
        (self.min * self.min, self.max * self.max)
    }

    /// Whether a squared field magnitude lies inside the window.
    pub fn contains_squared(&self, norm_squared: T) -> bool {
        let (min, max) = self.squared();
        norm_squared >= min && norm_squared <= max
    }
}

impl<T: RealField + Copy> Default for MagneticFieldWindow<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Fusion filter settings
///
/// # Example
/// ```
/// use attitude_fusion::{FusionSettings, MagneticFieldWindow};
///
/// let settings = FusionSettings {
///     gain: 0.5,
///     magnetic_field: MagneticFieldWindow::new(20_000.0, 80_000.0).unwrap(),
///     ramped_feedback: false,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusionSettings<T> {
    /// Steady-state feedback gain.
    ///
    /// A non-positive value passed at construction is replaced by
    /// [`INITIAL_GAIN`](crate::INITIAL_GAIN). Setting it to zero afterwards
    /// with [`Fusion::set_gain`](crate::Fusion::set_gain) turns the filter
    /// into a pure gyroscope integrator.
    pub gain: T,
    /// Valid magnetic field magnitude range.
    pub magnetic_field: MagneticFieldWindow<T>,
    /// Scale the feedback by the ramped startup gain instead of the
    /// configured gain.
    ///
    /// Off by default: the ramp is tracked (see
    /// [`Fusion::ramped_gain`](crate::Fusion::ramped_gain)) but the feedback
    /// uses the configured gain, which is the reference behavior of this
    /// filter. Turning it on gives the aggressive-then-settling startup the
    /// ramp describes.
    pub ramped_feedback: bool,
}

impl<T: RealField + Copy> Default for FusionSettings<T> {
    fn default() -> Self {
        Self {
            gain: scalar(0.5),
            magnetic_field: MagneticFieldWindow::default(),
            ramped_feedback: false,
        }
    }
}

/// Per-update status of the fusion filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionFlags {
    /// The ramped gain has not yet settled to the configured gain.
    pub initialising: bool,
    /// The last accelerometer reading was all zero and skipped.
    pub accelerometer_ignored: bool,
    /// The last update ran without magnetometer feedback, either because no
    /// heading source is configured or because the reading was outside the
    /// magnetic field window.
    pub magnetometer_ignored: bool,
}
