//! Common read-out surface of the orientation filters

use nalgebra::{RealField, UnitQuaternion};

use crate::euler::{EulerAngles, RotationOrder};
use crate::rotation::RotationMatrix;

/// An orientation estimate that downstream consumers can convert.
///
/// Consumers only ever receive copies of the estimate.
pub trait AttitudeEstimator<T: RealField + Copy> {
    /// Current orientation, body to reference frame.
    fn quaternion(&self) -> UnitQuaternion<T>;

    fn rotation_matrix(&self) -> RotationMatrix<T> {
        RotationMatrix::from_quaternion(&self.quaternion())
    }

    /// Tait-Bryan angles of the current orientation.
    fn euler(&self, order: RotationOrder) -> EulerAngles<T> {
        self.rotation_matrix().tait_bryan(order)
    }
}
