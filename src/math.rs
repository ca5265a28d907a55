//! Vector and quaternion algebra on top of nalgebra
//!
//! The filters only need a handful of operations beyond what nalgebra
//! already provides: multiplying a quaternion by a pure-vector quaternion
//! (the kinematic integration step), and normalizations whose zero-norm
//! precondition is stated at the call site instead of being re-checked.

use nalgebra::{Quaternion, RealField, UnitQuaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;
pub const RAD_TO_DEG: f64 = 180.0 / core::f64::consts::PI;

/// Converts an `f64` constant into the filter scalar.
#[inline]
pub(crate) fn scalar<T: RealField + Copy>(value: f64) -> T {
    nalgebra::convert(value)
}

/// Extension trait for Vector3 operations
pub trait Vector3Ext<T> {
    /// Divide the vector by its norm.
    ///
    /// Precondition: the vector is non-zero. A zero vector yields NaN
    /// components; callers guard the vectors that can legitimately be zero.
    fn normalize_unchecked(&self) -> Vector3<T>;

    /// Normalize the vector, returning zero vector if magnitude is zero
    fn safe_normalize(&self) -> Vector3<T>;

    /// True when all three components are exactly zero.
    fn is_exactly_zero(&self) -> bool;
}

impl<T: RealField + Copy> Vector3Ext<T> for Vector3<T> {
    fn normalize_unchecked(&self) -> Vector3<T> {
        *self / self.norm()
    }

    fn safe_normalize(&self) -> Vector3<T> {
        let mag = self.norm();
        if mag > T::zero() {
            *self / mag
        } else {
            Vector3::zeros()
        }
    }

    fn is_exactly_zero(&self) -> bool {
        self.x == T::zero() && self.y == T::zero() && self.z == T::zero()
    }
}

/// Extension trait for quaternion operations used by the filters
pub trait QuaternionExt<T> {
    /// Product `self ⊗ (0, v)` of a quaternion with a pure-vector quaternion.
    fn mul_vector(&self, v: &Vector3<T>) -> Quaternion<T>;

    /// Divide all four components by the Euclidean norm.
    ///
    /// Precondition: the quaternion is non-zero. The filters only call this
    /// on their own state right after a small first-order step away from a
    /// unit quaternion, which cannot reach zero.
    fn normalize_unchecked(&self) -> UnitQuaternion<T>;
}

impl<T: RealField + Copy> QuaternionExt<T> for Quaternion<T> {
    fn mul_vector(&self, v: &Vector3<T>) -> Quaternion<T> {
        let (w, x, y, z) = (self.w, self.i, self.j, self.k);
        Quaternion::new(
            -x * v.x - y * v.y - z * v.z,
            w * v.x + y * v.z - z * v.y,
            w * v.y - x * v.z + z * v.x,
            w * v.z + x * v.y - y * v.x,
        )
    }

    fn normalize_unchecked(&self) -> UnitQuaternion<T> {
        let recip = T::one() / self.norm();
        UnitQuaternion::new_unchecked(*self * recip)
    }
}

/// Converts three raw sensor counts to a vector, scaling each by `scale`.
pub(crate) fn scaled_vector<T: RealField + Copy>(scale: T, raw: [i32; 3]) -> Vector3<T> {
    Vector3::new(
        scale * scalar::<T>(raw[0] as f64),
        scale * scalar::<T>(raw[1] as f64),
        scale * scalar::<T>(raw[2] as f64),
    )
}
