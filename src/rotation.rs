//! Rotation matrices derived from orientation quaternions

use core::ops::{Index, Mul};

use nalgebra::{Matrix3, RealField, UnitQuaternion, Vector3};

use crate::euler::{EulerAngles, RotationOrder};

/// 3×3 orthonormal rotation matrix derived from an orientation quaternion.
///
/// The matrix maps reference-frame vectors into the body frame, i.e. it is
/// the transpose of the active rotation described by the quaternion. Its
/// third column is the gravity direction seen by the body and its second
/// column is the magnetic west direction, which is what the fusion filter
/// compares its measurements against.
///
/// Values are never mutated in place; compose with [`Mul`] or rebuild from a
/// quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix<T: RealField + Copy> {
    matrix: Matrix3<T>,
}

impl<T: RealField + Copy> RotationMatrix<T> {
    /// Build the matrix from a unit quaternion.
    ///
    /// The input is not renormalized; a non-unit quaternion yields a
    /// non-orthonormal matrix.
    pub fn from_quaternion(q: &UnitQuaternion<T>) -> Self {
        let two = T::one() + T::one();
        let half = T::one() / two;
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);

        let ww = w * w;
        let wx = w * x;
        let wy = w * y;
        let wz = w * z;
        let xy = x * y;
        let xz = x * z;
        let yz = y * z;

        #[rustfmt::skip]
        let matrix = Matrix3::new(
            two * (ww - half + x * x), two * (xy + wz),           two * (xz - wy),
            two * (xy - wz),           two * (ww - half + y * y), two * (yz + wx),
            two * (xz + wy),           two * (yz - wx),           two * (ww - half + z * z),
        );

        Self { matrix }
    }

    /// Wrap an existing matrix. The caller is responsible for orthonormality.
    pub fn from_matrix_unchecked(matrix: Matrix3<T>) -> Self {
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<T> {
        &self.matrix
    }

    /// Inverse rotation.
    pub fn transpose(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
        }
    }

    /// Matrix × vector.
    pub fn mul_vector(&self, v: &Vector3<T>) -> Vector3<T> {
        self.matrix * v
    }

    /// Extract Tait-Bryan angles under the given ordering.
    ///
    /// See [`EulerAngles`] for the meaning of the three angles and the
    /// gimbal-lock fallback.
    pub fn tait_bryan(&self, order: RotationOrder) -> EulerAngles<T> {
        EulerAngles::from_rotation_matrix(self, order)
    }

    /// Alias for [`RotationMatrix::tait_bryan`].
    pub fn euler(&self, order: RotationOrder) -> EulerAngles<T> {
        self.tait_bryan(order)
    }
}

impl<T: RealField + Copy> Default for RotationMatrix<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T: RealField + Copy> From<UnitQuaternion<T>> for RotationMatrix<T> {
    fn from(q: UnitQuaternion<T>) -> Self {
        Self::from_quaternion(&q)
    }
}

impl<T: RealField + Copy> Index<(usize, usize)> for RotationMatrix<T> {
    type Output = T;

    fn index(&self, index: (usize, usize)) -> &T {
        &self.matrix[index]
    }
}

/// Matrix × matrix composition `A * B`.
impl<T: RealField + Copy> Mul for RotationMatrix<T> {
    type Output = RotationMatrix<T>;

    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            matrix: self.matrix * rhs.matrix,
        }
    }
}

impl<T: RealField + Copy> Mul<Vector3<T>> for RotationMatrix<T> {
    type Output = Vector3<T>;

    fn mul(self, rhs: Vector3<T>) -> Self::Output {
        self.mul_vector(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Unit;

    #[test]
    fn test_identity_quaternion() {
        let m = RotationMatrix::from_quaternion(&UnitQuaternion::<f64>::identity());
        assert_relative_eq!(*m.matrix(), Matrix3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn test_matches_transposed_nalgebra_rotation() {
        let axis = Unit::new_normalize(Vector3::new(0.3, -0.5, 0.8));
        let q = UnitQuaternion::from_axis_angle(&axis, 1.1);

        let m = RotationMatrix::from_quaternion(&q);
        let expected = q.to_rotation_matrix().into_inner().transpose();

        assert_relative_eq!(*m.matrix(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_third_column_is_body_gravity() {
        let q = UnitQuaternion::from_euler_angles(0.4, -0.2, 1.3);
        let m = RotationMatrix::from_quaternion(&q);

        let up = m.mul_vector(&Vector3::z());
        assert_relative_eq!(up, q.inverse_transform_vector(&Vector3::z()), epsilon = 1e-12);
        assert_relative_eq!(up, m.matrix().column(2).into_owned(), epsilon = 1e-15);
    }

    #[test]
    fn test_composition() {
        let a = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let b = UnitQuaternion::from_euler_angles(-0.7, 0.5, 2.0);

        // (a * b)^T = b^T * a^T
        let composed = RotationMatrix::from(b) * RotationMatrix::from(a);
        let direct = RotationMatrix::from(a * b);
        assert_relative_eq!(*composed.matrix(), *direct.matrix(), epsilon = 1e-12);

        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_relative_eq!(composed * v, direct.mul_vector(&v), epsilon = 1e-12);
    }

    #[test]
    fn test_orthonormal() {
        let q = UnitQuaternion::from_euler_angles(2.5, -1.0, -0.4);
        let m = RotationMatrix::from_quaternion(&q);
        let product = m * m.transpose();
        assert_relative_eq!(*product.matrix(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(m.matrix().determinant(), 1.0, epsilon = 1e-12);
    }
}
