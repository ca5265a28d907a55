//! Tait-Bryan angle extraction in six axis orderings

use core::fmt;
use core::str::FromStr;

use nalgebra::{RealField, Unit, UnitQuaternion, Vector3};

use crate::error::Error;
use crate::math::{RAD_TO_DEG, scalar};
use crate::rotation::RotationMatrix;

/// Magnitude of the `asin` argument above which the extraction treats the
/// configuration as gimbal locked.
pub const GIMBAL_LOCK_THRESHOLD: f64 = 0.9999999;

/// Axis ordering of a Tait-Bryan decomposition.
///
/// The letters name the axes in the order the elementary rotations are
/// applied about the fixed reference axes. `Xyz` is therefore
/// roll-then-pitch-then-yaw, the same decomposition as the aerospace
/// intrinsic Z-Y'-X'' sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RotationOrder {
    Xyz,
    Yxz,
    Zxy,
    Zyx,
    Yzx,
    Xzy,
}

impl RotationOrder {
    /// Every supported ordering.
    pub const ALL: [RotationOrder; 6] = [
        RotationOrder::Xyz,
        RotationOrder::Yxz,
        RotationOrder::Zxy,
        RotationOrder::Zyx,
        RotationOrder::Yzx,
        RotationOrder::Xzy,
    ];

    /// Indices (0 = X, 1 = Y, 2 = Z) of the first, second and third axis.
    pub fn axes(self) -> [usize; 3] {
        match self {
            RotationOrder::Xyz => [0, 1, 2],
            RotationOrder::Yxz => [1, 0, 2],
            RotationOrder::Zxy => [2, 0, 1],
            RotationOrder::Zyx => [2, 1, 0],
            RotationOrder::Yzx => [1, 2, 0],
            RotationOrder::Xzy => [0, 2, 1],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RotationOrder::Xyz => "XYZ",
            RotationOrder::Yxz => "YXZ",
            RotationOrder::Zxy => "ZXY",
            RotationOrder::Zyx => "ZYX",
            RotationOrder::Yzx => "YZX",
            RotationOrder::Xzy => "XZY",
        }
    }
}

impl fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RotationOrder::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(s))
            .ok_or(Error::UnsupportedRotationOrder)
    }
}

impl TryFrom<u8> for RotationOrder {
    type Error = Error;

    /// Numeric codes follow the order of [`RotationOrder::ALL`].
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        RotationOrder::ALL
            .get(code as usize)
            .copied()
            .ok_or(Error::UnsupportedRotationOrder)
    }
}

/// Tait-Bryan angles tagged with the ordering that produced them.
///
/// `q`, `r` and `s` are the angles in radians about the first, second and
/// third axis of [`EulerAngles::order`]. The rotation they describe is
/// `R = R_third(s) · R_second(r) · R_first(q)`, acting on body vectors. For
/// [`RotationOrder::Xyz`] they are roll, pitch and yaw.
///
/// The ordering is part of the value: two triples with equal numbers but
/// different orderings describe different rotations and compare unequal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAngles<T> {
    pub q: T,
    pub r: T,
    pub s: T,
    order: RotationOrder,
}

impl<T: RealField + Copy> EulerAngles<T> {
    pub fn new(q: T, r: T, s: T, order: RotationOrder) -> Self {
        Self { q, r, s, order }
    }

    pub fn order(&self) -> RotationOrder {
        self.order
    }

    /// Extract angles from a rotation matrix.
    ///
    /// The middle angle comes from `asin` of one matrix entry, clamped to
    /// `[-1, 1]`. When that entry's magnitude reaches
    /// [`GIMBAL_LOCK_THRESHOLD`] the first and third axes are aligned; the
    /// third angle is then set to zero and the first is recovered from a
    /// non-singular pair of entries.
    pub fn from_rotation_matrix(matrix: &RotationMatrix<T>, order: RotationOrder) -> Self {
        let m = |row: usize, col: usize| matrix[(row, col)];
        let one = T::one();
        let threshold = scalar::<T>(GIMBAL_LOCK_THRESHOLD);

        // The matrix is the transpose of R, so it decomposes as
        // R_first(-q) · R_second(-r) · R_third(-s). Each arm reads
        // (sin of the middle angle, first angle, third angle, first angle at gimbal lock).
        let (sin_b, regular, locked) = match order {
            RotationOrder::Xyz => (
                m(0, 2),
                ((-m(1, 2), m(2, 2)), (-m(0, 1), m(0, 0))),
                (m(2, 1), m(1, 1)),
            ),
            RotationOrder::Yxz => (
                -m(1, 2),
                ((m(0, 2), m(2, 2)), (m(1, 0), m(1, 1))),
                (-m(2, 0), m(0, 0)),
            ),
            RotationOrder::Zxy => (
                m(2, 1),
                ((-m(0, 1), m(1, 1)), (-m(2, 0), m(2, 2))),
                (m(1, 0), m(0, 0)),
            ),
            RotationOrder::Zyx => (
                -m(2, 0),
                ((m(1, 0), m(0, 0)), (m(2, 1), m(2, 2))),
                (-m(0, 1), m(1, 1)),
            ),
            RotationOrder::Yzx => (
                m(1, 0),
                ((-m(2, 0), m(0, 0)), (-m(1, 2), m(1, 1))),
                (m(0, 2), m(2, 2)),
            ),
            RotationOrder::Xzy => (
                -m(0, 1),
                ((m(2, 1), m(1, 1)), (m(0, 2), m(0, 0))),
                (-m(1, 2), m(2, 2)),
            ),
        };

        let sin_b = sin_b.max(-one).min(one);
        let b = sin_b.asin();
        let (a, c) = if sin_b.abs() < threshold {
            let ((ay, ax), (cy, cx)) = regular;
            (ay.atan2(ax), cy.atan2(cx))
        } else {
            let (ay, ax) = locked;
            (ay.atan2(ax), T::zero())
        };

        // Sign inversion back to the rotation of the quaternion itself.
        Self::new(-a, -b, -c, order)
    }

    /// Roll, pitch and yaw straight from a quaternion, without building the
    /// matrix. Equivalent to extracting [`RotationOrder::Xyz`].
    pub fn roll_pitch_yaw(q: &UnitQuaternion<T>) -> Self {
        let one = T::one();
        let two = one + one;
        let half = one / two;
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        let ww_half = w * w - half;

        let sin_pitch = (two * (w * y - x * z)).max(-one).min(one);
        let pitch = sin_pitch.asin();
        if sin_pitch.abs() < scalar::<T>(GIMBAL_LOCK_THRESHOLD) {
            let roll = (w * x + y * z).atan2(ww_half + z * z);
            let yaw = (w * z + x * y).atan2(ww_half + x * x);
            Self::new(roll, pitch, yaw, RotationOrder::Xyz)
        } else {
            let roll = (w * x - y * z).atan2(ww_half + y * y);
            Self::new(roll, pitch, T::zero(), RotationOrder::Xyz)
        }
    }

    /// Rebuild the orientation these angles describe.
    pub fn to_quaternion(&self) -> UnitQuaternion<T> {
        let [first, second, third] = self.order.axes();
        let rotation = |axis: usize, angle: T| {
            let mut v = Vector3::zeros();
            v[axis] = T::one();
            UnitQuaternion::from_axis_angle(&Unit::new_unchecked(v), angle)
        };
        rotation(third, self.s) * rotation(second, self.r) * rotation(first, self.q)
    }

    /// Same angles in degrees.
    pub fn to_degrees(&self) -> Self {
        let scale = scalar::<T>(RAD_TO_DEG);
        Self::new(self.q * scale, self.r * scale, self.s * scale, self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_order_parsing() {
        assert_eq!("xyz".parse::<RotationOrder>(), Ok(RotationOrder::Xyz));
        assert_eq!("ZYX".parse::<RotationOrder>(), Ok(RotationOrder::Zyx));
        assert_eq!("XYX".parse::<RotationOrder>(), Err(Error::UnsupportedRotationOrder));
        assert_eq!("".parse::<RotationOrder>(), Err(Error::UnsupportedRotationOrder));

        assert_eq!(RotationOrder::try_from(3), Ok(RotationOrder::Zyx));
        assert_eq!(RotationOrder::try_from(6), Err(Error::UnsupportedRotationOrder));

        for order in RotationOrder::ALL {
            assert_eq!(order.as_str().parse::<RotationOrder>(), Ok(order));
        }
    }

    #[test]
    fn test_xyz_matches_nalgebra_euler_angles() {
        let q = UnitQuaternion::from_euler_angles(0.3, -0.6, 2.1);
        let angles = RotationMatrix::from_quaternion(&q).tait_bryan(RotationOrder::Xyz);
        let (roll, pitch, yaw) = q.euler_angles();

        assert_relative_eq!(angles.q, roll, epsilon = 1e-12);
        assert_relative_eq!(angles.r, pitch, epsilon = 1e-12);
        assert_relative_eq!(angles.s, yaw, epsilon = 1e-12);
    }

    #[test]
    fn test_roll_pitch_yaw_matches_matrix_path() {
        let q = UnitQuaternion::from_euler_angles(-1.2, 0.9, -2.8);
        let direct = EulerAngles::roll_pitch_yaw(&q);
        let via_matrix = RotationMatrix::from_quaternion(&q).tait_bryan(RotationOrder::Xyz);

        assert_relative_eq!(direct.q, via_matrix.q, epsilon = 1e-12);
        assert_relative_eq!(direct.r, via_matrix.r, epsilon = 1e-12);
        assert_relative_eq!(direct.s, via_matrix.s, epsilon = 1e-12);
        assert_eq!(direct.order(), RotationOrder::Xyz);
    }

    #[test]
    fn test_gimbal_lock_clamps_and_zeroes_third_angle() {
        // Pitch of exactly +90 degrees with some roll and yaw mixed in.
        let q = UnitQuaternion::from_euler_angles(0.4, core::f64::consts::FRAC_PI_2, 0.1);
        let angles = RotationMatrix::from_quaternion(&q).tait_bryan(RotationOrder::Xyz);

        assert!(angles.q.is_finite() && angles.r.is_finite());
        assert_eq!(angles.s, 0.0);
        assert_relative_eq!(angles.r, core::f64::consts::FRAC_PI_2, epsilon = 1e-3);

        // The fallback still describes the same rotation.
        let rebuilt = angles.to_quaternion();
        assert_relative_eq!(rebuilt.angle_to(&q), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_overshooting_entry_is_clamped() {
        use nalgebra::Matrix3;

        #[rustfmt::skip]
        let matrix = RotationMatrix::from_matrix_unchecked(Matrix3::new(
            0.0f64, 0.0, 1.0 + 1e-9,
            0.0, 1.0, 0.0,
            -1.0, 0.0, 0.0,
        ));
        let angles = matrix.tait_bryan(RotationOrder::Xyz);

        assert!(!angles.r.is_nan());
        assert_relative_eq!(angles.r, -core::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(angles.s, 0.0);
    }

    #[test]
    fn test_order_is_part_of_identity() {
        let a = EulerAngles::new(0.1, 0.2, 0.3, RotationOrder::Xyz);
        let b = EulerAngles::new(0.1, 0.2, 0.3, RotationOrder::Zyx);
        assert_ne!(a, b);
        assert_ne!(a.to_quaternion(), b.to_quaternion());
    }

    #[test]
    fn test_to_degrees() {
        let a = EulerAngles::new(core::f64::consts::PI, 0.0, -core::f64::consts::FRAC_PI_2, RotationOrder::Yzx)
            .to_degrees();
        assert_relative_eq!(a.q, 180.0, epsilon = 1e-12);
        assert_relative_eq!(a.s, -90.0, epsilon = 1e-12);
        assert_eq!(a.order(), RotationOrder::Yzx);
    }
}
