//! Configuration errors

/// Errors raised while configuring a filter or converting into a rotation
/// ordering. Per-sample conditions (an all-zero accelerometer reading, a
/// magnetic field outside its window) are not errors; the filter gates the
/// affected feedback term for that step and carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The filter was built without an inertial sensor source.
    #[error("no inertial sensor source was supplied")]
    MissingInertialSource,
    /// A rotation ordering outside the six Tait-Bryan orderings.
    #[error("unsupported rotation order, expected one of XYZ, YXZ, ZXY, ZYX, YZX, XZY")]
    UnsupportedRotationOrder,
    /// Magnetic field window with a negative bound or `min > max`.
    #[error("invalid magnetic field window, bounds must satisfy 0 <= min <= max")]
    InvalidMagneticFieldWindow,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
