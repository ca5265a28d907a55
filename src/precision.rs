//! Transcendental function providers
//!
//! The primary filter is generic over a [`Transcendental`] provider so the
//! same algorithm runs either on exact library functions ([`ExactMath`]) or
//! on the cheap rational approximations of [`FastFloat`] ([`FastMath`]) for
//! targets without efficient floating-point transcendental support.
//!
//! Error bounds of the fast approximations, in absolute radians / units:
//!
//! | function | bound |
//! |----------|-------|
//! | `atan2`  | 1e-3 (about 1e-5 in practice) |
//! | `sin`    | 1e-2 (Bhaskara I, about 1.7e-3 in practice) |
//! | `cos`    | 1e-2 |

use core::f64::consts::PI;

use nalgebra::RealField;

/// Source of the transcendental functions the filter calls per update.
pub trait Transcendental<T> {
    /// Four-quadrant arctangent of `y / x`.
    fn atan2(y: T, x: T) -> T;
    fn sin(x: T) -> T;
    fn cos(x: T) -> T;
}

/// Exact library transcendentals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactMath;

impl<T: RealField + Copy> Transcendental<T> for ExactMath {
    #[inline]
    fn atan2(y: T, x: T) -> T {
        y.atan2(x)
    }

    #[inline]
    fn sin(x: T) -> T {
        x.sin()
    }

    #[inline]
    fn cos(x: T) -> T {
        x.cos()
    }
}

/// Reduced-precision transcendentals backed by [`FastFloat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastMath;

impl<T: FastFloat> Transcendental<T> for FastMath {
    #[inline]
    fn atan2(y: T, x: T) -> T {
        y.fast_atan2(x)
    }

    #[inline]
    fn sin(x: T) -> T {
        x.fast_sin()
    }

    #[inline]
    fn cos(x: T) -> T {
        x.fast_cos()
    }
}

/// Branch-light approximations of elementary functions.
pub trait FastFloat: Copy {
    /// Absolute value by clearing the sign bit.
    fn fast_abs(self) -> Self;
    fn fast_min(self, other: Self) -> Self;
    fn fast_max(self, other: Self) -> Self;
    /// Minimax rational approximation of `atan2(self, x)`.
    ///
    /// Returns `0` when both arguments are zero.
    fn fast_atan2(self, x: Self) -> Self;
    /// Bhaskara I's sine approximation after reduction to `[-π, π]`.
    fn fast_sin(self) -> Self;
    /// Bhaskara I's cosine approximation, reflected outside `[-π/2, π/2]`.
    fn fast_cos(self) -> Self;
}

// Coefficients of the odd polynomial atan(a) ≈ a + a·s·(c1 + s·(c2 + s·c3)), s = a².
const ATAN_C1: f64 = -0.327622764;
const ATAN_C2: f64 = 0.15931422;
const ATAN_C3: f64 = -0.0464964749;

macro_rules! impl_fast_float {
    ($t:ty, $sign_mask:expr) => {
        impl FastFloat for $t {
            #[inline]
            fn fast_abs(self) -> Self {
                <$t>::from_bits(self.to_bits() & !$sign_mask)
            }

            #[inline]
            fn fast_min(self, other: Self) -> Self {
                if self < other { self } else { other }
            }

            #[inline]
            fn fast_max(self, other: Self) -> Self {
                if self > other { self } else { other }
            }

            fn fast_atan2(self, x: Self) -> Self {
                const PI_T: $t = PI as $t;
                let y = self;
                let (abs_x, abs_y) = (x.fast_abs(), y.fast_abs());
                let max = abs_x.fast_max(abs_y);
                if max == 0.0 {
                    return 0.0;
                }
                let a = abs_x.fast_min(abs_y) / max;
                let s = a * a;
                let mut r = ((ATAN_C3 as $t * s + ATAN_C2 as $t) * s + ATAN_C1 as $t) * s * a + a;
                if abs_y > abs_x {
                    r = PI_T / 2.0 - r;
                }
                if x < 0.0 {
                    r = PI_T - r;
                }
                if y < 0.0 {
                    r = -r;
                }
                r
            }

            fn fast_sin(self) -> Self {
                const PI_T: $t = PI as $t;
                const TAU_T: $t = (2.0 * PI) as $t;
                let mut x = self;
                if x.fast_abs() > PI_T {
                    // Round-to-nearest number of turns via truncating cast.
                    let turns = x / TAU_T;
                    let half = if turns < 0.0 { -0.5 } else { 0.5 };
                    x -= ((turns + half) as i64) as $t * TAU_T;
                }
                let a = x.fast_abs();
                let p = a * (PI_T - a);
                let sin = 16.0 * p / (5.0 * PI_T * PI_T - 4.0 * p);
                if x < 0.0 { -sin } else { sin }
            }

            fn fast_cos(self) -> Self {
                const PI_T: $t = PI as $t;
                const HALF_PI_T: $t = (PI / 2.0) as $t;
                let a = self.fast_abs();
                if a > HALF_PI_T {
                    // cos(x) = sin(π/2 - |x|)
                    return (HALF_PI_T - a).fast_sin();
                }
                let a2 = a * a;
                (PI_T * PI_T - 4.0 * a2) / (PI_T * PI_T + a2)
            }
        }
    };
}

impl_fast_float!(f32, 0x8000_0000_u32);
impl_fast_float!(f64, 0x8000_0000_0000_0000_u64);
