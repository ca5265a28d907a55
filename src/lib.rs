#![cfg_attr(not(test), no_std)]

//! Attitude fusion - orientation estimation from inertial and magnetic sensors
//!
//! Fuses gyroscope, accelerometer and, when available, magnetometer readings
//! into an orientation quaternion with a complementary filter. The gyroscope
//! is integrated every step and the result is pulled toward the measured
//! gravity direction (and magnetic west, with a heading source) by a
//! proportional feedback term.
//!
//! # Features
//!
//! - Complementary filter with a startup gain ramp
//! - Magnetometer feedback gated by a configurable field magnitude window
//! - Compile-time sensor capability sets: without a magnetometer yaw is held at zero
//! - Double precision with exact math, or single precision with fast approximations
//! - Tait-Bryan angle extraction for all six rotation orders, with gimbal-lock handling
//! - Gradient-descent (Madgwick) filter behind the same read-out trait
//! - `#![no_std]` compatible for embedded systems
//!
//! # Quick Start
//!
//! ```rust
//! use attitude_fusion::{AttitudeEstimator, FusionAhrs, Imu, ImuHeading, RotationOrder};
//!
//! struct Mpu9250;
//!
//! impl Imu for Mpu9250 {
//!     fn acceleration(&mut self) -> [i32; 3] {
//!         [0, 0, 1_000_000] // µg
//!     }
//!     fn angular_velocity(&mut self) -> [i32; 3] {
//!         [0, 0, 10_000] // µrad/s
//!     }
//! }
//!
//! impl ImuHeading for Mpu9250 {
//!     fn north(&mut self) -> [i32; 3] {
//!         [20_000, 0, -40_000] // nT
//!     }
//! }
//!
//! let mut ahrs = FusionAhrs::heading(0.5, Mpu9250);
//!
//! // Update at 100 Hz
//! ahrs.update(0.01);
//!
//! let quaternion = ahrs.quaternion();
//! let angles = ahrs.euler(RotationOrder::Xyz).to_degrees();
//! println!("roll {} pitch {} yaw {}", angles.q, angles.r, angles.s);
//! # assert!((quaternion.norm() - 1.0).abs() < 1e-12);
//! ```

mod ahrs;
mod error;
mod estimator;
mod euler;
mod madgwick;
mod math;
mod precision;
mod rotation;
mod sensor;
mod types;

pub use ahrs::{Fusion, FusionAhrs, FusionAhrs32, FusionBuilder, INITIAL_GAIN, INITIALISATION_PERIOD};
pub use error::{Error, Result};
pub use estimator::AttitudeEstimator;
pub use euler::{EulerAngles, GIMBAL_LOCK_THRESHOLD, RotationOrder};
pub use madgwick::Madgwick;
pub use math::{DEG_TO_RAD, QuaternionExt, RAD_TO_DEG, Vector3Ext};
pub use precision::{ExactMath, FastFloat, FastMath, Transcendental};
pub use rotation::RotationMatrix;
pub use sensor::{Imu, ImuHeading, InertialOnly, MICRO_G_TO_G, MICRO_RAD_TO_RAD, Reading, SensorSet, WithHeading};
pub use types::{FusionFlags, FusionSettings, MagneticFieldWindow};
