use std::error::Error;
use std::f64::consts::PI;

use attitude_fusion::{AttitudeEstimator, Fusion, FusionSettings, Imu, ImuHeading, MagneticFieldWindow, RotationOrder};
use attitude_fusion::{ExactMath, FastMath, SensorSet, Transcendental, WithHeading};
use nalgebra::{RealField, convert};
use serde::Deserialize;

/// One row of `testdata/sensor_log.csv`, produced by
/// `testdata/generate_sensor_log.py`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct Sample {
    time_s: f64,
    accel_x_ug: i32,
    accel_y_ug: i32,
    accel_z_ug: i32,
    gyro_x_urad_s: i32,
    gyro_y_urad_s: i32,
    gyro_z_urad_s: i32,
    mag_x_nt: i32,
    mag_y_nt: i32,
    mag_z_nt: i32,
    roll_rad: f64,
    pitch_rad: f64,
    yaw_rad: f64,
}

/// Sensor replaying the current row of a recording.
#[derive(Debug, Default)]
struct Playback {
    current: Sample,
}

impl Imu for Playback {
    fn acceleration(&mut self) -> [i32; 3] {
        [self.current.accel_x_ug, self.current.accel_y_ug, self.current.accel_z_ug]
    }

    fn angular_velocity(&mut self) -> [i32; 3] {
        [self.current.gyro_x_urad_s, self.current.gyro_y_urad_s, self.current.gyro_z_urad_s]
    }
}

impl ImuHeading for Playback {
    fn north(&mut self) -> [i32; 3] {
        [self.current.mag_x_nt, self.current.mag_y_nt, self.current.mag_z_nt]
    }
}

fn load_samples() -> Result<Vec<Sample>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path("testdata/sensor_log.csv")?;
    let mut samples = Vec::new();
    for result in reader.deserialize() {
        samples.push(result?);
    }
    Ok(samples)
}

fn wrap(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

#[derive(Debug, Default)]
struct ReplayStats {
    /// Largest angle error once the filter has settled (t > 5 s).
    settled_max_error: f64,
    settled_squared_error: f64,
    settled_count: usize,
    magnetometer_ignored: usize,
    max_yaw: f64,
}

impl ReplayStats {
    fn rms(&self) -> f64 {
        (self.settled_squared_error / self.settled_count as f64).sqrt()
    }
}

/// Replay the recording, comparing roll and pitch (and yaw with a heading
/// source) against the recorded orientation.
fn replay<S, T, M>(ahrs: &mut Fusion<S, T, M>, samples: &[Sample], current: fn(&mut S) -> &mut Sample) -> ReplayStats
where
    S: SensorSet,
    T: RealField + Copy + Into<f64>,
    M: Transcendental<T>,
{
    let mut stats = ReplayStats::default();
    let mut previous_time = 0.0;

    for sample in samples {
        *current(ahrs.sensors_mut()) = *sample;
        ahrs.update(convert(sample.time_s - previous_time));
        previous_time = sample.time_s;

        if ahrs.flags().magnetometer_ignored {
            stats.magnetometer_ignored += 1;
        }

        let angles = ahrs.euler(RotationOrder::Xyz);
        let (roll, pitch, yaw): (f64, f64, f64) = (angles.q.into(), angles.r.into(), angles.s.into());
        stats.max_yaw = stats.max_yaw.max(yaw.abs());

        let mut error = wrap(roll - sample.roll_rad).abs().max(wrap(pitch - sample.pitch_rad).abs());
        if ahrs.has_heading() {
            error = error.max(wrap(yaw - sample.yaw_rad).abs());
        }
        if sample.time_s > 5.0 {
            stats.settled_max_error = stats.settled_max_error.max(error);
            stats.settled_squared_error += error * error;
            stats.settled_count += 1;
        }
    }

    stats
}

fn heading_settings<T: RealField + Copy>(ramped_feedback: bool) -> FusionSettings<T> {
    FusionSettings {
        gain: convert(0.5),
        magnetic_field: MagneticFieldWindow {
            min: convert(20_000.0),
            max: convert(80_000.0),
        },
        ramped_feedback,
    }
}

/// Test that the filter tracks a recorded swaying motion with magnetometer
/// feedback and rides out the magnetic disturbance
#[test]
fn test_replay_with_heading() -> Result<(), Box<dyn Error>> {
    let samples = load_samples()?;
    assert_eq!(samples.len(), 1500);

    let mut ahrs: Fusion<_, f64, ExactMath> = Fusion::new(heading_settings(false), WithHeading(Playback::default()));
    let stats = replay(&mut ahrs, &samples, |sensors| &mut sensors.0.current);

    // 50 Hz for the one second the field is tripled.
    assert_eq!(stats.magnetometer_ignored, 50);
    assert!(stats.settled_max_error < 0.02, "max error {}", stats.settled_max_error);
    assert!(stats.rms() < 0.01, "rms error {}", stats.rms());
    Ok(())
}

/// Test that ramped feedback settles at least as well as the plain gain
#[test]
fn test_replay_with_ramped_feedback() -> Result<(), Box<dyn Error>> {
    let samples = load_samples()?;

    let mut plain: Fusion<_, f64, ExactMath> = Fusion::new(heading_settings(false), WithHeading(Playback::default()));
    let mut ramped: Fusion<_, f64, ExactMath> = Fusion::new(heading_settings(true), WithHeading(Playback::default()));
    let plain = replay(&mut plain, &samples, |sensors| &mut sensors.0.current);
    let ramped = replay(&mut ramped, &samples, |sensors| &mut sensors.0.current);

    assert!(ramped.settled_max_error < 0.02);
    assert!(ramped.rms() <= plain.rms());
    Ok(())
}

/// Test the single precision fast path on the same recording
#[test]
fn test_replay_single_precision() -> Result<(), Box<dyn Error>> {
    let samples = load_samples()?;

    let mut ahrs: Fusion<_, f32, FastMath> = Fusion::new(heading_settings(false), WithHeading(Playback::default()));
    let stats = replay(&mut ahrs, &samples, |sensors| &mut sensors.0.current);

    assert_eq!(stats.magnetometer_ignored, 50);
    assert!(stats.settled_max_error < 0.02, "max error {}", stats.settled_max_error);
    Ok(())
}

/// Test that without a heading source roll and pitch still track while yaw
/// stays at zero
#[test]
fn test_replay_without_heading() -> Result<(), Box<dyn Error>> {
    let samples = load_samples()?;

    let mut ahrs: Fusion<_, f64, ExactMath> = Fusion::inertial(0.5, Playback::default());
    let stats = replay(&mut ahrs, &samples, |sensors| &mut sensors.0.current);

    assert_eq!(stats.magnetometer_ignored, samples.len());
    assert!(stats.settled_max_error < 0.02, "max error {}", stats.settled_max_error);
    assert!(stats.max_yaw < 1e-9);
    Ok(())
}
