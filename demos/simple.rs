use attitude_fusion::{AttitudeEstimator, FusionAhrs, Imu, RotationOrder};

const SAMPLE_PERIOD: f64 = 0.01; // 10 ms sample period

/// Stand-in for an accelerometer and gyroscope driver.
struct Mpu6050;

impl Imu for Mpu6050 {
    fn acceleration(&mut self) -> [i32; 3] {
        [0, 0, 1_000_000] // replace this with actual accelerometer data in µg
    }

    fn angular_velocity(&mut self) -> [i32; 3] {
        [0, 0, 0] // replace this with actual gyroscope data in µrad/s
    }
}

fn main() {
    let mut ahrs = FusionAhrs::inertial(0.5, Mpu6050);

    for _ in 0..10 {
        // this loop should repeat each time new sensor data is available
        ahrs.update(SAMPLE_PERIOD);

        let angles = ahrs.euler(RotationOrder::Xyz).to_degrees();

        println!("Roll: {:.2}, Pitch: {:.2}, Yaw: {:.2}", angles.q, angles.r, angles.s);
    }
}
