//! Replay a recorded sensor log through the fusion filter
//!
//! Reads `testdata/sensor_log.csv`, runs it through a filter with
//! magnetometer feedback, and plots the estimated Euler angles against the
//! recorded orientation together with the status flags.
//!
//! Run with: `cargo run --example replay`

use attitude_fusion::{AttitudeEstimator, FusionAhrs, FusionSettings, Imu, ImuHeading, MagneticFieldWindow, RotationOrder};
use plotters::prelude::*;
use serde::Deserialize;
use std::error::Error;

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

/// Sensor handing the filter one recorded row at a time.
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

struct Step {
    time: f64,
    estimated: (f64, f64, f64),
    recorded: (f64, f64, f64),
    initialising: bool,
    magnetometer_ignored: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("Replaying recorded sensor log");

    let mut reader = csv::Reader::from_path("testdata/sensor_log.csv")?;
    let mut samples = Vec::new();
    for result in reader.deserialize() {
        let record: Sample = result?;
        samples.push(record);
    }

    let settings = FusionSettings {
        gain: 0.5,
        magnetic_field: MagneticFieldWindow::new(20_000.0, 80_000.0)?,
        ramped_feedback: true,
    };
    let mut ahrs = FusionAhrs::builder().settings(settings).heading(Playback::default()).build()?;

    println!(
        "Filter configured with {:.1} gain, field window {:.0}..{:.0} nT",
        settings.gain, settings.magnetic_field.min, settings.magnetic_field.max
    );
    println!("Processing {} sensor samples...", samples.len());

    let mut steps = Vec::with_capacity(samples.len());
    let mut previous_time = 0.0;

    for (i, sample) in samples.iter().enumerate() {
        ahrs.sensors_mut().0.current = *sample;
        ahrs.update(sample.time_s - previous_time);
        previous_time = sample.time_s;

        let angles = ahrs.euler(RotationOrder::Xyz).to_degrees();
        let flags = ahrs.flags();

        if i % 250 == 0 {
            println!(
                "t={:.2}s orientation=({:.1}°,{:.1}°,{:.1}°) gain={:.2} initialising={} magnetometer_ignored={}",
                sample.time_s,
                angles.q,
                angles.r,
                angles.s,
                ahrs.ramped_gain(),
                flags.initialising,
                flags.magnetometer_ignored
            );
        }

        steps.push(Step {
            time: sample.time_s,
            estimated: (angles.q, angles.r, angles.s),
            recorded: (
                sample.roll_rad.to_degrees(),
                sample.pitch_rad.to_degrees(),
                sample.yaw_rad.to_degrees(),
            ),
            initialising: flags.initialising,
            magnetometer_ignored: flags.magnetometer_ignored,
        });
    }

    create_plots(&steps)?;
    println!("Plots saved to replay_plots.png");

    Ok(())
}

/// Three angle panels (estimated solid, recorded thin) above two flag strips.
fn create_plots(steps: &[Step]) -> Result<(), Box<dyn Error>> {
    let (Some(first), Some(last)) = (steps.first(), steps.last()) else {
        return Ok(());
    };

    let root = BitMapBackend::new("replay_plots.png", (1000, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let (angles_area, flags_area) = root.split_vertically(700);
    let angle_panels = angles_area.split_evenly((3, 1));
    let flag_panels = flags_area.split_evenly((2, 1));
    let time_range = first.time..last.time;

    let series: [(&str, fn(&(f64, f64, f64)) -> f64, RGBColor); 3] = [
        ("Roll", |a| a.0, RED),
        ("Pitch", |a| a.1, GREEN),
        ("Yaw", |a| a.2, BLUE),
    ];

    for (panel, (name, pick, color)) in angle_panels.iter().zip(series) {
        let mut chart = ChartBuilder::on(panel)
            .caption(name, ("sans-serif", 18))
            .margin(5)
            .x_label_area_size(20)
            .y_label_area_size(50)
            .build_cartesian_2d(time_range.clone(), -60f64..60f64)?;

        chart.configure_mesh().y_desc("Degrees").draw()?;

        chart
            .draw_series(LineSeries::new(
                steps.iter().map(|s| (s.time, pick(&s.estimated))),
                color.stroke_width(2),
            ))?
            .label("Estimated")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], color));

        chart
            .draw_series(LineSeries::new(
                steps.iter().map(|s| (s.time, pick(&s.recorded))),
                &BLACK,
            ))?
            .label("Recorded")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLACK));

        chart.configure_series_labels().border_style(BLACK).draw()?;
    }

    let flags: [(&str, fn(&Step) -> bool); 2] = [
        ("Initialising", |s| s.initialising),
        ("Magnetometer ignored", |s| s.magnetometer_ignored),
    ];

    for (panel, (name, pick)) in flag_panels.iter().zip(flags) {
        let mut chart = ChartBuilder::on(panel)
            .caption(name, ("sans-serif", 14))
            .margin(5)
            .x_label_area_size(20)
            .y_label_area_size(50)
            .build_cartesian_2d(time_range.clone(), -0.1f64..1.1f64)?;

        chart.configure_mesh().disable_y_mesh().draw()?;

        chart.draw_series(LineSeries::new(
            steps.iter().map(|s| (s.time, if pick(s) { 1.0 } else { 0.0 })),
            &MAGENTA,
        ))?;
    }

    root.present()?;
    Ok(())
}
