//! # Calibration Benchmarks
//!
//! Measures the transfer function alone and the full set-level path on the
//! simulated board (state check + calibration + channel write).
//!
//! Run: `cargo bench --bench calibration_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pwm_actuator::{ActuatorConfig, ActuatorController, CalibrationParams, LinearCalibration};
use pwm_core::sim::SimBoard;

/// Benchmark transfer function
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration_apply");

    let servo = LinearCalibration::new(CalibrationParams::from_pulse_widths(0.0, 180.0, 0.5, 2.5, 50))
        .expect("servo calibration");
    let led = LinearCalibration::direct(1000).expect("led calibration");

    group.bench_function("servo_in_domain", |b| b.iter(|| black_box(servo.apply(black_box(90.0)))));

    group.bench_function("servo_clamped", |b| b.iter(|| black_box(servo.apply(black_box(270.0)))));

    group.bench_function("led_direct", |b| b.iter(|| black_box(led.apply(black_box(42.0)))));

    group.finish();
}

/// Benchmark transfer table generation
fn bench_transfer_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_table");

    let servo = LinearCalibration::new(CalibrationParams::from_pulse_widths(0.0, 180.0, 0.5, 2.5, 50))
        .expect("servo calibration");

    for step in [1.0, 10.0, 45.0] {
        group.bench_with_input(BenchmarkId::from_parameter(step), &step, |b, &step| {
            b.iter(|| black_box(servo.transfer_table(step)))
        });
    }

    group.finish();
}

/// Benchmark set_level through the controller
fn bench_set_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_set_level");

    let board = SimBoard::new();
    let servo = ActuatorController::initialize(board.pin(17), board.pwm(17), &ActuatorConfig::servo(17))
        .expect("initialize");

    let mut angle = 0.0;
    group.bench_function("servo_sweep", |b| {
        b.iter(|| {
            angle = (angle + 1.0) % 180.0;
            black_box(servo.set_level(angle).expect("set_level"))
        })
    });

    group.bench_function("get_data", |b| b.iter(|| black_box(servo.get_data())));

    group.finish();
    servo.shutdown();
}

criterion_group!(benches, bench_apply, bench_transfer_table, bench_set_level);
criterion_main!(benches);
