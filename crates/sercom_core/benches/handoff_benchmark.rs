//! # Frame Hand-off Benchmark
//!
//! Measures the cost of one producer/consumer slot swap, with the producer on
//! its own thread, and of the command path the transceiver hits every SEND.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sercom_core::{frame_slots, ActuatorCommand, CommandFrame};
use std::thread;

fn bench_swap(c: &mut Criterion) {
    let (mut producer, mut consumer) = frame_slots().unwrap();

    thread::spawn(move || {
        let mut seq = 0u8;
        loop {
            seq = seq.wrapping_add(1);
            producer.writable().payload_mut().fill(seq);
            producer.publish(seq & 1);
        }
    });

    c.bench_function("acquire_latest_threaded", |b| {
        b.iter(|| {
            let frame = consumer.acquire_latest();
            black_box(frame.payload()[0]);
        });
    });
}

fn bench_command(c: &mut Criterion) {
    let commands = CommandFrame::new();
    let command = ActuatorCommand {
        speed_a: 500,
        speed_b: -500,
        leds: [1, 1, 0],
    };
    let packet = command.to_packet();

    c.bench_function("set_actuator_command", |b| {
        b.iter(|| commands.set_actuator_command(black_box(&packet)));
    });

    c.bench_function("request_snapshot", |b| {
        b.iter(|| black_box(commands.snapshot()));
    });
}

criterion_group!(benches, bench_swap, bench_command);
criterion_main!(benches);
