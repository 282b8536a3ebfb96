//! End-to-end tests for the sensor bridge over an in-memory link.

use sercom_core::sim::{payload_for, sequence_of};
use sercom_core::{
    link_pair, ActuatorCommand, BridgeConfig, ButtonLine, NoAuxInput, PeerConditions,
    RequestFrame, SensorBridge, SimulatedPeer, RESPONSE_SIZE,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn test_config() -> BridgeConfig {
    BridgeConfig {
        response_timeout_ms: 200,
        drain_timeout_ms: 5,
        ..BridgeConfig::default()
    }
}

#[test]
fn test_valid_cycle_returns_payload_and_status() {
    let (link, port) = link_pair();
    let button = ButtonLine::new();
    button.press();
    let mut bridge = SensorBridge::initialize(link, button, &test_config()).unwrap();

    let payload: Vec<u8> = (0x00..=0x67).collect();
    port.next_request().unwrap();
    assert!(port.send(&payload));

    let frame = bridge.acquire_latest_sensor_frame();
    assert_eq!(frame.as_bytes().len(), RESPONSE_SIZE + 1);
    assert_eq!(&frame.as_bytes()[..RESPONSE_SIZE], payload.as_slice());
    assert_eq!(frame.as_bytes()[RESPONSE_SIZE], 1);
}

#[test]
fn test_consecutive_cycles_neither_repeat_nor_skip() {
    let (link, port) = link_pair();
    let mut bridge = SensorBridge::initialize(link, NoAuxInput, &test_config()).unwrap();

    port.next_request().unwrap();
    assert!(port.send(&payload_for(1)));
    assert_eq!(
        sequence_of(bridge.acquire_latest_sensor_frame().payload()),
        Some(1)
    );

    port.next_request().unwrap();
    assert!(port.send(&payload_for(2)));
    assert_eq!(
        sequence_of(bridge.acquire_latest_sensor_frame().payload()),
        Some(2)
    );
    assert_eq!(bridge.frames_acquired(), 2);
}

#[test]
fn test_clean_link_delivers_frames_in_order() {
    let (link, port) = link_pair();
    let _peer = SimulatedPeer::spawn(port, PeerConditions::clean());
    let mut bridge = SensorBridge::initialize(link, NoAuxInput, &test_config()).unwrap();

    let mut last = 0;
    for _ in 0..5 {
        let frame = bridge.acquire_latest_sensor_frame();
        assert_eq!(frame.payload().len(), RESPONSE_SIZE);
        assert_eq!(frame.status(), 0);

        let seq = sequence_of(frame.payload()).unwrap();
        assert_eq!(frame.payload(), payload_for(seq).as_slice());
        assert!(seq > last, "sequence went from {last} to {seq}");
        last = seq;
    }
    assert_eq!(bridge.frames_acquired(), 5);
}

#[test]
fn test_acquire_blocks_until_first_valid_frame() {
    let (link, port) = link_pair();
    let answered = Arc::new(AtomicBool::new(false));
    let answered_by_peer = Arc::clone(&answered);

    let config = BridgeConfig {
        response_timeout_ms: 20,
        ..test_config()
    };
    let mut bridge = SensorBridge::initialize(link, NoAuxInput, &config).unwrap();

    // Stay silent for three requests, then answer the fourth.
    thread::spawn(move || {
        for _ in 0..3 {
            port.next_request().unwrap();
        }
        port.next_request().unwrap();
        answered_by_peer.store(true, Ordering::Release);
        port.send(&payload_for(4));
        // Keep the port open.
        while port.next_request().is_some() {}
    });

    assert!(bridge.try_acquire_latest_sensor_frame().is_none());

    let frame = bridge.acquire_latest_sensor_frame();
    assert!(answered.load(Ordering::Acquire));
    assert_eq!(sequence_of(frame.payload()), Some(4));
}

#[test]
fn test_overrun_cycle_is_discarded() {
    let (link, port) = link_pair();
    let mut bridge = SensorBridge::initialize(link, NoAuxInput, &test_config()).unwrap();

    port.next_request().unwrap();
    assert!(port.send(&payload_for(1)));
    let first = bridge.acquire_latest_sensor_frame();
    assert_eq!(sequence_of(first.payload()), Some(1));

    // Full response plus three stray bytes.
    port.next_request().unwrap();
    let mut overrun = payload_for(2).to_vec();
    overrun.extend_from_slice(&[0xEE; 3]);
    assert!(port.send(&overrun));

    // A third request only comes if the second cycle was not published.
    assert!(port.recv_request(Duration::from_secs(2)).is_some());
    assert!(bridge.try_acquire_latest_sensor_frame().is_none());
    assert_eq!(sequence_of(bridge.latest().payload()), Some(1));

    assert!(port.send(&payload_for(3)));
    let third = bridge.acquire_latest_sensor_frame();
    assert_eq!(third.payload(), payload_for(3).as_slice());
    assert_eq!(bridge.frames_acquired(), 2);
}

#[test]
fn test_short_response_is_retried() {
    let (link, port) = link_pair();
    let mut bridge = SensorBridge::initialize(link, NoAuxInput, &test_config()).unwrap();

    port.next_request().unwrap();
    assert!(port.send(&payload_for(1)[..40]));

    port.next_request().unwrap();
    assert!(port.send(&payload_for(2)));

    let frame = bridge.acquire_latest_sensor_frame();
    assert_eq!(sequence_of(frame.payload()), Some(2));
    assert_eq!(bridge.frames_acquired(), 1);
}

#[test]
fn test_faulty_peer_never_delivers_overrun_frames() {
    let (link, port) = link_pair();
    let conditions = PeerConditions {
        overrun_every: 2,
        short_every: 5,
        extra_bytes: 7,
    };
    let _peer = SimulatedPeer::spawn(port, conditions);
    let mut bridge = SensorBridge::initialize(link, NoAuxInput, &test_config()).unwrap();

    for _ in 0..6 {
        let frame = bridge.acquire_latest_sensor_frame();
        let seq = sequence_of(frame.payload()).unwrap();
        assert_eq!(seq % 2, 1, "overrun frame {seq} was delivered");
        assert_ne!(seq % 5, 0, "short frame {seq} was delivered");
        assert_eq!(frame.payload(), payload_for(seq).as_slice());
    }
}

#[test]
fn test_actuator_command_reaches_peer() {
    let (link, port) = link_pair();
    let peer = SimulatedPeer::spawn(port, PeerConditions::clean());
    let mut bridge = SensorBridge::initialize(link, NoAuxInput, &test_config()).unwrap();

    let command = ActuatorCommand {
        speed_a: 1000,
        speed_b: -1000,
        leds: [1, 0, 1],
    };
    bridge.set_actuator_command(&command.to_packet());

    // The second acquire waits on a request sent after the update.
    bridge.acquire_latest_sensor_frame();
    bridge.acquire_latest_sensor_frame();

    let request = peer.last_request().unwrap();
    assert_eq!(request.speed_a(), 1000);
    assert_eq!(request.speed_b(), -1000);
    assert_eq!(request.led_values(), [1, 0, 1]);
    assert_eq!(request.sensor_requests, RequestFrame::new().sensor_requests);
}

#[test]
fn test_button_state_is_stamped() {
    let (link, port) = link_pair();
    let _peer = SimulatedPeer::spawn(port, PeerConditions::clean());
    let button = ButtonLine::new();
    let mut bridge = SensorBridge::initialize(link, button.clone(), &test_config()).unwrap();

    // The producer may already have sampled the line for the next frame.
    bridge.acquire_latest_sensor_frame();
    button.press();
    bridge.acquire_latest_sensor_frame();
    assert!(bridge.acquire_latest_sensor_frame().aux_active());

    button.release();
    bridge.acquire_latest_sensor_frame();
    let frame = bridge.acquire_latest_sensor_frame();
    assert!(!frame.aux_active());
    assert_eq!(frame.status(), 0);
}
