//! # SERCOM Core
//!
//! Double-buffered sensor telemetry over a fixed-frame serial link.
//!
//! A producer thread runs a request/response cycle against a peer
//! microcontroller: send a 23-byte request, read a 104-byte sensor response,
//! publish it into one of two pre-allocated frame slots. A consumer on any
//! other thread picks up the most recent complete frame.
//!
//! ## Architecture Rules
//!
//! 1. **No allocation after init** - Both frame slots are allocated once
//! 2. **Never a torn frame** - Only exact-length, quiet-line responses are published
//! 3. **Lock-free frame access** - Two sticky signals order the slot swap
//!
//! ## Example
//!
//! ```rust,ignore
//! use sercom_core::{link_pair, BridgeConfig, NoAuxInput, SensorBridge};
//!
//! let (link, _peer) = link_pair();
//! let mut bridge = SensorBridge::initialize(link, NoAuxInput, &BridgeConfig::default())?;
//!
//! bridge.set_actuator_command(&[0, 0, 0xE8, 0x03, 0x18, 0xFC, 1, 0, 1]);
//! let frame = bridge.acquire_latest_sensor_frame();
//! println!("button: {}", frame.aux_active());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod input;
pub mod link;
pub mod protocol;
pub mod sim;
pub mod sync;
pub mod transceiver;

pub use bridge::SensorBridge;
pub use command::{ActuatorCommand, ActuatorPacket, CommandFrame, ACTUATOR_PACKET_SIZE};
pub use config::BridgeConfig;
pub use error::{SercomError, SercomResult};
pub use input::{AuxInput, ButtonLine, NoAuxInput};
pub use link::{link_pair, ChannelLink, PeerPort, SerialLink};
#[cfg(feature = "serial")]
pub use link::UartLink;
pub use protocol::{RequestFrame, REQUEST_SIZE, RESPONSE_SIZE, SENSOR_FRAME_SIZE};
pub use sim::{PeerConditions, SimulatedPeer};
pub use sync::{frame_slots, FrameConsumer, FrameProducer, SensorFrame, StickySignal};
pub use transceiver::{LinkState, LinkTiming, ResponseCheck, Transceiver};
