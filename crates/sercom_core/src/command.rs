//! # Outgoing Frame Builder
//!
//! Owns the singleton [`RequestFrame`] and the actuator setter.
//!
//! The frame is written by whichever context decodes remote actuator commands
//! and read by the transceiver at the start of every cycle. Both sides go
//! through a short `parking_lot` lock: the transceiver copies a snapshot under
//! the lock and transmits outside it, so an update can never tear a request
//! that is already on the wire.

use parking_lot::Mutex;

use crate::error::{SercomError, SercomResult};
use crate::protocol::RequestFrame;

/// Bytes in an actuator packet as received from the remote client.
///
/// ```text
///  0   1   2   3   4   5   6    7    8
/// ┌───┬───┬───────┬───────┬────┬────┬────┐
/// │ header│speed A│speed B│LED1│LED3│LED5│
/// └───┴───┴───────┴───────┴────┴────┴────┘
/// ```
pub const ACTUATOR_PACKET_SIZE: usize = 9;

/// Actuator packet with the length guaranteed by its type.
pub type ActuatorPacket = [u8; ACTUATOR_PACKET_SIZE];

/// Decoded actuator command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActuatorCommand {
    /// Motor speed A.
    pub speed_a: i16,
    /// Motor speed B.
    pub speed_b: i16,
    /// LED values (LED1, LED3, LED5).
    pub leds: [u8; 3],
}

impl ActuatorCommand {
    /// Decodes a fixed-size actuator packet.
    #[must_use]
    pub const fn from_packet(packet: &ActuatorPacket) -> Self {
        Self {
            speed_a: i16::from_le_bytes([packet[2], packet[3]]),
            speed_b: i16::from_le_bytes([packet[4], packet[5]]),
            leds: [packet[6], packet[7], packet[8]],
        }
    }

    /// Encodes the command as an actuator packet with a zero header.
    #[must_use]
    pub fn to_packet(&self) -> ActuatorPacket {
        let mut packet = [0u8; ACTUATOR_PACKET_SIZE];
        packet[2..4].copy_from_slice(&self.speed_a.to_le_bytes());
        packet[4..6].copy_from_slice(&self.speed_b.to_le_bytes());
        packet[6..9].copy_from_slice(&self.leds);
        packet
    }
}

impl TryFrom<&[u8]> for ActuatorCommand {
    type Error = SercomError;

    fn try_from(bytes: &[u8]) -> SercomResult<Self> {
        let packet: &ActuatorPacket = bytes
            .get(..ACTUATOR_PACKET_SIZE)
            .and_then(|head| head.try_into().ok())
            .ok_or(SercomError::ShortActuatorPacket {
                required: ACTUATOR_PACKET_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self::from_packet(packet))
    }
}

/// The shared outgoing frame.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug, Default)]
pub struct CommandFrame {
    frame: Mutex<RequestFrame>,
}

impl CommandFrame {
    /// Creates the frame with motors stopped and LEDs off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame: Mutex::new(RequestFrame::new()),
        }
    }

    /// Copies motor speeds and LED values from an actuator packet into the
    /// request. Opcode bytes are never touched.
    pub fn set_actuator_command(&self, packet: &ActuatorPacket) {
        self.apply(&ActuatorCommand::from_packet(packet));
    }

    /// Applies a decoded actuator command.
    pub fn apply(&self, command: &ActuatorCommand) {
        let mut frame = self.frame.lock();
        frame.speed_a = command.speed_a.to_le_bytes();
        frame.speed_b = command.speed_b.to_le_bytes();
        for (led, value) in frame.leds.iter_mut().zip(command.leds) {
            led.value = value;
        }
    }

    /// Returns a copy of the request as it would be transmitted now.
    #[must_use]
    pub fn snapshot(&self) -> RequestFrame {
        *self.frame.lock()
    }
}
