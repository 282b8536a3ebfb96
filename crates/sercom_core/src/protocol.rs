//! # Wire Protocol
//!
//! Fixed-layout frames exchanged with the peer microcontroller.
//!
//! ## Request (host -> peer), 23 bytes
//!
//! ```text
//!  0   1   2   3   4   5   6   7   8   9  10  11  12  13  14  15  16  17  18  19  20  21  22
//! ┌───┬───┬───┬───┬───┬───┬───┬───┬───┬───────┬───────┬───────────┬───────────┬───────────┬───┐
//! │ A │ N │ O │mic│ b │ g │tof│ sd│ D │speed A│speed B│ L  0  val │ L  2  val │ L  4  val │ 0 │
//! └───┴───┴───┴───┴───┴───┴───┴───┴───┴───────┴───────┴───────────┴───────────┴───────────┴───┘
//! ```
//!
//! Every opcode is sent as the two's complement negation of its command
//! character, which selects the binary variant of the command on the peer.
//!
//! ## Response (peer -> host)
//!
//! Exactly [`RESPONSE_SIZE`] bytes with no length prefix and no checksum.
//! The host appends one status byte of its own, giving [`SENSOR_FRAME_SIZE`].

use bytemuck::{Pod, Zeroable};

/// Bytes the peer sends in answer to one request.
pub const RESPONSE_SIZE: usize = 104;

/// Bytes in a sensor frame slot: the response plus the local status byte.
pub const SENSOR_FRAME_SIZE: usize = RESPONSE_SIZE + 1;

/// Offset of the locally sampled status byte inside a sensor frame.
pub const STATUS_OFFSET: usize = RESPONSE_SIZE;

/// Bytes in a request frame.
pub const REQUEST_SIZE: usize = 23;

/// Binary-mode opcode for a command character.
#[inline]
#[must_use]
pub const fn binary_opcode(command: u8) -> u8 {
    command.wrapping_neg()
}

/// Accelerometer request.
pub const OP_ACCELEROMETER: u8 = binary_opcode(b'A');
/// Proximity sensors request.
pub const OP_PROXIMITY: u8 = binary_opcode(b'N');
/// Ambient light request.
pub const OP_AMBIENT_LIGHT: u8 = binary_opcode(b'O');
/// Microphones request (4 channels).
pub const OP_MICROPHONES: u8 = binary_opcode(0x0C);
/// Raw battery value request.
pub const OP_BATTERY: u8 = binary_opcode(b'b');
/// Raw gyro value request.
pub const OP_GYRO: u8 = binary_opcode(b'g');
/// Time-of-flight distance request.
pub const OP_TIME_OF_FLIGHT: u8 = binary_opcode(0x0D);
/// Storage (micro SD) state request.
pub const OP_STORAGE_STATE: u8 = binary_opcode(0x0E);
/// Set motor speed command.
pub const OP_MOTOR_SPEED: u8 = binary_opcode(b'D');
/// Set LED command.
pub const OP_LED: u8 = binary_opcode(b'L');

/// Sensor request opcodes in wire order (offsets 0..8).
pub const SENSOR_REQUESTS: [u8; 8] = [
    OP_ACCELEROMETER,
    OP_PROXIMITY,
    OP_AMBIENT_LIGHT,
    OP_MICROPHONES,
    OP_BATTERY,
    OP_GYRO,
    OP_TIME_OF_FLIGHT,
    OP_STORAGE_STATE,
];

/// LED indices addressed by the three LED commands.
pub const LED_INDICES: [u8; 3] = [0, 2, 4];

/// Offset of motor speed A (little-endian) in the request.
pub const SPEED_A_OFFSET: usize = 9;
/// Offset of motor speed B (little-endian) in the request.
pub const SPEED_B_OFFSET: usize = 11;
/// Offsets of the three LED value bytes in the request.
pub const LED_VALUE_OFFSETS: [usize; 3] = [15, 18, 21];

/// One LED command triplet.
///
/// Size: 3 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct LedCommand {
    /// Always [`OP_LED`].
    pub opcode: u8,
    /// LED index on the peer.
    pub index: u8,
    /// LED value.
    pub value: u8,
}

/// Request frame sent at the start of every cycle.
///
/// Holds the fixed sensor requests plus the mutable actuator fields. The
/// struct is `Pod` with byte-aligned fields only, so its memory image is the
/// wire image.
///
/// Size: 23 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RequestFrame {
    /// Sensor request opcodes.
    pub sensor_requests: [u8; 8],
    /// Always [`OP_MOTOR_SPEED`].
    pub motor_opcode: u8,
    /// Motor speed A, little-endian.
    pub speed_a: [u8; 2],
    /// Motor speed B, little-endian.
    pub speed_b: [u8; 2],
    /// LED commands.
    pub leds: [LedCommand; 3],
    /// Terminator, always 0.
    pub terminator: u8,
}

const _: () = assert!(core::mem::size_of::<RequestFrame>() == REQUEST_SIZE);

impl RequestFrame {
    /// Size of the frame in bytes.
    pub const SIZE: usize = REQUEST_SIZE;

    /// Creates a request with motors stopped and LEDs off.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sensor_requests: SENSOR_REQUESTS,
            motor_opcode: OP_MOTOR_SPEED,
            speed_a: [0; 2],
            speed_b: [0; 2],
            leds: [
                LedCommand { opcode: OP_LED, index: LED_INDICES[0], value: 0 },
                LedCommand { opcode: OP_LED, index: LED_INDICES[1], value: 0 },
                LedCommand { opcode: OP_LED, index: LED_INDICES[2], value: 0 },
            ],
            terminator: 0,
        }
    }

    /// Wire bytes of the frame.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Motor speed A.
    #[inline]
    #[must_use]
    pub const fn speed_a(&self) -> i16 {
        i16::from_le_bytes(self.speed_a)
    }

    /// Motor speed B.
    #[inline]
    #[must_use]
    pub const fn speed_b(&self) -> i16 {
        i16::from_le_bytes(self.speed_b)
    }

    /// LED values in command order.
    #[inline]
    #[must_use]
    pub const fn led_values(&self) -> [u8; 3] {
        [self.leds[0].value, self.leds[1].value, self.leds[2].value]
    }

    /// Reinterprets wire bytes as a request frame.
    ///
    /// Returns `None` if `bytes` is not exactly [`REQUEST_SIZE`] long.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }
}

impl Default for RequestFrame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes_are_negated_characters() {
        assert_eq!(OP_ACCELEROMETER, 0xBF);
        assert_eq!(OP_PROXIMITY, 0xB2);
        assert_eq!(OP_MICROPHONES, 0xF4);
        assert_eq!(OP_MOTOR_SPEED, 0xBC);
        assert_eq!(OP_LED, 0xB4);
        assert_eq!(binary_opcode(0), 0);
    }

    #[test]
    fn test_request_wire_layout() {
        let frame = RequestFrame::new();
        let bytes = frame.as_bytes();

        assert_eq!(bytes.len(), REQUEST_SIZE);
        assert_eq!(&bytes[..8], &SENSOR_REQUESTS);
        assert_eq!(bytes[8], OP_MOTOR_SPEED);
        assert_eq!(&bytes[SPEED_A_OFFSET..SPEED_A_OFFSET + 2], &[0, 0]);
        assert_eq!(&bytes[SPEED_B_OFFSET..SPEED_B_OFFSET + 2], &[0, 0]);
        assert_eq!(&bytes[13..16], &[OP_LED, 0, 0]);
        assert_eq!(&bytes[16..19], &[OP_LED, 2, 0]);
        assert_eq!(&bytes[19..22], &[OP_LED, 4, 0]);
        assert_eq!(bytes[22], 0);
    }

    #[test]
    fn test_led_value_offsets_match_layout() {
        let mut frame = RequestFrame::new();
        frame.leds[0].value = 1;
        frame.leds[1].value = 2;
        frame.leds[2].value = 3;

        let bytes = frame.as_bytes();
        for (i, offset) in LED_VALUE_OFFSETS.iter().enumerate() {
            assert_eq!(usize::from(bytes[*offset]), i + 1);
        }
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        assert!(RequestFrame::from_bytes(&[0u8; REQUEST_SIZE - 1]).is_none());

        let frame = RequestFrame::new();
        assert_eq!(RequestFrame::from_bytes(frame.as_bytes()), Some(frame));
    }
}
