//! # Double-Buffered Sensor Frames
//!
//! Lock-free hand-off of complete sensor frames from the link thread to the
//! consumer.
//!
//! ## Safety Note
//!
//! This module requires unsafe code for the two shared frame slots.
//! Every unsafe block relies on the ownership protocol described below.

#![allow(unsafe_code)]
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │         FrameSlots          │
//!                    │                             │
//!                    │  ┌─────────┐  ┌─────────┐   │
//!                    │  │ Slot 0  │  │ Slot 1  │   │
//!                    │  └────┬────┘  └────┬────┘   │
//!                    │       │            │        │
//!                    │  ┌────┴────────────┴────┐   │
//!                    │  │ Atomic write index   │   │
//!                    │  └──────────────────────┘   │
//!                    └─────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!      ┌──────────────┐                ┌──────────────┐
//!      │FrameProducer │                │FrameConsumer │
//!      │ (link thread)│                │ (any thread) │
//!      └──────────────┘                └──────────────┘
//! ```
//!
//! ## Ownership Protocol
//!
//! - The producer writes only `slots[write_index]`.
//! - The consumer reads only `slots[write_index ^ 1]`.
//! - Only the consumer moves `write_index`, and only after it has consumed
//!   `BufferFilled` for the writable slot. At that point the producer is parked
//!   in `FillNext` and writes nothing until the consumer raises it.
//! - Neither handle is `Clone`, so there is exactly one of each.

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use super::HandshakeSignals;
use crate::error::{SercomError, SercomResult};
use crate::protocol::{RESPONSE_SIZE, SENSOR_FRAME_SIZE, STATUS_OFFSET};

/// Number of frame slots.
pub const SLOT_COUNT: usize = 2;

/// Fill state of a frame slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Being written, or already handed to the consumer.
    Empty = 0,
    /// Holds a validated frame not yet acquired.
    Filled = 1,
}

impl SlotState {
    #[inline]
    const fn from_u8(value: u8) -> Self {
        if value == Self::Filled as u8 {
            Self::Filled
        } else {
            Self::Empty
        }
    }
}

/// One sensor frame: the peer's response followed by the local status byte.
pub struct SensorFrame {
    bytes: Box<[u8]>,
}

impl SensorFrame {
    /// Allocates a zeroed frame without aborting on allocation failure.
    fn allocate(slot: usize) -> SercomResult<Self> {
        let mut buf = Vec::new();
        if buf.try_reserve_exact(SENSOR_FRAME_SIZE).is_err() {
            tracing::error!(slot, bytes = SENSOR_FRAME_SIZE, "cannot allocate sensor frame slot");
            return Err(SercomError::Allocation {
                slot,
                bytes: SENSOR_FRAME_SIZE,
            });
        }
        buf.resize(SENSOR_FRAME_SIZE, 0);
        Ok(Self {
            bytes: buf.into_boxed_slice(),
        })
    }

    /// The whole frame, [`SENSOR_FRAME_SIZE`] bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The bytes received from the peer, [`RESPONSE_SIZE`] bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[..RESPONSE_SIZE]
    }

    /// The status byte sampled when the frame was validated.
    #[inline]
    #[must_use]
    pub fn status(&self) -> u8 {
        self.bytes[STATUS_OFFSET]
    }

    /// Whether the auxiliary input was active when the frame was validated.
    #[inline]
    #[must_use]
    pub fn aux_active(&self) -> bool {
        self.status() != 0
    }

    /// Receive buffer for the peer's bytes.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..RESPONSE_SIZE]
    }

    #[inline]
    fn set_status(&mut self, status: u8) {
        self.bytes[STATUS_OFFSET] = status;
    }
}

impl fmt::Debug for SensorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorFrame")
            .field("payload_len", &RESPONSE_SIZE)
            .field("status", &self.status())
            .finish()
    }
}

struct Slot {
    frame: UnsafeCell<SensorFrame>,
    state: AtomicU8,
}

impl Slot {
    fn allocate(index: usize) -> SercomResult<Self> {
        Ok(Self {
            frame: UnsafeCell::new(SensorFrame::allocate(index)?),
            state: AtomicU8::new(SlotState::Empty as u8),
        })
    }

    #[inline]
    fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set_state(&self, state: SlotState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// State shared by the two handles.
struct FrameSlots {
    /// The two frame buffers.
    /// Using UnsafeCell because exclusive access is guaranteed by the protocol.
    slots: [Slot; SLOT_COUNT],

    /// Index of the slot the producer writes (0 or 1).
    /// The last completed slot is always (write_index ^ 1).
    write_index: AtomicUsize,

    /// `BufferFilled` and `FillNext`.
    signals: HandshakeSignals,

    /// Completed swaps, for diagnostics.
    swap_count: AtomicU64,
}

// SAFETY: the slots are only reached through FrameProducer and FrameConsumer,
// which never touch the same slot at the same time (see module docs).
unsafe impl Sync for FrameSlots {}

/// Allocates both frame slots and returns the producer and consumer handles.
///
/// Slot 1 starts as the writable slot, slot 0 as the (zeroed) last completed
/// frame. Both start `Empty`.
///
/// # Errors
///
/// Returns [`SercomError::Allocation`] if either slot cannot be allocated.
pub fn frame_slots() -> SercomResult<(FrameProducer, FrameConsumer)> {
    let slots = [Slot::allocate(0)?, Slot::allocate(1)?];
    tracing::info!(bytes = SENSOR_FRAME_SIZE, count = SLOT_COUNT, "sensor frame slots allocated");

    let shared = Arc::new(FrameSlots {
        slots,
        write_index: AtomicUsize::new(1),
        signals: HandshakeSignals::new(),
        swap_count: AtomicU64::new(0),
    });

    Ok((
        FrameProducer {
            shared: Arc::clone(&shared),
        },
        FrameConsumer { shared },
    ))
}

/// Write side, owned by the link thread.
pub struct FrameProducer {
    shared: Arc<FrameSlots>,
}

impl FrameProducer {
    /// Index of the slot currently being written.
    #[inline]
    #[must_use]
    pub fn write_index(&self) -> usize {
        self.shared.write_index.load(Ordering::Acquire)
    }

    /// The slot currently being written.
    ///
    /// Its contents are never visible to the consumer unless the producer
    /// [`publish`](Self::publish)es it, so a partial or misaligned receive can
    /// simply be overwritten by the next cycle.
    #[inline]
    pub fn writable(&mut self) -> &mut SensorFrame {
        let index = self.write_index();
        // SAFETY: the consumer never reads slots[write_index], and cannot move
        // write_index until `publish` raises BufferFilled.
        unsafe { &mut *self.shared.slots[index].frame.get() }
    }

    /// Hands the writable slot to the consumer and waits for the next one.
    ///
    /// Stamps `status` into the frame's final byte, marks the slot `Filled`,
    /// raises `BufferFilled`, then blocks until the consumer raises
    /// `FillNext`. There is no timeout.
    pub fn publish(&mut self, status: u8) {
        let index = self.write_index();
        self.writable().set_status(status);

        let slot = &self.shared.slots[index];
        slot.set_state(SlotState::Filled);
        self.shared.signals.buffer_filled.raise();

        self.shared.signals.fill_next.wait();
    }
}

/// Read side. Exactly one exists; the accessor takes `&mut self`.
pub struct FrameConsumer {
    shared: Arc<FrameSlots>,
}

impl FrameConsumer {
    /// Returns the most recently completed frame, blocking until one exists.
    ///
    /// If the writable slot is still `Empty`, waits for `BufferFilled`.
    /// `BufferFilled` is always consumed here: the producer marks the slot
    /// `Filled` before raising, so a `Filled` slot has exactly one raise
    /// delivered or in flight, and it must not carry over to the next call.
    /// Then the roles of the slots are swapped, the new writable slot is
    /// marked `Empty` and `FillNext` is raised.
    ///
    /// The returned frame is not written again until the next acquire, which
    /// the borrow on `self` enforces. Blocks forever if the peer never
    /// produces a valid frame.
    pub fn acquire_latest(&mut self) -> &SensorFrame {
        let filled = self.shared.write_index.load(Ordering::Acquire);
        if self.shared.slots[filled].state() == SlotState::Empty {
            tracing::trace!(slot = filled, "waiting for a complete sensor frame");
        }
        self.shared.signals.buffer_filled.wait();
        self.swap(filled)
    }

    /// Non-blocking [`acquire_latest`](Self::acquire_latest).
    ///
    /// Returns `None` if no frame has completed since the last acquire.
    pub fn try_acquire_latest(&mut self) -> Option<&SensorFrame> {
        let filled = self.shared.write_index.load(Ordering::Acquire);
        if self.shared.slots[filled].state() == SlotState::Empty {
            return None;
        }
        self.shared.signals.buffer_filled.wait();
        Some(self.swap(filled))
    }

    /// The frame returned by the last acquire, without swapping.
    ///
    /// All zeroes before the first acquire.
    #[must_use]
    pub fn latest(&self) -> &SensorFrame {
        let index = self.last_completed_index();
        // SAFETY: the producer never writes the last completed slot, and the
        // index cannot move while `self` is shared-borrowed.
        unsafe { &*self.shared.slots[index].frame.get() }
    }

    /// Index of the slot returned by the last acquire.
    #[inline]
    #[must_use]
    pub fn last_completed_index(&self) -> usize {
        self.shared.write_index.load(Ordering::Acquire) ^ 1
    }

    /// Number of completed swaps.
    #[inline]
    #[must_use]
    pub fn swap_count(&self) -> u64 {
        self.shared.swap_count.load(Ordering::Relaxed)
    }

    fn swap(&mut self, filled: usize) -> &SensorFrame {
        let writable = filled ^ 1;
        self.shared.write_index.store(writable, Ordering::Release);
        self.shared.slots[writable].set_state(SlotState::Empty);

        let swaps = self.shared.swap_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(slot = filled, swaps, "sensor frame swapped");

        self.shared.signals.fill_next.raise();

        // SAFETY: slots[filled] is now the last completed slot. The producer
        // moves on to slots[writable] and never writes slots[filled] until the
        // next swap, which needs `&mut self` again.
        unsafe { &*self.shared.slots[filled].frame.get() }
    }
}
