//! # Producer/Consumer Hand-off
//!
//! ## The Problem
//!
//! ```text
//! Producer (link thread):  WRITE sensor bytes as they arrive
//! Consumer (any thread):   READ the last complete frame
//!
//! Without synchronization: consumer sees half a frame
//! With one lock:           consumer stalls for a whole link cycle
//! ```
//!
//! ## The Solution: Double Buffering + Two Sticky Signals
//!
//! ```text
//! Cycle N:
//!   Producer fills slot A, raises BufferFilled, waits FillNext
//!   Consumer reads slot B (previous frame)
//!
//! acquire_latest():
//!   consume BufferFilled
//!   flip index: A becomes "last completed", B becomes writable and EMPTY
//!   raise FillNext
//! ```
//!
//! No lock is held while a frame is written or read.

mod signal;
mod swap;

pub use signal::StickySignal;
pub use swap::{frame_slots, FrameConsumer, FrameProducer, SensorFrame, SlotState, SLOT_COUNT};

/// The two signals shared by one producer and one consumer.
#[derive(Debug, Default)]
pub struct HandshakeSignals {
    /// Producer -> consumer: the writable slot holds a complete frame.
    pub buffer_filled: StickySignal,
    /// Consumer -> producer: the slots were swapped, fill the writable one.
    pub fill_next: StickySignal,
}

impl HandshakeSignals {
    /// Creates both signals lowered.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer_filled: StickySignal::new(),
            fill_next: StickySignal::new(),
        }
    }
}
