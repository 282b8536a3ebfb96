//! # Serial Transceiver
//!
//! The request/response state machine that drives the link.
//!
//! ## States
//!
//! - **SEND**: transmit the request frame, wait until it has left the UART.
//! - **RECEIVE**: read one response into the writable slot, flush any excess
//!   bytes, and publish the slot if the response was exactly the right length.
//!
//! ```text
//!        ┌──────────────────────────────────────────────┐
//!        ▼                                              │
//!   ┌────────┐  tx done  ┌─────────┐  valid: publish,   │
//!   │  SEND  │──────────▶│ RECEIVE │  wait FillNext ────┤
//!   └────────┘           └─────────┘                    │
//!                             │  short / overrun:       │
//!                             └── discard ──────────────┘
//! ```
//!
//! ## Resynchronization
//!
//! The protocol has no length prefix and no checksum. The only way to stay
//! aligned is to demand exactly [`RESPONSE_SIZE`] bytes and then drain the
//! line until it is quiet for one `T2` period. A cycle that drained anything
//! is discarded, because the excess may belong to either frame.
//!
//! Invalid cycles are retried forever with no backoff. A peer that never
//! answers correctly starves the consumer, but nothing breaks.

use std::sync::Arc;
use std::time::Duration;

use crate::command::CommandFrame;
use crate::config::BridgeConfig;
use crate::input::AuxInput;
use crate::link::SerialLink;
use crate::protocol::RESPONSE_SIZE;
use crate::sync::FrameProducer;

/// Transceiver state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// Transmit the request.
    Send,
    /// Receive and validate the response.
    Receive,
}

/// Link timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkTiming {
    /// `T1`: time allowed for the full response.
    pub response_timeout: Duration,
    /// `T2`: time allowed per drained byte.
    pub drain_timeout: Duration,
}

impl LinkTiming {
    /// Timing taken from a bridge configuration.
    #[must_use]
    pub const fn from_config(config: &BridgeConfig) -> Self {
        Self {
            response_timeout: config.response_timeout(),
            drain_timeout: config.drain_timeout(),
        }
    }
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

/// Result of one RECEIVE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseCheck {
    /// Exactly [`RESPONSE_SIZE`] bytes and a quiet line afterwards.
    Complete,
    /// Fewer bytes than expected arrived within `T1`.
    Short {
        /// Bytes read in the response window.
        received: usize,
        /// Bytes drained afterwards.
        drained: usize,
    },
    /// The full response arrived but more bytes followed.
    Overrun {
        /// Bytes drained after the response.
        drained: usize,
    },
}

impl ResponseCheck {
    /// Classifies a receive from its byte counts.
    #[must_use]
    pub const fn classify(received: usize, drained: usize) -> Self {
        if received != RESPONSE_SIZE {
            Self::Short { received, drained }
        } else if drained != 0 {
            Self::Overrun { drained }
        } else {
            Self::Complete
        }
    }

    /// Whether the frame may be published.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Drives the link and fills the producer side of the frame slots.
pub struct Transceiver<L, A> {
    link: L,
    aux: A,
    commands: Arc<CommandFrame>,
    producer: FrameProducer,
    timing: LinkTiming,
    state: LinkState,
}

impl<L: SerialLink, A: AuxInput> Transceiver<L, A> {
    /// Creates a transceiver in the `Send` state.
    #[must_use]
    pub fn new(
        link: L,
        aux: A,
        commands: Arc<CommandFrame>,
        producer: FrameProducer,
        timing: LinkTiming,
    ) -> Self {
        Self {
            link,
            aux,
            commands,
            producer,
            timing,
            state: LinkState::Send,
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LinkState {
        self.state
    }

    /// Runs the state machine. Never returns.
    pub fn run(mut self) {
        tracing::info!(
            response_timeout = ?self.timing.response_timeout,
            drain_timeout = ?self.timing.drain_timeout,
            "transceiver started"
        );
        loop {
            self.step();
        }
    }

    /// Performs one state and moves to the next.
    ///
    /// A valid RECEIVE blocks until the consumer acquires the frame.
    pub fn step(&mut self) {
        self.state = match self.state {
            LinkState::Send => {
                self.transmit();
                LinkState::Receive
            }
            LinkState::Receive => {
                let check = self.read_response();
                if check.is_valid() {
                    let status = u8::from(self.aux.is_active());
                    self.producer.publish(status);
                } else {
                    tracing::debug!(?check, "discarding sensor response");
                }
                LinkState::Send
            }
        };
    }

    fn transmit(&mut self) {
        let request = self.commands.snapshot();
        let result = self
            .link
            .transmit(request.as_bytes())
            .and_then(|()| self.link.wait_tx_done());
        if let Err(err) = result {
            tracing::warn!(%err, "failed to transmit request");
        }
    }

    /// Reads one response into the writable slot and drains the line.
    fn read_response(&mut self) -> ResponseCheck {
        let received = match self
            .link
            .read_bytes(self.producer.writable().payload_mut(), self.timing.response_timeout)
        {
            Ok(n) => n,
            Err(err) => {
                tracing::warn!(%err, "failed to read response");
                0
            }
        };
        let drained = self.drain();
        ResponseCheck::classify(received, drained)
    }

    /// Reads single bytes until one read times out empty.
    fn drain(&mut self) -> usize {
        let mut byte = [0u8; 1];
        let mut drained = 0;
        loop {
            match self.link.read_bytes(&mut byte, self.timing.drain_timeout) {
                Ok(0) => break,
                Ok(n) => drained += n,
                Err(err) => {
                    tracing::warn!(%err, "failed to drain link");
                    break;
                }
            }
        }
        drained
    }
}
