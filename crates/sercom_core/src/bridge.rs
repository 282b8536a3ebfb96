//! # Sensor Bridge
//!
//! Public face of the engine: allocates the frame slots, starts the producer
//! thread and exposes the consumer-side operations.
//!
//! ```text
//!   caller thread                      producer thread
//!   ─────────────                      ───────────────
//!   SensorBridge::initialize ──spawn──▶ Transceiver::run
//!   set_actuator_command ──▶ CommandFrame ──▶ SEND
//!   acquire_latest_sensor_frame ◀── FrameSlots ◀── RECEIVE
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};

use crate::command::{ActuatorCommand, ActuatorPacket, CommandFrame};
use crate::config::BridgeConfig;
use crate::error::{SercomError, SercomResult};
use crate::input::AuxInput;
use crate::link::SerialLink;
use crate::sync::{frame_slots, FrameConsumer, SensorFrame};
use crate::transceiver::{LinkTiming, Transceiver};

/// A running transfer engine.
///
/// The producer thread runs for the life of the process; dropping the bridge
/// detaches it.
pub struct SensorBridge {
    consumer: FrameConsumer,
    commands: Arc<CommandFrame>,
    producer: JoinHandle<()>,
}

impl SensorBridge {
    /// Allocates both frame slots and starts the producer thread on `link`.
    ///
    /// # Errors
    ///
    /// - [`SercomError::InvalidConfig`] if `config` fails validation.
    /// - [`SercomError::Allocation`] if a frame slot cannot be allocated.
    /// - [`SercomError::Spawn`] if the thread cannot be started.
    pub fn initialize<L, A>(link: L, aux: A, config: &BridgeConfig) -> SercomResult<Self>
    where
        L: SerialLink + 'static,
        A: AuxInput + 'static,
    {
        config.validate()?;

        let (producer, consumer) = frame_slots()?;
        let commands = Arc::new(CommandFrame::new());
        let transceiver = Transceiver::new(
            link,
            aux,
            Arc::clone(&commands),
            producer,
            LinkTiming::from_config(config),
        );

        let producer = thread::Builder::new()
            .name(config.producer_thread.clone())
            .stack_size(config.producer_stack_size)
            .spawn(move || transceiver.run())
            .map_err(SercomError::Spawn)?;

        tracing::info!(
            thread = %config.producer_thread,
            response_timeout_ms = config.response_timeout_ms,
            drain_timeout_ms = config.drain_timeout_ms,
            "sensor bridge initialized"
        );

        Ok(Self {
            consumer,
            commands,
            producer,
        })
    }

    /// Blocks until a complete sensor frame is available and returns it.
    ///
    /// See [`FrameConsumer::acquire_latest`].
    pub fn acquire_latest_sensor_frame(&mut self) -> &SensorFrame {
        self.consumer.acquire_latest()
    }

    /// Returns a new frame if one completed since the last acquire.
    pub fn try_acquire_latest_sensor_frame(&mut self) -> Option<&SensorFrame> {
        self.consumer.try_acquire_latest()
    }

    /// The frame returned by the last acquire.
    #[must_use]
    pub fn latest(&self) -> &SensorFrame {
        self.consumer.latest()
    }

    /// Number of frames handed to the caller so far.
    #[must_use]
    pub fn frames_acquired(&self) -> u64 {
        self.consumer.swap_count()
    }

    /// Copies a 9-byte actuator packet into the outgoing request.
    ///
    /// Takes effect on the next SEND.
    pub fn set_actuator_command(&self, packet: &ActuatorPacket) {
        self.commands.set_actuator_command(packet);
    }

    /// Typed form of [`set_actuator_command`](Self::set_actuator_command).
    pub fn apply(&self, command: &ActuatorCommand) {
        self.commands.apply(command);
    }

    /// Shared handle to the request frame, for writers on other threads.
    #[must_use]
    pub fn commands(&self) -> Arc<CommandFrame> {
        Arc::clone(&self.commands)
    }

    /// The producer thread.
    #[must_use]
    pub fn producer_thread(&self) -> &Thread {
        self.producer.thread()
    }
}
