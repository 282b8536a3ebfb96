//! Serial port backend.
//!
//! Opens the port as 8N1 without flow control, the framing the peer firmware
//! expects.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use super::SerialLink;
use crate::config::BridgeConfig;
use crate::error::SercomResult;

/// UART link to the peer microcontroller.
pub struct UartLink {
    port: Box<dyn SerialPort>,
}

impl UartLink {
    /// Opens the port named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SercomError::Link`](crate::SercomError::Link) if the port
    /// cannot be opened or configured.
    pub fn open(config: &BridgeConfig) -> SercomResult<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.response_timeout())
            .open()
            .map_err(io::Error::from)?;

        tracing::info!(port = %config.port, baud = config.baud_rate, "serial link opened");
        Ok(Self { port })
    }

    /// Wraps an already configured port.
    #[must_use]
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl SerialLink for UartLink {
    fn transmit(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn wait_tx_done(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut read = 0;

        while read < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.port.set_timeout(remaining).map_err(io::Error::from)?;

            match self.port.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(read)
    }
}
