//! # Link Layer
//!
//! The byte pipe between the host and the peer microcontroller.
//!
//! ## Design
//!
//! - Blocking I/O only; the calling thread parks for the whole operation
//! - Reads are bounded by a timeout, writes are not
//! - A timeout is not an error: it is a short read

mod channel;
#[cfg(feature = "serial")]
mod serial;

pub use channel::{link_pair, ChannelLink, PeerPort};
#[cfg(feature = "serial")]
pub use serial::UartLink;

use std::io;
use std::time::Duration;

/// Blocking, timeout-bounded serial link.
pub trait SerialLink: Send {
    /// Queues `bytes` for transmission.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the bytes cannot be queued.
    fn transmit(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Blocks until every queued byte has left the transmitter.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the link cannot be drained.
    fn wait_tx_done(&mut self) -> io::Result<()>;

    /// Reads into `buf` until it is full or `timeout` has elapsed.
    ///
    /// Returns the number of bytes read; `0` means nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for failures other than a timeout.
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn transmit(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).transmit(bytes)
    }

    fn wait_tx_done(&mut self) -> io::Result<()> {
        (**self).wait_tx_done()
    }

    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read_bytes(buf, timeout)
    }
}
