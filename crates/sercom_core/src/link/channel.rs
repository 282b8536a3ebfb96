//! In-memory link backed by crossbeam channels.
//!
//! [`ChannelLink`] is the host end and implements [`SerialLink`]; [`PeerPort`]
//! is the peer end. Requests travel as whole frames, responses as a byte
//! stream, which is what the host sees on a real UART.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use super::SerialLink;

/// Creates a connected host/peer pair.
#[must_use]
pub fn link_pair() -> (ChannelLink, PeerPort) {
    let (request_tx, request_rx) = unbounded();
    let (byte_tx, byte_rx) = unbounded();
    (
        ChannelLink {
            to_peer: request_tx,
            from_peer: byte_rx,
        },
        PeerPort {
            from_host: request_rx,
            to_host: byte_tx,
        },
    )
}

/// Host end of an in-memory link.
///
/// A dropped peer behaves like a silent line: transmits vanish and reads
/// time out.
#[derive(Debug)]
pub struct ChannelLink {
    to_peer: Sender<Vec<u8>>,
    from_peer: Receiver<u8>,
}

impl SerialLink for ChannelLink {
    fn transmit(&mut self, bytes: &[u8]) -> io::Result<()> {
        // Nobody listening is not an error on a UART either.
        let _ = self.to_peer.send(bytes.to_vec());
        Ok(())
    }

    fn wait_tx_done(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut read = 0;

        while read < buf.len() {
            match self.from_peer.recv_deadline(deadline) {
                Ok(byte) => {
                    buf[read] = byte;
                    read += 1;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    break;
                }
            }
        }

        Ok(read)
    }
}

/// Peer end of an in-memory link.
#[derive(Debug)]
pub struct PeerPort {
    from_host: Receiver<Vec<u8>>,
    to_host: Sender<u8>,
}

impl PeerPort {
    /// Waits up to `timeout` for the next request from the host.
    ///
    /// Returns `None` on timeout or if the host end was dropped.
    #[must_use]
    pub fn recv_request(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.from_host.recv_timeout(timeout).ok()
    }

    /// Blocks until the next request arrives.
    ///
    /// Returns `None` once the host end is dropped.
    #[must_use]
    pub fn next_request(&self) -> Option<Vec<u8>> {
        self.from_host.recv().ok()
    }

    /// Sends raw response bytes to the host.
    ///
    /// Returns `false` if the host end was dropped.
    pub fn send(&self, bytes: &[u8]) -> bool {
        bytes.iter().all(|&byte| self.to_host.send(byte).is_ok())
    }
}
