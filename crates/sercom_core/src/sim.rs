//! # Simulated Peer
//!
//! A software stand-in for the sensor microcontroller, driven over a
//! [`PeerPort`]. Used by the bridge binary's `--simulate` mode and by tests.
//!
//! Each request is answered with [`RESPONSE_SIZE`] bytes derived from a
//! sequence number, so the receiver can tell which cycle a frame came from.
//! [`PeerConditions`] injects the two framing faults the transceiver must
//! survive.

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::link::PeerPort;
use crate::protocol::{RequestFrame, RESPONSE_SIZE};

/// Fault injection for [`SimulatedPeer`]. Zero disables a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerConditions {
    /// Every Nth response carries `extra_bytes` trailing bytes.
    pub overrun_every: u32,
    /// Every Nth response is cut to half length.
    pub short_every: u32,
    /// Trailing bytes appended to an overrun response.
    pub extra_bytes: usize,
}

impl Default for PeerConditions {
    fn default() -> Self {
        Self {
            overrun_every: 0,
            short_every: 0,
            extra_bytes: 3,
        }
    }
}

impl PeerConditions {
    /// A peer that always answers correctly.
    #[must_use]
    pub fn clean() -> Self {
        Self::default()
    }
}

/// The sensor payload the peer sends for sequence number `seq`.
#[must_use]
pub fn payload_for(seq: u32) -> [u8; RESPONSE_SIZE] {
    let mut payload = [0u8; RESPONSE_SIZE];
    payload[..4].copy_from_slice(&seq.to_le_bytes());
    for (i, byte) in payload.iter_mut().enumerate().skip(4) {
        #[allow(clippy::cast_possible_truncation)]
        {
            *byte = (seq as usize).wrapping_add(i) as u8;
        }
    }
    payload
}

/// Sequence number stamped into a payload by [`payload_for`].
#[must_use]
pub fn sequence_of(payload: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = payload.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// A peer running on its own thread.
pub struct SimulatedPeer {
    last_request: Arc<Mutex<Option<RequestFrame>>>,
    handle: JoinHandle<u32>,
}

impl SimulatedPeer {
    /// Starts answering requests on `port`.
    ///
    /// The thread exits once the host end of the link is dropped.
    #[must_use]
    pub fn spawn(port: PeerPort, conditions: PeerConditions) -> Self {
        let last_request = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&last_request);

        let handle = thread::spawn(move || {
            let mut seq = 0u32;
            while let Some(request) = port.next_request() {
                seq = seq.wrapping_add(1);
                *seen.lock() = RequestFrame::from_bytes(&request);

                let payload = payload_for(seq);
                let sent = if conditions.short_every != 0 && seq % conditions.short_every == 0 {
                    tracing::debug!(seq, "peer sending short response");
                    port.send(&payload[..RESPONSE_SIZE / 2])
                } else if conditions.overrun_every != 0 && seq % conditions.overrun_every == 0 {
                    tracing::debug!(seq, extra = conditions.extra_bytes, "peer sending overrun");
                    let mut overrun = payload.to_vec();
                    overrun.resize(RESPONSE_SIZE + conditions.extra_bytes, 0xEE);
                    port.send(&overrun)
                } else {
                    port.send(&payload)
                };
                if !sent {
                    break;
                }
            }
            tracing::debug!(requests = seq, "simulated peer stopped");
            seq
        });

        Self {
            last_request,
            handle,
        }
    }

    /// The most recent request, if it decoded.
    #[must_use]
    pub fn last_request(&self) -> Option<RequestFrame> {
        *self.last_request.lock()
    }

    /// Waits for the peer to stop and returns how many requests it answered.
    ///
    /// Only returns after the host end of the link is dropped.
    #[must_use]
    pub fn join(self) -> Option<u32> {
        self.handle.join().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{link_pair, SerialLink};
    use std::time::Duration;

    #[test]
    fn test_payload_carries_sequence() {
        let payload = payload_for(7);
        assert_eq!(sequence_of(&payload), Some(7));
        assert_ne!(payload_for(7), payload_for(8));
        assert_eq!(sequence_of(&[1, 2]), None);
    }

    #[test]
    fn test_peer_answers_requests() {
        let (mut host, port) = link_pair();
        let peer = SimulatedPeer::spawn(port, PeerConditions::clean());

        host.transmit(RequestFrame::new().as_bytes()).unwrap();
        let mut buf = [0u8; RESPONSE_SIZE];
        let n = host.read_bytes(&mut buf, Duration::from_secs(1)).unwrap();

        assert_eq!(n, RESPONSE_SIZE);
        assert_eq!(sequence_of(&buf), Some(1));
        assert_eq!(peer.last_request(), Some(RequestFrame::new()));

        drop(host);
        assert_eq!(peer.join(), Some(1));
    }

    #[test]
    fn test_peer_overrun() {
        let (mut host, port) = link_pair();
        let conditions = PeerConditions {
            overrun_every: 1,
            ..PeerConditions::default()
        };
        let _peer = SimulatedPeer::spawn(port, conditions);

        host.transmit(RequestFrame::new().as_bytes()).unwrap();
        let mut buf = [0u8; RESPONSE_SIZE + 8];
        let n = host.read_bytes(&mut buf, Duration::from_millis(200)).unwrap();
        assert_eq!(n, RESPONSE_SIZE + 3);
    }
}
