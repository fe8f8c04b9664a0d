//! Shared test utilities: ports, recording sinks/observers, scripted sources.
//!
//! Available only under `#[cfg(test)]`.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::TransportError;
use crate::network::discovery::NodeObserver;
use crate::network::protocol::{Message, TextMessage};
use crate::network::transport::{BroadcastSink, Datagram, DatagramSource};
use crate::peer::PeerId;
use crate::registry::PeerRecord;
use crate::shutdown::ShutdownToken;

/// Ask the OS for a currently unused UDP port.
pub fn free_udp_port() -> u16 {
    let probe = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    probe.local_addr().unwrap().port()
}

/// Wrap raw bytes as if they had arrived from a local peer.
pub fn datagram(payload: &[u8]) -> Datagram {
    Datagram {
        payload: Bytes::copy_from_slice(payload),
        sender: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40_000)),
    }
}

/// Poll `check` every 10 ms until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}

// ============================================================================
// RecordingSink
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Bytes>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Every frame sent so far, decoded.
    pub fn messages(&self) -> Vec<Message> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| Message::decode(f).unwrap())
            .collect()
    }
}

impl BroadcastSink for RecordingSink {
    fn send_broadcast(&self, frame: &[u8]) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Send(std::io::Error::new(
                std::io::ErrorKind::NetworkUnreachable,
                "network unreachable",
            )));
        }
        self.frames.lock().unwrap().push(Bytes::copy_from_slice(frame));
        Ok(())
    }
}

// ============================================================================
// RecordingObserver
// ============================================================================

#[derive(Default)]
pub struct RecordingObserver {
    texts: Mutex<Vec<(PeerId, String)>>,
    evicted: Mutex<Vec<PeerId>>,
    status_calls: Mutex<usize>,
}

impl RecordingObserver {
    pub fn texts(&self) -> Vec<(PeerId, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn evicted(&self) -> Vec<PeerId> {
        self.evicted.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

impl NodeObserver for RecordingObserver {
    fn text_received(&self, message: &TextMessage, _sender: SocketAddr) {
        self.texts
            .lock()
            .unwrap()
            .push((message.source, message.body().to_string()));
    }

    fn peers_evicted(&self, evicted: &[PeerRecord]) {
        self.evicted.lock().unwrap().extend(evicted.iter().map(|r| r.id));
    }

    fn status(&self, _self_id: PeerId, _peers: &[PeerRecord], _now: Instant) {
        *self.status_calls.lock().unwrap() += 1;
    }
}

// ============================================================================
// ScriptedSource
// ============================================================================

/// Hands out canned datagrams, then cancels `shutdown` once drained.
pub struct ScriptedSource {
    queue: VecDeque<Datagram>,
    shutdown: ShutdownToken,
}

impl ScriptedSource {
    pub fn new(datagrams: Vec<Datagram>, shutdown: ShutdownToken) -> Self {
        Self {
            queue: datagrams.into(),
            shutdown,
        }
    }
}

impl DatagramSource for ScriptedSource {
    fn receive(&mut self) -> Option<Datagram> {
        let next = self.queue.pop_front();
        if next.is_none() {
            self.shutdown.cancel();
        }
        next
    }
}
