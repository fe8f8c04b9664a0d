//! Broadcast transport: one send socket, one receive socket.
//!
//! The send half is owned by the send loop and the receive half by the
//! receive loop, so neither socket needs a lock. `split()` hands them out,
//! `reunite()` + `close()` put them back together at shutdown.
//!
//! Receives use a bounded wait (`SO_RCVTIMEO`) instead of readiness
//! notification: the loop wakes at least once per timeout to look at the
//! shutdown token, and the timeout is the only knob trading shutdown
//! latency against idle wakeups.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::constants::RECEIVE_BUFFER_SIZE;
use crate::error::{InitStage, TransportError};

/// One datagram pulled off the receive socket.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub payload: Bytes,
    pub sender: SocketAddr,
}

/// Anything the send loop can push frames through.
pub trait BroadcastSink {
    fn send_broadcast(&self, frame: &[u8]) -> Result<(), TransportError>;
}

/// Anything the receive loop can pull datagrams from. `None` means
/// "nothing this iteration", never a fatal condition.
pub trait DatagramSource {
    fn receive(&mut self) -> Option<Datagram>;
}

pub struct BroadcastTransport {
    sender: BroadcastSender,
    receiver: BroadcastReceiver,
}

impl BroadcastTransport {
    /// Open both sockets. Any failure drops whatever was already created, so
    /// a failed open never leaves a socket behind.
    pub fn open(
        port: u16,
        broadcast_address: &str,
        receive_timeout: Duration,
    ) -> Result<Self, TransportError> {
        // --- Send socket ---
        let send_socket = new_udp_socket()?;
        send_socket
            .set_broadcast(true)
            .map_err(|e| TransportError::init(InitStage::SetBroadcast, e))?;

        let ip: Ipv4Addr = broadcast_address.trim().parse().map_err(|e| {
            TransportError::init(
                InitStage::ResolveAddress,
                std::io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("'{}': {}", broadcast_address, e),
                ),
            )
        })?;
        let target = SocketAddrV4::new(ip, port);

        // --- Receive socket ---
        let recv_socket = new_udp_socket()?;
        // Lets several nodes share one host; not fatal if refused.
        if let Err(e) = recv_socket.set_reuse_address(true) {
            tracing::warn!(error = %e, "SO_REUSEADDR refused, port cannot be shared on this host");
        }

        if receive_timeout.is_zero() {
            return Err(TransportError::init(
                InitStage::ReceiveTimeout,
                std::io::Error::new(ErrorKind::InvalidInput, "receive timeout must be non-zero"),
            ));
        }
        recv_socket
            .set_read_timeout(Some(receive_timeout))
            .map_err(|e| TransportError::init(InitStage::ReceiveTimeout, e))?;

        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
        recv_socket
            .bind(&SockAddr::from(bind_addr))
            .map_err(|e| TransportError::init(InitStage::Bind, e))?;

        tracing::info!(
            port,
            broadcast = %ip,
            receive_timeout_ms = receive_timeout.as_millis() as u64,
            "Broadcast transport open"
        );

        Ok(Self {
            sender: BroadcastSender {
                socket: send_socket.into(),
                target,
            },
            receiver: BroadcastReceiver {
                socket: recv_socket.into(),
                buf: vec![0u8; RECEIVE_BUFFER_SIZE],
            },
        })
    }

    pub fn split(self) -> (BroadcastSender, BroadcastReceiver) {
        (self.sender, self.receiver)
    }

    pub fn reunite(sender: BroadcastSender, receiver: BroadcastReceiver) -> Self {
        Self { sender, receiver }
    }

    pub fn target(&self) -> SocketAddrV4 {
        self.sender.target
    }

    pub fn send_broadcast(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.sender.send_broadcast(frame)
    }

    pub fn receive(&mut self) -> Option<Datagram> {
        self.receiver.receive()
    }

    /// Release both sockets. Taking `self` makes a second close impossible.
    pub fn close(self) {
        let target = self.sender.target;
        drop(self.sender);
        drop(self.receiver);
        tracing::info!(broadcast = %target, "Broadcast transport closed");
    }
}

fn new_udp_socket() -> Result<Socket, TransportError> {
    Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| TransportError::init(InitStage::SocketCreate, e))
}

/// Send half. Only the send loop touches it.
#[derive(Debug)]
pub struct BroadcastSender {
    socket: UdpSocket,
    target: SocketAddrV4,
}

impl BroadcastSender {
    pub fn target(&self) -> SocketAddrV4 {
        self.target
    }
}

impl BroadcastSink for BroadcastSender {
    fn send_broadcast(&self, frame: &[u8]) -> Result<(), TransportError> {
        let sent = self
            .socket
            .send_to(frame, self.target)
            .map_err(TransportError::Send)?;
        if sent != frame.len() {
            // Datagrams are all-or-nothing at the OS boundary; no retry.
            tracing::warn!(sent, expected = frame.len(), "Short broadcast write");
        }
        Ok(())
    }
}

/// Receive half. Only the receive loop touches it.
#[derive(Debug)]
pub struct BroadcastReceiver {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl BroadcastReceiver {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramSource for BroadcastReceiver {
    fn receive(&mut self) -> Option<Datagram> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((0, _)) => None,
            Ok((len, sender)) => Some(Datagram {
                payload: Bytes::copy_from_slice(&self.buf[..len]),
                sender,
            }),
            // Timeout surfaces as WouldBlock on unix, TimedOut on windows.
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => None,
            Err(e) if e.kind() == ErrorKind::Interrupted => None,
            Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                tracing::debug!("Receive reported connection reset, ignoring");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Receive failed");
                None
            }
        }
    }
}
