//! Duty loops: the receive loop ingests datagrams into the registry, the
//! send loop announces this node and sweeps silent peers.
//!
//! Both loops poll a `ShutdownToken` once per iteration and never return
//! early on a failed send or receive; each failure is logged and the next
//! iteration simply tries again.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::config::NodeConfig;
use crate::network::protocol::{Message, TextMessage};
use crate::network::transport::{BroadcastSink, Datagram, DatagramSource};
use crate::peer::{PeerId, Position};
use crate::registry::{PeerRecord, PeerRegistry};
use crate::shutdown::ShutdownToken;

/// Hooks for the surrounding application (console, tests). All methods
/// default to doing nothing.
pub trait NodeObserver: Send + Sync {
    fn text_received(&self, _message: &TextMessage, _sender: SocketAddr) {}
    fn peers_evicted(&self, _evicted: &[PeerRecord]) {}
    fn status(&self, _self_id: PeerId, _peers: &[PeerRecord], _now: Instant) {}
}

pub struct SilentObserver;

impl NodeObserver for SilentObserver {}

// ============================================================================
// Receive loop
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    pub datagrams: u64,
    pub ingested: u64,
    pub discarded: u64,
    pub own_echoes: u64,
}

/// Decode and ingest one datagram.
pub fn handle_datagram(
    datagram: &Datagram,
    registry: &PeerRegistry,
    observer: &dyn NodeObserver,
    stats: &mut ReceiveStats,
) {
    stats.datagrams += 1;

    let message = match Message::decode(&datagram.payload) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(sender = %datagram.sender, error = %e, "Discarding datagram");
            stats.discarded += 1;
            return;
        }
    };

    // Our own broadcasts come back through the loopback.
    if message.source() == registry.self_id() {
        stats.own_echoes += 1;
        return;
    }

    registry.ingest(&message);
    stats.ingested += 1;

    match &message {
        Message::Text(text) => {
            tracing::info!(
                peer = %text.source,
                sender = %datagram.sender,
                body = text.body(),
                "Text message received"
            );
            observer.text_received(text, datagram.sender);
        }
        other => {
            tracing::trace!(peer = %other.source(), kind = other.kind().as_str(), "Message ingested");
        }
    }
}

/// Pull datagrams until shutdown. Suspends only inside `source.receive()`.
pub fn run_receive_loop<R: DatagramSource + ?Sized>(
    source: &mut R,
    registry: &PeerRegistry,
    observer: &dyn NodeObserver,
    shutdown: &ShutdownToken,
) -> ReceiveStats {
    tracing::info!(self_id = %registry.self_id(), "Receive loop started");
    let mut stats = ReceiveStats::default();

    while !shutdown.is_cancelled() {
        if let Some(datagram) = source.receive() {
            handle_datagram(&datagram, registry, observer, &mut stats);
        }
    }

    tracing::info!(
        datagrams = stats.datagrams,
        ingested = stats.ingested,
        discarded = stats.discarded,
        own_echoes = stats.own_echoes,
        "Receive loop stopped"
    );
    stats
}

// ============================================================================
// Send loop
// ============================================================================

/// What this node announces, and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconPlan {
    pub self_id: PeerId,
    pub position: Position,
    pub greeting: Option<String>,
    pub send_interval: Duration,
    pub heartbeat_interval: Duration,
    pub status_interval: Duration,
    pub peer_timeout: Duration,
    pub tick: Duration,
}

impl BeaconPlan {
    pub fn from_config(self_id: PeerId, config: &NodeConfig) -> Self {
        Self {
            self_id,
            position: config.position_for(self_id),
            greeting: config.greeting_for(self_id),
            send_interval: config.send_interval(),
            heartbeat_interval: config.heartbeat_interval(),
            status_interval: config.status_interval(),
            peer_timeout: config.peer_timeout(),
            tick: config.tick(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendStats {
    pub positions: u64,
    pub heartbeats: u64,
    pub texts: u64,
    pub failures: u64,
    pub evictions: u64,
}

/// Send-side state machine. `tick` performs one iteration; the caller
/// owns the sleeping, which keeps the cadence testable with fake instants.
pub struct Beacon {
    plan: BeaconPlan,
    last_position: Option<Instant>,
    last_heartbeat: Option<Instant>,
    last_status: Instant,
    greeted: bool,
    stats: SendStats,
}

fn is_due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
    match last {
        None => true,
        Some(t) => now.saturating_duration_since(t) >= interval,
    }
}

impl Beacon {
    pub fn new(plan: BeaconPlan, started: Instant) -> Self {
        Self {
            greeted: plan.greeting.is_none(),
            plan,
            last_position: None,
            last_heartbeat: None,
            last_status: started,
            stats: SendStats::default(),
        }
    }

    pub fn plan(&self) -> &BeaconPlan {
        &self.plan
    }

    pub fn stats(&self) -> SendStats {
        self.stats
    }

    /// Send one frame. A failure is counted and logged, never retried: the
    /// next scheduled send is the retry.
    fn broadcast<S: BroadcastSink + ?Sized>(&mut self, sink: &S, message: &Message) -> bool {
        match sink.send_broadcast(&message.encode()) {
            Ok(()) => true,
            Err(e) => {
                self.stats.failures += 1;
                tracing::warn!(kind = message.kind().as_str(), error = %e, "Broadcast failed");
                false
            }
        }
    }

    pub fn tick<S: BroadcastSink + ?Sized>(
        &mut self,
        sink: &S,
        registry: &PeerRegistry,
        observer: &dyn NodeObserver,
        now: Instant,
    ) {
        let id = self.plan.self_id;

        if is_due(self.last_position, self.plan.send_interval, now) {
            let msg = Message::position(id, self.plan.position);
            if self.broadcast(sink, &msg) {
                self.stats.positions += 1;
                tracing::debug!(position = %self.plan.position, "Position report sent");
            }
            self.last_position = Some(now);
        }

        if is_due(self.last_heartbeat, self.plan.heartbeat_interval, now) {
            if self.broadcast(sink, &Message::heartbeat(id)) {
                self.stats.heartbeats += 1;
            }
            self.last_heartbeat = Some(now);
        }

        if !self.greeted {
            if let Some(greeting) = self.plan.greeting.clone() {
                if self.broadcast(sink, &Message::text(id, &greeting)) {
                    self.stats.texts += 1;
                    tracing::info!(text = %greeting, "Greeting sent");
                }
            }
            self.greeted = true;
        }

        let evicted = registry.prune_expired_at(self.plan.peer_timeout, now);
        if !evicted.is_empty() {
            self.stats.evictions += evicted.len() as u64;
            observer.peers_evicted(&evicted);
        }

        if now.saturating_duration_since(self.last_status) >= self.plan.status_interval {
            observer.status(id, &registry.snapshot(), now);
            self.last_status = now;
        }
    }
}

/// Announce and sweep until shutdown. Suspends only in the tick sleep.
pub fn run_send_loop<S: BroadcastSink + ?Sized>(
    sink: &S,
    registry: &PeerRegistry,
    plan: BeaconPlan,
    observer: &dyn NodeObserver,
    shutdown: &ShutdownToken,
) -> SendStats {
    tracing::info!(
        self_id = %plan.self_id,
        send_interval_ms = plan.send_interval.as_millis() as u64,
        peer_timeout_ms = plan.peer_timeout.as_millis() as u64,
        "Send loop started"
    );
    let tick = plan.tick;
    let mut beacon = Beacon::new(plan, Instant::now());

    while !shutdown.is_cancelled() {
        beacon.tick(sink, registry, observer, Instant::now());
        std::thread::sleep(tick);
    }

    let stats = beacon.stats();
    tracing::info!(
        positions = stats.positions,
        heartbeats = stats.heartbeats,
        texts = stats.texts,
        failures = stats.failures,
        evictions = stats.evictions,
        "Send loop stopped"
    );
    stats
}
