//! Peer registry -- who is reachable, where they are, and when we last
//! heard from them.
//!
//! One `Mutex` guards the whole map. Updates arrive at most a few times a
//! second per peer and sweeps run on the send loop's tick, so a single
//! exclusive section is plenty. Reads are copy-out: callers get owned
//! `PeerRecord`s and never hold the lock while they print or serialize.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::network::protocol::{Message, PositionReport};
use crate::peer::{PeerId, Position};

/// Everything known about one remote peer.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerRecord {
    pub id: PeerId,
    /// `None` until the peer sends its first position report.
    pub position: Option<Position>,
    pub last_heard: Instant,
    pub first_heard: Instant,
    pub messages_heard: u64,
}

impl PeerRecord {
    fn new(id: PeerId, now: Instant) -> Self {
        Self {
            id,
            position: None,
            last_heard: now,
            first_heard: now,
            messages_heard: 0,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.last_heard = now;
        self.messages_heard += 1;
    }

    /// Time since the last message, saturating at zero.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_heard)
    }

    pub fn tracked_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.first_heard)
    }

    pub fn is_expired(&self, timeout: Duration, now: Instant) -> bool {
        self.age(now) > timeout
    }
}

pub struct PeerRegistry {
    self_id: PeerId,
    peers: Mutex<BTreeMap<PeerId, PeerRecord>>,
}

impl PeerRegistry {
    pub fn new(self_id: PeerId) -> Self {
        Self {
            self_id,
            peers: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn self_id(&self) -> PeerId {
        self.self_id
    }

    /// A panic in another thread must not take the registry down with it;
    /// the map itself is always left consistent between statements.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<PeerId, PeerRecord>> {
        self.peers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a position report, creating the peer if needed.
    pub fn record_position(&self, report: &PositionReport) {
        self.record_position_at(report, Instant::now());
    }

    pub fn record_position_at(&self, report: &PositionReport, now: Instant) {
        if report.source == self.self_id {
            return;
        }
        let mut peers = self.lock();
        match peers.get_mut(&report.source) {
            Some(record) => {
                record.position = Some(report.position);
                record.touch(now);
            }
            None => {
                let mut record = PeerRecord::new(report.source, now);
                record.position = Some(report.position);
                record.touch(now);
                peers.insert(report.source, record);
                tracing::info!(peer = %report.source, position = %report.position, "New peer (position report)");
            }
        }
    }

    /// Refresh liveness only, creating a bare record if needed.
    pub fn record_heard(&self, peer_id: PeerId) {
        self.record_heard_at(peer_id, Instant::now());
    }

    pub fn record_heard_at(&self, peer_id: PeerId, now: Instant) {
        if peer_id == self.self_id {
            return;
        }
        let mut peers = self.lock();
        match peers.get_mut(&peer_id) {
            Some(record) => record.touch(now),
            None => {
                let mut record = PeerRecord::new(peer_id, now);
                record.touch(now);
                peers.insert(peer_id, record);
                tracing::info!(peer = %peer_id, "New peer");
            }
        }
    }

    /// Apply one decoded message: every kind refreshes liveness, position
    /// reports also replace the stored position. Both happen under one lock.
    pub fn ingest(&self, message: &Message) {
        self.ingest_at(message, Instant::now());
    }

    pub fn ingest_at(&self, message: &Message, now: Instant) {
        match message {
            Message::Position(report) => self.record_position_at(report, now),
            other => self.record_heard_at(other.source(), now),
        }
    }

    /// Remove every peer silent for longer than `timeout` and return them.
    /// Selection and removal share one critical section, so a concurrent
    /// `snapshot` sees the map either before or after the sweep.
    pub fn prune_expired(&self, timeout: Duration) -> Vec<PeerRecord> {
        self.prune_expired_at(timeout, Instant::now())
    }

    pub fn prune_expired_at(&self, timeout: Duration, now: Instant) -> Vec<PeerRecord> {
        let mut peers = self.lock();
        let expired: Vec<PeerId> = peers
            .values()
            .filter(|r| r.is_expired(timeout, now))
            .map(|r| r.id)
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(record) = peers.remove(&id) {
                tracing::info!(
                    peer = %id,
                    silent_secs = record.age(now).as_secs(),
                    "Peer timed out"
                );
                evicted.push(record);
            }
        }
        evicted
    }

    /// Point-in-time copy, ordered by peer id.
    pub fn snapshot(&self) -> Vec<PeerRecord> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, peer_id: PeerId) -> Option<PeerRecord> {
        self.lock().get(&peer_id).cloned()
    }

    pub fn contains(&self, peer_id: PeerId) -> bool {
        self.lock().contains_key(&peer_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
