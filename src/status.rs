//! Status view: turns a registry snapshot into something a human (text)
//! or a script (JSON) can read.

use std::fmt::Write as _;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::peer::{PeerId, Position};
use crate::registry::PeerRecord;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeerSummary {
    pub id: PeerId,
    pub position: Option<Position>,
    pub last_heard_secs: u64,
    pub tracked_secs: u64,
    pub messages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Utc>,
    pub self_id: PeerId,
    pub peer_count: usize,
    pub peers: Vec<PeerSummary>,
}

impl StatusReport {
    pub fn new(self_id: PeerId, records: &[PeerRecord], now: Instant) -> Self {
        let peers: Vec<PeerSummary> = records
            .iter()
            .map(|r| PeerSummary {
                id: r.id,
                position: r.position,
                last_heard_secs: r.age(now).as_secs(),
                tracked_secs: r.tracked_for(now).as_secs(),
                messages: r.messages_heard,
            })
            .collect();
        Self {
            generated_at: Utc::now(),
            self_id,
            peer_count: peers.len(),
            peers,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "===== Known Peers ({}) | node {} @ {} =====",
            self.peer_count,
            self.self_id,
            self.generated_at.format("%H:%M:%S")
        );
        for p in &self.peers {
            let pos = match &p.position {
                Some(pos) => pos.to_string(),
                None => "N/A".to_string(),
            };
            let _ = writeln!(
                out,
                "  Node {:>6} | Pos: {:<32} | Last heard: {:>3}s ago | Tracked: {:>5}s | Msgs: {}",
                p.id, pos, p.last_heard_secs, p.tracked_secs, p.messages
            );
        }
        out.push_str("==========================================");
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::PositionReport;
    use crate::registry::PeerRegistry;
    use std::time::Duration;

    fn sample() -> (Vec<PeerRecord>, Instant) {
        let reg = PeerRegistry::new(PeerId(1));
        let t0 = Instant::now();
        reg.record_heard_at(PeerId(2), t0);
        reg.record_position_at(
            &PositionReport {
                source: PeerId(3),
                position: Position::new(50.0, -1.0, 101.0),
            },
            t0,
        );
        (reg.snapshot(), t0 + Duration::from_secs(4))
    }

    #[test]
    fn test_text_shows_na_for_unknown_position() {
        let (records, now) = sample();
        let text = StatusReport::new(PeerId(1), &records, now).render_text();
        assert!(text.contains("Known Peers (2)"), "{}", text);

        let line2 = text.lines().find(|l| l.contains("Node      2")).unwrap();
        assert!(line2.contains("N/A"));
        assert!(line2.contains("4s ago"));

        let line3 = text.lines().find(|l| l.contains("Node      3")).unwrap();
        assert!(line3.contains("50.00000/-1.00000 @ 101.0m"), "{}", line3);
    }

    #[test]
    fn test_json_shape() {
        let (records, now) = sample();
        let json = StatusReport::new(PeerId(1), &records, now).to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["self_id"], 1);
        assert_eq!(v["peer_count"], 2);
        assert_eq!(v["peers"][0]["id"], 2);
        assert!(v["peers"][0]["position"].is_null());
        assert_eq!(v["peers"][1]["position"]["alt"], 101.0);
        assert_eq!(v["peers"][1]["last_heard_secs"], 4);
    }
}
