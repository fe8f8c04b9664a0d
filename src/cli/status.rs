use std::net::SocketAddr;
use std::time::Instant;

use peer_beacon::config::StatusFormat;
use peer_beacon::network::{NodeObserver, TextMessage};
use peer_beacon::status::StatusReport;
use peer_beacon::{PeerId, PeerRecord};

/// Prints node events to stdout. Logs go through `tracing` separately.
pub struct ConsoleObserver {
    format: StatusFormat,
}

impl ConsoleObserver {
    pub fn new(format: StatusFormat) -> Self {
        Self { format }
    }
}

pub fn render_text_message(message: &TextMessage, sender: SocketAddr) -> String {
    format!(
        "\n--- Text Message Received ---\n  From Node: {} [{}]\n  Message:   {}\n-----------------------------",
        message.source,
        sender.ip(),
        message.body()
    )
}

pub fn render_eviction(record: &PeerRecord, now: Instant) -> String {
    format!(
        "[peers] Node {} timed out (silent for {}s)",
        record.id,
        record.age(now).as_secs()
    )
}

impl NodeObserver for ConsoleObserver {
    fn text_received(&self, message: &TextMessage, sender: SocketAddr) {
        println!("{}", render_text_message(message, sender));
    }

    fn peers_evicted(&self, evicted: &[PeerRecord]) {
        let now = Instant::now();
        for record in evicted {
            println!("{}", render_eviction(record, now));
        }
    }

    fn status(&self, self_id: PeerId, peers: &[PeerRecord], now: Instant) {
        let report = StatusReport::new(self_id, peers, now);
        match self.format {
            // An empty table is noise; JSON consumers still get a line.
            StatusFormat::Text if peers.is_empty() => {}
            StatusFormat::Text => println!("\n{}", report.render_text()),
            StatusFormat::Json => match report.to_json() {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize status"),
            },
        }
    }
}
