use anyhow::{Context, Result};

use peer_beacon::network::{BroadcastTransport, Message};
use peer_beacon::PeerId;

/// `say <ID> <TEXT>`: broadcast one text message as node `id`, then exit.
pub fn run(
    id: PeerId,
    text: &str,
    port: Option<u16>,
    broadcast_address: Option<&str>,
    config: Option<&str>,
) -> Result<()> {
    let mut cfg = super::load_config(config)?;
    if let Some(port) = port {
        cfg.port = port;
    }
    if let Some(addr) = broadcast_address {
        cfg.broadcast_address = addr.to_string();
    }
    cfg.check()?;

    let transport = BroadcastTransport::open(cfg.port, &cfg.broadcast_address, cfg.receive_timeout())
        .context("Failed to open broadcast transport")?;

    let message = Message::text(id, text);
    let result = transport.send_broadcast(&message.encode());
    let target = transport.target();
    transport.close();
    result.with_context(|| format!("Failed to broadcast to {}", target))?;

    if let Message::Text(t) = &message {
        if t.body().len() < text.len() {
            eprintln!("Note: message truncated to {} bytes", t.body().len());
        }
        println!("Node {} -> {}: {}", id, target, t.body());
    }
    Ok(())
}
