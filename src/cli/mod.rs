pub mod config;
pub mod say;
pub mod status;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use peer_beacon::config::{NodeConfig, StatusFormat};
use peer_beacon::paths;
use peer_beacon::Position;

/// Resolve the config file: explicit `--config` path or `{data_dir}/config.json`.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(p) => paths::expand_tilde(p),
        None => paths::config_path(),
    }
}

/// Load the node config. An explicit path must exist; the default one may not.
pub fn load_config(explicit: Option<&str>) -> Result<NodeConfig> {
    let path = config_path(explicit);
    if explicit.is_some() && !path.exists() {
        bail!("Config file not found: {}", path.display());
    }
    Ok(NodeConfig::load(&path))
}

/// `run` flags. Each one, when given, overrides the config file.
#[derive(Args, Debug, Default)]
pub struct RunOverrides {
    /// UDP port shared by all nodes
    #[arg(long)]
    pub port: Option<u16>,
    /// IPv4 broadcast address to send to
    #[arg(long = "broadcast")]
    pub broadcast_address: Option<String>,
    /// Receive timeout in milliseconds (must be non-zero)
    #[arg(long)]
    pub recv_timeout_ms: Option<u64>,
    /// Seconds between position reports
    #[arg(long)]
    pub send_interval_secs: Option<u64>,
    /// Seconds of silence before a peer is evicted
    #[arg(long)]
    pub peer_timeout_secs: Option<u64>,
    #[arg(long, requires_all = ["lon", "alt"], allow_negative_numbers = true)]
    pub lat: Option<f64>,
    #[arg(long, requires_all = ["lat", "alt"], allow_negative_numbers = true)]
    pub lon: Option<f64>,
    #[arg(long, requires_all = ["lat", "lon"], allow_negative_numbers = true)]
    pub alt: Option<f64>,
    /// Greeting broadcast once at startup (`{id}` expands to the node id)
    #[arg(long, conflicts_with = "no_greeting")]
    pub greeting: Option<String>,
    /// Do not send a greeting
    #[arg(long)]
    pub no_greeting: bool,
    /// Status view format: text or json
    #[arg(long)]
    pub status_format: Option<StatusFormat>,
    /// Config file (defaults to the data dir)
    #[arg(long)]
    pub config: Option<String>,
    /// Append logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<String>,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut NodeConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(addr) = &self.broadcast_address {
            config.broadcast_address = addr.clone();
        }
        if let Some(ms) = self.recv_timeout_ms {
            // Not clamped: a zero timeout must reach the transport and fail there.
            config.receive_timeout_ms = ms;
        }
        if let Some(secs) = self.send_interval_secs {
            config.send_interval_secs = secs.max(1);
        }
        if let Some(secs) = self.peer_timeout_secs {
            config.peer_timeout_secs = Some(secs.max(config.send_interval_secs));
        }
        if let (Some(lat), Some(lon), Some(alt)) = (self.lat, self.lon, self.alt) {
            config.position = Some(Position::new(lat, lon, alt));
        }
        if self.no_greeting {
            config.greeting = None;
        } else if let Some(greeting) = &self.greeting {
            config.greeting = Some(greeting.clone()).filter(|g| !g.trim().is_empty());
        }
        if let Some(format) = self.status_format {
            config.status_format = format;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
    }
}
