use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BROADCAST_ADDRESS, DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_PORT,
    DEFAULT_RECEIVE_TIMEOUT_MS, DEFAULT_SEND_INTERVAL_SECS, DEFAULT_STATUS_INTERVAL_SECS,
    DEFAULT_TICK_MS, PEER_TIMEOUT_MULTIPLIER,
};
use crate::error::{BeaconError, BeaconResult};
use crate::peer::{PeerId, Position};

/// How the periodic status view is printed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFormat {
    #[default]
    Text,
    Json,
}

impl StatusFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for StatusFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown status format: {}", s)),
        }
    }
}

/// Node configuration: transport parameters and beacon cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// UDP port shared by every node on the broadcast domain.
    pub port: u16,
    /// IPv4 address datagrams are sent to (limited broadcast by default).
    pub broadcast_address: String,
    /// Upper bound on one blocking receive; also bounds receive-side shutdown.
    pub receive_timeout_ms: u64,
    /// Interval between position reports.
    pub send_interval_secs: u64,
    /// Silence after which a peer is evicted. Defaults to 3x send interval.
    pub peer_timeout_secs: Option<u64>,
    /// Interval between heartbeats.
    pub heartbeat_interval_ms: u64,
    /// Interval between status views.
    pub status_interval_secs: u64,
    /// Send loop sleep between iterations.
    pub tick_ms: u64,
    /// Text broadcast once at startup. `{id}` expands to the node id.
    pub greeting: Option<String>,
    /// Advertised position. Derived from the node id when absent.
    pub position: Option<Position>,
    pub status_format: StatusFormat,
    pub log_file: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            broadcast_address: DEFAULT_BROADCAST_ADDRESS.to_string(),
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            send_interval_secs: DEFAULT_SEND_INTERVAL_SECS,
            peer_timeout_secs: None,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            status_interval_secs: DEFAULT_STATUS_INTERVAL_SECS,
            tick_ms: DEFAULT_TICK_MS,
            greeting: Some("Hello from Node {id}".to_string()),
            position: None,
            status_format: StatusFormat::Text,
            log_file: None,
        }
    }
}

impl NodeConfig {
    /// Load from a JSON file. Missing file -> defaults; invalid file ->
    /// defaults with a warning. The result is always validated.
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Invalid node config, using defaults"
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        config.validate();
        config
    }

    pub fn save(&self, path: &Path) -> BeaconResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Clamp values into a usable range.
    pub fn validate(&mut self) {
        self.receive_timeout_ms = self.receive_timeout_ms.max(1);
        self.send_interval_secs = self.send_interval_secs.max(1);
        self.heartbeat_interval_ms = self.heartbeat_interval_ms.max(1);
        self.status_interval_secs = self.status_interval_secs.max(1);
        self.tick_ms = self.tick_ms.max(1);
        if let Some(timeout) = self.peer_timeout_secs {
            // A peer must get at least one position interval before eviction.
            self.peer_timeout_secs = Some(timeout.max(self.send_interval_secs));
        }
        if let Some(greeting) = &self.greeting {
            if greeting.trim().is_empty() {
                self.greeting = None;
            }
        }
    }

    /// Hard errors `validate` cannot repair.
    pub fn check(&self) -> BeaconResult<()> {
        if self.port == 0 {
            return Err(BeaconError::InvalidConfig(
                "port must be non-zero (all nodes share it)".into(),
            ));
        }
        if self.broadcast_address.trim().parse::<std::net::Ipv4Addr>().is_err() {
            return Err(BeaconError::InvalidConfig(format!(
                "broadcast_address '{}' is not an IPv4 address",
                self.broadcast_address
            )));
        }
        Ok(())
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_secs(self.send_interval_secs)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(
            self.peer_timeout_secs
                .unwrap_or(self.send_interval_secs.saturating_mul(PEER_TIMEOUT_MULTIPLIER)),
        )
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn position_for(&self, id: PeerId) -> Position {
        self.position.unwrap_or_else(|| Position::derived_from(id))
    }

    pub fn greeting_for(&self, id: PeerId) -> Option<String> {
        self.greeting
            .as_ref()
            .map(|g| g.replace("{id}", &id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.port, 30000);
        assert_eq!(cfg.broadcast_address, "255.255.255.255");
        assert_eq!(cfg.receive_timeout(), Duration::from_millis(1000));
        assert_eq!(cfg.send_interval(), Duration::from_secs(5));
        assert_eq!(cfg.peer_timeout(), Duration::from_secs(15));
        assert!(cfg.check().is_ok());
    }

    #[test]
    fn test_peer_timeout_follows_send_interval() {
        let cfg = NodeConfig {
            send_interval_secs: 2,
            ..Default::default()
        };
        assert_eq!(cfg.peer_timeout(), Duration::from_secs(6));
    }

    #[test]
    fn test_validate_clamps_out_of_range() {
        let mut cfg = NodeConfig {
            receive_timeout_ms: 0,
            send_interval_secs: 10,
            peer_timeout_secs: Some(3),
            tick_ms: 0,
            greeting: Some("   ".into()),
            ..Default::default()
        };
        cfg.validate();
        assert_eq!(cfg.receive_timeout_ms, 1);
        assert_eq!(cfg.tick_ms, 1);
        assert_eq!(cfg.peer_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.greeting, None);
    }

    #[test]
    fn test_check_rejects_bad_address_and_port() {
        let cfg = NodeConfig {
            broadcast_address: "localhost".into(),
            ..Default::default()
        };
        assert!(cfg.check().is_err());

        let cfg = NodeConfig {
            port: 0,
            ..Default::default()
        };
        assert!(cfg.check().is_err());
    }

    #[test]
    fn test_greeting_and_position_for_id() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.greeting_for(PeerId(4)).as_deref(), Some("Hello from Node 4"));
        assert_eq!(cfg.position_for(PeerId(1)), Position::derived_from(PeerId(1)));

        let fixed = NodeConfig {
            position: Some(Position::new(50.0, -1.0, 101.0)),
            ..Default::default()
        };
        assert_eq!(fixed.position_for(PeerId(9)), Position::new(50.0, -1.0, 101.0));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = NodeConfig {
            port: 31000,
            peer_timeout_secs: Some(20),
            status_format: StatusFormat::Json,
            position: Some(Position::new(1.5, 2.5, 3.5)),
            ..Default::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(NodeConfig::load(&path), cfg);
    }

    #[test]
    fn test_load_missing_or_invalid_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert_eq!(NodeConfig::load(&missing), NodeConfig::default());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert_eq!(NodeConfig::load(&bad), NodeConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"port": 31234, "status_format": "json"}"#).unwrap();
        let cfg = NodeConfig::load(&path);
        assert_eq!(cfg.port, 31234);
        assert_eq!(cfg.status_format, StatusFormat::Json);
        assert_eq!(cfg.send_interval_secs, 5);
    }

    #[test]
    fn test_huge_send_interval_saturates_peer_timeout() {
        let mut cfg = NodeConfig {
            send_interval_secs: u64::MAX / 2,
            ..Default::default()
        };
        cfg.validate();
        assert_eq!(cfg.peer_timeout(), Duration::from_secs(u64::MAX));

        cfg.peer_timeout_secs = Some(10);
        cfg.validate();
        assert_eq!(cfg.peer_timeout(), Duration::from_secs(u64::MAX / 2));
    }
}
