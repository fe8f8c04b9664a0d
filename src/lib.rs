//! Peer Beacon: coordinator-free presence over UDP broadcast.
//!
//! Every node broadcasts its position and a heartbeat, listens for the same
//! from everybody else, and keeps a registry of who is reachable and where.
//! Peers that go quiet for longer than the timeout are swept out.

// Foundation
pub mod constants;
pub mod error;
pub mod paths;
pub mod peer;
pub mod shutdown;

// Configuration + logging
pub mod config;
pub mod tracing_init;

// Sub-systems
pub mod network;
pub mod registry;
pub mod status;

#[cfg(test)]
pub mod test_helpers;

// Re-exports for convenience
pub use config::NodeConfig;
pub use error::{BeaconError, BeaconResult, DecodeError, InitStage, TransportError};
pub use peer::{PeerId, Position};
pub use registry::{PeerRecord, PeerRegistry};
pub use shutdown::ShutdownToken;
