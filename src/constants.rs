// === Wire ===
pub const PREFIX_SIZE: usize = 8;
pub const TEXT_CAPACITY: usize = 64;
pub const RECEIVE_BUFFER_SIZE: usize = 2048;

// === Transport defaults ===
pub const DEFAULT_PORT: u16 = 30_000;
pub const DEFAULT_BROADCAST_ADDRESS: &str = "255.255.255.255";
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 1_000;

// === Beacon cadence ===
pub const DEFAULT_SEND_INTERVAL_SECS: u64 = 5;
pub const PEER_TIMEOUT_MULTIPLIER: u64 = 3; // peer timeout = 3 x send interval
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_TICK_MS: u64 = 100; // send loop sleep between iterations

// === Derived position (when none is configured) ===
pub const BASE_LATITUDE: f64 = 50.0;
pub const BASE_LONGITUDE: f64 = -1.0;
pub const BASE_ALTITUDE: f64 = 100.0;
pub const POSITION_STEP_DEG: f64 = 0.01;
