#[allow(clippy::module_inception)]
pub mod registry;

pub use registry::{PeerRecord, PeerRegistry};
