pub mod discovery;
pub mod protocol;
pub mod transport;

pub use discovery::{run_receive_loop, run_send_loop, BeaconPlan, NodeObserver, SilentObserver};
pub use protocol::{Message, MessageKind, PositionReport, TextMessage};
pub use transport::{BroadcastReceiver, BroadcastSender, BroadcastSink, BroadcastTransport, Datagram, DatagramSource};
