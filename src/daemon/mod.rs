use std::io::BufRead;
use std::sync::Arc;

use peer_beacon::config::NodeConfig;
use peer_beacon::network::{run_receive_loop, run_send_loop, BeaconPlan, BroadcastTransport};
use peer_beacon::paths;
use peer_beacon::{PeerId, PeerRegistry, ShutdownToken};

use crate::cli::status::ConsoleObserver;

/// Run one node in the foreground.
///
/// Two duty threads share the registry:
///   - receiver: owns the receive socket, ingests peers
///   - sender: owns the send socket, announces this node and sweeps silent peers
///
/// Shutdown comes from SIGINT/SIGTERM or Enter on stdin. Both threads hand
/// their socket back on exit and the transport is closed after the join.
pub fn run(id: PeerId, config: NodeConfig) {
    let log_file = config.log_file.as_deref().map(paths::expand_tilde);
    peer_beacon::tracing_init::init_tracing(log_file.as_deref());

    tracing::info!(
        node = %id,
        port = config.port,
        broadcast = %config.broadcast_address,
        send_interval_secs = config.send_interval_secs,
        peer_timeout_secs = config.peer_timeout().as_secs(),
        "Starting peer-beacon node"
    );

    let transport = match BroadcastTransport::open(
        config.port,
        &config.broadcast_address,
        config.receive_timeout(),
    ) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, fatal = e.is_fatal(), "Transport initialization failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let registry = Arc::new(PeerRegistry::new(id));
    let observer = Arc::new(ConsoleObserver::new(config.status_format));
    let shutdown = ShutdownToken::new();
    let plan = BeaconPlan::from_config(id, &config);
    tracing::info!(position = %plan.position, "Advertised position");

    // Signal handlers (cross-platform)
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.flag()).ok();
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.flag()).ok();

    let (tx, mut rx) = transport.split();

    // Start receiver thread
    let rx_handle = {
        let registry = registry.clone();
        let observer = observer.clone();
        let shutdown = shutdown.clone();
        std::thread::Builder::new()
            .name("beacon-rx".into())
            .spawn(move || {
                run_receive_loop(&mut rx, &registry, observer.as_ref(), &shutdown);
                rx
            })
    };

    // Start sender thread
    let tx_handle = {
        let registry = registry.clone();
        let observer = observer.clone();
        let shutdown = shutdown.clone();
        std::thread::Builder::new()
            .name("beacon-tx".into())
            .spawn(move || {
                run_send_loop(&tx, &registry, plan, observer.as_ref(), &shutdown);
                tx
            })
    };

    let (rx_handle, tx_handle) = match (rx_handle, tx_handle) {
        (Ok(rx), Ok(tx)) => (rx, tx),
        (rx, tx) => {
            tracing::error!("Failed to spawn duty threads");
            shutdown.cancel();
            if let Ok(h) = rx {
                let _ = h.join();
            }
            if let Ok(h) = tx {
                let _ = h.join();
            }
            std::process::exit(1);
        }
    };

    spawn_stdin_watch(shutdown.clone());
    println!("[node {}] Running. Press Enter to stop...", id);

    let rx = rx_handle.join();
    let tx = tx_handle.join();
    match (tx, rx) {
        (Ok(tx), Ok(rx)) => BroadcastTransport::reunite(tx, rx).close(),
        _ => tracing::error!("A duty thread panicked; sockets dropped without close"),
    }

    let remaining = registry.len();
    tracing::info!(known_peers = remaining, "Node shutdown complete");
}

/// Cancel on the first line read from stdin. EOF (detached stdin) is not a
/// stop request: a node started without a terminal keeps running.
fn spawn_stdin_watch(shutdown: ShutdownToken) {
    let spawned = std::thread::Builder::new()
        .name("stdin-watch".into())
        .spawn(move || {
            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) => tracing::debug!("stdin closed, Enter-to-stop disabled"),
                Ok(_) => shutdown.cancel(),
                Err(e) => tracing::debug!(error = %e, "stdin unreadable, Enter-to-stop disabled"),
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Failed to spawn stdin watcher");
    }
}

