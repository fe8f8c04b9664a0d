mod cli;
mod daemon;

use clap::{Parser, Subcommand};

use peer_beacon::PeerId;

#[derive(Parser)]
#[command(name = "peer-beacon", version, about = "Peer Beacon: presence and position over UDP broadcast")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a node until Ctrl-C, SIGTERM or Enter
    Run {
        /// Node id, unique on the broadcast domain
        id: PeerId,
        #[command(flatten)]
        overrides: cli::RunOverrides,
    },
    /// Broadcast one text message and exit
    Say {
        /// Node id to send as
        id: PeerId,
        /// Message body (truncated to 63 bytes)
        text: String,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long = "broadcast")]
        broadcast_address: Option<String>,
        #[arg(long)]
        config: Option<String>,
    },
    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as JSON
    Show {
        #[arg(long)]
        config: Option<String>,
    },
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
        #[arg(long)]
        config: Option<String>,
    },
    /// Print the configuration file path
    Path,
}

fn main() {
    let app = App::parse();

    match app.command {
        // Run: the node process itself; exits 1 on transport init failure
        Commands::Run { id, overrides } => {
            let config = match cli::load_config(overrides.config.as_deref()) {
                Ok(mut config) => {
                    overrides.apply(&mut config);
                    config
                }
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    std::process::exit(2);
                }
            };
            if let Err(e) = config.check() {
                eprintln!("Error: {}", e);
                std::process::exit(2);
            }
            daemon::run(id, config);
        }

        Commands::Say { id, text, port, broadcast_address, config } => {
            cli::say::run(id, &text, port, broadcast_address.as_deref(), config.as_deref())
                .unwrap_or_else(|e| {
                    eprintln!("Error: {:#}", e);
                    std::process::exit(1);
                });
        }

        Commands::Config { action } => {
            let result = match action {
                ConfigAction::Show { config } => cli::config::run_show(config.as_deref()),
                ConfigAction::Init { force, config } => {
                    cli::config::run_init(config.as_deref(), force)
                }
                ConfigAction::Path => cli::config::run_path(),
            };
            result.unwrap_or_else(|e| eprintln!("Error: {:#}", e));
        }
    }
}
