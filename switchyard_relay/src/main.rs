// Standalone relay binary.
//
//   relay --port 7878 --name yard --turn-ms 50 --max-players 8
//
// Logging goes through env_logger; set `RUST_LOG=switchyard=debug` to see
// every turn.

use clap::Parser;
use switchyard_relay::{RelayConfig, start_relay};

#[derive(Debug, Parser)]
#[command(name = "relay", about = "Switchyard turn-ordering relay")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
    /// Port to listen on (0 picks a free port).
    #[arg(long, default_value_t = 7878)]
    port: u16,
    /// Session name shown to joining players.
    #[arg(long, default_value = "switchyard")]
    name: String,
    /// Require this password in Hello.
    #[arg(long)]
    password: Option<String>,
    /// Turn cadence in milliseconds.
    #[arg(long = "turn-ms", default_value_t = 50)]
    turn_ms: u32,
    #[arg(long, default_value_t = 8)]
    max_players: usize,
}

impl From<Cli> for RelayConfig {
    fn from(cli: Cli) -> Self {
        Self {
            bind_addr: cli.bind,
            port: cli.port,
            session_name: cli.name,
            password: cli.password,
            turn_duration_ms: cli.turn_ms,
            max_players: cli.max_players,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = RelayConfig::from(Cli::parse());

    match start_relay(config) {
        Ok((handle, addr)) => {
            log::info!("relay ready on {addr}; stop with Ctrl+C");
            handle.join();
        }
        Err(e) => {
            log::error!("failed to start relay: {e}");
            std::process::exit(1);
        }
    }
}
