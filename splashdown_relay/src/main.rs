// CLI entry point for the Splashdown relay.
//
// Starts a standalone relay that game clients connect to over WebSocket.
// Configuration comes from the environment (see `config.rs`), and any flags
// given here override it. Logging goes through `tracing`; set `RUST_LOG` to
// change the filter (default `info`).
//
// Usage:
//   relay [OPTIONS]
//     --port <PORT>                Listen port (env PORT, default: 3000)
//     --bind <ADDR>                Bind address (env BIND_ADDR, default: 0.0.0.0)
//     --max-players <N>            Player cap (env MAX_PLAYERS, default: 50)
//     --inactive-timeout <MS>      Idle eviction timeout in ms
//                                  (env INACTIVE_TIMEOUT, default: 60000)

use std::time::Duration;

use splashdown_relay::config::RelayConfig;
use splashdown_relay::server::start_relay;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = parse_args(RelayConfig::from_env());

    let (handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to start relay");
            std::process::exit(1);
        }
    };

    info!(%addr, "accepting connections at ws://{addr}/ (Ctrl+C to stop)");
    // The process exits on SIGINT/SIGTERM; connection threads die with it.
    handle.join();
}

/// Apply command-line flags on top of `config`. Uses simple
/// `std::env::args()` matching.
fn parse_args(mut config: RelayConfig) -> RelayConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = flag_value(&args, i, "--port requires a valid port number");
            }
            "--bind" => {
                i += 1;
                config.bind_addr = flag_value(&args, i, "--bind requires an address");
            }
            "--max-players" => {
                i += 1;
                config.max_players = flag_value(&args, i, "--max-players requires a valid number");
            }
            "--inactive-timeout" => {
                i += 1;
                let ms: u64 = flag_value(&args, i, "--inactive-timeout requires milliseconds");
                config.inactive_timeout = Duration::from_millis(ms);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn flag_value<T: std::str::FromStr>(args: &[String], i: usize, error: &str) -> T {
    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{error}");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>             Listen port (env PORT, default: 3000)");
    println!("  --bind <ADDR>             Bind address (env BIND_ADDR, default: 0.0.0.0)");
    println!("  --max-players <N>         Player cap (env MAX_PLAYERS, default: 50)");
    println!("  --inactive-timeout <MS>   Idle timeout in ms (env INACTIVE_TIMEOUT, default: 60000)");
    println!("  --help, -h                Show this help");
}
