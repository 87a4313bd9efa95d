// Relay configuration.
//
// `RelayConfig` is read from the environment (`PORT`, `MAX_PLAYERS`,
// `INACTIVE_TIMEOUT` in milliseconds, `BIND_ADDR`), with the relay binary
// layering command-line flags on top (see `main.rs`). Values that fail to
// parse are logged and replaced by the default rather than aborting startup.
//
// Lookup goes through a closure so tests can feed a fixed table instead of
// mutating the process environment.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Upper bound on the idle-sweep interval.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How often the dispatch loop logs the connected-player roster.
pub const DIAGNOSTICS_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for starting a relay server.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub port: u16,
    pub max_players: usize,
    /// A session with no inbound frame for longer than this is evicted.
    pub inactive_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: 3000,
            max_players: 50,
            inactive_timeout: Duration::from_millis(60_000),
        }
    }
}

impl RelayConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys keep their
    /// defaults; unparseable values keep their defaults and log a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout_ms = parse_or(
            &lookup,
            "INACTIVE_TIMEOUT",
            defaults.inactive_timeout.as_millis() as u64,
        );
        Self {
            bind_addr: lookup("BIND_ADDR")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.bind_addr),
            port: parse_or(&lookup, "PORT", defaults.port),
            max_players: parse_or(&lookup, "MAX_PLAYERS", defaults.max_players),
            inactive_timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Interval between idle sweeps: twice the timeout, capped at five
    /// minutes.
    pub fn sweep_interval(&self) -> Duration {
        (self.inactive_timeout * 2).min(MAX_SWEEP_INTERVAL)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "unparseable config value, using default");
                default
            }
        },
    }
}
