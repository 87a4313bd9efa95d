// splashdown_relay: WebSocket relay broadcaster for Splashdown.
//
// The relay is a thin message broker: it accepts WebSocket connections from
// game clients, assigns each an id, and fans every `update` and
// `waterBalloon` frame out to all other clients. It keeps only the latest
// transform per player (for the `init` roster) and never runs any game
// logic; physics stays on the clients.
//
// Module overview:
// - `registry.rs`:  Session state: admission and the player cap, id minting,
//                   relaying, disconnect and idle eviction. The core data
//                   structure that `server.rs` drives.
// - `server.rs`:    TCP listener, connection threads (one per client), and
//                   the dispatch loop with the idle-sweep and diagnostics
//                   timers.
// - `transport.rs`: The outbox/read-timeout socket pump shared by the
//                   server's connection threads and `NetClient`.
// - `client.rs`:    `NetClient`, a non-blocking client used by game shells
//                   and end-to-end tests.
// - `config.rs`:    `RelayConfig`, read from the environment.
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in a
// test or game process via the library API (`start_relay`).

pub mod client;
pub mod config;
pub mod registry;
pub mod server;
pub mod transport;

pub use client::{ClientError, ClientEvent, NetClient};
pub use config::RelayConfig;
pub use server::{RelayError, RelayHandle, start_relay};
