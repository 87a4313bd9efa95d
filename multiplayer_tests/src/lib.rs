// Networked game client glue for end-to-end tests.
//
// `GameClient` pairs a real `NetClient` (from `splashdown_relay::client`)
// with a real `ClientGame` (from `splashdown_sim::game`) and shuttles
// messages between them, exactly as an embedding game shell would:
// - inbound relay frames go to `ClientGame::handle_server_message`;
// - frames the game queued (`drain_outbound`) go to the socket;
// - a closed channel calls `ClientGame::on_disconnected` and schedules a
//   reconnect after the returned backoff delay. Retries never stop.
//
// Each frame is stamped with milliseconds since the client was created and
// fed through a `FrameClock`, the same way a display callback would drive
// it. The only test-specific code is `run_until`, a blocking loop that
// produces those frames at wall-clock pace until a predicate holds.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use splashdown_relay::client::{ClientEvent, NetClient};
use splashdown_sim::config::SimConfig;
use splashdown_sim::frame::FrameClock;
use splashdown_sim::game::ClientGame;
use splashdown_sim::world::World;
use tracing::{debug, warn};

/// Default timeout for blocking loops.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// Wall-clock pace of `run_until`.
const FRAME_INTERVAL: Duration = Duration::from_millis(10);

pub struct GameClient {
    url: String,
    net: Option<NetClient>,
    retry_at: Option<Instant>,
    /// Cleared by `disconnect`; no further connection attempts.
    reconnect: bool,
    epoch: Instant,
    clock: FrameClock,
    pub game: ClientGame,
}

impl GameClient {
    /// A client for the relay at `url`. Does not connect until `pump`.
    pub fn new(url: impl Into<String>, game: ClientGame) -> Self {
        Self {
            url: url.into(),
            net: None,
            retry_at: None,
            reconnect: true,
            epoch: Instant::now(),
            clock: FrameClock::default(),
            game,
        }
    }

    /// An active default game connected to a local relay.
    pub fn connect(addr: SocketAddr) -> Self {
        let mut game = ClientGame::new(SimConfig::default(), World::default());
        game.set_active(true);
        let mut client = Self::new(format!("ws://{addr}/"), game);
        client.pump();
        client
    }

    pub fn is_connected(&self) -> bool {
        self.net.is_some() && self.game.is_connected()
    }

    fn try_connect(&mut self) {
        match NetClient::connect(&self.url) {
            Ok(net) => {
                debug!(url = %self.url, "connected to relay");
                self.net = Some(net);
                self.retry_at = None;
                self.game.on_connected();
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "connect failed");
                self.schedule_retry();
            }
        }
    }

    fn schedule_retry(&mut self) {
        self.net = None;
        let delay = self.game.on_disconnected();
        self.retry_at = Some(Instant::now() + delay);
    }

    /// Move messages both ways and handle (re)connection. Never blocks
    /// beyond a connection attempt.
    pub fn pump(&mut self) {
        let retry_due = self.retry_at.is_none_or(|at| Instant::now() >= at);
        if self.reconnect && self.net.is_none() && retry_due {
            self.try_connect();
        }

        let mut closed = false;
        if let Some(net) = self.net.as_mut() {
            for event in net.poll() {
                match event {
                    ClientEvent::Message(msg) => self.game.handle_server_message(msg),
                    ClientEvent::Closed => closed = true,
                }
            }
        }
        if closed {
            self.schedule_retry();
            return;
        }

        let outbound = self.game.drain_outbound();
        if let Some(net) = self.net.as_ref() {
            for msg in &outbound {
                if let Err(e) = net.send(msg) {
                    warn!(error = %e, "send failed");
                    break;
                }
            }
        }
    }

    /// Tick the game by `dt` seconds, then pump.
    pub fn step(&mut self, dt: f64) {
        self.game.tick(dt);
        self.pump();
    }

    /// One display frame at `timestamp_ms`. The first frame only primes
    /// the clock.
    pub fn frame(&mut self, timestamp_ms: f64) {
        let dt = self.clock.advance(timestamp_ms);
        self.step(dt);
    }

    /// Milliseconds since this client was created.
    fn timestamp_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn frame_now(&mut self) {
        let now = self.timestamp_ms();
        self.frame(now);
    }

    /// Step at wall-clock pace until `done` holds. Returns false on timeout.
    pub fn run_until(
        &mut self,
        timeout: Duration,
        mut done: impl FnMut(&ClientGame) -> bool,
    ) -> bool {
        let start = Instant::now();
        loop {
            if done(&self.game) {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(FRAME_INTERVAL);
            self.frame_now();
        }
    }

    /// Close the connection and stop reconnecting.
    pub fn disconnect(&mut self) {
        self.reconnect = false;
        self.retry_at = None;
        if let Some(net) = self.net.take() {
            net.close();
            self.game.on_disconnected();
        }
    }
}

/// Step every client in lockstep until `done` holds. Returns false on
/// timeout.
pub fn run_all_until(
    clients: &mut [&mut GameClient],
    timeout: Duration,
    mut done: impl FnMut(&[&mut GameClient]) -> bool,
) -> bool {
    let start = Instant::now();
    loop {
        if done(clients) {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        thread::sleep(FRAME_INTERVAL);
        for client in clients.iter_mut() {
            client.frame_now();
        }
    }
}
