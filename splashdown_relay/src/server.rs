// WebSocket server and dispatch loop for the relay.
//
// Architecture: thread-per-connection with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts TCP
//   connections and spawns one connection thread per socket.
// - **Connection threads**: perform the WebSocket handshake, create the
//   connection's outbox, and ask the dispatch thread for admission with
//   `InternalEvent::NewConnection`. From then on they run
//   `transport::pump`: inbound text frames are decoded and forwarded as
//   `InternalEvent::MessageFrom` (or `Touched` for frames that failed to
//   decode), outbound frames are drained from the outbox and written. When
//   the pump ends the thread sends `InternalEvent::Disconnected`.
// - **Dispatch thread**: owns the `Registry`, receives events from the
//   channel, and dispatches them. Uses `recv_timeout` so that the idle sweep
//   and the diagnostics log share the thread without a separate timer.
//
// The dispatch thread never touches a socket. Every send it makes is an
// outbox push, so a slow client only ever stalls its own connection thread.
//
// Shutdown: all threads poll a shared `keep_running` flag (cleared by
// `RelayHandle::stop`). Dropping the registry drops every outbox, which
// closes any connection still open.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use splashdown_protocol::codec::{Decoded, decode_client};
use splashdown_protocol::message::ClientMessage;
use splashdown_protocol::types::PlayerId;
use thiserror::Error;
use tracing::{debug, info, warn};
use tungstenite::WebSocket;

use crate::config::{DIAGNOSTICS_INTERVAL, RelayConfig};
use crate::registry::Registry;
use crate::transport::{self, HANDSHAKE_TIMEOUT, Outbound, POLL_INTERVAL};

/// Longest the dispatch loop sleeps before rechecking `keep_running`.
const DISPATCH_WAKE: Duration = Duration::from_millis(100);

/// Most events handled per wake, so a flood cannot starve the sweep.
const MAX_EVENTS_PER_WAKE: usize = 256;

/// Errors starting the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("listener setup failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Reply to a connection thread's admission request.
enum Admission {
    Accepted(PlayerId),
    Rejected,
}

/// Events sent from listener/connection threads to the dispatch thread.
enum InternalEvent {
    NewConnection {
        peer: SocketAddr,
        outbox: Sender<Outbound>,
        reply: Sender<Admission>,
    },
    MessageFrom {
        player_id: PlayerId,
        message: ClientMessage,
    },
    /// A frame arrived but could not be relayed (malformed or unknown type).
    Touched { player_id: PlayerId },
    Disconnected { player_id: PlayerId },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for the dispatch thread to exit.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Block until the relay exits.
    pub fn join(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Start the relay on background threads. Returns a handle for stopping it
/// and the bound address (useful with port 0).
pub fn start_relay(config: RelayConfig) -> Result<(RelayHandle, SocketAddr), RelayError> {
    let bind = format!("{}:{}", config.bind_addr, config.port);
    let listener = TcpListener::bind(&bind).map_err(|source| RelayError::Bind {
        addr: bind.clone(),
        source,
    })?;
    let addr = listener.local_addr()?;
    // Non-blocking so the accept loop can notice shutdown.
    listener.set_nonblocking(true)?;
    info!(
        %addr,
        max_players = config.max_players,
        inactive_timeout_ms = config.inactive_timeout.as_millis() as u64,
        "relay listening"
    );

    let keep_running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = mpsc::channel();

    let keep_running_listener = keep_running.clone();
    thread::spawn(move || accept_loop(listener, tx, keep_running_listener));

    let keep_running_dispatch = keep_running.clone();
    let thread = thread::spawn(move || run_dispatch(config, rx, keep_running_dispatch));

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let tx_conn = tx.clone();
                let keep_running_conn = keep_running.clone();
                thread::spawn(move || connection_thread(stream, peer, tx_conn, keep_running_conn));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(20));
            }
            Err(e) => {
                warn!(error = %e, "accept failed, listener stopping");
                break;
            }
        }
    }
}

/// Main dispatch loop. Runs until `keep_running` is cleared.
fn run_dispatch(config: RelayConfig, rx: Receiver<InternalEvent>, keep_running: Arc<AtomicBool>) {
    let mut registry = Registry::new(config.max_players, config.inactive_timeout);
    let sweep_interval = config.sweep_interval();
    let mut next_sweep = Instant::now() + sweep_interval;
    let mut next_diagnostics = Instant::now() + DIAGNOSTICS_INTERVAL;

    while keep_running.load(Ordering::SeqCst) {
        let now = Instant::now();
        let wait = next_sweep
            .min(next_diagnostics)
            .saturating_duration_since(now)
            .min(DISPATCH_WAKE);

        match rx.recv_timeout(wait) {
            Ok(event) => {
                drain_events(&mut registry, event, &rx);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        if now >= next_sweep {
            let evicted = registry.sweep(now);
            if !evicted.is_empty() {
                info!(count = evicted.len(), "idle sweep evicted players");
            }
            next_sweep = now + sweep_interval;
        }
        if now >= next_diagnostics {
            let ids: Vec<String> = registry.player_ids().iter().map(|id| id.to_string()).collect();
            info!(players = registry.player_count(), ids = ?ids, "relay status");
            next_diagnostics = now + DIAGNOSTICS_INTERVAL;
        }
    }
    info!("relay stopped");
}

/// Handle `first` plus whatever is already queued, up to
/// `MAX_EVENTS_PER_WAKE` in total. Returns how many were handled.
fn drain_events(
    registry: &mut Registry,
    first: InternalEvent,
    rx: &Receiver<InternalEvent>,
) -> usize {
    handle_event(registry, first);
    let mut handled = 1;
    for event in rx.try_iter().take(MAX_EVENTS_PER_WAKE - 1) {
        handle_event(registry, event);
        handled += 1;
    }
    handled
}

/// Dispatch a single event to the registry.
fn handle_event(registry: &mut Registry, event: InternalEvent) {
    match event {
        InternalEvent::NewConnection {
            peer,
            outbox,
            reply,
        } => {
            let admission = match registry.connect(outbox, peer, Instant::now()) {
                Ok(id) => Admission::Accepted(id),
                Err(_) => Admission::Rejected,
            };
            let _ = reply.send(admission);
        }
        InternalEvent::MessageFrom { player_id, message } => {
            registry.handle_message(&player_id, message, Instant::now());
        }
        InternalEvent::Touched { player_id } => {
            registry.touch(&player_id, Instant::now());
        }
        InternalEvent::Disconnected { player_id } => {
            registry.disconnect(&player_id);
        }
    }
}

/// One client's socket, from handshake to close. Runs in its own thread.
fn connection_thread(
    stream: TcpStream,
    peer: SocketAddr,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    let Some(mut ws) = handshake(stream, peer) else {
        return;
    };

    let (outbox_tx, outbox_rx) = mpsc::channel();
    let (reply_tx, reply_rx) = mpsc::channel();
    let request = InternalEvent::NewConnection {
        peer,
        outbox: outbox_tx,
        reply: reply_tx,
    };
    if tx.send(request).is_err() {
        return;
    }
    let player_id = match reply_rx.recv() {
        Ok(Admission::Accepted(id)) => Some(id),
        // The outbox already holds the error frame and close; pump it out.
        Ok(Admission::Rejected) => None,
        Err(_) => return,
    };

    let exit = transport::pump(
        &mut ws,
        &outbox_rx,
        || !keep_running.load(Ordering::SeqCst),
        |text| {
            if let Some(ref id) = player_id {
                forward_frame(&tx, id, &text);
            }
        },
    );
    debug!(%peer, ?exit, "connection closed");

    if let Some(player_id) = player_id {
        let _ = tx.send(InternalEvent::Disconnected { player_id });
    }
}

fn handshake(stream: TcpStream, peer: SocketAddr) -> Option<WebSocket<TcpStream>> {
    if let Err(e) = stream
        .set_nonblocking(false)
        .and_then(|()| stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)))
    {
        warn!(%peer, error = %e, "failed to configure socket");
        return None;
    }
    let ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            debug!(%peer, error = %e, "websocket handshake failed");
            return None;
        }
    };
    if let Err(e) = ws.get_ref().set_read_timeout(Some(POLL_INTERVAL)) {
        warn!(%peer, error = %e, "failed to set poll timeout");
        return None;
    }
    Some(ws)
}

/// Decode one inbound frame and hand it to the dispatch thread. Frames that
/// cannot be relayed still count as activity.
fn forward_frame(tx: &Sender<InternalEvent>, player_id: &PlayerId, text: &str) {
    let event = match decode_client(text) {
        Ok(Decoded::Message(message)) => InternalEvent::MessageFrom {
            player_id: player_id.clone(),
            message,
        },
        Ok(Decoded::Unknown(kind)) => {
            debug!(%player_id, %kind, "ignoring unknown frame type");
            InternalEvent::Touched {
                player_id: player_id.clone(),
            }
        }
        Err(e) => {
            warn!(%player_id, error = %e, "dropping malformed frame");
            InternalEvent::Touched {
                player_id: player_id.clone(),
            }
        }
    };
    let _ = tx.send(event);
}
