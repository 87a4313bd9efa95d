// WebSocket socket pump shared by the relay's connection threads and the
// client-side `NetClient`.
//
// Each socket is owned by exactly one thread, which alternates between two
// jobs until the channel closes:
// - draining an `mpsc` outbox of `Outbound` commands and writing them;
// - reading inbound frames with a short socket read timeout, handing text
//   frames to a callback.
//
// Every other thread talks to the socket only through the outbox, so a
// producer never blocks on network I/O. Dropping all outbox senders closes
// the socket just like an explicit `Outbound::Close`.
//
// After a close has been initiated the pump keeps reading (so tungstenite
// can complete the close handshake) for at most `CLOSE_LINGER`.

use std::io;
use std::net::TcpStream;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use tracing::debug;
use tungstenite::{Error as WsError, Message, WebSocket};

/// Socket read timeout while pumping. Bounds the latency of outbound frames
/// queued while the thread is blocked in `read`.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read timeout for the opening handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for the peer to answer our close frame.
const CLOSE_LINGER: Duration = Duration::from_secs(1);

/// A command for the thread that owns a socket.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// An encoded JSON text frame.
    Frame(String),
    /// Send a close frame and shut the channel down.
    Close,
}

/// Why a pump loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpExit {
    /// The peer closed, or a close we initiated completed or timed out.
    Closed,
    /// The stop predicate returned true.
    Stopped,
    /// A read or write failed.
    Failed,
}

/// Pump `ws` until the channel closes or `should_stop` returns true.
///
/// `ws` must wrap a stream whose read timeout is already set (usually to
/// `POLL_INTERVAL`); a blocking read would starve the outbox.
pub fn pump(
    ws: &mut WebSocket<TcpStream>,
    outbox: &Receiver<Outbound>,
    mut should_stop: impl FnMut() -> bool,
    mut on_text: impl FnMut(String),
) -> PumpExit {
    let mut closing_since: Option<Instant> = None;

    loop {
        if should_stop() {
            let _ = ws.close(None);
            let _ = ws.flush();
            return PumpExit::Stopped;
        }

        if closing_since.is_none() {
            match drain_outbox(ws, outbox) {
                Ok(true) => {}
                Ok(false) => {
                    let _ = ws.close(None);
                    closing_since = Some(Instant::now());
                }
                Err(e) => {
                    debug!(error = %e, "socket write failed");
                    return PumpExit::Failed;
                }
            }
        }
        match ws.flush() {
            Ok(()) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return PumpExit::Closed,
            Err(e) => {
                debug!(error = %e, "socket flush failed");
                return PumpExit::Failed;
            }
        }

        if closing_since.is_some_and(|since| since.elapsed() >= CLOSE_LINGER) {
            return PumpExit::Closed;
        }

        match ws.read() {
            Ok(Message::Text(text)) => {
                if closing_since.is_none() {
                    on_text(text);
                }
            }
            Ok(Message::Close(_)) => {
                // tungstenite queues the close reply; the next flush or read
                // reports the connection as closed.
                closing_since.get_or_insert_with(Instant::now);
            }
            Ok(Message::Binary(_)) => debug!("ignoring binary frame"),
            Ok(_) => {}
            Err(e) if is_timeout(&e) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return PumpExit::Closed,
            Err(e) => {
                debug!(error = %e, "socket read failed");
                return PumpExit::Failed;
            }
        }
    }
}

/// Write every queued frame. Returns `Ok(false)` once a close was requested
/// or every sender is gone.
fn drain_outbox(
    ws: &mut WebSocket<TcpStream>,
    outbox: &Receiver<Outbound>,
) -> Result<bool, WsError> {
    loop {
        match outbox.try_recv() {
            Ok(Outbound::Frame(text)) => ws.write(Message::Text(text))?,
            Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => return Ok(false),
            Err(TryRecvError::Empty) => return Ok(true),
        }
    }
}

fn is_timeout(e: &WsError) -> bool {
    matches!(
        e,
        WsError::Io(io) if matches!(io.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
    )
}
