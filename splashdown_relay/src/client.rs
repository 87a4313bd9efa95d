// WebSocket client for connecting to the relay.
//
// Provides a non-blocking interface for a game loop to talk to the relay.
// Architecture:
// - `connect()` performs the TCP connect and WebSocket handshake on the
//   calling thread, then hands the socket to a background I/O thread.
// - The I/O thread runs `transport::pump`: it decodes inbound frames into
//   `ServerMessage`s and pushes them into an inbox channel, and writes
//   whatever the game thread queued in the outbox.
// - `poll()` drains the inbox without blocking. The last event a client
//   ever yields is `ClientEvent::Closed`.
//
// Malformed inbound frames and unknown frame types are logged and skipped;
// neither closes the connection.
//
// This module lives in the relay crate because it shares the socket pump
// with the server and has no dependency on the simulation. Living here makes
// it available to the end-to-end tests and any embedding game shell.

use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use splashdown_protocol::codec::{CodecError, Decoded, decode_server, encode};
use splashdown_protocol::message::{ClientMessage, ServerMessage};
use thiserror::Error;
use tracing::{debug, warn};
use tungstenite::http::Uri;

use crate::transport::{self, HANDSHAKE_TIMEOUT, Outbound, POLL_INTERVAL};

/// Errors connecting to or sending through the relay.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid relay url: {0}")]
    InvalidUrl(#[from] tungstenite::http::uri::InvalidUri),
    #[error("relay url has no host")]
    MissingHost,
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("connection closed")]
    Closed,
}

/// Something that happened on the connection.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    Message(ServerMessage),
    /// The channel closed, from either side. No further events follow.
    Closed,
}

/// WebSocket client for relay communication.
pub struct NetClient {
    outbox: Sender<Outbound>,
    inbox: Receiver<ClientEvent>,
    _io_thread: JoinHandle<()>,
    closed: bool,
}

impl NetClient {
    /// Connect to a relay at `url` (e.g. `ws://127.0.0.1:3000/`).
    pub fn connect(url: &str) -> Result<Self, ClientError> {
        let uri: Uri = url.parse()?;
        let stream = TcpStream::connect(dial_target(&uri)?)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
        let (mut ws, _response) = tungstenite::client::client(url, stream)
            .map_err(|e| ClientError::Handshake(e.to_string()))?;
        ws.get_ref().set_read_timeout(Some(POLL_INTERVAL))?;

        let (outbox_tx, outbox_rx) = mpsc::channel();
        let (inbox_tx, inbox_rx) = mpsc::channel();
        let io_thread = thread::spawn(move || {
            let exit = transport::pump(&mut ws, &outbox_rx, || false, |text| {
                match decode_server(&text) {
                    Ok(Decoded::Message(msg)) => {
                        debug!(kind = msg.kind(), subject = ?msg.subject(), "frame from relay");
                        let _ = inbox_tx.send(ClientEvent::Message(msg));
                    }
                    Ok(Decoded::Unknown(kind)) => debug!(%kind, "ignoring unknown frame type"),
                    Err(e) => warn!(error = %e, "dropping malformed frame from relay"),
                }
            });
            debug!(?exit, "relay connection closed");
            let _ = inbox_tx.send(ClientEvent::Closed);
        });

        Ok(Self {
            outbox: outbox_tx,
            inbox: inbox_rx,
            _io_thread: io_thread,
            closed: false,
        })
    }

    /// Queue a message for the relay.
    pub fn send(&self, msg: &ClientMessage) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        let text = encode(msg)?;
        self.outbox
            .send(Outbound::Frame(text))
            .map_err(|_| ClientError::Closed)
    }

    /// Drain all queued events (non-blocking).
    pub fn poll(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbox.try_recv() {
            if event == ClientEvent::Closed {
                self.closed = true;
            }
            events.push(event);
        }
        events
    }

    /// Whether `Closed` has been observed by `poll`.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start a graceful close. `poll` reports `Closed` once it completes.
    pub fn close(&self) {
        let _ = self.outbox.send(Outbound::Close);
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Host and port to dial for `uri`. IPv6 literals come back from `Uri`
/// bracketed, which socket resolution does not accept.
fn dial_target(uri: &Uri) -> Result<(&str, u16), ClientError> {
    let host = uri.host().ok_or(ClientError::MissingHost)?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    Ok((host, uri.port_u16().unwrap_or(80)))
}
