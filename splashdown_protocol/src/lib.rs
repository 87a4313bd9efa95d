// splashdown_protocol: wire protocol between the relay and game clients.
//
// This crate defines the frame vocabulary and JSON text codec used by the
// relay (`splashdown_relay`) and the client simulation (`splashdown_sim`).
// It knows nothing about sockets or physics; both sides depend on it.
//
// Module overview:
// - `types.rs`:    `PlayerId`, the `Vec3` math/wire vector, `PlayerSnapshot`.
// - `message.rs`:  `ClientMessage` (client to relay) and `ServerMessage`
//                  (relay to client), internally tagged by `type`.
// - `codec.rs`:    `encode` plus `decode_client`/`decode_server`, which
//                  separate unknown frame types from malformed frames.
//
// Design decisions:
// - **JSON text frames.** Browser clients speak JSON over WebSocket text
//   frames, so the relay does too. One JSON object per frame, no extra
//   length prefix.
// - **No relay-side validation.** `waterBalloon` velocities and `update`
//   transforms are relayed as received. The relay is a broadcaster, not an
//   authority.

pub mod codec;
pub mod message;
pub mod types;

pub use codec::{CodecError, Decoded, decode_client, decode_server, encode};
pub use message::{ClientMessage, ServerMessage};
pub use types::{PlayerId, PlayerSnapshot, Vec3};
