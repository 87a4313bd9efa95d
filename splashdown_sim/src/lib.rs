// splashdown_sim: client-side game simulation.
//
// Everything a Splashdown client computes locally, with no rendering, no
// windowing, and no sockets: on-foot locomotion with static collision,
// plane flight, water balloons, the third-person camera rig, the mirror of
// remote players, and the publish/reconnect schedulers. A render layer
// feeds input and frame deltas in and draws `RenderFrame`s; a network layer
// shuttles `ClientMessage`/`ServerMessage` values between `ClientGame` and
// the relay.
//
// Module overview:
// - `game.rs`:       ClientGame: owns all client state; tick/render/input/network entry points.
// - `config.rs`:     SimConfig: every tunable constant, nested parameter groups, JSON overrides.
// - `player.rs`:     Local player: jump state, on-foot movement, look.
// - `flight.rs`:     Plane flight model (speed, pitch, yaw, banking, altitude).
// - `projectile.rs`: Water balloon ballistics, local raycast hits, splashes, TTL.
// - `world.rs`:      Static trees/buildings, targets, movement blocking and ray queries.
// - `camera.rs`:     On-foot and chase camera poses; throw origin and direction.
// - `mirror.rs`:     RemoteMirror: cache of other players fed by relay frames.
// - `sync.rs`:       PublishSchedule and ReconnectBackoff.
// - `input.rs`:      Held-action set with edge detection.
// - `frame.rs`:      FrameClock: display timestamps to frame deltas.
// - `math.rs`:       Euler rotations and yaw-frame basis vectors.
//
// The sim is single-threaded and never blocks. Collections are
// `BTreeMap`/`BTreeSet`, so render and test output iterate in a fixed
// order.

pub mod camera;
pub mod config;
pub mod flight;
pub mod frame;
pub mod game;
pub mod input;
pub mod math;
pub mod mirror;
pub mod player;
pub mod projectile;
pub mod sync;
pub mod world;

pub use config::SimConfig;
pub use game::{ClientGame, RemoteView, RenderFrame};
pub use input::Action;
pub use world::World;
