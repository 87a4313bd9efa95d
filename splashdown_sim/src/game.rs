// Per-client game orchestrator.
//
// `ClientGame` owns every piece of client state (local player, plane,
// balloons, targets, remote mirror, sync schedulers) and is driven from
// outside by three kinds of calls:
// - input: `press`/`release`/`look`/`throw_balloon`/`toggle_plane` and
//   `set_active` for the pointer-capture gate;
// - network: `handle_server_message`, `on_connected`, `on_disconnected`,
//   plus `drain_outbound` to collect frames for the socket;
// - time: `tick(frame_dt)` once per display frame, then `render()`.
//
// A tick runs input -> physics -> collision -> publish. The client clock
// (balloon TTL, publish cadence) advances by the real frame delta, while
// integration uses the delta capped at `SimConfig::max_dt`. An inactive
// game skips the whole update but its clock keeps running.
//
// The game never blocks and never talks to a socket; the glue that owns a
// `NetClient` lives in `multiplayer_tests`.

use std::time::Duration;

use glam::DVec3;
use splashdown_protocol::message::{ClientMessage, ServerMessage};
use splashdown_protocol::types::PlayerId;
use tracing::{debug, info};

use crate::camera::CameraPose;
use crate::config::SimConfig;
use crate::flight::Plane;
use crate::input::{Action, InputState};
use crate::mirror::{MirrorEffect, RemoteMirror};
use crate::player::{JumpState, Mode, Player};
use crate::projectile::{Outcome, Projectile, Provenance, Splash};
use crate::sync::{PublishSchedule, ReconnectBackoff};
use crate::world::{Target, TargetId, World};

/// A remote player as the renderer sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteView {
    pub id: PlayerId,
    pub position: DVec3,
    pub rotation: DVec3,
    pub is_in_plane: bool,
}

/// Everything the render collaborator needs for one frame.
#[derive(Clone, Debug)]
pub struct RenderFrame {
    pub player: Player,
    pub plane: Plane,
    pub camera: CameraPose,
    pub aiming: bool,
    pub remote_players: Vec<RemoteView>,
    pub projectiles: Vec<Projectile>,
    pub targets: Vec<Target>,
    /// Splashes since the previous `render`.
    pub splashes: Vec<Splash>,
    /// Remote players plus the local one.
    pub player_count: usize,
    /// The crosshair ray hits a target or a tree.
    pub target_in_sight: bool,
    pub connected: bool,
    pub status: Option<String>,
}

pub struct ClientGame {
    config: SimConfig,
    world: World,
    targets: Vec<Target>,
    next_target_id: u32,
    player: Player,
    plane: Plane,
    input: InputState,
    projectiles: Vec<Projectile>,
    splashes: Vec<Splash>,
    mirror: RemoteMirror,
    publish: PublishSchedule,
    backoff: ReconnectBackoff,
    outbound: Vec<ClientMessage>,
    camera: CameraPose,
    clock_ms: f64,
    connected: bool,
    active: bool,
    status: Option<String>,
}

impl ClientGame {
    /// A new game, inactive and disconnected, with the player on foot at
    /// the origin and the plane parked.
    pub fn new(config: SimConfig, world: World) -> Self {
        let player = Player::default();
        let plane = Plane::parked(&config.flight);
        let camera = CameraPose::on_foot(&player, false, &config.camera);
        Self {
            config,
            world,
            targets: Vec::new(),
            next_target_id: 0,
            player,
            plane,
            input: InputState::default(),
            projectiles: Vec::new(),
            splashes: Vec::new(),
            mirror: RemoteMirror::default(),
            publish: PublishSchedule::default(),
            backoff: ReconnectBackoff::default(),
            outbound: Vec::new(),
            camera,
            clock_ms: 0.0,
            connected: false,
            active: false,
            status: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn mirror(&self) -> &RemoteMirror {
        &self.mirror
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Place a destructible target. Returns its id.
    pub fn add_target(&mut self, center: DVec3, radius: f64) -> TargetId {
        let id = TargetId(self.next_target_id);
        self.next_target_id += 1;
        self.targets.push(Target { id, center, radius });
        id
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Pointer captured (true) or released (false). Releasing drops every
    /// held key.
    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            debug!(active, "activity changed");
        }
        self.active = active;
        if !active {
            self.input.clear();
        }
    }

    pub fn press(&mut self, action: Action) {
        let edge = self.input.press(action);
        if edge && action == Action::Jump && self.active {
            self.player.try_jump(&self.config.jump);
        }
    }

    pub fn release(&mut self, action: Action) {
        self.input.release(action);
    }

    /// Pointer motion in pixels.
    pub fn look(&mut self, dx: f64, dy: f64) {
        if self.active {
            self.player.look(dx, dy, &self.config.look);
        }
    }

    fn aiming(&self) -> bool {
        !self.player.is_piloting() && self.input.is_held(Action::Aim)
    }

    fn refresh_camera(&mut self) {
        self.camera = if self.player.is_piloting() {
            CameraPose::chase(&self.plane, &self.config.camera)
        } else {
            CameraPose::on_foot(&self.player, self.aiming(), &self.config.camera)
        };
    }

    /// Throw from the camera along its view direction. Returns false if the
    /// game is inactive.
    pub fn throw_balloon(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.refresh_camera();
        let position = self.camera.position;
        let velocity = self.camera.forward() * self.config.projectile.throw_speed;
        self.projectiles.push(Projectile::new(
            position,
            velocity,
            self.clock_ms,
            Provenance::Local,
        ));
        if self.connected {
            self.outbound.push(ClientMessage::WaterBalloon {
                position: position.into(),
                velocity: velocity.into(),
            });
        }
        true
    }

    /// Board or leave the plane.
    pub fn toggle_plane(&mut self) {
        if !self.active {
            return;
        }
        match self.player.mode {
            Mode::OnFoot => {
                self.plane.board(&self.config.flight);
                self.player.mode = Mode::Piloting;
                self.player.jump = JumpState::Grounded;
                self.player.velocity = DVec3::ZERO;
                self.player.position = self.plane.position;
                self.player.yaw = 0.0;
                info!(position = %self.plane.position, "boarded plane");
            }
            Mode::Piloting => {
                self.player.mode = Mode::OnFoot;
                self.player.position = DVec3::new(
                    self.plane.position.x,
                    self.config.jump.ground_y,
                    self.plane.position.z,
                );
                info!(position = %self.player.position, "left plane");
            }
        }
        self.refresh_camera();
    }

    // -----------------------------------------------------------------------
    // Network
    // -----------------------------------------------------------------------

    pub fn handle_server_message(&mut self, msg: ServerMessage) {
        match self.mirror.apply(msg) {
            MirrorEffect::None => {}
            MirrorEffect::SpawnBalloon { position, velocity } => {
                self.projectiles.push(Projectile::new(
                    position,
                    velocity,
                    self.clock_ms,
                    Provenance::Remote,
                ));
            }
            MirrorEffect::Status(message) => self.status = Some(message),
        }
    }

    /// The channel opened: start over with an empty mirror.
    pub fn on_connected(&mut self) {
        self.mirror.clear();
        self.backoff.reset();
        self.connected = true;
        self.status = None;
    }

    /// The channel closed. Returns the delay before the next attempt.
    pub fn on_disconnected(&mut self) -> Duration {
        self.connected = false;
        self.outbound.clear();
        let delay = self.backoff.next_delay(&self.config.sync);
        info!(delay_ms = delay.as_millis() as u64, "disconnected, will retry");
        delay
    }

    /// Frames queued for the socket since the last drain.
    pub fn drain_outbound(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outbound)
    }

    fn transform_message(&self) -> ClientMessage {
        if self.player.is_piloting() {
            ClientMessage::Update {
                position: self.plane.position.into(),
                rotation: self.plane.orientation().into(),
                is_in_plane: true,
            }
        } else {
            ClientMessage::Update {
                position: self.player.position.into(),
                rotation: DVec3::new(0.0, self.player.yaw, 0.0).into(),
                is_in_plane: false,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Advance one display frame of `frame_dt` seconds.
    pub fn tick(&mut self, frame_dt: f64) {
        let frame_dt = frame_dt.max(0.0);
        self.clock_ms += frame_dt * 1000.0;
        if !self.active {
            return;
        }
        let dt = frame_dt.min(self.config.max_dt);

        if self.player.is_piloting() {
            self.plane.step(
                &self.input,
                self.player.yaw,
                self.player.vertical_aim,
                &self.config.flight,
                dt,
            );
            self.player.position = self.plane.position;
            self.player.yaw = self.plane.yaw;
        } else {
            self.player
                .step_on_foot(&self.input, &self.world, &self.config, dt);
        }

        self.step_projectiles(dt);
        self.refresh_camera();

        if self.publish.poll(self.clock_ms, &self.config.sync) && self.connected {
            let msg = self.transform_message();
            self.outbound.push(msg);
        }
    }

    /// Targets are removed as soon as a balloon destroys them, so a later
    /// balloon in the same tick flies through the gap.
    fn step_projectiles(&mut self, dt: f64) {
        let mut kept = Vec::with_capacity(self.projectiles.len());
        for mut p in std::mem::take(&mut self.projectiles) {
            let outcome = p.step(
                &self.world,
                &self.targets,
                &self.config.projectile,
                dt,
                self.clock_ms,
            );
            if let Some(splash) = outcome.splash() {
                self.splashes.push(splash);
            }
            match outcome {
                Outcome::Flying => kept.push(p),
                Outcome::Hit {
                    destroyed: Some(id),
                    ..
                } => {
                    debug!(target_id = id.0, "target hit");
                    self.targets.retain(|t| t.id != id);
                }
                Outcome::Hit { .. } | Outcome::Landed(_) | Outcome::Expired => {}
            }
        }
        self.projectiles = kept;
    }

    fn target_in_sight(&self) -> bool {
        self.world
            .raycast(&self.targets, self.camera.position, self.camera.forward())
            .is_some()
    }

    /// Snapshot for drawing. Drains the pending splashes.
    pub fn render(&mut self) -> RenderFrame {
        let remote_players: Vec<RemoteView> = self
            .mirror
            .players()
            .map(|(id, p)| RemoteView {
                id: id.clone(),
                position: p.position,
                rotation: p.rotation,
                is_in_plane: p.is_in_plane,
            })
            .collect();
        RenderFrame {
            player: self.player.clone(),
            plane: self.plane.clone(),
            camera: self.camera,
            aiming: self.aiming(),
            player_count: remote_players.len() + 1,
            remote_players,
            projectiles: self.projectiles.clone(),
            targets: self.targets.clone(),
            splashes: std::mem::take(&mut self.splashes),
            target_in_sight: self.target_in_sight(),
            connected: self.connected,
            status: self.status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use splashdown_protocol::types::{PlayerSnapshot, Vec3};

    use super::*;
    use crate::world::Tree;

    const FRAME: f64 = 1.0 / 60.0;

    fn active_game() -> ClientGame {
        let mut game = ClientGame::new(SimConfig::default(), World::default());
        game.set_active(true);
        game
    }

    fn connected_game() -> ClientGame {
        let mut game = active_game();
        game.on_connected();
        game
    }

    fn init(me: &str, others: &[&str]) -> ServerMessage {
        ServerMessage::Init {
            id: PlayerId::from(me),
            players: others
                .iter()
                .map(|id| PlayerSnapshot {
                    id: PlayerId::from(*id),
                    position: Vec3::ZERO,
                    rotation: Vec3::ZERO,
                    is_in_plane: false,
                })
                .collect(),
        }
    }

    #[test]
    fn inactive_game_skips_update_but_keeps_time() {
        let mut game = ClientGame::new(SimConfig::default(), World::default());
        game.on_connected();
        game.press(Action::Forward);
        game.press(Action::Jump);
        game.tick(0.5);
        assert_eq!(game.player().position, DVec3::ZERO);
        assert_eq!(game.player().jump, JumpState::Grounded);
        assert!(game.drain_outbound().is_empty());
        assert!(!game.throw_balloon());
        assert!((game.clock_ms() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn integration_step_is_capped() {
        let mut game = active_game();
        game.press(Action::Forward);
        game.tick(1.0);
        assert!((game.player().position.z + 50.0 / 30.0).abs() < 1e-9);
        assert!((game.clock_ms() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn publishes_transform_only_when_connected() {
        let mut game = active_game();
        game.tick(0.01);
        assert!(game.drain_outbound().is_empty());

        game.on_connected();
        // The disconnected tick already consumed the publish slot.
        game.tick(0.01);
        assert!(game.drain_outbound().is_empty());

        game.tick(0.05);
        let out = game.drain_outbound();
        assert_eq!(
            out,
            vec![ClientMessage::Update {
                position: Vec3::ZERO,
                rotation: Vec3::ZERO,
                is_in_plane: false,
            }]
        );
    }

    #[test]
    fn piloting_publishes_plane_transform() {
        let mut game = connected_game();
        game.toggle_plane();
        game.tick(FRAME);
        match game.drain_outbound().as_slice() {
            [ClientMessage::Update {
                position,
                rotation,
                is_in_plane,
            }] => {
                assert!(*is_in_plane);
                assert_eq!(*position, Vec3::from(game.plane().position));
                assert_eq!(*rotation, Vec3::from(game.plane().orientation()));
            }
            other => panic!("unexpected outbound {other:?}"),
        }
    }

    #[test]
    fn boarding_and_leaving_the_plane() {
        let mut game = active_game();
        game.press(Action::Jump);
        game.tick(FRAME);
        assert_eq!(game.player().jump, JumpState::Jumping);

        game.toggle_plane();
        let flight = game.config().flight.clone();
        assert!(game.player().is_piloting());
        assert_eq!(game.player().jump, JumpState::Grounded);
        assert_eq!(game.player().velocity, DVec3::ZERO);
        assert_eq!(game.player().position, flight.spawn_position);
        assert_eq!(game.player().yaw, 0.0);
        assert_eq!(game.plane().speed, flight.min_speed);
        assert_eq!(game.plane().orientation(), DVec3::new(0.0, FRAC_PI_2, 0.0));

        game.tick(1.0 / 30.0);
        assert_eq!(game.player().position, game.plane().position);
        assert_eq!(game.player().yaw, game.plane().yaw);
        assert_eq!(game.plane().altitude, flight.min_altitude);

        let plane_at = game.plane().position;
        game.toggle_plane();
        assert!(!game.player().is_piloting());
        assert_eq!(
            game.player().position,
            DVec3::new(plane_at.x, 0.0, plane_at.z)
        );
        assert_eq!(game.plane().position, plane_at);
    }

    #[test]
    fn jump_is_ignored_while_piloting() {
        let mut game = active_game();
        game.toggle_plane();
        game.press(Action::Jump);
        assert_eq!(game.player().jump, JumpState::Grounded);
    }

    #[test]
    fn held_jump_does_not_retrigger() {
        let mut game = active_game();
        game.press(Action::Jump);
        for _ in 0..200 {
            game.tick(FRAME);
        }
        assert_eq!(game.player().jump, JumpState::Grounded);
        // Still held: no new edge, no new jump.
        game.press(Action::Jump);
        assert_eq!(game.player().jump, JumpState::Grounded);
        game.release(Action::Jump);
        game.press(Action::Jump);
        assert_eq!(game.player().jump, JumpState::Jumping);
    }

    #[test]
    fn throw_queues_balloon_when_connected() {
        let mut offline = active_game();
        assert!(offline.throw_balloon());
        assert_eq!(offline.projectiles().len(), 1);
        assert!(offline.drain_outbound().is_empty());

        let mut game = connected_game();
        assert!(game.throw_balloon());
        let p = game.projectiles()[0].clone();
        assert_eq!(p.provenance, Provenance::Local);
        assert!(p.position.distance(DVec3::new(0.5, 2.0, 6.0)) < 1e-9);
        assert!(p.velocity.distance(DVec3::new(0.0, 0.0, -350.0)) < 1e-9);
        assert_eq!(
            game.drain_outbound(),
            vec![ClientMessage::WaterBalloon {
                position: p.position.into(),
                velocity: p.velocity.into(),
            }]
        );
    }

    #[test]
    fn thrown_balloon_destroys_target_in_sight() {
        let mut game = active_game();
        let id = game.add_target(DVec3::new(0.5, 2.0, -100.0), 3.0);
        assert!(game.render().target_in_sight);

        game.throw_balloon();
        for _ in 0..60 {
            game.tick(FRAME);
        }
        assert!(game.targets().iter().all(|t| t.id != id));
        assert!(game.projectiles().is_empty());

        let frame = game.render();
        assert!(!frame.target_in_sight);
        assert_eq!(frame.splashes.len(), 1);
        assert!(frame.splashes[0].big);
        // Drained.
        assert!(game.render().splashes.is_empty());
    }

    #[test]
    fn two_balloons_destroy_one_target_once() {
        let mut game = active_game();
        let id = game.add_target(DVec3::new(0.5, 2.0, -100.0), 3.0);
        // Same camera, same tick: both balloons fly the same path.
        assert!(game.throw_balloon());
        assert!(game.throw_balloon());
        for _ in 0..60 {
            game.tick(FRAME);
        }
        assert!(game.targets().iter().all(|t| t.id != id));

        let frame = game.render();
        let big: Vec<&Splash> = frame.splashes.iter().filter(|s| s.big).collect();
        assert_eq!(big.len(), 1);
        // The second balloon found nothing left to hit and is still airborne.
        assert_eq!(frame.projectiles.len(), 1);
        assert!(frame.projectiles[0].position.z < -100.0);
    }

    #[test]
    fn tree_in_sight_counts_for_the_crosshair() {
        let world = World::new(
            vec![Tree {
                position: DVec3::new(0.5, 0.0, -30.0),
                radius: 1.0,
                height: 10.0,
            }],
            vec![],
        );
        let mut game = ClientGame::new(SimConfig::default(), world);
        game.set_active(true);
        assert!(game.render().target_in_sight);

        game.look(0.0, -10_000.0);
        game.tick(FRAME);
        assert!(!game.render().target_in_sight);
    }

    #[test]
    fn balloon_expires_after_ttl() {
        let mut config = SimConfig::default();
        config.projectile.gravity = 0.0;
        let mut game = ClientGame::new(config, World::default());
        game.set_active(true);
        game.throw_balloon();
        let mut elapsed = 0.0;
        while !game.projectiles().is_empty() {
            game.tick(FRAME);
            elapsed += FRAME * 1000.0;
            assert!(elapsed < 9000.0);
        }
        assert!(elapsed > 8000.0);
        assert!(elapsed <= 8000.0 + FRAME * 1000.0 + 1e-6);
        assert!(game.render().splashes.is_empty());
    }

    #[test]
    fn remote_balloons_and_player_count() {
        let mut game = connected_game();
        game.handle_server_message(init("me", &["a", "b"]));
        game.handle_server_message(ServerMessage::PlayerJoined {
            id: PlayerId::from("c"),
        });
        game.handle_server_message(ServerMessage::WaterBalloon {
            id: PlayerId::from("a"),
            position: Vec3::new(0.0, 5.0, 0.0),
            velocity: Vec3::new(0.0, 0.0, -10.0),
        });
        game.handle_server_message(ServerMessage::WaterBalloon {
            id: PlayerId::from("me"),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
        });

        let frame = game.render();
        assert_eq!(frame.player_count, 4);
        let ids: Vec<&str> = frame.remote_players.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(frame.projectiles.len(), 1);
        assert_eq!(frame.projectiles[0].provenance, Provenance::Remote);
    }

    #[test]
    fn reconnect_clears_mirror_and_resets_backoff() {
        let mut game = connected_game();
        game.handle_server_message(init("me", &["a"]));
        assert_eq!(game.mirror().len(), 1);

        assert_eq!(game.on_disconnected(), Duration::from_millis(1000));
        assert!(!game.is_connected());
        assert_eq!(game.on_disconnected(), Duration::from_millis(1000));
        assert_eq!(game.on_disconnected(), Duration::from_millis(2000));

        game.on_connected();
        assert!(game.mirror().is_empty());
        assert_eq!(game.on_disconnected(), Duration::from_millis(1000));
    }

    #[test]
    fn relay_error_becomes_status() {
        let mut game = active_game();
        game.handle_server_message(ServerMessage::Error {
            message: "Server is full".into(),
        });
        assert_eq!(game.status(), Some("Server is full"));
        assert_eq!(game.render().status.as_deref(), Some("Server is full"));
        game.on_connected();
        assert_eq!(game.status(), None);
    }

    #[test]
    fn aiming_moves_the_camera_on_foot_only() {
        let mut game = active_game();
        game.press(Action::Aim);
        game.tick(FRAME);
        assert!(game.render().aiming);
        assert!((game.camera().position.z - 4.0).abs() < 1e-9);

        game.toggle_plane();
        assert!(!game.render().aiming);
    }

    #[test]
    fn deactivating_releases_held_keys() {
        let mut game = active_game();
        game.press(Action::Forward);
        game.set_active(false);
        game.set_active(true);
        game.tick(FRAME);
        assert_eq!(game.player().position, DVec3::ZERO);
    }
}
