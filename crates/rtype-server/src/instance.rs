//! `GameInstance`: the per-room authoritative simulation. Owns the only
//! `Registry` in the room, drives it through the fixed-order system
//! pipeline once per tick, and is the sole decoder of control packets
//! (spec §4.6-4.8). Only the game loop thread ever calls into this type;
//! the receive and send threads in [`crate::net_threads`] never touch it.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, info};

use rtype_ecs::{EntityId, Registry};
use rtype_level::data::EventType;
use rtype_level::{DispatchedEvent, LevelData, LevelDirector, LevelSideEffect, LevelSpawnSystem, SpawnScaling};
use rtype_net::control::{self, LevelInit, WireArchetype, WireLevelEvent};
use rtype_net::desync::DesyncDetector;
use rtype_net::rollback::RollbackRing;
use rtype_net::{MessageType, ReplicationManager};
use rtype_sim::components::{
    Boundary, Collider, Health, Hitbox, InvincibilityTimer, PlayerInput, RespawnTimer, Score, Tag,
    Transform, Velocity,
};
use rtype_sim::systems::boundary::boundary_system;
use rtype_sim::systems::collision::collision_system;
use rtype_sim::systems::damage::damage_system;
use rtype_sim::systems::destruction::destruction_system;
use rtype_sim::systems::enemy_shooting::enemy_shooting_system;
use rtype_sim::systems::input::{player_input_system, InputEvent, InputFlags, PlayerInputTuning};
use rtype_sim::systems::monster_movement::monster_movement_system;
use rtype_sim::systems::movement::movement_system;
use rtype_sim::systems::player_bounds::player_bounds_system;
use rtype_sim::systems::score::score_system;
use rtype_sim::EventBus;

use crate::net_threads::{OutboundPacket, RawControlPacket, ReceivedInput};
use crate::room::RoomConfig;
use crate::session::{can_kick, can_promote, ClientSession, PlayerRole};

const PLAYER_SPAWN_X: f32 = 50.0;
const PLAYER_SPAWN_Y: f32 = 300.0;
const PLAYER_MAX_HEALTH: i32 = 100;
const PLAYER_BASE_SPEED: f32 = 220.0;
const MISSILE_SPEED: f32 = 600.0;
const MISSILE_LIFETIME: f32 = 2.0;
const MISSILE_DAMAGE: i32 = 10;
const COUNTDOWN_SECONDS: f32 = 3.0;
const RESPAWN_DELAY: f32 = 2.0;
const INVINCIBILITY_DURATION: f32 = 2.0;
const DEFAULT_PLAYER_BOUNDS: (f32, f32, f32, f32) = (0.0, 0.0, 1280.0, 720.0);
const DESPAWN_MARGIN: f32 = 200.0;

/// A room's lifecycle state (spec §4.8). `Countdown` carries its own
/// remaining time and the next second it has yet to announce, so a tick
/// that crosses more than one second boundary (a stalled game loop
/// thread catching up) only announces the one it lands on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameState {
    Lobby,
    Countdown { remaining: f32, next_announce: u8 },
    Playing,
    Finished,
}

/// Tunables a room needs beyond [`RoomConfig`]: replication cadence,
/// rollback depth, and desync thresholds, normally sourced from
/// [`crate::config::ServerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct GameInstanceSettings {
    pub full_state_interval: u32,
    pub max_packet_bytes: usize,
    pub rollback_capacity: usize,
    pub checksum_interval: u32,
    pub timeout_threshold: u32,
}

/// One room's authoritative game state: registry, level progression,
/// sessions, and the replication/rollback/desync machinery that
/// produces what the send thread mails out.
pub struct GameInstance {
    room_id: u32,
    registry: Registry,
    level: Arc<LevelData>,
    director: LevelDirector,
    spawn_system: LevelSpawnSystem,
    bus: EventBus,
    config: RoomConfig,
    seed: u32,
    state: GameState,

    sessions: HashMap<u32, ClientSession>,
    endpoint_to_player: HashMap<SocketAddr, u32>,
    player_entities: HashMap<u32, EntityId>,
    lives_remaining: HashMap<u32, u8>,
    banned_endpoints: HashSet<SocketAddr>,
    player_ready_bits: HashMap<EntityId, bool>,
    next_player_id: u32,
    next_server_sequence: u16,
    tick_count: u32,

    replication: ReplicationManager,
    rollback: RollbackRing,
    desync: Arc<DesyncDetector>,
    outbound_tx: Sender<OutboundPacket>,

    active_player_bounds: Option<(f32, f32, f32, f32)>,
    default_player_bounds: (f32, f32, f32, f32),
    spawn_groups: HashMap<String, Vec<EntityId>>,
    dead_spawn_groups: HashSet<String>,
    boss_entities: HashMap<EntityId, String>,
    open_gates: HashSet<String>,
    last_checkpoint_respawn: Option<(f32, f32)>,

    tuning: PlayerInputTuning,
}

impl GameInstance {
    pub fn new(
        room_id: u32,
        config: RoomConfig,
        level: Arc<LevelData>,
        seed: u32,
        outbound_tx: Sender<OutboundPacket>,
        settings: GameInstanceSettings,
    ) -> Self {
        let scaling = SpawnScaling {
            enemy_health_multiplier: config.enemy_stat_multiplier,
            enemy_damage_multiplier: config.enemy_stat_multiplier,
        };
        let director = LevelDirector::new(level.clone());

        Self {
            room_id,
            registry: Registry::new(),
            level,
            director,
            spawn_system: LevelSpawnSystem::new(scaling),
            bus: EventBus::new(),
            config,
            seed,
            state: GameState::Lobby,

            sessions: HashMap::new(),
            endpoint_to_player: HashMap::new(),
            player_entities: HashMap::new(),
            lives_remaining: HashMap::new(),
            banned_endpoints: HashSet::new(),
            player_ready_bits: HashMap::new(),
            next_player_id: 1,
            next_server_sequence: 0,
            tick_count: 0,

            replication: ReplicationManager::with_settings(settings.full_state_interval, settings.max_packet_bytes),
            rollback: RollbackRing::new(settings.rollback_capacity),
            desync: Arc::new(DesyncDetector::new(settings.checksum_interval, settings.timeout_threshold)),
            outbound_tx,

            active_player_bounds: None,
            default_player_bounds: DEFAULT_PLAYER_BOUNDS,
            spawn_groups: HashMap::new(),
            dead_spawn_groups: HashSet::new(),
            boss_entities: HashMap::new(),
            open_gates: HashSet::new(),
            last_checkpoint_respawn: None,

            tuning: PlayerInputTuning {
                speed: PLAYER_BASE_SPEED * config.player_speed_multiplier,
                missile_speed: MISSILE_SPEED,
                missile_lifetime: MISSILE_LIFETIME,
                missile_damage: MISSILE_DAMAGE,
            },
        }
    }

    pub fn room_id(&self) -> u32 {
        self.room_id
    }

    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, GameState::Finished)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn desync_detector(&self) -> &Arc<DesyncDetector> {
        &self.desync
    }

    /// Decodes a raw control packet and dispatches it by message type.
    /// A malformed header or an unexpected message type is dropped with
    /// a debug log, never propagated.
    pub fn handle_control(&mut self, packet: RawControlPacket) {
        let header = match rtype_net::decode_frame(&packet.bytes) {
            Ok((header, _)) => header,
            Err(e) => {
                debug!(from = %packet.from, error = %e, "dropping malformed control packet");
                return;
            }
        };

        match header.message_type {
            MessageType::ClientJoin => self.handle_join(&packet.bytes, packet.from),
            MessageType::ClientReady => self.handle_ready(packet.from),
            MessageType::ClientPing => self.handle_ping(&packet.bytes, packet.from),
            MessageType::ClientChecksum => self.handle_checksum(&packet.bytes, packet.from),
            other => debug!(from = %packet.from, ?other, "ignoring unexpected message type from client"),
        }
    }

    /// Advances the room by one tick: in `Playing`, runs the full system
    /// pipeline and replication; in every other state, only progresses
    /// the state machine itself.
    pub fn tick(&mut self, inputs: &[ReceivedInput], dt: f32) {
        match self.state {
            GameState::Lobby => self.tick_lobby(),
            GameState::Countdown { .. } => self.tick_countdown(dt),
            GameState::Playing => self.tick_playing(inputs, dt),
            GameState::Finished => {}
        }
        self.tick_count += 1;
    }

    fn tick_lobby(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        if self.sessions.values().all(|s| s.ready) {
            let seq = self.next_seq();
            self.broadcast(control::encode_all_ready(seq));
            self.state = GameState::Countdown {
                remaining: COUNTDOWN_SECONDS,
                next_announce: 3,
            };
        }
    }

    fn tick_countdown(&mut self, dt: f32) {
        let (mut remaining, mut next_announce) = match self.state {
            GameState::Countdown { remaining, next_announce } => (remaining, next_announce),
            _ => return,
        };
        remaining -= dt;
        let ceil = remaining.ceil().max(0.0) as u8;
        let mut to_announce = None;
        if ceil < next_announce {
            next_announce = ceil;
            if ceil > 0 {
                to_announce = Some(ceil);
            }
        }

        if remaining <= 0.0 {
            self.start_playing();
        } else {
            self.state = GameState::Countdown { remaining, next_announce };
            if let Some(n) = to_announce {
                let seq = self.next_seq();
                self.broadcast(control::encode_countdown_tick(seq, n));
            }
        }
    }

    fn start_playing(&mut self) {
        self.state = GameState::Playing;
        self.replication.force_full_state();
        let seq = self.next_seq();
        self.broadcast(control::encode_game_start(seq, self.seed));
    }

    /// Owner-only: skips the ready quorum and starts the countdown
    /// immediately.
    pub fn force_start(&mut self, requester_player_id: u32) -> bool {
        let is_owner = self
            .sessions
            .get(&requester_player_id)
            .map(|s| s.role == PlayerRole::Owner)
            .unwrap_or(false);
        if !is_owner || !matches!(self.state, GameState::Lobby) || self.sessions.is_empty() {
            return false;
        }
        let seq = self.next_seq();
        self.broadcast(control::encode_all_ready(seq));
        self.state = GameState::Countdown {
            remaining: COUNTDOWN_SECONDS,
            next_announce: 3,
        };
        true
    }

    fn tick_playing(&mut self, inputs: &[ReceivedInput], dt: f32) {
        let input_events = self.translate_inputs(inputs);

        player_input_system(&mut self.registry, &input_events, self.tuning);
        movement_system(&mut self.registry, dt);
        monster_movement_system(&mut self.registry, dt);
        enemy_shooting_system(&mut self.registry, dt);

        let collisions: Vec<_> = collision_system(&self.registry)
            .into_iter()
            .filter(|c| !self.is_invincible(c.a) && !self.is_invincible(c.b))
            .collect();
        damage_system(&mut self.registry, &collisions, &mut self.bus);
        score_system(&mut self.registry, &self.bus);

        let (mut dead, to_respawn) = self.collect_dead_and_respawning();
        self.decrement_missile_lifetimes(dt, &mut dead);
        self.collect_offscreen(&mut dead);
        dead.sort();
        dead.dedup();

        for id in to_respawn {
            let _ = self.registry.emplace(id, RespawnTimer { remaining: RESPAWN_DELAY });
        }

        destruction_system(&mut self.registry, &dead, &mut self.bus);
        self.apply_destroy_bookkeeping();
        self.advance_respawns_and_invincibility(dt);

        boundary_system(&mut self.registry);
        player_bounds_system(&mut self.registry, self.active_player_bounds, self.default_player_bounds);

        self.bus.clear();

        self.update_director_facts();
        let dispatched = self.director.tick(dt);
        for event in dispatched {
            self.apply_dispatched_event(event);
        }

        if self.director.is_finished() {
            self.state = GameState::Finished;
        }

        self.rollback.push(self.tick_count, &self.registry);
        let sync = self.replication.synchronize(&self.registry, self.tick_count);
        for packet in sync.packets {
            self.broadcast(packet);
        }
        self.desync.check_timeouts(self.tick_count);
    }

    fn translate_inputs(&mut self, inputs: &[ReceivedInput]) -> Vec<InputEvent> {
        inputs
            .iter()
            .filter_map(|received| {
                let player_id = *self.endpoint_to_player.get(&received.from)?;
                let entity = *self.player_entities.get(&player_id)?;
                self.player_ready_bits
                    .insert(entity, received.input.flags.has(InputFlags::READY));
                Some(InputEvent {
                    player: entity,
                    sequence_id: received.input.sequence_id,
                    flags: received.input.flags,
                    x: received.input.x,
                    y: received.input.y,
                    angle: received.input.angle,
                })
            })
            .collect()
    }

    fn is_invincible(&self, id: EntityId) -> bool {
        self.registry.has::<InvincibilityTimer>(id)
    }

    /// Splits `Health`-bearing dead entities into ones to destroy and
    /// ones to keep alive awaiting respawn: a player with lives left is
    /// never destroyed, only benched behind a `RespawnTimer`.
    fn collect_dead_and_respawning(&mut self) -> (Vec<EntityId>, Vec<EntityId>) {
        let mut dead = Vec::new();
        let mut to_respawn = Vec::new();

        let candidates: Vec<EntityId> = self
            .registry
            .view::<(Health,)>()
            .filter(|(_, (health,))| health.is_dead())
            .map(|(id, _)| id)
            .collect();

        for id in candidates {
            let is_player = self.registry.get::<Tag>(id).map(|t| t.has(Tag::PLAYER)).unwrap_or(false);
            if is_player && !self.registry.has::<RespawnTimer>(id) {
                if let Some(player_id) = self.entity_player_id(id) {
                    let lives_left = self.decrement_lives(player_id);
                    if lives_left > 0 {
                        to_respawn.push(id);
                        continue;
                    }
                }
            }
            dead.push(id);
        }

        (dead, to_respawn)
    }

    fn decrement_lives(&mut self, player_id: u32) -> u8 {
        let starting = self.config.player_lives;
        let lives = self.lives_remaining.entry(player_id).or_insert(starting);
        if *lives > 0 {
            *lives -= 1;
        }
        *lives
    }

    fn entity_player_id(&self, entity: EntityId) -> Option<u32> {
        self.player_entities
            .iter()
            .find(|(_, &e)| e == entity)
            .map(|(&player_id, _)| player_id)
    }

    fn decrement_missile_lifetimes(&mut self, dt: f32, dead: &mut Vec<EntityId>) {
        use rtype_sim::components::Missile;
        let ids = self.registry.ids_matching::<(Missile,)>();
        for id in ids {
            let expired = {
                let missile = self.registry.get_mut::<Missile>(id).expect("matched by ids_matching");
                missile.lifetime -= dt;
                missile.lifetime <= 0.0
            };
            if expired {
                dead.push(id);
            }
        }
    }

    /// Non-player entities that drift well outside the default play area
    /// are silently removed: no score, no `DamageEvent`, just gone.
    fn collect_offscreen(&self, dead: &mut Vec<EntityId>) {
        let (min_x, min_y, max_x, max_y) = self.default_player_bounds;
        let lo_x = min_x - DESPAWN_MARGIN;
        let hi_x = max_x + DESPAWN_MARGIN;
        let lo_y = min_y - DESPAWN_MARGIN;
        let hi_y = max_y + DESPAWN_MARGIN;

        for (id, (transform, tag)) in self.registry.view::<(Transform, Tag)>() {
            if tag.has(Tag::PLAYER) {
                continue;
            }
            if transform.x < lo_x || transform.x > hi_x || transform.y < lo_y || transform.y > hi_y {
                dead.push(id);
            }
        }
    }

    fn apply_destroy_bookkeeping(&mut self) {
        let destroyed: Vec<EntityId> = self.bus.destroy_events().iter().map(|e| e.id).collect();
        for id in destroyed {
            if let Some(boss_id) = self.boss_entities.remove(&id) {
                self.director.register_boss_dead(boss_id);
            }
        }

        let mut newly_dead_groups = Vec::new();
        for (spawn_id, members) in &self.spawn_groups {
            if self.dead_spawn_groups.contains(spawn_id) {
                continue;
            }
            if members.iter().all(|id| !self.registry.is_alive(*id)) {
                newly_dead_groups.push(spawn_id.clone());
            }
        }
        for spawn_id in newly_dead_groups {
            self.dead_spawn_groups.insert(spawn_id.clone());
            self.director.register_spawn_dead(spawn_id);
        }
    }

    fn advance_respawns_and_invincibility(&mut self, dt: f32) {
        let respawning = self.registry.ids_matching::<(RespawnTimer,)>();
        for id in respawning {
            let done = {
                let timer = self.registry.get_mut::<RespawnTimer>(id).expect("matched by ids_matching");
                timer.remaining -= dt;
                timer.remaining <= 0.0
            };
            if !done {
                continue;
            }
            self.registry.remove::<RespawnTimer>(id);
            let (sx, sy) = self.last_checkpoint_respawn.unwrap_or((PLAYER_SPAWN_X, PLAYER_SPAWN_Y));
            if let Ok(t) = self.registry.get_mut::<Transform>(id) {
                t.x = sx;
                t.y = sy;
            }
            if let Ok(h) = self.registry.get_mut::<Health>(id) {
                h.current = h.max;
            }
            let _ = self.registry.emplace(id, InvincibilityTimer { remaining: INVINCIBILITY_DURATION });
        }

        let invincible = self.registry.ids_matching::<(InvincibilityTimer,)>();
        for id in invincible {
            let done = {
                let timer = self
                    .registry
                    .get_mut::<InvincibilityTimer>(id)
                    .expect("matched by ids_matching");
                timer.remaining -= dt;
                timer.remaining <= 0.0
            };
            if done {
                self.registry.remove::<InvincibilityTimer>(id);
            }
        }
    }

    fn update_director_facts(&mut self) {
        let enemy_count = self
            .registry
            .view::<(Tag,)>()
            .filter(|(_, (tag,))| tag.has(Tag::ENEMY))
            .count() as i32;
        self.director.register_enemy_count(enemy_count);

        let positions: Vec<(f32, f32)> = self
            .registry
            .view::<(Transform, Tag)>()
            .filter(|(_, (_, tag))| tag.has(Tag::PLAYER))
            .map(|(_, (t, _))| (t.x, t.y))
            .collect();
        self.director.register_player_positions(positions);

        let all_ready = !self.player_entities.is_empty()
            && self.player_entities.values().all(|id| {
                self.registry.is_alive(*id) && *self.player_ready_bits.get(id).unwrap_or(&false)
            });
        self.director.register_players_ready(all_ready);

        for (&entity, boss_id) in &self.boss_entities {
            if let Ok(health) = self.registry.get::<Health>(entity) {
                let percent = if health.max > 0 {
                    (health.current as f32 / health.max as f32) * 100.0
                } else {
                    0.0
                };
                self.director.register_boss_hp_percent(boss_id, percent);
            }
        }
    }

    fn apply_dispatched_event(&mut self, dispatched: DispatchedEvent) {
        let result = self.spawn_system.apply(&mut self.registry, &self.level, &dispatched.event);

        if let Some(spawn_id) = &result.spawn_id {
            self.spawn_groups.entry(spawn_id.clone()).or_default().extend(&result.spawned);
        }

        if dispatched.event.kind == Some(EventType::SpawnBoss) {
            if let (Some(settings), Some(&entity)) = (&dispatched.event.boss, result.spawned.first()) {
                self.boss_entities.insert(entity, settings.boss_id.clone());
                self.director.register_boss_spawned(&settings.boss_id);
            }
        }

        match result.side_effect {
            Some(LevelSideEffect::SetBackground(id)) => self.broadcast_level_event(&dispatched.segment_id, format!("background:{id}")),
            Some(LevelSideEffect::SetMusic(id)) => self.broadcast_level_event(&dispatched.segment_id, format!("music:{id}")),
            Some(LevelSideEffect::SetCameraBounds(_)) => {}
            Some(LevelSideEffect::SetPlayerBounds(b)) => {
                self.active_player_bounds = Some((b.min_x, b.min_y, b.max_x, b.max_y));
            }
            Some(LevelSideEffect::ClearPlayerBounds) => {
                self.active_player_bounds = None;
            }
            Some(LevelSideEffect::GateOpen(id)) => {
                self.open_gates.insert(id);
            }
            Some(LevelSideEffect::GateClose(id)) => {
                self.open_gates.remove(&id);
            }
            Some(LevelSideEffect::Checkpoint { checkpoint_id, respawn }) => {
                self.last_checkpoint_respawn = Some(respawn);
                self.director.register_checkpoint_reached(checkpoint_id);
            }
            Some(LevelSideEffect::SetScroll(_)) | None => {}
        }
    }

    fn broadcast_level_event(&mut self, segment_id: &str, label: String) {
        let seq = self.next_seq();
        let tick = self.tick_count;
        let event = WireLevelEvent {
            segment_id: segment_id.to_string(),
            label,
        };
        self.broadcast(control::encode_level_event(seq, tick, &event));
    }

    fn next_seq(&mut self) -> u16 {
        let seq = self.next_server_sequence;
        self.next_server_sequence = self.next_server_sequence.wrapping_add(1);
        seq
    }

    fn broadcast(&self, bytes: Vec<u8>) {
        for session in self.sessions.values() {
            if self
                .outbound_tx
                .try_send(OutboundPacket { to: session.endpoint, bytes: bytes.clone() })
                .is_err()
            {
                debug!(to = %session.endpoint, "outbound queue full, dropping broadcast packet");
            }
        }
    }

    fn send_control(&self, to: SocketAddr, bytes: Vec<u8>) {
        if self.outbound_tx.try_send(OutboundPacket { to, bytes }).is_err() {
            debug!(%to, "outbound queue full, dropping control packet");
        }
    }

    fn handle_join(&mut self, bytes: &[u8], from: SocketAddr) {
        if self.banned_endpoints.contains(&from) {
            let seq = self.next_seq();
            self.send_control(from, control::encode_join_deny(seq, "banned from this room"));
            return;
        }
        if !matches!(self.state, GameState::Lobby) {
            let seq = self.next_seq();
            self.send_control(from, control::encode_join_deny(seq, "room is not accepting joins"));
            return;
        }
        if self.endpoint_to_player.contains_key(&from) {
            return;
        }

        let name = match control::decode_client_join(bytes) {
            Ok(name) => name,
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed join packet");
                return;
            }
        };

        let player_id = self.next_player_id;
        self.next_player_id += 1;
        let role = if self.sessions.is_empty() { PlayerRole::Owner } else { PlayerRole::Member };
        let session = ClientSession::new(player_id, from, name, role);
        self.sessions.insert(player_id, session);
        self.endpoint_to_player.insert(from, player_id);
        self.lives_remaining.insert(player_id, self.config.player_lives);

        let entity = self.spawn_player_entity();
        self.player_entities.insert(player_id, entity);

        info!(player_id, %from, "player joined");

        let seq = self.next_seq();
        self.send_control(from, control::encode_join_accept(seq, player_id));
        let init = self.level_init_message();
        let seq = self.next_seq();
        self.send_control(from, control::encode_level_init(seq, &init));
    }

    fn spawn_player_entity(&mut self) -> EntityId {
        let id = self.registry.create();
        let (sx, sy) = self.last_checkpoint_respawn.unwrap_or((PLAYER_SPAWN_X, PLAYER_SPAWN_Y));
        let _ = self.registry.emplace(id, Transform { x: sx, y: sy, rotation: 0.0, scale_x: 1.0, scale_y: 1.0 });
        let _ = self.registry.emplace(id, Velocity::default());
        let _ = self.registry.emplace(id, Hitbox::default());
        let _ = self.registry.emplace(id, Collider::new_box(1.0, 1.0));
        let _ = self.registry.emplace(id, Health::new(PLAYER_MAX_HEALTH));
        let _ = self.registry.emplace(id, Tag::new(Tag::PLAYER));
        let _ = self.registry.emplace(id, Score::default());
        let _ = self.registry.emplace(id, PlayerInput::default());
        let _ = self.registry.emplace(
            id,
            Boundary {
                min_x: self.default_player_bounds.0,
                min_y: self.default_player_bounds.1,
                max_x: self.default_player_bounds.2,
                max_y: self.default_player_bounds.3,
            },
        );
        id
    }

    fn level_init_message(&self) -> LevelInit {
        LevelInit {
            level_id: self.level.level_id as u16,
            seed: self.seed,
            background_id: self.level.meta.background_id.clone(),
            music_id: self.level.meta.music_id.clone(),
            archetypes: self
                .level
                .archetypes
                .iter()
                .map(|a| WireArchetype {
                    type_id: a.type_id,
                    sprite_id: a.sprite_id.clone(),
                    anim_id: a.anim_id.clone(),
                    layer: a.layer,
                })
                .collect(),
        }
    }

    fn handle_ready(&mut self, from: SocketAddr) {
        let Some(&player_id) = self.endpoint_to_player.get(&from) else { return };
        if let Some(session) = self.sessions.get_mut(&player_id) {
            session.ready = true;
        }
    }

    fn handle_ping(&mut self, bytes: &[u8], from: SocketAddr) {
        let Ok(timestamp_ms) = control::decode_client_ping(bytes) else { return };
        let seq = self.next_seq();
        self.send_control(from, control::encode_server_pong(seq, timestamp_ms));
    }

    fn handle_checksum(&mut self, bytes: &[u8], from: SocketAddr) {
        let Some(&player_id) = self.endpoint_to_player.get(&from) else { return };
        let Ok((tick, client_checksum)) = control::decode_client_checksum(bytes) else { return };
        if let Some(entry) = self.rollback.get(tick) {
            self.desync.report_client_checksum(player_id, tick, client_checksum, entry.checksum);
        }
    }

    /// Removes a player's session and entity. Authorized by
    /// [`can_kick`]; the owner may kick anyone but another owner, an
    /// admin only a member, a member no one.
    pub fn kick(&mut self, requester_player_id: u32, target_player_id: u32) -> bool {
        let requester_role = self.sessions.get(&requester_player_id).map(|s| s.role);
        let target_role = self.sessions.get(&target_player_id).map(|s| s.role);
        let (Some(requester_role), Some(target_role)) = (requester_role, target_role) else {
            return false;
        };
        if !can_kick(requester_role, target_role) {
            return false;
        }
        self.remove_player(target_player_id, "kicked");
        true
    }

    /// Like [`Self::kick`] but additionally refuses future joins from the
    /// target's endpoint.
    pub fn ban(&mut self, requester_player_id: u32, target_player_id: u32) -> bool {
        let requester_role = self.sessions.get(&requester_player_id).map(|s| s.role);
        let target = self.sessions.get(&target_player_id).cloned();
        let (Some(requester_role), Some(target)) = (requester_role, target) else {
            return false;
        };
        if !can_kick(requester_role, target.role) {
            return false;
        }
        self.banned_endpoints.insert(target.endpoint);
        self.remove_player(target_player_id, "banned");
        true
    }

    /// Owner-only: promotes a member to admin.
    pub fn promote(&mut self, requester_player_id: u32, target_player_id: u32) -> bool {
        let requester_role = self.sessions.get(&requester_player_id).map(|s| s.role);
        let Some(requester_role) = requester_role else { return false };
        if !can_promote(requester_role) {
            return false;
        }
        if let Some(session) = self.sessions.get_mut(&target_player_id) {
            session.role = PlayerRole::Admin;
            true
        } else {
            false
        }
    }

    fn remove_player(&mut self, player_id: u32, reason: &'static str) {
        if let Some(session) = self.sessions.remove(&player_id) {
            self.endpoint_to_player.remove(&session.endpoint);
        }
        if let Some(entity) = self.player_entities.remove(&player_id) {
            self.registry.destroy(entity);
            self.player_ready_bits.remove(&entity);
        }
        self.lives_remaining.remove(&player_id);
        self.desync.remove_client(player_id);
        info!(player_id, reason, "player removed from room");
    }
}
