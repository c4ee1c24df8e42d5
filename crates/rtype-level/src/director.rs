//! The level director: a per-room state machine that walks a [`LevelData`]'s
//! segments, evaluates triggers against externally-reported game state, and
//! emits the [`LevelEvent`]s due to fire this tick as [`DispatchedEvent`]s
//! for [`crate::spawn::LevelSpawnSystem`] to apply.
//!
//! The director never touches the registry itself — it only tracks scalar
//! progress (elapsed time, scroll distance) and the small bits of state the
//! trigger grammar needs (dead spawns, boss phases, checkpoints). The game
//! loop feeds it per-tick facts via the `register_*` methods before calling
//! [`LevelDirector::tick`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::data::{
    CameraBounds, EventType, LevelData, LevelEvent, LevelSegment, ScrollMode, ScrollSettings,
    Trigger, TriggerType,
};

/// An event that fired this tick, tagged with the segment it belongs to
/// (bosses' phase/on-death events carry an empty segment id).
#[derive(Debug, Clone)]
pub struct DispatchedEvent {
    pub segment_id: String,
    pub event: LevelEvent,
}

#[derive(Debug, Clone, Default)]
struct EventRuntime {
    fired_once: bool,
    fire_count: i32,
    last_fire_time: Option<f32>,
}

#[derive(Debug, Clone, Default)]
struct BossRuntime {
    active: bool,
    phase_index: usize,
    phase_runtime: Vec<EventRuntime>,
}

/// Read-only snapshot of externally-tracked facts a trigger may reference.
struct TriggerContext<'a> {
    segment_elapsed: f32,
    distance: f32,
    dead_spawns: &'a HashSet<String>,
    dead_bosses: &'a HashSet<String>,
    enemy_count: i32,
    reached_checkpoints: &'a HashSet<String>,
    boss_hp_percent: &'a HashMap<String, f32>,
    player_positions: &'a [(f32, f32)],
    players_ready: bool,
}

fn point_in_zone(p: (f32, f32), zone: &CameraBounds) -> bool {
    p.0 >= zone.min_x && p.0 <= zone.max_x && p.1 >= zone.min_y && p.1 <= zone.max_y
}

fn evaluate_trigger(trigger: &Trigger, ctx: &TriggerContext) -> bool {
    match trigger.kind {
        Some(TriggerType::Time) => ctx.segment_elapsed >= trigger.time,
        Some(TriggerType::Distance) => ctx.distance >= trigger.distance,
        Some(TriggerType::SpawnDead) => ctx.dead_spawns.contains(&trigger.spawn_id),
        Some(TriggerType::BossDead) => ctx.dead_bosses.contains(&trigger.boss_id),
        Some(TriggerType::EnemyCountAtMost) => ctx.enemy_count <= trigger.count,
        Some(TriggerType::CheckpointReached) => ctx.reached_checkpoints.contains(&trigger.checkpoint_id),
        Some(TriggerType::HpBelow) => {
            let hp = ctx.boss_hp_percent.get(&trigger.boss_id).copied().unwrap_or(100.0);
            hp <= trigger.value as f32
        }
        Some(TriggerType::PlayerInZone) => {
            let Some(zone) = &trigger.zone else { return false };
            if ctx.player_positions.is_empty() {
                return false;
            }
            if trigger.require_all_players {
                ctx.player_positions.iter().all(|&p| point_in_zone(p, zone))
            } else {
                ctx.player_positions.iter().any(|&p| point_in_zone(p, zone))
            }
        }
        Some(TriggerType::PlayersReady) => ctx.players_ready,
        Some(TriggerType::AllOf) => trigger.triggers.iter().all(|t| evaluate_trigger(t, ctx)),
        Some(TriggerType::AnyOf) => trigger.triggers.iter().any(|t| evaluate_trigger(t, ctx)),
        None => false,
    }
}

fn evaluate_scroll(scroll: &ScrollSettings, elapsed: f32) -> f32 {
    match scroll.mode {
        ScrollMode::Constant => scroll.speed_x,
        ScrollMode::Stopped => 0.0,
        ScrollMode::Curve => {
            let curve = &scroll.curve;
            if curve.is_empty() {
                return scroll.speed_x;
            }
            if elapsed <= curve[0].time {
                return curve[0].speed_x;
            }
            for w in curve.windows(2) {
                let (a, b) = (w[0], w[1]);
                if elapsed >= a.time && elapsed <= b.time {
                    let span = b.time - a.time;
                    if span <= 0.0 {
                        return b.speed_x;
                    }
                    let t = (elapsed - a.time) / span;
                    return a.speed_x + (b.speed_x - a.speed_x) * t;
                }
            }
            curve.last().unwrap().speed_x
        }
    }
}

/// Drives progression through a level's segments and boss phases.
///
/// Holds the level data by `Arc` rather than by reference: a `GameInstance`
/// shares one immutable `LevelData` across the director, the spawn system,
/// and the wire-level `LevelInit` encoder, and an `Arc` avoids pinning the
/// director to a borrow that would otherwise have to outlive the instance
/// that owns both.
pub struct LevelDirector {
    data: Arc<LevelData>,
    segment_index: usize,
    segment_elapsed: f32,
    distance: f32,
    scroll_speed_x: f32,
    /// A `SetScroll` event replaces the segment's own scroll for the rest
    /// of the segment and resets `scroll_clock` to 0; `None` means "use
    /// the current segment's declared `scroll`" (spec §4.3's `activeScroll`).
    active_scroll: Option<ScrollSettings>,
    scroll_clock: f32,
    event_runtime: Vec<Vec<EventRuntime>>,
    boss_runtime: HashMap<String, BossRuntime>,
    dead_spawns: HashSet<String>,
    dead_bosses: HashSet<String>,
    reached_checkpoints: HashSet<String>,
    enemy_count: i32,
    boss_hp_percent: HashMap<String, f32>,
    player_positions: Vec<(f32, f32)>,
    players_ready: bool,
    finished: bool,
}

impl LevelDirector {
    pub fn new(data: Arc<LevelData>) -> Self {
        let event_runtime = data
            .segments
            .iter()
            .map(|seg| vec![EventRuntime::default(); seg.events.len()])
            .collect();
        let boss_runtime = data
            .bosses
            .iter()
            .map(|(id, boss)| {
                (
                    id.clone(),
                    BossRuntime {
                        active: false,
                        phase_index: 0,
                        phase_runtime: vec![EventRuntime::default(); boss.phases.len()],
                    },
                )
            })
            .collect();

        let scroll_speed_x = data
            .segments
            .first()
            .map(|seg| evaluate_scroll(&seg.scroll, 0.0))
            .unwrap_or(0.0);
        let finished = data.segments.is_empty();

        Self {
            data,
            segment_index: 0,
            segment_elapsed: 0.0,
            distance: 0.0,
            scroll_speed_x,
            active_scroll: None,
            scroll_clock: 0.0,
            event_runtime,
            boss_runtime,
            dead_spawns: HashSet::new(),
            dead_bosses: HashSet::new(),
            reached_checkpoints: HashSet::new(),
            enemy_count: 0,
            boss_hp_percent: HashMap::new(),
            player_positions: Vec::new(),
            players_ready: false,
            finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_scroll_speed(&self) -> f32 {
        self.scroll_speed_x
    }

    pub fn current_segment(&self) -> Option<&LevelSegment> {
        self.data.segments.get(self.segment_index)
    }

    /// The level data this director was constructed from, shared with the
    /// rest of the room (spawn system, `LevelInit` encoding).
    pub fn level_data(&self) -> &Arc<LevelData> {
        &self.data
    }

    pub fn register_spawn_dead(&mut self, spawn_id: impl Into<String>) {
        self.dead_spawns.insert(spawn_id.into());
    }

    pub fn register_boss_spawned(&mut self, boss_id: &str) {
        if let Some(rt) = self.boss_runtime.get_mut(boss_id) {
            rt.active = true;
        }
        self.boss_hp_percent.insert(boss_id.to_string(), 100.0);
    }

    pub fn register_boss_dead(&mut self, boss_id: impl Into<String>) {
        let id = boss_id.into();
        self.boss_hp_percent.insert(id.clone(), 0.0);
        self.dead_bosses.insert(id);
    }

    pub fn register_boss_hp_percent(&mut self, boss_id: &str, percent: f32) {
        self.boss_hp_percent.insert(boss_id.to_string(), percent.clamp(0.0, 100.0));
    }

    pub fn register_checkpoint_reached(&mut self, checkpoint_id: impl Into<String>) {
        self.reached_checkpoints.insert(checkpoint_id.into());
    }

    pub fn register_enemy_count(&mut self, count: i32) {
        self.enemy_count = count;
    }

    pub fn register_player_positions(&mut self, positions: Vec<(f32, f32)>) {
        self.player_positions = positions;
    }

    pub fn register_players_ready(&mut self, ready: bool) {
        self.players_ready = ready;
    }

    fn context(&self) -> TriggerContext {
        TriggerContext {
            segment_elapsed: self.segment_elapsed,
            distance: self.distance,
            dead_spawns: &self.dead_spawns,
            dead_bosses: &self.dead_bosses,
            enemy_count: self.enemy_count,
            reached_checkpoints: &self.reached_checkpoints,
            boss_hp_percent: &self.boss_hp_percent,
            player_positions: &self.player_positions,
            players_ready: self.players_ready,
        }
    }

    /// Advances the director by `dt` seconds and returns the events that
    /// fired, in declaration order (segment events first, then boss phase
    /// events, then boss on-death events).
    pub fn tick(&mut self, dt: f32) -> Vec<DispatchedEvent> {
        if self.finished {
            return Vec::new();
        }

        self.segment_elapsed += dt;
        self.scroll_clock += dt;
        self.distance += self.scroll_speed_x * dt;

        let mut fired = Vec::new();

        if let Some(seg) = self.data.segments.get(self.segment_index) {
            self.scroll_speed_x = match &self.active_scroll {
                Some(active) => evaluate_scroll(active, self.scroll_clock),
                None => evaluate_scroll(&seg.scroll, self.segment_elapsed),
            };

            let ctx = self.context();
            for (ei, event) in seg.events.iter().enumerate() {
                if Self::fire_if_due(&mut self.event_runtime[self.segment_index][ei], event, &ctx) {
                    if event.kind == Some(EventType::SetScroll) {
                        if let Some(scroll) = &event.scroll {
                            self.active_scroll = Some(scroll.clone());
                            self.scroll_clock = 0.0;
                        }
                    }
                    fired.push(DispatchedEvent {
                        segment_id: seg.id.clone(),
                        event: event.clone(),
                    });
                }
            }
        }

        for (boss_id, boss) in &self.data.bosses {
            let Some(rt) = self.boss_runtime.get_mut(boss_id) else { continue };
            if !rt.active || rt.phase_index >= boss.phases.len() {
                continue;
            }
            let ctx = self.context();
            let phase = &boss.phases[rt.phase_index];
            if evaluate_trigger(&phase.trigger, &ctx) {
                for event in &phase.events {
                    fired.push(DispatchedEvent {
                        segment_id: String::new(),
                        event: event.clone(),
                    });
                }
                rt.phase_index += 1;
            }
        }

        for (boss_id, boss) in &self.data.bosses {
            if !self.dead_bosses.contains(boss_id) {
                continue;
            }
            if let Some(rt) = self.boss_runtime.get_mut(boss_id) {
                if rt.active {
                    rt.active = false;
                    for event in &boss.on_death {
                        fired.push(DispatchedEvent {
                            segment_id: String::new(),
                            event: event.clone(),
                        });
                    }
                }
            }
        }

        if let Some(seg) = self.data.segments.get(self.segment_index) {
            let ctx = self.context();
            if evaluate_trigger(&seg.exit, &ctx) {
                self.advance_segment();
            }
        }

        fired
    }

    fn advance_segment(&mut self) {
        self.segment_index += 1;
        self.segment_elapsed = 0.0;
        self.distance = 0.0;
        self.active_scroll = None;
        self.scroll_clock = 0.0;
        if self.segment_index >= self.data.segments.len() {
            self.finished = true;
        } else {
            self.scroll_speed_x = evaluate_scroll(&self.data.segments[self.segment_index].scroll, 0.0);
        }
    }

    fn fire_if_due(state: &mut EventRuntime, event: &LevelEvent, ctx: &TriggerContext) -> bool {
        match &event.repeat {
            None => {
                if !state.fired_once && evaluate_trigger(&event.trigger, ctx) {
                    state.fired_once = true;
                    state.fire_count += 1;
                    state.last_fire_time = Some(ctx.segment_elapsed);
                    true
                } else {
                    false
                }
            }
            Some(repeat) => {
                if state.fire_count == 0 {
                    if evaluate_trigger(&event.trigger, ctx) {
                        state.fired_once = true;
                        state.fire_count += 1;
                        state.last_fire_time = Some(ctx.segment_elapsed);
                        return true;
                    }
                    return false;
                }
                if let Some(limit) = repeat.count {
                    if state.fire_count >= limit {
                        return false;
                    }
                }
                if let Some(until) = &repeat.until {
                    if evaluate_trigger(until, ctx) {
                        return false;
                    }
                }
                let last = state.last_fire_time.unwrap_or(0.0);
                if ctx.segment_elapsed - last >= repeat.interval {
                    state.fire_count += 1;
                    state.last_fire_time = Some(ctx.segment_elapsed);
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_level_str;

    fn archetypes_json() -> String {
        crate::data::REQUIRED_ARCHETYPE_IDS
            .iter()
            .map(|id| format!(r#"{{"typeId": {id}, "spriteId": "s", "animId": "a", "layer": 0}}"#))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn build_level(segments_json: &str) -> LevelData {
        let json = format!(
            r#"{{
                "schemaVersion": 1,
                "levelId": 1,
                "meta": {{"backgroundId": "bg", "musicId": "music"}},
                "archetypes": [{}],
                "templates": {{"enemies": {{"e1": {{"typeId": 20, "hitbox": {{"w": 1, "h": 1, "offsetX": 0, "offsetY": 0, "active": true}}}}}}}},
                "segments": [{}]
            }}"#,
            archetypes_json(),
            segments_json
        );
        load_level_str(&json, "test").unwrap()
    }

    #[test]
    fn time_trigger_fires_once_elapsed() {
        let data = build_level(
            r#"{
                "id": "s0",
                "exit": {"type": "distance", "distance": 1000000},
                "events": [{
                    "type": "spawn_wave",
                    "id": "w1",
                    "trigger": {"type": "time", "time": 1.0},
                    "wave": {"type": "line", "enemy": "e1", "count": 1}
                }]
            }"#,
        );
        let mut director = LevelDirector::new(Arc::new(data));
        assert!(director.tick(0.5).is_empty());
        let fired = director.tick(0.6);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].event.id, "w1");
        assert!(director.tick(1.0).is_empty(), "non-repeating event fires once");
    }

    #[test]
    fn exit_trigger_advances_segment_and_resets_elapsed() {
        let data = build_level(
            r#"
            {"id": "s0", "exit": {"type": "time", "time": 1.0}},
            {"id": "s1", "exit": {"type": "time", "time": 1000.0}}
            "#,
        );
        let mut director = LevelDirector::new(Arc::new(data));
        director.tick(1.5);
        assert_eq!(director.current_segment().unwrap().id, "s1");
        assert!(!director.is_finished());
    }

    #[test]
    fn last_segment_exit_marks_finished() {
        let data = build_level(r#"{"id": "s0", "exit": {"type": "time", "time": 0.1}}"#);
        let mut director = LevelDirector::new(Arc::new(data));
        director.tick(0.2);
        assert!(director.is_finished());
    }

    #[test]
    fn repeat_with_count_limit_stops_firing() {
        let data = build_level(
            r#"{
                "id": "s0",
                "exit": {"type": "distance", "distance": 1000000},
                "events": [{
                    "type": "spawn_wave",
                    "id": "w1",
                    "trigger": {"type": "time", "time": 0.0},
                    "repeat": {"interval": 1.0, "count": 2},
                    "wave": {"type": "line", "enemy": "e1", "count": 1}
                }]
            }"#,
        );
        let mut director = LevelDirector::new(Arc::new(data));
        let mut total = 0;
        for _ in 0..5 {
            total += director.tick(1.0).len();
        }
        assert_eq!(total, 2);
    }

    #[test]
    fn spawn_dead_trigger_waits_for_registration() {
        let data = build_level(
            r#"{
                "id": "s0",
                "exit": {"type": "spawn_dead", "spawnId": "boss1"},
                "events": []
            }"#,
        );
        let mut director = LevelDirector::new(Arc::new(data));
        director.tick(10.0);
        assert!(!director.is_finished());
        director.register_spawn_dead("boss1");
        director.tick(0.01);
        assert!(director.is_finished());
    }
}
