//! Translates dispatched level events into registry entities.
//!
//! [`LevelSpawnSystem::apply`] is called once per [`DispatchedEvent`]
//! returned by [`crate::director::LevelDirector::tick`]. Entity-producing
//! events (`spawn_wave`, `spawn_obstacle`, `spawn_boss`) emplace components
//! directly; everything else has no registry-side effect and is surfaced as
//! a [`LevelSideEffect`] for the room's game loop to apply to its own state
//! (current scroll, camera bounds, background/music ids, gates,
//! checkpoints).

use rtype_ecs::{EntityId, Registry};
use rtype_sim::components::{
    Health, Movement, MovementPattern, ScoreValue, Tag, Transform, Velocity,
};

use crate::data::{
    CameraBounds, EventType, LevelData, LevelEvent, ScrollSettings, WaveDefinition, WaveType,
};

/// Non-entity effects of a dispatched event, for the caller to fold into
/// room-level state (scroll speed, camera/player bounds, gates...).
#[derive(Debug, Clone)]
pub enum LevelSideEffect {
    SetScroll(ScrollSettings),
    SetBackground(String),
    SetMusic(String),
    SetCameraBounds(CameraBounds),
    SetPlayerBounds(CameraBounds),
    ClearPlayerBounds,
    GateOpen(String),
    GateClose(String),
    Checkpoint { checkpoint_id: String, respawn: (f32, f32) },
}

/// Entities spawned by one `apply` call, tagged with the `spawnId` (if any)
/// so the caller can watch for their collective death and feed
/// [`crate::director::LevelDirector::register_spawn_dead`].
#[derive(Debug, Clone, Default)]
pub struct SpawnResult {
    pub spawned: Vec<EntityId>,
    pub spawn_id: Option<String>,
    pub side_effect: Option<LevelSideEffect>,
}

/// Per-segment enemy health/damage scaling applied uniformly across an
/// encounter, e.g. for difficulty ramps between playthroughs.
#[derive(Debug, Clone, Copy)]
pub struct SpawnScaling {
    pub enemy_health_multiplier: f32,
    pub enemy_damage_multiplier: f32,
}

impl Default for SpawnScaling {
    fn default() -> Self {
        Self {
            enemy_health_multiplier: 1.0,
            enemy_damage_multiplier: 1.0,
        }
    }
}

pub struct LevelSpawnSystem {
    pub scaling: SpawnScaling,
}

impl LevelSpawnSystem {
    pub fn new(scaling: SpawnScaling) -> Self {
        Self { scaling }
    }

    pub fn apply(
        &self,
        registry: &mut Registry,
        data: &LevelData,
        event: &LevelEvent,
    ) -> SpawnResult {
        match event.kind {
            Some(EventType::SpawnWave) => self.spawn_wave(registry, data, event),
            Some(EventType::SpawnObstacle) => self.spawn_obstacle(registry, data, event),
            Some(EventType::SpawnBoss) => self.spawn_boss(registry, data, event),
            Some(EventType::SetScroll) => SpawnResult {
                side_effect: event.scroll.clone().map(LevelSideEffect::SetScroll),
                ..Default::default()
            },
            Some(EventType::SetBackground) => SpawnResult {
                side_effect: event.background_id.clone().map(LevelSideEffect::SetBackground),
                ..Default::default()
            },
            Some(EventType::SetMusic) => SpawnResult {
                side_effect: event.music_id.clone().map(LevelSideEffect::SetMusic),
                ..Default::default()
            },
            Some(EventType::SetCameraBounds) => SpawnResult {
                side_effect: event.camera_bounds.map(LevelSideEffect::SetCameraBounds),
                ..Default::default()
            },
            Some(EventType::SetPlayerBounds) => SpawnResult {
                side_effect: event.player_bounds.map(LevelSideEffect::SetPlayerBounds),
                ..Default::default()
            },
            Some(EventType::ClearPlayerBounds) => SpawnResult {
                side_effect: Some(LevelSideEffect::ClearPlayerBounds),
                ..Default::default()
            },
            Some(EventType::GateOpen) => SpawnResult {
                side_effect: event.gate_id.clone().map(LevelSideEffect::GateOpen),
                ..Default::default()
            },
            Some(EventType::GateClose) => SpawnResult {
                side_effect: event.gate_id.clone().map(LevelSideEffect::GateClose),
                ..Default::default()
            },
            Some(EventType::Checkpoint) => SpawnResult {
                side_effect: event.checkpoint.as_ref().map(|c| LevelSideEffect::Checkpoint {
                    checkpoint_id: c.checkpoint_id.clone(),
                    respawn: (c.respawn.x, c.respawn.y),
                }),
                ..Default::default()
            },
            None => SpawnResult::default(),
        }
    }

    fn spawn_wave(&self, registry: &mut Registry, data: &LevelData, event: &LevelEvent) -> SpawnResult {
        let Some(wave) = &event.wave else { return SpawnResult::default() };
        let Some(template) = data.templates.enemies.get(&wave.enemy) else {
            tracing::warn!(enemy = %wave.enemy, "spawn_wave references unknown enemy template");
            return SpawnResult::default();
        };

        let positions = wave_positions(wave);
        let mut spawned = Vec::with_capacity(positions.len());
        for (x, y) in positions {
            let health = wave.health.unwrap_or(template.health);
            let scale = wave.scale.unwrap_or(template.scale);
            let health = (health as f32 * self.scaling.enemy_health_multiplier).round() as i32;

            let id = registry.create();
            let _ = registry.emplace(
                id,
                Transform {
                    x,
                    y,
                    rotation: 0.0,
                    scale_x: scale.x,
                    scale_y: scale.y,
                },
            );
            let _ = registry.emplace(id, Velocity::default());
            let _ = registry.emplace(id, template.hitbox);
            if let Some(collider) = &template.collider {
                let _ = registry.emplace(id, collider.clone());
            }
            let _ = registry.emplace(id, Health::new(health.max(1)));
            let _ = registry.emplace(id, Tag::new(Tag::ENEMY));
            let _ = registry.emplace(id, ScoreValue { value: template.score });

            if let Some(pattern_id) = &wave.pattern_id {
                if let Some(pattern) = data.patterns.iter().find(|p| &p.id == pattern_id) {
                    let _ = registry.emplace(id, pattern.movement);
                } else {
                    tracing::warn!(pattern_id, "spawn_wave references unknown pattern");
                }
            } else {
                let _ = registry.emplace(id, Movement::new(MovementPattern::Linear, 0.0));
            }

            let shoot_enabled = wave.shooting_enabled.unwrap_or(true);
            if shoot_enabled {
                if let Some(shooting) = &template.shooting {
                    let mut shooting = shooting.clone();
                    shooting.damage = (shooting.damage as f32 * self.scaling.enemy_damage_multiplier).round() as i32;
                    let _ = registry.emplace(id, shooting);
                }
            }

            spawned.push(id);
        }

        SpawnResult {
            spawned,
            spawn_id: Some(event.id.clone()).filter(|s| !s.is_empty()),
            side_effect: None,
        }
    }

    fn spawn_obstacle(&self, registry: &mut Registry, data: &LevelData, event: &LevelEvent) -> SpawnResult {
        let Some(settings) = &event.obstacle else { return SpawnResult::default() };
        let Some(template) = data.templates.obstacles.get(&settings.obstacle) else {
            tracing::warn!(obstacle = %settings.obstacle, "spawn_obstacle references unknown template");
            return SpawnResult::default();
        };

        let anchor = settings.anchor.unwrap_or(template.anchor);
        let margin = settings.margin.unwrap_or(template.margin);
        let y = match anchor {
            crate::data::ObstacleAnchor::Top => margin,
            crate::data::ObstacleAnchor::Bottom => -margin,
            crate::data::ObstacleAnchor::Absolute => settings.y.unwrap_or(0.0),
        };
        let health = settings.health.unwrap_or(template.health);
        let scale = settings.scale.unwrap_or(template.scale);
        let speed_x = settings.speed_x.unwrap_or(template.speed_x);
        let speed_y = settings.speed_y.unwrap_or(template.speed_y);

        let id = registry.create();
        let _ = registry.emplace(
            id,
            Transform {
                x: settings.x,
                y,
                rotation: 0.0,
                scale_x: scale.x,
                scale_y: scale.y,
            },
        );
        let _ = registry.emplace(id, Velocity { vx: speed_x, vy: speed_y });
        let _ = registry.emplace(id, template.hitbox);
        if let Some(collider) = &template.collider {
            let _ = registry.emplace(id, collider.clone());
        }
        let _ = registry.emplace(id, Health::new(health.max(1)));
        let _ = registry.emplace(id, Tag::new(Tag::OBSTACLE));

        SpawnResult {
            spawned: vec![id],
            spawn_id: Some(settings.spawn_id.clone()).filter(|s| !s.is_empty()),
            side_effect: None,
        }
    }

    fn spawn_boss(&self, registry: &mut Registry, data: &LevelData, event: &LevelEvent) -> SpawnResult {
        let Some(settings) = &event.boss else { return SpawnResult::default() };
        let Some(boss) = data.bosses.get(&settings.boss_id) else {
            tracing::warn!(boss_id = %settings.boss_id, "spawn_boss references unknown boss definition");
            return SpawnResult::default();
        };

        let health = (boss.health as f32 * self.scaling.enemy_health_multiplier).round() as i32;

        let id = registry.create();
        let _ = registry.emplace(
            id,
            Transform {
                x: settings.spawn.x,
                y: settings.spawn.y,
                rotation: 0.0,
                scale_x: boss.scale.x,
                scale_y: boss.scale.y,
            },
        );
        let _ = registry.emplace(id, Velocity::default());
        let _ = registry.emplace(id, boss.hitbox);
        if let Some(collider) = &boss.collider {
            let _ = registry.emplace(id, collider.clone());
        }
        let _ = registry.emplace(id, Health::new(health.max(1)));
        let _ = registry.emplace(id, Tag::new(Tag::ENEMY | Tag::BOSS));
        let _ = registry.emplace(id, ScoreValue { value: boss.score });

        if let Some(pattern_id) = &boss.pattern_id {
            if let Some(pattern) = data.patterns.iter().find(|p| &p.id == pattern_id) {
                let _ = registry.emplace(id, pattern.movement);
            }
        }
        if let Some(shooting) = &boss.shooting {
            let _ = registry.emplace(id, shooting.clone());
        }

        SpawnResult {
            spawned: vec![id],
            spawn_id: Some(settings.spawn_id.clone()).filter(|s| !s.is_empty()),
            side_effect: None,
        }
    }
}

fn wave_positions(wave: &WaveDefinition) -> Vec<(f32, f32)> {
    let count = wave.count.max(0) as usize;
    match wave.kind {
        Some(WaveType::Line) => (0..count)
            .map(|i| (wave.spawn_x, wave.start_y + wave.delta_y * i as f32))
            .collect(),
        Some(WaveType::Stagger) => (0..count)
            .map(|i| {
                let row = i as f32;
                (wave.spawn_x + wave.spacing * (row % 2.0), wave.start_y + wave.row_height * row)
            })
            .collect(),
        Some(WaveType::Triangle) => {
            let mut points = Vec::new();
            for layer in 0..wave.layers.max(1) {
                let width = layer;
                for i in 0..=width {
                    let x = wave.spawn_x + (i as f32 - width as f32 / 2.0) * wave.horizontal_step;
                    let y = wave.apex_y + layer as f32 * wave.row_height;
                    points.push((x, y));
                }
            }
            points
        }
        Some(WaveType::Serpent) => (0..count)
            .map(|i| {
                let t = i as f32;
                let x = wave.spawn_x + wave.step_time * t;
                let y = wave.start_y + (wave.amplitude_x * (t * std::f32::consts::TAU / wave.step.max(1.0)).sin());
                (x, y)
            })
            .collect(),
        Some(WaveType::Cross) => {
            let mut points = vec![(wave.center_x, wave.center_y)];
            for i in 1..=wave.arm_length.max(0) {
                let d = i as f32 * wave.step;
                points.push((wave.center_x + d, wave.center_y));
                points.push((wave.center_x - d, wave.center_y));
                points.push((wave.center_x, wave.center_y + d));
                points.push((wave.center_x, wave.center_y - d));
            }
            points
        }
        None => Vec::new(),
    }
}
