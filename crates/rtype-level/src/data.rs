//! The in-memory level model: the JSON schema (v1) deserialized and
//! validated by [`crate::loader`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use rtype_sim::components::{Collider, EnemyShooting, Hitbox};

/// The set of archetype `typeId`s every level must translate, per the
/// external-interface contract: player variants, bullet variants, enemy
/// bullet, death fx.
pub const REQUIRED_ARCHETYPE_IDS: &[u16] = &[1, 3, 4, 5, 6, 7, 8, 12, 13, 14, 15, 16];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2f {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelMeta {
    pub background_id: String,
    pub music_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelArchetype {
    pub type_id: u16,
    pub sprite_id: String,
    pub anim_id: String,
    pub layer: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub id: String,
    pub movement: rtype_sim::components::Movement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyTemplate {
    pub type_id: u16,
    pub hitbox: Hitbox,
    #[serde(default)]
    pub collider: Option<Collider>,
    #[serde(default = "default_health")]
    pub health: i32,
    #[serde(default)]
    pub score: i32,
    #[serde(default = "default_scale")]
    pub scale: Vec2f,
    #[serde(default)]
    pub shooting: Option<EnemyShooting>,
}

fn default_health() -> i32 {
    1
}

fn default_scale() -> Vec2f {
    Vec2f { x: 1.0, y: 1.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleAnchor {
    Top,
    Bottom,
    Absolute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObstacleTemplate {
    pub type_id: u16,
    pub hitbox: Hitbox,
    #[serde(default)]
    pub collider: Option<Collider>,
    #[serde(default = "default_health")]
    pub health: i32,
    #[serde(default = "default_anchor")]
    pub anchor: ObstacleAnchor,
    #[serde(default)]
    pub margin: f32,
    #[serde(default)]
    pub speed_x: f32,
    #[serde(default)]
    pub speed_y: f32,
    #[serde(default = "default_scale")]
    pub scale: Vec2f,
}

fn default_anchor() -> ObstacleAnchor {
    ObstacleAnchor::Absolute
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelTemplates {
    #[serde(default)]
    pub hitboxes: HashMap<String, Hitbox>,
    #[serde(default)]
    pub colliders: HashMap<String, Collider>,
    #[serde(default)]
    pub enemies: HashMap<String, EnemyTemplate>,
    #[serde(default)]
    pub obstacles: HashMap<String, ObstacleTemplate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollMode {
    #[default]
    Constant,
    Stopped,
    Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollKeyframe {
    pub time: f32,
    pub speed_x: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSettings {
    #[serde(default)]
    pub mode: ScrollMode,
    #[serde(default)]
    pub speed_x: f32,
    #[serde(default)]
    pub curve: Vec<ScrollKeyframe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Time,
    Distance,
    SpawnDead,
    BossDead,
    EnemyCountAtMost,
    CheckpointReached,
    HpBelow,
    AllOf,
    AnyOf,
    PlayerInZone,
    PlayersReady,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: Option<TriggerType>,
    #[serde(default)]
    pub time: f32,
    #[serde(default)]
    pub distance: f32,
    #[serde(default)]
    pub spawn_id: String,
    #[serde(default)]
    pub boss_id: String,
    #[serde(default)]
    pub checkpoint_id: String,
    #[serde(default)]
    pub count: i32,
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub zone: Option<CameraBounds>,
    #[serde(default)]
    pub require_all_players: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatSpec {
    pub interval: f32,
    #[serde(default)]
    pub count: Option<i32>,
    #[serde(default)]
    pub until: Option<Trigger>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveType {
    Line,
    Stagger,
    Triangle,
    Serpent,
    Cross,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveDefinition {
    #[serde(rename = "type")]
    pub kind: Option<WaveType>,
    pub enemy: String,
    #[serde(default)]
    pub pattern_id: Option<String>,
    #[serde(default)]
    pub spawn_x: f32,
    #[serde(default)]
    pub start_y: f32,
    #[serde(default)]
    pub delta_y: f32,
    #[serde(default)]
    pub count: i32,
    #[serde(default)]
    pub spacing: f32,
    #[serde(default)]
    pub apex_y: f32,
    #[serde(default)]
    pub row_height: f32,
    #[serde(default)]
    pub layers: i32,
    #[serde(default)]
    pub horizontal_step: f32,
    #[serde(default)]
    pub amplitude_x: f32,
    #[serde(default)]
    pub step_time: f32,
    #[serde(default)]
    pub center_x: f32,
    #[serde(default)]
    pub center_y: f32,
    #[serde(default)]
    pub step: f32,
    #[serde(default)]
    pub arm_length: i32,
    #[serde(default)]
    pub health: Option<i32>,
    #[serde(default)]
    pub scale: Option<Vec2f>,
    #[serde(default)]
    pub shooting_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnObstacleSettings {
    pub obstacle: String,
    pub spawn_id: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub anchor: Option<ObstacleAnchor>,
    #[serde(default)]
    pub margin: Option<f32>,
    #[serde(default)]
    pub health: Option<i32>,
    #[serde(default)]
    pub scale: Option<Vec2f>,
    #[serde(default)]
    pub speed_x: Option<f32>,
    #[serde(default)]
    pub speed_y: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnBossSettings {
    pub boss_id: String,
    pub spawn_id: String,
    #[serde(default)]
    pub spawn: Vec2f,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointDefinition {
    pub checkpoint_id: String,
    pub respawn: Vec2f,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SpawnWave,
    SpawnObstacle,
    SpawnBoss,
    SetScroll,
    SetBackground,
    SetMusic,
    SetCameraBounds,
    SetPlayerBounds,
    ClearPlayerBounds,
    GateOpen,
    GateClose,
    Checkpoint,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEvent {
    #[serde(rename = "type")]
    pub kind: Option<EventType>,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub repeat: Option<RepeatSpec>,
    #[serde(default)]
    pub wave: Option<WaveDefinition>,
    #[serde(default)]
    pub obstacle: Option<SpawnObstacleSettings>,
    #[serde(default)]
    pub boss: Option<SpawnBossSettings>,
    #[serde(default)]
    pub scroll: Option<ScrollSettings>,
    #[serde(default)]
    pub background_id: Option<String>,
    #[serde(default)]
    pub music_id: Option<String>,
    #[serde(default)]
    pub camera_bounds: Option<CameraBounds>,
    #[serde(default)]
    pub player_bounds: Option<CameraBounds>,
    #[serde(default)]
    pub gate_id: Option<String>,
    #[serde(default)]
    pub checkpoint: Option<CheckpointDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSegment {
    pub id: String,
    #[serde(default)]
    pub scroll: ScrollSettings,
    #[serde(default)]
    pub events: Vec<LevelEvent>,
    pub exit: Trigger,
    #[serde(default)]
    pub boss_room: bool,
    #[serde(default)]
    pub camera_bounds: Option<CameraBounds>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossPhase {
    pub id: String,
    pub trigger: Trigger,
    #[serde(default)]
    pub events: Vec<LevelEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossDefinition {
    pub type_id: u16,
    pub hitbox: Hitbox,
    #[serde(default)]
    pub collider: Option<Collider>,
    #[serde(default = "default_health")]
    pub health: i32,
    #[serde(default)]
    pub score: i32,
    #[serde(default = "default_scale")]
    pub scale: Vec2f,
    #[serde(default)]
    pub pattern_id: Option<String>,
    #[serde(default)]
    pub shooting: Option<EnemyShooting>,
    #[serde(default)]
    pub phases: Vec<BossPhase>,
    #[serde(default)]
    pub on_death: Vec<LevelEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelData {
    pub schema_version: i32,
    pub level_id: i32,
    pub meta: LevelMeta,
    #[serde(default)]
    pub archetypes: Vec<LevelArchetype>,
    #[serde(default)]
    pub patterns: Vec<PatternDefinition>,
    #[serde(default)]
    pub templates: LevelTemplates,
    #[serde(default)]
    pub bosses: HashMap<String, BossDefinition>,
    #[serde(default)]
    pub segments: Vec<LevelSegment>,
}
