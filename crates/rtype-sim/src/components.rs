//! Plain-data component records for the simulation.
//!
//! Every type here is a tagged-union-free record: no component stores a
//! trait object or an inheritance-derived pointer. Variant behavior (e.g.
//! [`Movement`]'s pattern, [`Collider`]'s shape) is expressed with a Rust
//! `enum`, per the "polymorphism-free core" design note.

use serde::{Deserialize, Serialize};

use rtype_ecs::EntityId;

/// Position, rotation and non-uniform scale of an entity.
///
/// Collision-bearing entities require `scale_x`/`scale_y` finite and
/// positive; [`crate::systems::collision`] rejects any shape built from a
/// non-finite or non-positive scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Linear velocity in world units per second.
///
/// A non-finite component is skipped by [`crate::systems::movement`] rather
/// than corrupting `Transform`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite()
    }
}

/// Axis-aligned collision box local to the entity's transform. The simplest
/// collidable shape; an entity with neither this nor a [`Collider`] is
/// non-collidable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hitbox {
    pub w: f32,
    pub h: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub active: bool,
}

impl Default for Hitbox {
    fn default() -> Self {
        Self {
            w: 1.0,
            h: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            active: true,
        }
    }
}

/// The shape of a [`Collider`], tagged rather than modeled as a class
/// hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Box { w: f32, h: f32 },
    Circle { radius: f32 },
    Polygon { points: Vec<(f32, f32)> },
}

/// A richer collider than [`Hitbox`]: box, circle, or arbitrary polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collider {
    pub shape: ColliderShape,
    pub offset_x: f32,
    pub offset_y: f32,
    pub active: bool,
}

impl Collider {
    pub fn new_box(w: f32, h: f32) -> Self {
        Self {
            shape: ColliderShape::Box { w, h },
            offset_x: 0.0,
            offset_y: 0.0,
            active: true,
        }
    }

    pub fn new_circle(radius: f32) -> Self {
        Self {
            shape: ColliderShape::Circle { radius },
            offset_x: 0.0,
            offset_y: 0.0,
            active: true,
        }
    }
}

/// Current and maximum hit points. Invariant: `0 <= current <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Applies `amount` of damage, clamping `current` at zero. Returns the
    /// amount actually absorbed (`min(current_before, amount)`), matching
    /// `DamageEvent.amount` in the spec.
    pub fn damage(&mut self, amount: i32) -> i32 {
        let absorbed = amount.max(0).min(self.current);
        self.current = (self.current - absorbed).max(0);
        absorbed
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }
}

/// A projectile's damage payload and remaining lifetime, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Missile {
    pub damage: i32,
    pub lifetime: f32,
    pub from_player: bool,
}

/// Links a projectile (or any spawned entity) back to the entity that
/// created it, used by [`crate::systems::damage`] to attribute kills.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    pub owner: EntityId,
}

/// The parametric motion pattern driving [`crate::systems::monster_movement`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MovementPattern {
    Linear,
    Zigzag,
    Sine,
    FollowPlayer,
}

/// Drives `Velocity` for non-player entities from a pure function of
/// `(pattern, params, time)`. `time` accumulates every call to
/// [`crate::systems::monster_movement::monster_movement_system`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub pattern: MovementPattern,
    pub speed: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub phase: f32,
    pub time: f32,
}

impl Movement {
    pub fn new(pattern: MovementPattern, speed: f32) -> Self {
        Self {
            pattern,
            speed,
            amplitude: 0.0,
            frequency: 0.0,
            phase: 0.0,
            time: 0.0,
        }
    }
}

/// A bitset of coarse entity categories. Kept as a plain `u16` bitmask
/// (mirroring the wire-level `InputFlags` bitmask) rather than a derived
/// `bitflags!` type, since only membership tests are needed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag(pub u16);

impl Tag {
    pub const PLAYER: u16 = 1 << 0;
    pub const ENEMY: u16 = 1 << 1;
    pub const PROJECTILE: u16 = 1 << 2;
    pub const OBSTACLE: u16 = 1 << 3;
    pub const BOSS: u16 = 1 << 4;

    pub fn new(bits: u16) -> Self {
        Self(bits)
    }

    pub fn has(self, bit: u16) -> bool {
        self.0 & bit != 0
    }
}

/// The last accepted input for a player, keyed by its sequence id so stale
/// or duplicate packets can be detected and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub sequence_id: u16,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// Per-enemy autofire cadence. `time_since_last_shot` is owned by the
/// component, not the system, so [`crate::systems::enemy_shooting`] remains
/// stateless across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyShooting {
    pub interval: f32,
    pub speed: f32,
    pub damage: i32,
    pub lifetime: f32,
    pub time_since_last_shot: f32,
}

/// Present on a dead player while awaiting respawn. [`crate::systems::boundary`]
/// skips clamping entities that carry this component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RespawnTimer {
    pub remaining: f32,
}

/// Grants temporary immunity to damage after a respawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvincibilityTimer {
    pub remaining: f32,
}

/// A rectangular world-space clamp applied to `Transform` by
/// [`crate::systems::boundary`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

/// Score credited to the attacking player when this entity is destroyed by
/// damage (as opposed to leaving bounds, which is silent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreValue {
    pub value: i32,
}

/// A player's running score total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub total: i32,
}

/// Client-side rendering depth. Carried in snapshots but never read by the
/// server simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub z: i16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_damage_clamps_at_zero() {
        let mut hp = Health::new(10);
        hp.current = 5;
        let absorbed = hp.damage(100);
        assert_eq!(hp.current, 0);
        assert_eq!(absorbed, 5);
    }

    #[test]
    fn health_damage_never_goes_negative_on_repeated_hits() {
        let mut hp = Health::new(3);
        assert_eq!(hp.damage(1), 1);
        assert_eq!(hp.damage(1), 1);
        assert_eq!(hp.damage(5), 1);
        assert_eq!(hp.current, 0);
        assert_eq!(hp.damage(1), 0);
    }

    #[test]
    fn tag_membership() {
        let t = Tag::new(Tag::PLAYER | Tag::PROJECTILE);
        assert!(t.has(Tag::PLAYER));
        assert!(!t.has(Tag::ENEMY));
    }
}
