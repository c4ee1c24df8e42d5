//! `PlayerInputSystem`: decodes accepted input events into player velocity
//! and fire-triggered missile spawns.

use rtype_ecs::{EntityId, Registry};

use crate::components::{Collider, Hitbox, Missile, Ownership, PlayerInput, Tag, Transform, Velocity};

/// Bitmask over the movement/fire/ready flags carried by a wire input
/// packet. Shared between the simulation (which decomposes it into a
/// velocity) and the codec (which validates it against unknown bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFlags(pub u16);

impl InputFlags {
    pub const MOVE_UP: u16 = 1 << 0;
    pub const MOVE_DOWN: u16 = 1 << 1;
    pub const MOVE_LEFT: u16 = 1 << 2;
    pub const MOVE_RIGHT: u16 = 1 << 3;
    pub const FIRE: u16 = 1 << 4;
    pub const READY: u16 = 1 << 5;

    /// All bits the protocol currently understands. Anything outside this
    /// mask is rejected by the codec before an `InputEvent` is constructed.
    pub const ALL: u16 = Self::MOVE_UP
        | Self::MOVE_DOWN
        | Self::MOVE_LEFT
        | Self::MOVE_RIGHT
        | Self::FIRE
        | Self::READY;

    pub fn has(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    pub fn is_known(self) -> bool {
        self.0 & !Self::ALL == 0
    }
}

/// A single decoded, already-filtered input ready to be applied to a
/// player entity this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub player: EntityId,
    pub sequence_id: u16,
    pub flags: InputFlags,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// Tunables for [`player_input_system`], sourced from `RoomConfig` at the
/// call site.
#[derive(Debug, Clone, Copy)]
pub struct PlayerInputTuning {
    pub speed: f32,
    pub missile_speed: f32,
    pub missile_lifetime: f32,
    pub missile_damage: i32,
}

/// Applies a batch of decoded inputs, in order, to the registry.
///
/// For each event: if the player entity is dead, or its stored
/// `sequence_id` is `>=` the incoming one, the input is dropped (late or
/// duplicate). Otherwise the stored `PlayerInput` is updated, movement
/// flags decompose into a unit vector (diagonals normalized) scaled by
/// `tuning.speed`, and a `Fire` flag spawns a missile.
pub fn player_input_system(
    registry: &mut Registry,
    inputs: &[InputEvent],
    tuning: PlayerInputTuning,
) {
    for ev in inputs {
        if !registry.is_alive(ev.player) {
            continue;
        }
        let stale = registry
            .get::<PlayerInput>(ev.player)
            .map(|stored| ev.sequence_id <= stored.sequence_id)
            .unwrap_or(false);
        if stale {
            continue;
        }

        let _ = registry.emplace(
            ev.player,
            PlayerInput {
                sequence_id: ev.sequence_id,
                x: ev.x,
                y: ev.y,
                angle: ev.angle,
            },
        );

        let mut dx = 0.0f32;
        let mut dy = 0.0f32;
        if ev.flags.has(InputFlags::MOVE_UP) {
            dy -= 1.0;
        }
        if ev.flags.has(InputFlags::MOVE_DOWN) {
            dy += 1.0;
        }
        if ev.flags.has(InputFlags::MOVE_LEFT) {
            dx -= 1.0;
        }
        if ev.flags.has(InputFlags::MOVE_RIGHT) {
            dx += 1.0;
        }
        let len = (dx * dx + dy * dy).sqrt();
        let (ux, uy) = if len > 0.0 { (dx / len, dy / len) } else { (0.0, 0.0) };
        let _ = registry.emplace(
            ev.player,
            Velocity {
                vx: ux * tuning.speed,
                vy: uy * tuning.speed,
            },
        );

        if ev.flags.has(InputFlags::FIRE) {
            spawn_missile(registry, ev.player, &tuning);
        }
    }
}

fn spawn_missile(registry: &mut Registry, player: EntityId, tuning: &PlayerInputTuning) {
    let Ok(transform) = registry.get::<Transform>(player).copied() else {
        return;
    };
    let angle = registry
        .get::<PlayerInput>(player)
        .map(|i| i.angle)
        .unwrap_or(0.0);

    let missile = registry.create();
    let _ = registry.emplace(missile, transform);
    let _ = registry.emplace(
        missile,
        Velocity {
            vx: angle.cos() * tuning.missile_speed,
            vy: angle.sin() * tuning.missile_speed,
        },
    );
    let _ = registry.emplace(
        missile,
        Missile {
            damage: tuning.missile_damage,
            lifetime: tuning.missile_lifetime,
            from_player: true,
        },
    );
    let _ = registry.emplace(missile, Ownership { owner: player });
    let _ = registry.emplace(missile, Tag::new(Tag::PROJECTILE));
    let _ = registry.emplace(missile, Hitbox::default());
    let _ = registry.emplace(missile, Collider::new_box(1.0, 1.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Health;

    fn tuning() -> PlayerInputTuning {
        PlayerInputTuning {
            speed: 10.0,
            missile_speed: 20.0,
            missile_lifetime: 2.0,
            missile_damage: 5,
        }
    }

    fn spawn_player(registry: &mut Registry) -> EntityId {
        let e = registry.create();
        registry.emplace(e, Transform::default()).unwrap();
        registry.emplace(e, Velocity::default()).unwrap();
        registry.emplace(e, Health::new(10)).unwrap();
        registry.emplace(e, Tag::new(Tag::PLAYER)).unwrap();
        e
    }

    #[test]
    fn diagonal_movement_is_normalized() {
        let mut registry = Registry::new();
        let p = spawn_player(&mut registry);
        player_input_system(
            &mut registry,
            &[InputEvent {
                player: p,
                sequence_id: 1,
                flags: InputFlags(InputFlags::MOVE_UP | InputFlags::MOVE_RIGHT),
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            }],
            tuning(),
        );
        let v = registry.get::<Velocity>(p).unwrap();
        let speed = (v.vx * v.vx + v.vy * v.vy).sqrt();
        assert!((speed - 10.0).abs() < 1e-4, "speed was {speed}");
    }

    #[test]
    fn stale_sequence_is_dropped() {
        let mut registry = Registry::new();
        let p = spawn_player(&mut registry);
        player_input_system(
            &mut registry,
            &[InputEvent {
                player: p,
                sequence_id: 5,
                flags: InputFlags(InputFlags::MOVE_RIGHT),
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            }],
            tuning(),
        );
        player_input_system(
            &mut registry,
            &[InputEvent {
                player: p,
                sequence_id: 3,
                flags: InputFlags(InputFlags::MOVE_LEFT),
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            }],
            tuning(),
        );
        let stored = registry.get::<PlayerInput>(p).unwrap();
        assert_eq!(stored.sequence_id, 5);
        let v = registry.get::<Velocity>(p).unwrap();
        assert!(v.vx > 0.0, "stale input must not override velocity");
    }

    #[test]
    fn fire_spawns_exactly_one_missile() {
        let mut registry = Registry::new();
        let p = spawn_player(&mut registry);
        player_input_system(
            &mut registry,
            &[InputEvent {
                player: p,
                sequence_id: 1,
                flags: InputFlags(InputFlags::FIRE),
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            }],
            tuning(),
        );
        let missiles: Vec<_> = registry.view::<(Missile,)>().map(|(id, _)| id).collect();
        assert_eq!(missiles.len(), 1);
        let owner = registry.get::<Ownership>(missiles[0]).unwrap();
        assert_eq!(owner.owner, p);
    }

    #[test]
    fn dead_player_input_is_ignored() {
        let mut registry = Registry::new();
        let p = spawn_player(&mut registry);
        registry.destroy(p);
        player_input_system(
            &mut registry,
            &[InputEvent {
                player: p,
                sequence_id: 1,
                flags: InputFlags(InputFlags::FIRE),
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            }],
            tuning(),
        );
        assert_eq!(registry.view::<(Missile,)>().count(), 0);
    }
}
