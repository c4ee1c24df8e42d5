//! `MonsterMovementSystem`: derives `Velocity` from a `Movement` pattern.

use std::f32::consts::PI;

use rtype_ecs::{EntityId, Registry};

use crate::components::{Movement, MovementPattern, Tag, Transform, Velocity};

/// Updates every `(Movement, Velocity)` entity's velocity from its pattern,
/// then advances `Movement.time` by `dt`. `FollowPlayer` aims at the
/// nearest live entity tagged `Player`, falling back to `Linear` if none
/// exist.
pub fn monster_movement_system(registry: &mut Registry, dt: f32) {
    let ids: Vec<EntityId> = registry.ids_matching::<(Movement, Velocity)>();
    for id in ids {
        let movement = *registry.get::<Movement>(id).expect("matched by view");
        let transform = registry.get::<Transform>(id).ok().copied();

        let (mut vx, mut vy) = match movement.pattern {
            MovementPattern::Linear => (-movement.speed, 0.0),
            MovementPattern::Zigzag => zigzag(&movement),
            MovementPattern::Sine => sine(&movement),
            MovementPattern::FollowPlayer => follow_player(registry, &movement, transform),
        };

        if !vx.is_finite() {
            vx = 0.0;
        }
        if !vy.is_finite() {
            vy = 0.0;
        }

        if let Ok(vel) = registry.get_mut::<Velocity>(id) {
            vel.vx = vx;
            vel.vy = vy;
        }
        if let Ok(m) = registry.get_mut::<Movement>(id) {
            m.time += dt;
        }
    }
}

fn zigzag(m: &Movement) -> (f32, f32) {
    if m.frequency <= 0.0 {
        return (-m.speed, 0.0);
    }
    let half_period = 1.0 / (2.0 * m.frequency);
    let phase_index = (m.time / half_period).floor() as i64;
    let sign = if phase_index % 2 == 0 { 1.0 } else { -1.0 };
    (-m.speed, sign * m.amplitude)
}

fn sine(m: &Movement) -> (f32, f32) {
    if !m.amplitude.is_finite() || !m.frequency.is_finite() {
        return (-m.speed, 0.0);
    }
    let vy = m.amplitude * (m.phase + 2.0 * PI * m.frequency * m.time).sin();
    (-m.speed, vy)
}

fn follow_player(
    registry: &Registry,
    m: &Movement,
    transform: Option<Transform>,
) -> (f32, f32) {
    let Some(self_t) = transform else {
        return (-m.speed, 0.0);
    };
    let nearest = registry
        .view::<(Transform, Tag)>()
        .filter(|(_, (_, tag))| tag.has(Tag::PLAYER))
        .map(|(_, (t, _))| *t)
        .min_by(|a, b| {
            let da = (a.x - self_t.x).powi(2) + (a.y - self_t.y).powi(2);
            let db = (b.x - self_t.x).powi(2) + (b.y - self_t.y).powi(2);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
    let Some(target) = nearest else {
        return (-m.speed, 0.0);
    };
    let dx = target.x - self_t.x;
    let dy = target.y - self_t.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= 0.0 {
        return (-m.speed, 0.0);
    }
    (dx / len * m.speed, dy / len * m.speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_monster(registry: &mut Registry, movement: Movement) -> EntityId {
        let e = registry.create();
        registry.emplace(e, Transform::default()).unwrap();
        registry.emplace(e, Velocity::default()).unwrap();
        registry.emplace(e, movement).unwrap();
        e
    }

    #[test]
    fn linear_moves_left_at_speed() {
        let mut registry = Registry::new();
        let e = spawn_monster(&mut registry, Movement::new(MovementPattern::Linear, 5.0));
        monster_movement_system(&mut registry, 0.1);
        let v = registry.get::<Velocity>(e).unwrap();
        assert_eq!(v.vx, -5.0);
        assert_eq!(v.vy, 0.0);
    }

    #[test]
    fn zigzag_zero_frequency_has_no_vertical_component() {
        let mut registry = Registry::new();
        let mut m = Movement::new(MovementPattern::Zigzag, 5.0);
        m.amplitude = 3.0;
        m.frequency = 0.0;
        let e = spawn_monster(&mut registry, m);
        monster_movement_system(&mut registry, 0.1);
        let v = registry.get::<Velocity>(e).unwrap();
        assert_eq!(v.vy, 0.0);
    }

    #[test]
    fn sine_non_finite_params_collapse_to_zero_vertical() {
        let mut registry = Registry::new();
        let mut m = Movement::new(MovementPattern::Sine, 5.0);
        m.amplitude = f32::NAN;
        let e = spawn_monster(&mut registry, m);
        monster_movement_system(&mut registry, 0.1);
        let v = registry.get::<Velocity>(e).unwrap();
        assert_eq!(v.vy, 0.0);
    }

    #[test]
    fn follow_player_falls_back_to_linear_when_no_player() {
        let mut registry = Registry::new();
        let e = spawn_monster(
            &mut registry,
            Movement::new(MovementPattern::FollowPlayer, 4.0),
        );
        monster_movement_system(&mut registry, 0.1);
        let v = registry.get::<Velocity>(e).unwrap();
        assert_eq!(v.vx, -4.0);
        assert_eq!(v.vy, 0.0);
    }

    #[test]
    fn follow_player_aims_at_nearest() {
        let mut registry = Registry::new();
        let player = registry.create();
        registry
            .emplace(player, Transform { x: 10.0, y: 0.0, ..Transform::default() })
            .unwrap();
        registry.emplace(player, Tag::new(Tag::PLAYER)).unwrap();

        let e = spawn_monster(&mut registry, Movement::new(MovementPattern::FollowPlayer, 5.0));
        monster_movement_system(&mut registry, 0.1);
        let v = registry.get::<Velocity>(e).unwrap();
        assert!(v.vx > 0.0, "should move toward the player at +x");
        assert!((v.vx.powi(2) + v.vy.powi(2)).sqrt() - 5.0 < 1e-3);
    }

    #[test]
    fn time_accumulates_each_call() {
        let mut registry = Registry::new();
        let e = spawn_monster(&mut registry, Movement::new(MovementPattern::Sine, 1.0));
        monster_movement_system(&mut registry, 0.25);
        monster_movement_system(&mut registry, 0.25);
        let m = registry.get::<Movement>(e).unwrap();
        assert!((m.time - 0.5).abs() < 1e-6);
    }
}
