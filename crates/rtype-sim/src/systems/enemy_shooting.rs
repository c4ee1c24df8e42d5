//! `EnemyShootingSystem`: periodic autofire for tagged enemies.

use rtype_ecs::{EntityId, Registry};

use crate::components::{Collider, EnemyShooting, Hitbox, Missile, Ownership, Tag, Transform, Velocity};

/// Accumulates `dt` into each enemy's `time_since_last_shot`; while it is
/// at least `interval`, subtracts `interval` and spawns one projectile,
/// possibly firing more than once in a single call if `dt` is large enough
/// to span multiple intervals.
pub fn enemy_shooting_system(registry: &mut Registry, dt: f32) {
    let ids: Vec<EntityId> = registry
        .view::<(EnemyShooting, Transform, Tag)>()
        .filter(|(_, (_, _, tag))| tag.has(Tag::ENEMY))
        .map(|(id, _)| id)
        .collect();

    for id in ids {
        let mut shooting = *registry.get::<EnemyShooting>(id).expect("matched by view");
        shooting.time_since_last_shot += dt;

        while shooting.interval > 0.0 && shooting.time_since_last_shot >= shooting.interval {
            shooting.time_since_last_shot -= shooting.interval;
            let transform = *registry.get::<Transform>(id).expect("matched by view");
            spawn_projectile(registry, transform, &shooting);
        }

        if let Ok(stored) = registry.get_mut::<EnemyShooting>(id) {
            *stored = shooting;
        }
    }
}

fn spawn_projectile(registry: &mut Registry, transform: Transform, shooting: &EnemyShooting) {
    let proj = registry.create();
    let _ = registry.emplace(proj, transform);
    let _ = registry.emplace(
        proj,
        Velocity {
            vx: -shooting.speed,
            vy: 0.0,
        },
    );
    let _ = registry.emplace(
        proj,
        Missile {
            damage: shooting.damage,
            lifetime: shooting.lifetime,
            from_player: false,
        },
    );
    let _ = registry.emplace(proj, Tag::new(Tag::PROJECTILE));
    let _ = registry.emplace(proj, Hitbox::default());
    let _ = registry.emplace(proj, Collider::new_box(1.0, 1.0));
    // An enemy projectile has no owner entity in the sense of a credited
    // player; `Ownership` is attached with a self-referential ownerless
    // marker so DamageSystem's "missile.owner or missile.id" fallback can
    // still resolve an attacker id for scoring.
    let _ = registry.emplace(proj, Ownership { owner: proj });
}
