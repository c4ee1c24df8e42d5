//! `MovementSystem`: integrates `Transform` from `Velocity` each tick.

use rtype_ecs::Registry;

use crate::components::{Transform, Velocity};

/// For every `(Transform, Velocity)` pair, advances position by `v * dt`.
/// An entity whose velocity is non-finite is skipped entirely, leaving its
/// transform untouched rather than propagating NaN/Inf.
pub fn movement_system(registry: &mut Registry, dt: f32) {
    let ids: Vec<_> = registry.ids_matching::<(Transform, Velocity)>();
    for id in ids {
        let vel = *registry.get::<Velocity>(id).expect("matched by view");
        if !vel.is_finite() {
            continue;
        }
        if let Ok(t) = registry.get_mut::<Transform>(id) {
            t.x += vel.vx * dt;
            t.y += vel.vy * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_velocity_advances_exactly() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.emplace(e, Transform::default()).unwrap();
        registry.emplace(e, Velocity { vx: 2.0, vy: -3.0 }).unwrap();
        movement_system(&mut registry, 0.5);
        let t = registry.get::<Transform>(e).unwrap();
        assert_eq!(t.x, 1.0);
        assert_eq!(t.y, -1.5);
    }

    #[test]
    fn non_finite_velocity_leaves_position_unchanged() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.emplace(e, Transform::default()).unwrap();
        registry
            .emplace(e, Velocity { vx: f32::NAN, vy: 1.0 })
            .unwrap();
        movement_system(&mut registry, 1.0);
        let t = registry.get::<Transform>(e).unwrap();
        assert_eq!(t.x, 0.0);
        assert_eq!(t.y, 0.0);
    }
}
