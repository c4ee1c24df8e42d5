//! `BoundarySystem` and `PlayerBoundsSystem`: clamp `Transform` within a
//! `Boundary` rectangle.

use rtype_ecs::Registry;

use crate::components::{Boundary, RespawnTimer, Transform};

/// Clamps every `(Transform, Boundary)` entity that is not awaiting
/// respawn into its boundary rectangle.
pub fn boundary_system(registry: &mut Registry) {
    let ids: Vec<_> = registry
        .view::<(Transform, Boundary)>()
        .filter(|(id, _)| !registry.has::<RespawnTimer>(*id))
        .map(|(id, _)| id)
        .collect();

    for id in ids {
        let b = *registry.get::<Boundary>(id).expect("matched by view");
        if let Ok(t) = registry.get_mut::<Transform>(id) {
            t.x = t.x.clamp(b.min_x, b.max_x);
            t.y = t.y.clamp(b.min_y, b.max_y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_bounds() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry
            .emplace(e, Transform { x: 100.0, y: -50.0, ..Transform::default() })
            .unwrap();
        registry
            .emplace(e, Boundary { min_x: 0.0, min_y: 0.0, max_x: 50.0, max_y: 50.0 })
            .unwrap();
        boundary_system(&mut registry);
        let t = registry.get::<Transform>(e).unwrap();
        assert_eq!(t.x, 50.0);
        assert_eq!(t.y, 0.0);
    }

    #[test]
    fn respawning_entity_is_not_clamped() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry
            .emplace(e, Transform { x: 999.0, y: 999.0, ..Transform::default() })
            .unwrap();
        registry
            .emplace(e, Boundary { min_x: 0.0, min_y: 0.0, max_x: 50.0, max_y: 50.0 })
            .unwrap();
        registry.emplace(e, RespawnTimer { remaining: 1.0 }).unwrap();
        boundary_system(&mut registry);
        let t = registry.get::<Transform>(e).unwrap();
        assert_eq!(t.x, 999.0);
    }
}
