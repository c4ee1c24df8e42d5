//! `PlayerBoundsSystem`: applies the level director's currently-active
//! camera bounds (or the level default, once cleared) as each player's
//! `Boundary`.
//!
//! Takes plain `(min_x, min_y, max_x, max_y)` tuples rather than the level
//! crate's `CameraBounds` type, since `rtype-sim` sits below `rtype-level`
//! in the dependency graph; the caller (the level director integration in
//! `rtype-server`) converts its richer type at the call site.

use rtype_ecs::Registry;

use crate::components::{Boundary, Tag};

pub fn player_bounds_system(
    registry: &mut Registry,
    active: Option<(f32, f32, f32, f32)>,
    default_bounds: (f32, f32, f32, f32),
) {
    let (min_x, min_y, max_x, max_y) = active.unwrap_or(default_bounds);
    let ids: Vec<_> = registry
        .view::<(Tag,)>()
        .filter(|(_, (tag,))| tag.has(Tag::PLAYER))
        .map(|(id, _)| id)
        .collect();
    for id in ids {
        let _ = registry.emplace(
            id,
            Boundary {
                min_x,
                min_y,
                max_x,
                max_y,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_active_bounds_over_default() {
        let mut registry = Registry::new();
        let p = registry.create();
        registry.emplace(p, Tag::new(Tag::PLAYER)).unwrap();
        player_bounds_system(&mut registry, Some((1.0, 2.0, 3.0, 4.0)), (0.0, 0.0, 100.0, 100.0));
        let b = registry.get::<Boundary>(p).unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn falls_back_to_default_when_cleared() {
        let mut registry = Registry::new();
        let p = registry.create();
        registry.emplace(p, Tag::new(Tag::PLAYER)).unwrap();
        player_bounds_system(&mut registry, None, (0.0, 0.0, 100.0, 100.0));
        let b = registry.get::<Boundary>(p).unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (0.0, 0.0, 100.0, 100.0));
    }
}
