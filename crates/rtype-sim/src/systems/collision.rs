//! `CollisionSystem`: builds world-space shapes and detects overlapping
//! pairs via AABB pruning plus an exact Separating Axis Theorem test.
//!
//! The detector has no side effects; it returns an unordered list of
//! `(a, b)` pairs with `a < b`, stable for tests.

use rtype_ecs::{EntityId, Registry};

use crate::components::{Collider, ColliderShape, Hitbox, Transform};

/// An overlapping pair, ordered so `a < b` regardless of detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Collision {
    pub a: EntityId,
    pub b: EntityId,
}

impl Collision {
    pub(crate) fn new(x: EntityId, y: EntityId) -> Self {
        if x < y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ShapeKind {
    Circle,
    Polygon,
}

#[derive(Debug, Clone)]
struct WorldShape {
    kind: ShapeKind,
    points: Vec<(f32, f32)>,
    center: (f32, f32),
    radius: f32,
    aabb: (f32, f32, f32, f32), // min_x, max_x, min_y, max_y
}

fn finite(v: f32) -> bool {
    v.is_finite()
}

fn to_world(t: &Transform, px: f32, py: f32, ox: f32, oy: f32) -> (f32, f32) {
    (t.x + (px + ox) * t.scale_x, t.y + (py + oy) * t.scale_y)
}

/// Builds a world-space shape from a `Transform` plus whichever of
/// `Collider`/`Hitbox` the entity carries (collider takes priority). Returns
/// `None` if the entity is non-collidable, inactive, or any input is
/// non-finite/degenerate.
fn build_shape(t: &Transform, collider: Option<&Collider>, hitbox: Option<&Hitbox>) -> Option<WorldShape> {
    if collider.is_none() && hitbox.is_none() {
        return None;
    }
    let active = collider.map(|c| c.active).unwrap_or_else(|| hitbox.unwrap().active);
    if !active {
        return None;
    }
    if !finite(t.x) || !finite(t.y) || !finite(t.scale_x) || !finite(t.scale_y) {
        return None;
    }

    let mut shape = match collider {
        Some(Collider {
            shape: ColliderShape::Box { w, h },
            offset_x,
            offset_y,
            ..
        }) => build_box(t, *w, *h, *offset_x, *offset_y)?,
        Some(Collider {
            shape: ColliderShape::Circle { radius },
            offset_x,
            offset_y,
            ..
        }) => build_circle(t, *radius, *offset_x, *offset_y)?,
        Some(Collider {
            shape: ColliderShape::Polygon { points },
            offset_x,
            offset_y,
            ..
        }) => build_polygon(t, points, *offset_x, *offset_y)?,
        None => {
            let hb = hitbox.unwrap();
            build_box(t, hb.w, hb.h, hb.offset_x, hb.offset_y)?
        }
    };

    shape.aabb = compute_aabb(&shape);
    Some(shape)
}

fn build_box(t: &Transform, w: f32, h: f32, ox: f32, oy: f32) -> Option<WorldShape> {
    if w <= 0.0 || h <= 0.0 || !finite(w) || !finite(h) || !finite(ox) || !finite(oy) {
        return None;
    }
    let points = vec![
        to_world(t, 0.0, 0.0, ox, oy),
        to_world(t, w, 0.0, ox, oy),
        to_world(t, w, h, ox, oy),
        to_world(t, 0.0, h, ox, oy),
    ];
    Some(WorldShape {
        kind: ShapeKind::Polygon,
        points,
        center: (0.0, 0.0),
        radius: 0.0,
        aabb: (0.0, 0.0, 0.0, 0.0),
    })
}

fn build_circle(t: &Transform, radius: f32, ox: f32, oy: f32) -> Option<WorldShape> {
    if radius <= 0.0 || !finite(radius) || !finite(ox) || !finite(oy) {
        return None;
    }
    let scale_factor = t.scale_x.abs().max(t.scale_y.abs());
    Some(WorldShape {
        kind: ShapeKind::Circle,
        points: vec![],
        center: to_world(t, 0.0, 0.0, ox, oy),
        radius: radius * scale_factor,
        aabb: (0.0, 0.0, 0.0, 0.0),
    })
}

fn build_polygon(t: &Transform, pts: &[(f32, f32)], ox: f32, oy: f32) -> Option<WorldShape> {
    if pts.len() < 3 || !finite(ox) || !finite(oy) {
        return None;
    }
    let mut points = Vec::with_capacity(pts.len());
    for &(px, py) in pts {
        if !finite(px) || !finite(py) {
            return None;
        }
        points.push(to_world(t, px, py, ox, oy));
    }
    Some(WorldShape {
        kind: ShapeKind::Polygon,
        points,
        center: (0.0, 0.0),
        radius: 0.0,
        aabb: (0.0, 0.0, 0.0, 0.0),
    })
}

fn compute_aabb(shape: &WorldShape) -> (f32, f32, f32, f32) {
    match shape.kind {
        ShapeKind::Circle => (
            shape.center.0 - shape.radius,
            shape.center.0 + shape.radius,
            shape.center.1 - shape.radius,
            shape.center.1 + shape.radius,
        ),
        ShapeKind::Polygon => {
            let mut min_x = f32::INFINITY;
            let mut max_x = f32::NEG_INFINITY;
            let mut min_y = f32::INFINITY;
            let mut max_y = f32::NEG_INFINITY;
            for &(x, y) in &shape.points {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
            (min_x, max_x, min_y, max_y)
        }
    }
}

fn aabb_overlap(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> bool {
    !(a.1 < b.0 || a.0 > b.1 || a.3 < b.2 || a.2 > b.3)
}

fn normalize(v: (f32, f32)) -> Option<(f32, f32)> {
    let len = (v.0 * v.0 + v.1 * v.1).sqrt();
    if len <= 0.0 || !len.is_finite() {
        return None;
    }
    Some((v.0 / len, v.1 / len))
}

fn project_polygon(pts: &[(f32, f32)], axis: (f32, f32)) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &(x, y) in pts {
        let proj = x * axis.0 + y * axis.1;
        min = min.min(proj);
        max = max.max(proj);
    }
    (min, max)
}

fn project_circle(center: (f32, f32), radius: f32, axis: (f32, f32)) -> (f32, f32) {
    let proj = center.0 * axis.0 + center.1 * axis.1;
    (proj - radius, proj + radius)
}

fn ranges_overlap(a: (f32, f32), b: (f32, f32)) -> bool {
    !(a.1 < b.0 || b.1 < a.0)
}

/// Generates edge normals for `poly`, skipping any edge shorter than the
/// epsilon `normalize` enforces, per the "polygon winding" design note:
/// orientation-agnostic, and axis generation never early-outs on a
/// zero-length edge (it is simply excluded from the axis set).
fn edge_axes(poly: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let n = poly.len();
    let mut axes = Vec::with_capacity(n);
    for i in 0..n {
        let p1 = poly[i];
        let p2 = poly[(i + 1) % n];
        let edge = (p2.0 - p1.0, p2.1 - p1.1);
        let axis = (-edge.1, edge.0);
        if let Some(a) = normalize(axis) {
            axes.push(a);
        }
    }
    axes
}

fn polygon_polygon(a: &[(f32, f32)], b: &[(f32, f32)]) -> bool {
    for axis in edge_axes(a).into_iter().chain(edge_axes(b)) {
        let pa = project_polygon(a, axis);
        let pb = project_polygon(b, axis);
        if !ranges_overlap(pa, pb) {
            return false;
        }
    }
    true
}

fn circle_circle(a: &WorldShape, b: &WorldShape) -> bool {
    let dx = a.center.0 - b.center.0;
    let dy = a.center.1 - b.center.1;
    let r = a.radius + b.radius;
    dx * dx + dy * dy <= r * r
}

fn circle_polygon(circle: &WorldShape, poly: &WorldShape) -> bool {
    if poly.points.is_empty() {
        return false;
    }
    let mut best_dist = f32::INFINITY;
    let mut closest = poly.points[0];
    for &p in &poly.points {
        let dx = circle.center.0 - p.0;
        let dy = circle.center.1 - p.1;
        let d = dx * dx + dy * dy;
        if d < best_dist {
            best_dist = d;
            closest = p;
        }
    }

    let mut axes = edge_axes(&poly.points);
    if let Some(axis) = normalize((closest.0 - circle.center.0, closest.1 - circle.center.1)) {
        axes.push(axis);
    }

    for axis in axes {
        let pc = project_circle(circle.center, circle.radius, axis);
        let pp = project_polygon(&poly.points, axis);
        if !ranges_overlap(pc, pp) {
            return false;
        }
    }
    true
}

fn intersect(a: &WorldShape, b: &WorldShape) -> bool {
    if !aabb_overlap(a.aabb, b.aabb) {
        return false;
    }
    match (a.kind, b.kind) {
        (ShapeKind::Circle, ShapeKind::Circle) => circle_circle(a, b),
        (ShapeKind::Circle, ShapeKind::Polygon) => circle_polygon(a, b),
        (ShapeKind::Polygon, ShapeKind::Circle) => circle_polygon(b, a),
        (ShapeKind::Polygon, ShapeKind::Polygon) => polygon_polygon(&a.points, &b.points),
    }
}

/// Detects every overlapping collidable pair in the registry this tick.
/// Pure: has no side effect on the registry.
pub fn collision_system(registry: &Registry) -> Vec<Collision> {
    let mut ids = Vec::new();
    let mut shapes = Vec::new();

    for (id, (t,)) in registry.view::<(Transform,)>() {
        let collider = registry.get::<Collider>(id).ok();
        let hitbox = registry.get::<Hitbox>(id).ok();
        if let Some(shape) = build_shape(t, collider, hitbox) {
            ids.push(id);
            shapes.push(shape);
        }
    }

    let mut out = Vec::new();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if intersect(&shapes[i], &shapes[j]) {
                out.push(Collision::new(ids[i], ids[j]));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_entity(registry: &mut Registry, x: f32, y: f32, w: f32, h: f32) -> EntityId {
        let e = registry.create();
        registry
            .emplace(e, Transform { x, y, rotation: 0.0, scale_x: 1.0, scale_y: 1.0 })
            .unwrap();
        registry
            .emplace(e, Hitbox { w, h, offset_x: 0.0, offset_y: 0.0, active: true })
            .unwrap();
        e
    }

    #[test]
    fn non_overlapping_boxes_produce_no_pair() {
        let mut registry = Registry::new();
        box_entity(&mut registry, 0.0, 0.0, 1.0, 1.0);
        box_entity(&mut registry, 10.0, 10.0, 1.0, 1.0);
        assert!(collision_system(&registry).is_empty());
    }

    #[test]
    fn touching_boxes_edge_coincident_collide() {
        let mut registry = Registry::new();
        box_entity(&mut registry, 0.0, 0.0, 2.0, 2.0);
        box_entity(&mut registry, 2.0, 0.0, 2.0, 2.0);
        assert_eq!(collision_system(&registry).len(), 1);
    }

    #[test]
    fn collision_symmetry_is_order_independent() {
        let mut r1 = Registry::new();
        let a1 = box_entity(&mut r1, 0.0, 0.0, 2.0, 2.0);
        let b1 = box_entity(&mut r1, 1.0, 1.0, 2.0, 2.0);
        let pairs1 = collision_system(&r1);
        assert_eq!(pairs1, vec![Collision::new(a1, b1)]);

        // Build the same scene with creation order reversed.
        let mut r2 = Registry::new();
        let b2 = box_entity(&mut r2, 1.0, 1.0, 2.0, 2.0);
        let a2 = box_entity(&mut r2, 0.0, 0.0, 2.0, 2.0);
        let pairs2 = collision_system(&r2);
        assert_eq!(pairs2, vec![Collision::new(a2, b2)]);
        assert!(pairs1[0].a < pairs1[0].b);
    }

    #[test]
    fn inactive_collider_is_excluded() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.emplace(e, Transform::default()).unwrap();
        registry
            .emplace(e, Hitbox { w: 1.0, h: 1.0, offset_x: 0.0, offset_y: 0.0, active: false })
            .unwrap();
        box_entity(&mut registry, 0.0, 0.0, 5.0, 5.0);
        assert!(collision_system(&registry).is_empty());
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.emplace(e, Transform::default()).unwrap();
        registry
            .emplace(
                e,
                Collider {
                    shape: ColliderShape::Polygon { points: vec![(0.0, 0.0), (1.0, 0.0)] },
                    offset_x: 0.0,
                    offset_y: 0.0,
                    active: true,
                },
            )
            .unwrap();
        box_entity(&mut registry, 0.0, 0.0, 5.0, 5.0);
        assert!(collision_system(&registry).is_empty());
    }

    #[test]
    fn circle_circle_overlap() {
        let mut registry = Registry::new();
        let a = registry.create();
        registry.emplace(a, Transform::default()).unwrap();
        registry.emplace(a, Collider::new_circle(1.0)).unwrap();
        let b = registry.create();
        registry
            .emplace(b, Transform { x: 1.5, y: 0.0, ..Transform::default() })
            .unwrap();
        registry.emplace(b, Collider::new_circle(1.0)).unwrap();
        assert_eq!(collision_system(&registry).len(), 1);
    }
}
