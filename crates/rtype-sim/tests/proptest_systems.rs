//! Property-based checks for two of the universal invariants the tick
//! pipeline must hold regardless of input: collision detection is
//! independent of which entity was created first, and health damage never
//! pushes current HP outside `[0, max]`.

use proptest::prelude::*;

use rtype_ecs::Registry;
use rtype_sim::components::{Collider, Health, Hitbox, Missile, Tag, Transform};
use rtype_sim::systems::collision::collision_system;
use rtype_sim::systems::damage::damage_system;

fn finite_f32() -> impl Strategy<Value = f32> {
    prop_oneof![(-500.0f32..500.0f32), (-5.0f32..5.0f32)]
}

fn radius() -> impl Strategy<Value = f32> {
    1.0f32..50.0f32
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2048))]

    /// Two circle colliders either overlap or they don't; which one was
    /// `create()`d first must not change the answer, and the reported
    /// pair is always normalized `a < b`.
    #[test]
    fn circle_collision_is_independent_of_creation_order(
        ax in finite_f32(), ay in finite_f32(), ar in radius(),
        bx in finite_f32(), by in finite_f32(), br in radius(),
    ) {
        let build = |first_at_origin: bool| {
            let mut reg = Registry::new();
            let (first, second) = if first_at_origin {
                ((ax, ay, ar), (bx, by, br))
            } else {
                ((bx, by, br), (ax, ay, ar))
            };
            let e0 = reg.create();
            reg.emplace(e0, Transform { x: first.0, y: first.1, rotation: 0.0, scale_x: 1.0, scale_y: 1.0 }).unwrap();
            reg.emplace(e0, Collider::new_circle(first.2)).unwrap();
            let e1 = reg.create();
            reg.emplace(e1, Transform { x: second.0, y: second.1, rotation: 0.0, scale_x: 1.0, scale_y: 1.0 }).unwrap();
            reg.emplace(e1, Collider::new_circle(second.2)).unwrap();
            reg
        };

        let reg_normal = build(true);
        let normal_pairs = collision_system(&reg_normal).len();

        let dist2 = (ax - bx) * (ax - bx) + (ay - by) * (ay - by);
        let touching = dist2 <= (ar + br) * (ar + br);
        prop_assert_eq!(normal_pairs, if touching { 1 } else { 0 });

        let reg_reordered = build(false);
        let reordered_pairs = collision_system(&reg_reordered).len();
        prop_assert_eq!(normal_pairs, reordered_pairs);

        for collision in collision_system(&reg_normal) {
            prop_assert!(collision.a < collision.b);
        }
    }

    /// Repeated damage application never drives current HP below zero or
    /// above its starting max, and the absorbed amount never exceeds the
    /// HP that was actually available.
    #[test]
    fn health_damage_never_leaves_the_zero_to_max_range(
        max in 1i32..10_000,
        hits in prop::collection::vec(-1000i32..1000i32, 0..50),
    ) {
        let mut health = Health::new(max);
        for amount in hits {
            let before = health.current;
            let absorbed = health.damage(amount);
            prop_assert!(health.current >= 0);
            prop_assert!(health.current <= max);
            prop_assert!(absorbed <= before);
            prop_assert!(absorbed >= 0);
            prop_assert_eq!(health.current, before - absorbed);
        }
    }

    /// A missile-vs-health collision pair always reduces the defender's HP
    /// by exactly the absorbed amount and never creates HP out of thin air.
    #[test]
    fn damage_system_only_ever_reduces_target_health(
        missile_damage in 0i32..200,
        target_max_hp in 1i32..500,
    ) {
        let mut reg = Registry::new();
        let missile_id = reg.create();
        reg.emplace(missile_id, Transform::default()).unwrap();
        reg.emplace(missile_id, Hitbox::default()).unwrap();
        reg.emplace(missile_id, Missile { damage: missile_damage, lifetime: 1.0, from_player: true }).unwrap();
        reg.emplace(missile_id, Tag::new(Tag::PROJECTILE)).unwrap();

        let target_id = reg.create();
        reg.emplace(target_id, Transform::default()).unwrap();
        reg.emplace(target_id, Hitbox::default()).unwrap();
        reg.emplace(target_id, Health::new(target_max_hp)).unwrap();
        reg.emplace(target_id, Tag::new(Tag::ENEMY)).unwrap();

        let pair = rtype_sim::systems::collision::Collision { a: missile_id.min(target_id), b: missile_id.max(target_id) };

        let hp_before = reg.get::<Health>(target_id).unwrap().current;
        let mut bus = rtype_sim::events::EventBus::new();
        damage_system(&mut reg, &[pair], &mut bus);
        let hp_after = reg.get::<Health>(target_id).unwrap().current;

        prop_assert!(hp_after <= hp_before);
        prop_assert_eq!(hp_after, (hp_before - missile_damage).max(0));
    }
}
