//! `DamageSystem`: resolves missile/health collisions into HP reduction and
//! `DamageEvent`s, applied synchronously after every pair is processed.

use rtype_ecs::{EntityId, Registry};

use crate::components::{Health, Missile, Ownership};
use crate::events::{DamageEvent, EventBus};
use crate::systems::collision::Collision;

/// For each collision pair, checks both orientations: whichever side
/// carries `Missile` is the attacker against a side carrying `Health`. The
/// applied damage is `max(missile.damage, target's own Missile.damage if
/// it has one, else -infinity)`, clamped to the target's current HP. Both
/// orientations are independent: a pair where both entities carry
/// `Missile` and `Health` can emit two events.
pub fn damage_system(registry: &mut Registry, collisions: &[Collision], bus: &mut EventBus) {
    for pair in collisions {
        resolve_orientation(registry, pair.a, pair.b, bus);
        resolve_orientation(registry, pair.b, pair.a, bus);
    }
}

fn resolve_orientation(registry: &mut Registry, missile_side: EntityId, health_side: EntityId, bus: &mut EventBus) {
    let Ok(missile) = registry.get::<Missile>(missile_side).copied() else {
        return;
    };
    if !registry.has::<Health>(health_side) {
        return;
    }

    let other_missile_damage = registry
        .get::<Missile>(health_side)
        .map(|m| m.damage)
        .unwrap_or(i32::MIN);
    let dmg = missile.damage.max(other_missile_damage);

    let attacker = registry
        .get::<Ownership>(missile_side)
        .map(|o| o.owner)
        .unwrap_or(missile_side);

    let Ok(health) = registry.get_mut::<Health>(health_side) else {
        return;
    };
    let absorbed = health.damage(dmg);
    let remaining = health.current;

    bus.publish_damage(DamageEvent {
        attacker,
        target: health_side,
        amount: absorbed,
        remaining,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Tag;

    #[test]
    fn damage_clamps_to_health_and_reports_absorbed_amount() {
        let mut registry = Registry::new();
        let attacker = registry.create();
        registry.emplace(attacker, Tag::new(Tag::PLAYER)).unwrap();

        let missile = registry.create();
        registry
            .emplace(missile, Missile { damage: 100, lifetime: 1.0, from_player: true })
            .unwrap();
        registry.emplace(missile, Ownership { owner: attacker }).unwrap();

        let target = registry.create();
        registry.emplace(target, Health { current: 5, max: 5 }).unwrap();

        let mut bus = EventBus::new();
        damage_system(
            &mut registry,
            &[Collision::new(missile, target)],
            &mut bus,
        );

        let hp = registry.get::<Health>(target).unwrap();
        assert_eq!(hp.current, 0);
        let ev = bus.damage_events()[0];
        assert_eq!(ev.amount, 5);
        assert_eq!(ev.remaining, 0);
        assert_eq!(ev.attacker, attacker);
    }

    #[test]
    fn non_missile_non_health_pair_emits_nothing() {
        let mut registry = Registry::new();
        let a = registry.create();
        let b = registry.create();
        let mut bus = EventBus::new();
        damage_system(&mut registry, &[Collision::new(a, b)], &mut bus);
        assert!(bus.damage_events().is_empty());
    }
}
