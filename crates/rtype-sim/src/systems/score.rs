//! `ScoreSystem`: a `DamageEvent` subscriber that credits kills.

use rtype_ecs::Registry;

use crate::components::{Score, ScoreValue, Tag};
use crate::events::EventBus;

/// For every `DamageEvent` in `bus` where the target reached zero HP, is
/// tagged `Enemy`, and carries a `ScoreValue`, and the attacker is tagged
/// `Player`, increments the attacker's `Score` by that value.
pub fn score_system(registry: &mut Registry, bus: &EventBus) {
    for ev in bus.damage_events() {
        if ev.remaining != 0 {
            continue;
        }
        let target_is_scoring_enemy = registry
            .get::<Tag>(ev.target)
            .map(|t| t.has(Tag::ENEMY))
            .unwrap_or(false);
        if !target_is_scoring_enemy {
            continue;
        }
        let Ok(value) = registry.get::<ScoreValue>(ev.target).copied() else {
            continue;
        };
        let attacker_is_player = registry
            .get::<Tag>(ev.attacker)
            .map(|t| t.has(Tag::PLAYER))
            .unwrap_or(false);
        if !attacker_is_player {
            continue;
        }
        if let Ok(score) = registry.get_mut::<Score>(ev.attacker) {
            score.total += value.value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DamageEvent;
    use rtype_ecs::EntityId;

    fn setup() -> (Registry, EntityId, EntityId) {
        let mut registry = Registry::new();
        let player = registry.create();
        registry.emplace(player, Tag::new(Tag::PLAYER)).unwrap();
        registry.emplace(player, Score::default()).unwrap();

        let enemy = registry.create();
        registry.emplace(enemy, Tag::new(Tag::ENEMY)).unwrap();
        registry.emplace(enemy, ScoreValue { value: 150 }).unwrap();
        (registry, player, enemy)
    }

    #[test]
    fn kill_credits_player_score() {
        let (mut registry, player, enemy) = setup();
        let mut bus = EventBus::new();
        bus.publish_damage(DamageEvent { attacker: player, target: enemy, amount: 5, remaining: 0 });
        score_system(&mut registry, &bus);
        assert_eq!(registry.get::<Score>(player).unwrap().total, 150);
    }

    #[test]
    fn non_lethal_damage_does_not_score() {
        let (mut registry, player, enemy) = setup();
        let mut bus = EventBus::new();
        bus.publish_damage(DamageEvent { attacker: player, target: enemy, amount: 5, remaining: 3 });
        score_system(&mut registry, &bus);
        assert_eq!(registry.get::<Score>(player).unwrap().total, 0);
    }
}
