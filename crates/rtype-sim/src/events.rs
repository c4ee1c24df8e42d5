//! The same-thread, synchronous event bus systems publish to within a tick.
//!
//! Per the "event bus" design note, this is a plain `Vec`-backed fan-out: no
//! subscriber registration, no cross-thread publishing. A system appends
//! events; the next system (or the caller composing the destruction list)
//! drains them before the bus is cleared for the next tick.

use rtype_ecs::EntityId;

/// Emitted by [`crate::systems::damage::damage_system`] for every missile/
/// health collision it resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    /// The entity that gets credit for the hit: the missile's owner if it
    /// has one, otherwise the missile entity itself.
    pub attacker: EntityId,
    pub target: EntityId,
    pub amount: i32,
    pub remaining: i32,
}

/// Emitted by [`crate::systems::destruction::destruction_system`] for every
/// entity it removes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestroyEvent {
    pub id: EntityId,
}

/// A single-tick, in-order log of damage and destroy events.
#[derive(Debug, Default)]
pub struct EventBus {
    damage: Vec<DamageEvent>,
    destroy: Vec<DestroyEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_damage(&mut self, event: DamageEvent) {
        self.damage.push(event);
    }

    pub fn publish_destroy(&mut self, event: DestroyEvent) {
        self.destroy.push(event);
    }

    pub fn damage_events(&self) -> &[DamageEvent] {
        &self.damage
    }

    pub fn destroy_events(&self) -> &[DestroyEvent] {
        &self.destroy
    }

    /// Clears both logs at the end of a tick.
    pub fn clear(&mut self) {
        self.damage.clear();
        self.destroy.clear();
    }
}
