//! The rollback ring: a bounded history of per-tick state summaries, and
//! the deterministic checksum derived from each summary that the desync
//! detector compares against what clients report (spec §4.7).

use std::collections::VecDeque;

use rtype_ecs::{EntityId, Registry};
use rtype_sim::components::Transform;

use crate::snapshot::ReplicatedState;

/// 120 frames at 60 Hz: two seconds, chosen to comfortably cover the
/// worst-case round trip the protocol is expected to tolerate.
pub const DEFAULT_CAPACITY: usize = 120;

/// One tick's worth of replicated state, compact enough to hold 120 of
/// them in memory without concern, plus the checksum derived from it.
#[derive(Debug, Clone)]
pub struct RollbackEntry {
    pub tick: u32,
    pub checksum: u32,
    entities: Vec<(EntityId, ReplicatedState)>,
}

impl RollbackEntry {
    pub fn entities(&self) -> &[(EntityId, ReplicatedState)] {
        &self.entities
    }
}

/// Hashes a tick's live entity states into a single `u32`, sorted by
/// entity id first so the result does not depend on hash-map iteration
/// order. Both the server (here) and a client's own prediction must
/// reach the same value for the same inputs for this to be useful.
pub fn compute_checksum(registry: &Registry) -> u32 {
    let mut entities: Vec<(EntityId, ReplicatedState)> = registry
        .view::<(Transform,)>()
        .filter_map(|(id, _)| ReplicatedState::capture(registry, id).map(|s| (id, s)))
        .collect();
    entities.sort_by_key(|(id, _)| id.to_raw());

    let mut bytes = Vec::with_capacity(entities.len() * 24);
    for (id, state) in &entities {
        bytes.extend_from_slice(&id.to_raw().to_be_bytes());
        bytes.extend_from_slice(&state.x.to_be_bytes());
        bytes.extend_from_slice(&state.y.to_be_bytes());
        bytes.extend_from_slice(&state.rotation.to_be_bytes());
        if let Some(hp) = state.health {
            bytes.extend_from_slice(&hp.to_be_bytes());
        }
    }
    crc32fast::hash(&bytes)
}

fn capture_entities(registry: &Registry) -> Vec<(EntityId, ReplicatedState)> {
    let mut entities: Vec<(EntityId, ReplicatedState)> = registry
        .view::<(Transform,)>()
        .filter_map(|(id, _)| ReplicatedState::capture(registry, id).map(|s| (id, s)))
        .collect();
    entities.sort_by_key(|(id, _)| id.to_raw());
    entities
}

/// A fixed-capacity FIFO of [`RollbackEntry`] values, one pushed per
/// simulation tick. The oldest entry is evicted once `capacity` is
/// reached; nothing here rewinds the live registry, it only remembers
/// recent history for comparison and diagnostics.
pub struct RollbackRing {
    capacity: usize,
    entries: VecDeque<RollbackEntry>,
}

impl RollbackRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Captures the registry's current state under `tick`, evicting the
    /// oldest entry if the ring is full. Returns the checksum just
    /// recorded, for convenient forwarding to a desync detector.
    pub fn push(&mut self, tick: u32, registry: &Registry) -> u32 {
        let entities = capture_entities(registry);
        let checksum = compute_checksum(registry);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(RollbackEntry { tick, checksum, entities });
        checksum
    }

    pub fn get(&self, tick: u32) -> Option<&RollbackEntry> {
        self.entries.iter().find(|e| e.tick == tick)
    }

    pub fn latest(&self) -> Option<&RollbackEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtype_sim::components::Transform;

    fn spawn(registry: &mut Registry, x: f32) -> EntityId {
        let e = registry.create();
        registry
            .emplace(e, Transform { x, y: 0.0, rotation: 0.0, scale_x: 1.0, scale_y: 1.0 })
            .unwrap();
        e
    }

    #[test]
    fn identical_state_produces_identical_checksum() {
        let mut a = Registry::new();
        spawn(&mut a, 3.0);
        let mut b = Registry::new();
        spawn(&mut b, 3.0);
        assert_eq!(compute_checksum(&a), compute_checksum(&b));
    }

    #[test]
    fn differing_state_produces_differing_checksum() {
        let mut a = Registry::new();
        spawn(&mut a, 3.0);
        let mut b = Registry::new();
        spawn(&mut b, 4.0);
        assert_ne!(compute_checksum(&a), compute_checksum(&b));
    }

    #[test]
    fn ring_evicts_oldest_entry_past_capacity() {
        let mut registry = Registry::new();
        spawn(&mut registry, 0.0);
        let mut ring = RollbackRing::new(3);
        for tick in 0..5 {
            ring.push(tick, &registry);
        }
        assert_eq!(ring.len(), 3);
        assert!(ring.get(0).is_none());
        assert!(ring.get(4).is_some());
    }

    #[test]
    fn push_returns_the_checksum_just_recorded() {
        let mut registry = Registry::new();
        spawn(&mut registry, 1.0);
        let mut ring = RollbackRing::new(DEFAULT_CAPACITY);
        let checksum = ring.push(7, &registry);
        assert_eq!(ring.get(7).unwrap().checksum, checksum);
    }
}
