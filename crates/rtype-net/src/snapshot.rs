//! Snapshot packets: full and delta entity-state replication, spec §4.6.
//!
//! A snapshot lists entities as `entityId(u32) | mask(u16) | type(u8) |
//! fields...`, where `mask` selects which optional fields follow. The same
//! bit positions apply to both full and delta packets so a client's decoder
//! is a single code path regardless of which arrived.
//!
//! [`EntityStateCache`] is the per-peer (or global, if peers share state)
//! memory of what was last put on the wire for each entity; the delta
//! encoder only emits entities whose replicated fields changed since the
//! cache was last updated, plus spawns and despawns.

use std::collections::HashMap;

use rtype_ecs::{EntityId, Registry};
use rtype_sim::components::{Health, Tag, Transform, Velocity};

use crate::error::CodecError;
use crate::header::{decode_frame, encode_frame, PacketHeader, PacketKind};
use crate::message::MessageType;

/// Bit positions within a snapshot entry's `mask` field. Fixed across full
/// and delta packets per the spec's wire-format contract.
pub mod field_mask {
    /// `x(f32), y(f32)` — always present for any entity with a `Transform`.
    pub const POSITION: u16 = 1 << 0;
    /// `rotation(f32)`.
    pub const ROTATION: u16 = 1 << 1;
    /// `vx(f32), vy(f32)`.
    pub const VELOCITY: u16 = 1 << 2;
    /// `current(u16)` — clamps negative current to 0 before encoding.
    pub const HEALTH: u16 = 1 << 3;
    /// No further fields follow; the entity named by `entityId` left the
    /// live set since the cache was last updated.
    pub const DESPAWNED: u16 = 1 << 4;
}

/// The coarse client-rendering category written as a snapshot entry's
/// `type` byte, derived from `Tag` (adapted from the original
/// `typeForEntity` helper, extended to the full tag set this workspace
/// carries).
fn type_byte(registry: &Registry, id: EntityId) -> u8 {
    let Ok(tag) = registry.get::<Tag>(id) else {
        return 0;
    };
    if tag.has(Tag::PLAYER) {
        1
    } else if tag.has(Tag::PROJECTILE) {
        3
    } else if tag.has(Tag::BOSS) {
        5
    } else if tag.has(Tag::OBSTACLE) {
        4
    } else if tag.has(Tag::ENEMY) {
        2
    } else {
        0
    }
}

/// The replicated subset of an entity's state, compared field-by-field
/// against the cache to decide whether a delta entry is needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicatedState {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub velocity: Option<(f32, f32)>,
    pub health: Option<u16>,
    pub type_byte: u8,
}

impl ReplicatedState {
    pub(crate) fn capture(registry: &Registry, id: EntityId) -> Option<Self> {
        let t = registry.get::<Transform>(id).ok()?;
        let velocity = registry.get::<Velocity>(id).ok().map(|v| (v.vx, v.vy));
        let health = registry
            .get::<Health>(id)
            .ok()
            .map(|h| h.current.max(0) as u16);
        Some(Self {
            x: t.x,
            y: t.y,
            rotation: t.rotation,
            velocity,
            health,
            type_byte: type_byte(registry, id),
        })
    }

    fn mask(&self) -> u16 {
        let mut m = field_mask::POSITION | field_mask::ROTATION;
        if self.velocity.is_some() {
            m |= field_mask::VELOCITY;
        }
        if self.health.is_some() {
            m |= field_mask::HEALTH;
        }
        m
    }
}

/// One decoded snapshot entry, as a client-side consumer or the round-trip
/// test would see it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotEntry {
    pub entity_id: u32,
    pub despawned: bool,
    pub state: Option<ReplicatedState>,
}

fn write_entry(out: &mut Vec<u8>, id: EntityId, state: &ReplicatedState) {
    out.extend_from_slice(&(id.to_raw() as u32).to_be_bytes());
    out.extend_from_slice(&state.mask().to_be_bytes());
    out.push(state.type_byte);
    out.extend_from_slice(&state.x.to_be_bytes());
    out.extend_from_slice(&state.y.to_be_bytes());
    out.extend_from_slice(&state.rotation.to_be_bytes());
    if let Some((vx, vy)) = state.velocity {
        out.extend_from_slice(&vx.to_be_bytes());
        out.extend_from_slice(&vy.to_be_bytes());
    }
    if let Some(hp) = state.health {
        out.extend_from_slice(&hp.to_be_bytes());
    }
}

fn write_despawn(out: &mut Vec<u8>, raw_id: u32) {
    out.extend_from_slice(&raw_id.to_be_bytes());
    out.extend_from_slice(&field_mask::DESPAWNED.to_be_bytes());
    out.push(0);
}

/// Decodes the entity list of a single snapshot payload (post header/CRC
/// validation), used by the round-trip test and by a from-scratch client
/// decoder.
pub fn decode_entries(payload: &[u8]) -> Result<Vec<SnapshotEntry>, CodecError> {
    if payload.len() < 2 {
        return Err(CodecError::TooShort { need: 2, got: payload.len() });
    }
    let count = u16::from_be_bytes([payload[0], payload[1]]) as usize;
    let mut cursor = 2usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        if payload.len() < cursor + 4 + 2 + 1 {
            return Err(CodecError::TooShort {
                need: cursor + 7,
                got: payload.len(),
            });
        }
        let entity_id = u32::from_be_bytes(payload[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;
        let mask = u16::from_be_bytes(payload[cursor..cursor + 2].try_into().unwrap());
        cursor += 2;
        let type_byte = payload[cursor];
        cursor += 1;

        if mask & field_mask::DESPAWNED != 0 {
            out.push(SnapshotEntry {
                entity_id,
                despawned: true,
                state: None,
            });
            continue;
        }

        let need_fields = 4 * 3
            + if mask & field_mask::VELOCITY != 0 { 8 } else { 0 }
            + if mask & field_mask::HEALTH != 0 { 2 } else { 0 };
        if payload.len() < cursor + need_fields {
            return Err(CodecError::TooShort {
                need: cursor + need_fields,
                got: payload.len(),
            });
        }
        let x = f32::from_be_bytes(payload[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;
        let y = f32::from_be_bytes(payload[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;
        let rotation = f32::from_be_bytes(payload[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;
        let velocity = if mask & field_mask::VELOCITY != 0 {
            let vx = f32::from_be_bytes(payload[cursor..cursor + 4].try_into().unwrap());
            let vy = f32::from_be_bytes(payload[cursor + 4..cursor + 8].try_into().unwrap());
            cursor += 8;
            Some((vx, vy))
        } else {
            None
        };
        let health = if mask & field_mask::HEALTH != 0 {
            let hp = u16::from_be_bytes(payload[cursor..cursor + 2].try_into().unwrap());
            cursor += 2;
            Some(hp)
        } else {
            None
        };

        out.push(SnapshotEntry {
            entity_id,
            despawned: false,
            state: Some(ReplicatedState {
                x,
                y,
                rotation,
                velocity,
                health,
                type_byte,
            }),
        });
    }
    Ok(out)
}

/// Per-peer (or global) memory of the last state put on the wire for each
/// entity, used by the delta encoder to decide what changed.
#[derive(Debug, Default)]
pub struct EntityStateCache {
    last_sent: HashMap<EntityId, ReplicatedState>,
}

impl EntityStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.last_sent.clear();
    }

    /// Applies a decoded entry to a client-side reconstruction of the
    /// cache, used by the round-trip test to assert decoded state matches
    /// the server's live state.
    pub fn apply(&mut self, entries: &[SnapshotEntry]) {
        for e in entries {
            let id = EntityId::from_raw(e.entity_id as u64);
            if e.despawned {
                self.last_sent.remove(&id);
            } else if let Some(state) = e.state {
                self.last_sent.insert(id, state);
            }
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&ReplicatedState> {
        self.last_sent.get(&id)
    }

    pub fn live_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.last_sent.keys().copied()
    }
}

fn frame_snapshot(message_type: MessageType, sequence_id: u16, tick: u32, payload: Vec<u8>) -> Vec<u8> {
    let header = PacketHeader::new(
        PacketKind::ServerToClient,
        message_type,
        sequence_id,
        tick,
        payload.len() as u16,
    );
    encode_frame(&header, &payload)
}

/// Builds one full-state snapshot packet: every live entity with a
/// `Transform`. Updates `cache` to the just-sent state for every included
/// entity and clears any cache entries that are no longer live.
pub fn build_full_snapshot(registry: &Registry, tick: u32, cache: &mut EntityStateCache) -> Vec<u8> {
    let live: Vec<EntityId> = registry.view::<(Transform,)>().map(|(id, _)| id).collect();
    let mut payload = Vec::new();
    payload.extend_from_slice(&(live.len() as u16).to_be_bytes());
    for &id in &live {
        if let Some(state) = ReplicatedState::capture(registry, id) {
            write_entry(&mut payload, id, &state);
        }
    }
    cache.last_sent = live
        .iter()
        .filter_map(|&id| ReplicatedState::capture(registry, id).map(|s| (id, s)))
        .collect();
    frame_snapshot(MessageType::Snapshot, (tick & 0xFFFF) as u16, tick, payload)
}

/// Builds zero or more delta snapshot packets, each `<= max_packet_bytes`
/// including header and CRC, covering every entity whose replicated state
/// changed since `cache`, every newly spawned entity, and every entity the
/// cache remembers that is no longer live (encoded as a despawn entry).
/// Updates `cache` to match what was actually sent.
pub fn build_delta_snapshots(
    registry: &Registry,
    tick: u32,
    cache: &mut EntityStateCache,
    max_packet_bytes: usize,
) -> Vec<Vec<u8>> {
    let mut changed: Vec<(EntityId, ReplicatedState)> = Vec::new();
    let mut still_live = std::collections::HashSet::new();

    for (id, _) in registry.view::<(Transform,)>() {
        still_live.insert(id);
        let Some(state) = ReplicatedState::capture(registry, id) else {
            continue;
        };
        if cache.get(id) != Some(&state) {
            changed.push((id, state));
        }
    }

    let despawned: Vec<EntityId> = cache
        .live_ids()
        .filter(|id| !still_live.contains(id))
        .collect();

    for (id, state) in &changed {
        cache.last_sent.insert(*id, *state);
    }
    for id in &despawned {
        cache.last_sent.remove(id);
    }

    if changed.is_empty() && despawned.is_empty() {
        return Vec::new();
    }

    const HEADER_BUDGET: usize = 12 + 4 + 2; // header + crc + entry count
    const ENTRY_UPPER_BOUND: usize = 4 + 2 + 1 + 4 * 3 + 8 + 2;

    let mut packets = Vec::new();
    let mut batch: Vec<u8> = Vec::new();
    let mut batch_count: u16 = 0;
    let mut budget = max_packet_bytes.saturating_sub(HEADER_BUDGET);

    macro_rules! flush {
        () => {
            if batch_count > 0 {
                let mut payload = Vec::with_capacity(batch.len() + 2);
                payload.extend_from_slice(&batch_count.to_be_bytes());
                payload.extend_from_slice(&batch);
                packets.push(frame_snapshot(
                    MessageType::SnapshotDelta,
                    (tick & 0xFFFF) as u16,
                    tick,
                    payload,
                ));
                batch.clear();
                batch_count = 0;
                budget = max_packet_bytes.saturating_sub(HEADER_BUDGET);
            }
        };
    }

    for (id, state) in &changed {
        if ENTRY_UPPER_BOUND > budget {
            flush!();
        }
        write_entry(&mut batch, *id, state);
        batch_count += 1;
        budget = budget.saturating_sub(ENTRY_UPPER_BOUND);
    }
    for id in &despawned {
        const DESPAWN_LEN: usize = 4 + 2 + 1;
        if DESPAWN_LEN > budget {
            flush!();
        }
        write_despawn(&mut batch, id.to_raw() as u32);
        batch_count += 1;
        budget = budget.saturating_sub(DESPAWN_LEN);
    }
    flush!();
    packets
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtype_sim::components::Health as HealthComp;

    fn spawn_entity(registry: &mut Registry, x: f32) -> EntityId {
        let e = registry.create();
        registry.emplace(e, Transform { x, y: 0.0, rotation: 0.0, scale_x: 1.0, scale_y: 1.0 }).unwrap();
        e
    }

    #[test]
    fn full_snapshot_round_trips_to_live_state() {
        let mut registry = Registry::new();
        let e0 = spawn_entity(&mut registry, 1.0);
        let e1 = spawn_entity(&mut registry, 2.0);
        let mut cache = EntityStateCache::new();
        let frame = build_full_snapshot(&registry, 0, &mut cache);
        let (_, payload) = decode_frame(&frame).unwrap();
        let entries = decode_entries(payload).unwrap();
        assert_eq!(entries.len(), 2);
        let ids: Vec<u32> = entries.iter().map(|e| e.entity_id).collect();
        assert!(ids.contains(&(e0.to_raw() as u32)));
        assert!(ids.contains(&(e1.to_raw() as u32)));
    }

    #[test]
    fn delta_only_encodes_moved_entities() {
        let mut registry = Registry::new();
        let moved = spawn_entity(&mut registry, 0.0);
        let stationary: Vec<EntityId> = (0..40).map(|_| spawn_entity(&mut registry, 5.0)).collect();
        let _ = &stationary;
        let mut cache = EntityStateCache::new();
        let _ = build_full_snapshot(&registry, 0, &mut cache);

        registry.get_mut::<Transform>(moved).unwrap().x = 9.0;

        let packets = build_delta_snapshots(&registry, 1, &mut cache, 1400);
        let mut decoded_ids = Vec::new();
        for pkt in &packets {
            let (_, payload) = decode_frame(pkt).unwrap();
            decoded_ids.extend(decode_entries(payload).unwrap().into_iter().map(|e| e.entity_id));
        }
        assert_eq!(decoded_ids, vec![moved.to_raw() as u32]);
    }

    #[test]
    fn despawned_entity_emits_a_despawn_entry() {
        let mut registry = Registry::new();
        let e = spawn_entity(&mut registry, 0.0);
        let mut cache = EntityStateCache::new();
        let _ = build_full_snapshot(&registry, 0, &mut cache);

        registry.destroy(e);
        let packets = build_delta_snapshots(&registry, 1, &mut cache, 1400);
        assert_eq!(packets.len(), 1);
        let (_, payload) = decode_frame(&packets[0]).unwrap();
        let entries = decode_entries(payload).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].despawned);
        assert_eq!(entries[0].entity_id, e.to_raw() as u32);
    }

    #[test]
    fn every_packet_stays_under_the_mtu_budget() {
        let mut registry = Registry::new();
        for i in 0..200 {
            let id = spawn_entity(&mut registry, i as f32);
            registry.emplace(id, Velocity { vx: 1.0, vy: 1.0 }).unwrap();
            registry.emplace(id, HealthComp::new(10)).unwrap();
        }
        let mut cache = EntityStateCache::new();
        let packets = build_delta_snapshots(&registry, 1, &mut cache, 1400);
        for p in packets {
            assert!(p.len() <= 1400, "packet of {} bytes exceeds MTU budget", p.len());
        }
    }

    #[test]
    fn no_changes_emits_no_packets() {
        let mut registry = Registry::new();
        spawn_entity(&mut registry, 0.0);
        let mut cache = EntityStateCache::new();
        let _ = build_full_snapshot(&registry, 0, &mut cache);
        let packets = build_delta_snapshots(&registry, 1, &mut cache, 1400);
        assert!(packets.is_empty());
    }
}
