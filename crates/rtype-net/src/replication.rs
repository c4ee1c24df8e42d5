//! Per-room replication policy: decides full vs delta on each tick and
//! owns the [`EntityStateCache`] that the delta encoder diffs against.
//! Mirrors the original `ReplicationManager`'s `synchronize()` contract.

use rtype_ecs::Registry;

use crate::snapshot::{build_delta_snapshots, build_full_snapshot, EntityStateCache};

/// Every 60th tick (one second at 60 Hz) a full snapshot goes out instead
/// of a delta, so a client that missed or mis-applied a delta resyncs
/// within a second without a dedicated retransmission path.
pub const FULL_STATE_INTERVAL: u32 = 60;

/// MTU-conservative ceiling for a single UDP datagram's payload, including
/// header and CRC trailer.
pub const MAX_PACKET_BYTES: usize = 1400;

/// The result of one `synchronize` call: the wire-ready packets for this
/// tick, and whether they were a full state dump or a delta batch.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub packets: Vec<Vec<u8>>,
    pub was_full: bool,
}

/// Owns the entity-state cache for a single room and decides, tick by
/// tick, whether to emit a full snapshot or a delta batch.
pub struct ReplicationManager {
    cache: EntityStateCache,
    last_full_state_tick: Option<u32>,
    full_state_interval: u32,
    max_packet_bytes: usize,
}

impl ReplicationManager {
    pub fn new() -> Self {
        Self::with_settings(FULL_STATE_INTERVAL, MAX_PACKET_BYTES)
    }

    pub fn with_settings(full_state_interval: u32, max_packet_bytes: usize) -> Self {
        Self {
            cache: EntityStateCache::new(),
            last_full_state_tick: None,
            full_state_interval,
            max_packet_bytes,
        }
    }

    fn is_full_state_tick(&self, tick: u32) -> bool {
        self.last_full_state_tick.is_none() || tick % self.full_state_interval == 0
    }

    /// Produces this tick's outgoing packets and updates the cache to
    /// reflect what was sent.
    pub fn synchronize(&mut self, registry: &Registry, tick: u32) -> SyncResult {
        if self.is_full_state_tick(tick) {
            let packet = build_full_snapshot(registry, tick, &mut self.cache);
            self.last_full_state_tick = Some(tick);
            SyncResult {
                packets: vec![packet],
                was_full: true,
            }
        } else {
            let packets = build_delta_snapshots(registry, tick, &mut self.cache, self.max_packet_bytes);
            SyncResult {
                packets,
                was_full: false,
            }
        }
    }

    /// Forces the next `synchronize` call to emit a full state regardless
    /// of tick parity; used after a room resets between rounds.
    pub fn force_full_state(&mut self) {
        self.last_full_state_tick = None;
        self.cache.clear();
    }
}

impl Default for ReplicationManager {
    fn default() -> Self {
        Self::new()
    }
}
