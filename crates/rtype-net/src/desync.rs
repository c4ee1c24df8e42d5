//! Per-player desync detection: compares a client-reported checksum
//! against the server-authoritative one for the same tick, and flags
//! clients that stop reporting altogether (spec §4.7).
//!
//! The detector holds no policy of its own. It counts mismatches and
//! calls back; what to do about a desynced player — kick, force a full
//! snapshot, just log it — is the caller's decision.

use std::sync::Mutex;

/// Default tick interval between checksum comparisons: once a second at
/// 60 Hz. Checksums arriving on other ticks are recorded but not
/// compared.
pub const DEFAULT_CHECKSUM_INTERVAL: u32 = 60;

/// Default number of ticks without a checksum report before a player is
/// flagged as timed out: three seconds at 60 Hz.
pub const DEFAULT_TIMEOUT_THRESHOLD: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesyncType {
    ChecksumMismatch,
    EntityCountMismatch,
    CriticalFieldMismatch,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct DesyncInfo {
    pub player_id: u32,
    pub tick: u32,
    pub desync_type: DesyncType,
    pub server_checksum: u32,
    pub client_checksum: u32,
    pub description: String,
}

/// A callback invoked from whichever thread observes the desync (the
/// game loop thread for mismatches, any thread polling [`DesyncDetector::check_timeouts`]
/// for timeouts). Implementers must not block.
pub type DesyncCallback = Box<dyn Fn(&DesyncInfo) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct ClientChecksumInfo {
    last_tick: u32,
    last_checksum: u32,
    last_update_tick: u32,
    desync_count: u32,
}

struct Inner {
    clients: std::collections::HashMap<u32, ClientChecksumInfo>,
}

/// Per-room desync tracker. The client-info map is the only lock in the
/// core simulation; the callback is stored separately so invoking it
/// never requires holding the client-info lock.
pub struct DesyncDetector {
    checksum_interval: u32,
    timeout_threshold: u32,
    inner: Mutex<Inner>,
    callback: Mutex<Option<DesyncCallback>>,
}

impl DesyncDetector {
    pub fn new(checksum_interval: u32, timeout_threshold: u32) -> Self {
        Self {
            checksum_interval: checksum_interval.max(1),
            timeout_threshold,
            inner: Mutex::new(Inner {
                clients: std::collections::HashMap::new(),
            }),
            callback: Mutex::new(None),
        }
    }

    pub fn set_desync_callback(&self, callback: DesyncCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    pub fn should_verify_checksum(&self, tick: u32) -> bool {
        tick % self.checksum_interval == 0
    }

    fn invoke_callback(&self, info: DesyncInfo) {
        if let Some(cb) = self.callback.lock().unwrap().as_ref() {
            cb(&info);
        }
    }

    /// Records a client-reported checksum for `tick` and, if this is a
    /// verification tick, compares it against `server_checksum`. Fires
    /// `ChecksumMismatch` at most once per call.
    pub fn report_client_checksum(&self, player_id: u32, tick: u32, client_checksum: u32, server_checksum: u32) {
        let should_verify = self.should_verify_checksum(tick);
        let mismatch = should_verify && client_checksum != server_checksum;

        {
            let mut inner = self.inner.lock().unwrap();
            let entry = inner.clients.entry(player_id).or_insert(ClientChecksumInfo {
                last_tick: tick,
                last_checksum: client_checksum,
                last_update_tick: tick,
                desync_count: 0,
            });
            entry.last_tick = tick;
            entry.last_checksum = client_checksum;
            entry.last_update_tick = tick;
            if mismatch {
                entry.desync_count += 1;
            }
        }

        if mismatch {
            self.invoke_callback(DesyncInfo {
                player_id,
                tick,
                desync_type: DesyncType::ChecksumMismatch,
                server_checksum,
                client_checksum,
                description: format!(
                    "checksum mismatch at tick {tick}: server={server_checksum:#010x} client={client_checksum:#010x}"
                ),
            });
        }
    }

    /// Flags any player whose last report is more than `timeout_threshold`
    /// ticks behind `current_tick`. Cost scales with player count, which
    /// stays small enough per room to call this every tick.
    pub fn check_timeouts(&self, current_tick: u32) {
        let timed_out: Vec<u32> = {
            let inner = self.inner.lock().unwrap();
            inner
                .clients
                .iter()
                .filter(|(_, info)| current_tick.saturating_sub(info.last_update_tick) > self.timeout_threshold)
                .map(|(&player_id, _)| player_id)
                .collect()
        };
        for player_id in timed_out {
            self.invoke_callback(DesyncInfo {
                player_id,
                tick: current_tick,
                desync_type: DesyncType::Timeout,
                server_checksum: 0,
                client_checksum: 0,
                description: format!("no checksum report for over {} ticks", self.timeout_threshold),
            });
        }
    }

    pub fn remove_client(&self, player_id: u32) {
        self.inner.lock().unwrap().clients.remove(&player_id);
    }

    pub fn desync_count(&self, player_id: u32) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .clients
            .get(&player_id)
            .map(|c| c.desync_count)
            .unwrap_or(0)
    }

    pub fn reset_desync_count(&self, player_id: u32) {
        if let Some(info) = self.inner.lock().unwrap().clients.get_mut(&player_id) {
            info.desync_count = 0;
        }
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clients.clear();
    }
}

impl Default for DesyncDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKSUM_INTERVAL, DEFAULT_TIMEOUT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn matching_checksum_on_verify_tick_does_not_fire() {
        let detector = DesyncDetector::new(60, 180);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        detector.set_desync_callback(Box::new(move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));
        detector.report_client_checksum(1, 60, 0xAAAA, 0xAAAA);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(detector.desync_count(1), 0);
    }

    #[test]
    fn mismatched_checksum_on_verify_tick_fires_exactly_once() {
        let detector = DesyncDetector::new(60, 180);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        detector.set_desync_callback(Box::new(move |info| {
            assert_eq!(info.desync_type, DesyncType::ChecksumMismatch);
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));
        detector.report_client_checksum(1, 60, 0xAAAA, 0xBBBB);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(detector.desync_count(1), 1);
    }

    #[test]
    fn mismatch_off_the_verification_cadence_is_ignored() {
        let detector = DesyncDetector::new(60, 180);
        detector.report_client_checksum(1, 61, 1, 2);
        assert_eq!(detector.desync_count(1), 0);
    }

    #[test]
    fn timeout_fires_once_threshold_exceeded() {
        let detector = DesyncDetector::new(60, 100);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        detector.set_desync_callback(Box::new(move |info| {
            assert_eq!(info.desync_type, DesyncType::Timeout);
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));
        detector.report_client_checksum(1, 0, 5, 5);
        detector.check_timeouts(50);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        detector.check_timeouts(150);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removing_a_client_drops_its_desync_count() {
        let detector = DesyncDetector::new(60, 180);
        detector.report_client_checksum(1, 60, 1, 2);
        assert_eq!(detector.desync_count(1), 1);
        detector.remove_client(1);
        assert_eq!(detector.desync_count(1), 0);
    }
}
