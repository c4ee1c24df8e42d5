//! The game loop thread: the sole owner of a room's [`GameInstance`],
//! ticking it at a fixed rate (spec §5). Mirrors the
//! spawn/stop ownership pattern of [`crate::net_threads::ReceiveThread`]
//! and [`crate::net_threads::SendThread`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::instance::GameInstance;
use crate::net_threads::{RawControlPacket, ReceivedInput};

/// Owns the worker thread driving one room's [`GameInstance`]. Each tick
/// drains pending control packets, collects this tick's inputs, and
/// advances the simulation by one fixed step.
///
/// Scheduling re-anchors `next` to `now + period` whenever the loop has
/// fallen more than one period behind, rather than attempting to run
/// several catch-up ticks back to back: a stalled thread resumes at the
/// current wall-clock tick instead of replaying a burst of ticks with a
/// dt that no longer matches real elapsed time.
pub struct GameLoopThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl GameLoopThread {
    pub fn spawn(
        mut instance: GameInstance,
        input_rx: Receiver<ReceivedInput>,
        control_rx: Receiver<RawControlPacket>,
        tick_rate_hz: f64,
    ) -> Self {
        let period = Duration::from_secs_f64(1.0 / tick_rate_hz);
        let dt = (1.0 / tick_rate_hz) as f32;
        let running = Arc::new(AtomicBool::new(true));
        let running_worker = running.clone();

        let handle = std::thread::spawn(move || {
            let mut next = Instant::now() + period;

            while running_worker.load(Ordering::Relaxed) {
                for packet in control_rx.try_iter() {
                    instance.handle_control(packet);
                }
                let inputs: Vec<ReceivedInput> = input_rx.try_iter().collect();

                instance.tick(&inputs, dt);

                if instance.is_finished() {
                    break;
                }

                let now = Instant::now();
                if now < next {
                    std::thread::sleep(next - now);
                    next += period;
                } else if now - next > period {
                    next = now + period;
                } else {
                    next += period;
                }
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
