//! The receive and send threads: the only two threads per room that ever
//! touch a socket. Neither touches the registry (spec §5).
//!
//! The receive thread polls non-blocking, decodes just enough of each
//! packet to route it, and pushes typed events onto bounded
//! `crossbeam-channel` queues. Input packets are deduplicated per source
//! endpoint by sequence id, mirroring the original receive thread; every
//! other message type is forwarded as a raw control packet for
//! [`crate::instance::GameInstance`] to decode and act on.

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, trace};

use rtype_net::input::decode_input_packet;
use rtype_net::InputPacket;

const POLL_DELAY: Duration = Duration::from_millis(1);
const RECV_BUFFER_LEN: usize = 1536;

/// A fully decoded, validated input packet paired with who sent it.
#[derive(Debug, Clone)]
pub struct ReceivedInput {
    pub input: InputPacket,
    pub from: SocketAddr,
}

/// Any non-input packet, forwarded undecoded so the caller can dispatch on
/// its message type without this module knowing every control variant.
#[derive(Debug, Clone)]
pub struct RawControlPacket {
    pub bytes: Vec<u8>,
    pub from: SocketAddr,
}

/// An outbound datagram queued by the game loop thread for the send
/// thread to transmit.
#[derive(Debug, Clone)]
pub struct OutboundPacket {
    pub to: SocketAddr,
    pub bytes: Vec<u8>,
}

fn message_type_byte(bytes: &[u8]) -> Option<u8> {
    bytes.get(1).copied()
}

const CLIENT_INPUT_BYTE: u8 = 3;

/// Owns the receive-side worker thread. Dropping this without calling
/// [`stop`](Self::stop) leaves the thread running; `stop` joins it.
pub struct ReceiveThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReceiveThread {
    pub fn spawn(
        socket: UdpSocket,
        input_tx: Sender<ReceivedInput>,
        control_tx: Sender<RawControlPacket>,
    ) -> std::io::Result<Self> {
        socket.set_read_timeout(Some(POLL_DELAY))?;
        let running = Arc::new(AtomicBool::new(true));
        let running_worker = running.clone();

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; RECV_BUFFER_LEN];
            let mut last_seq: HashMap<SocketAddr, u16> = HashMap::new();

            while running_worker.load(Ordering::Relaxed) {
                let (len, from) = match socket.recv_from(&mut buf) {
                    Ok(v) => v,
                    Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                        continue;
                    }
                    Err(e) => {
                        debug!(error = %e, "recv_from failed");
                        continue;
                    }
                };

                let bytes = &buf[..len];
                match message_type_byte(bytes) {
                    Some(CLIENT_INPUT_BYTE) => match decode_input_packet(bytes) {
                        Ok(input) => {
                            let stale = last_seq
                                .get(&from)
                                .map(|&seq| input.sequence_id <= seq)
                                .unwrap_or(false);
                            if stale {
                                trace!(%from, sequence_id = input.sequence_id, "dropping stale input");
                                continue;
                            }
                            last_seq.insert(from, input.sequence_id);
                            if input_tx.try_send(ReceivedInput { input, from }).is_err() {
                                debug!(%from, "input queue full, dropping packet");
                            }
                        }
                        Err(e) => debug!(%from, error = %e, "dropping malformed input packet"),
                    },
                    Some(_) => {
                        if control_tx
                            .try_send(RawControlPacket { bytes: bytes.to_vec(), from })
                            .is_err()
                        {
                            debug!(%from, "control queue full, dropping packet");
                        }
                    }
                    None => debug!(%from, "dropping packet shorter than a header"),
                }
            }
        });

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Owns the send-side worker thread: dequeues outbound packets in order
/// and calls `send_to`, preserving per-peer ordering within a tick since
/// the channel is FIFO and a single thread drains it.
pub struct SendThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SendThread {
    pub fn spawn(socket: UdpSocket, outbound_rx: Receiver<OutboundPacket>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_worker = running.clone();

        let handle = std::thread::spawn(move || {
            while running_worker.load(Ordering::Relaxed) {
                match outbound_rx.recv_timeout(POLL_DELAY) {
                    Ok(packet) => {
                        if let Err(e) = socket.send_to(&packet.bytes, packet.to) {
                            debug!(to = %packet.to, error = %e, "send_to failed");
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
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
