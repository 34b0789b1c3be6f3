//! Broadcast Announce transport protocol (J1939-21).
//!
//! Listen-only reassembly of multi-frame payloads. Only the connectionless
//! BAM mode is handled; RTS/CTS connection attempts are ignored since a
//! listener cannot take part in them.
//!
//! Per source address at most one session exists:
//!
//! ```text
//! idle ──BAM──► receiving ──last DT──► complete ──take──► idle
//!                 │
//!                 ├─ wrong sequence ─► error ──► idle (next BAM)
//!                 └─ >750 ms gap    ─► error ──► idle (next BAM)
//! ```

use embassy_time::{Duration, Instant};

use crate::timing::TP_PACKET_TIMEOUT;

use super::message::Message;
use super::pgn;

/// Control byte announcing a broadcast transfer.
const CONTROL_BAM: u8 = 0x20;

/// Concurrent reassembly sessions.
pub const MAX_SESSIONS: usize = 4;

/// Largest multi-packet payload: 255 packets of 7 bytes.
pub const MAX_TRANSFER: usize = 1785;

/// Bytes of payload carried by one data-transfer frame.
const DT_CHUNK: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum SessionState {
    Idle,
    Receiving,
    Complete,
    Error,
}

struct Session {
    state: SessionState,
    source_address: u8,
    target_pgn: u32,
    total_size: u16,
    expected: u8,
    received: u8,
    last_rx: Instant,
    buf: [u8; MAX_TRANSFER],
}

impl Session {
    const fn new() -> Self {
        Self {
            state: SessionState::Idle,
            source_address: 0,
            target_pgn: 0,
            total_size: 0,
            expected: 0,
            received: 0,
            last_rx: Instant::from_ticks(0),
            buf: [0xFF; MAX_TRANSFER],
        }
    }

    fn open(&mut self, sa: u8, target_pgn: u32, total_size: u16, packets: u8, now: Instant) {
        self.state = SessionState::Receiving;
        self.source_address = sa;
        self.target_pgn = target_pgn;
        self.total_size = total_size;
        self.expected = packets;
        self.received = 0;
        self.last_rx = now;
        // Unused tail bytes of a drained buffer read as 0xFF.
        self.buf.fill(0xFF);
    }
}

/// Counters for abandoned or refused transfers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportStats {
    /// Sessions killed by an out-of-order sequence number.
    pub sequence_errors: u32,
    /// Sessions killed by inter-packet silence.
    pub timeouts: u32,
    /// Announces dropped because every slot was busy.
    pub dropped_announces: u32,
}

/// The per-source-address session set.
pub struct Assembler {
    sessions: [Session; MAX_SESSIONS],
    stats: TransportStats,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub const fn new() -> Self {
        Self {
            sessions: [
                Session::new(),
                Session::new(),
                Session::new(),
                Session::new(),
            ],
            stats: TransportStats {
                sequence_errors: 0,
                timeouts: 0,
                dropped_announces: 0,
            },
        }
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Feed one transport-protocol frame.
    ///
    /// Returns the source address whose transfer just completed, if any.
    /// Frames for other PGNs are ignored.
    pub fn handle(&mut self, msg: &Message) -> Option<u8> {
        match msg.pgn {
            pgn::TP_CM => {
                self.handle_announce(msg);
                None
            }
            pgn::TP_DT => self.handle_data(msg),
            _ => None,
        }
    }

    /// Abandon receiving sessions whose sender has gone quiet.
    pub fn poll(&mut self, now: Instant) {
        for session in &mut self.sessions {
            if session.state == SessionState::Receiving && age(now, session.last_rx) > TP_PACKET_TIMEOUT {
                warn!("tp: timeout from sa {}", session.source_address);
                session.state = SessionState::Error;
                self.stats.timeouts += 1;
            }
        }
    }

    /// Drain a completed transfer into `out`.
    ///
    /// Returns the announced target PGN and the number of bytes copied
    /// (capped at `out.len()`), and frees the slot. Completed buffers are
    /// one-shot.
    pub fn take(&mut self, sa: u8, out: &mut [u8]) -> Option<(u32, usize)> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.state == SessionState::Complete && s.source_address == sa)?;
        let len = (session.total_size as usize).min(out.len());
        out[..len].copy_from_slice(&session.buf[..len]);
        let target = session.target_pgn;
        session.state = SessionState::Idle;
        Some((target, len))
    }

    fn handle_announce(&mut self, msg: &Message) {
        if msg.data.len() < 8 || msg.data[0] != CONTROL_BAM {
            // RTS/CTS and abort frames are none of our business
            return;
        }
        let total_size = u16::from_le_bytes([msg.data[1], msg.data[2]]);
        let packets = msg.data[3];
        let target_pgn =
            msg.data[5] as u32 | (msg.data[6] as u32) << 8 | (msg.data[7] as u32) << 16;

        if total_size as usize > MAX_TRANSFER || packets == 0 {
            return;
        }

        // A sender's new announce always discards its previous session.
        let slot = self
            .sessions
            .iter()
            .position(|s| s.state != SessionState::Idle && s.source_address == msg.source_address)
            .or_else(|| {
                self.sessions
                    .iter()
                    .position(|s| matches!(s.state, SessionState::Idle | SessionState::Error))
            });

        match slot {
            Some(i) => {
                trace!(
                    "tp: bam from sa {}, pgn {}, {} bytes",
                    msg.source_address,
                    target_pgn,
                    total_size
                );
                self.sessions[i].open(
                    msg.source_address,
                    target_pgn,
                    total_size,
                    packets,
                    msg.timestamp,
                );
            }
            None => self.stats.dropped_announces += 1,
        }
    }

    fn handle_data(&mut self, msg: &Message) -> Option<u8> {
        if msg.data.len() < 2 {
            return None;
        }
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.state == SessionState::Receiving && s.source_address == msg.source_address)?;

        if age(msg.timestamp, session.last_rx) > TP_PACKET_TIMEOUT {
            session.state = SessionState::Error;
            self.stats.timeouts += 1;
            return None;
        }

        let seq = msg.data[0];
        if seq != session.received + 1 {
            warn!(
                "tp: sequence {} from sa {}, expected {}",
                seq,
                msg.source_address,
                session.received + 1
            );
            session.state = SessionState::Error;
            self.stats.sequence_errors += 1;
            return None;
        }

        let offset = (seq as usize - 1) * DT_CHUNK;
        let remaining = (session.total_size as usize).saturating_sub(offset);
        let chunk = DT_CHUNK.min(remaining).min(msg.data.len() - 1);
        session.buf[offset..offset + chunk].copy_from_slice(&msg.data[1..1 + chunk]);

        session.received = seq;
        session.last_rx = msg.timestamp;

        if session.received == session.expected {
            session.state = SessionState::Complete;
            return Some(session.source_address);
        }
        None
    }
}

fn age(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::from_ticks(0))
}
