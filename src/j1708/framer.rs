//! Byte-stream framing by inter-byte silence.
//!
//! J1708 has no start/stop delimiters; a frame ends when the bus goes quiet.
//! The framer consumes (byte, timestamp) pairs from the UART driver and
//! holds at most one completed message:
//!
//! ```text
//! idle ──byte──► receiving ──gap + good checksum──► complete ──take──► idle
//!                    │
//!                    ├─ gap + bad frame ─► receiving (restart, frame counted)
//!                    └─ overflow        ─► idle (frame counted)
//! ```
//!
//! The byte that reveals the gap belongs to the *next* message: on
//! [`Push::MessageReady`] and [`Push::Blocked`] the caller must drain with
//! [`Framer::take`] and offer the byte again.

use embassy_time::{Duration, Instant};
use heapless::Vec;

use crate::timing::J1708_BYTE_GAP;

use super::checksum;
use super::message::Message;
use super::MAX_FRAME;

/// Outcome of offering one byte to the framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Push {
    /// The byte was consumed; feed the next one.
    Consumed,
    /// A message completed. The byte was *not* consumed.
    MessageReady,
    /// A completed message is still waiting to be drained; the byte was
    /// rejected.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Receiving,
    Complete,
}

/// Frame-level error counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FramerStats {
    pub checksum_errors: u32,
    pub short_frames: u32,
    pub overflows: u32,
}

/// The inter-byte-gap framer.
pub struct Framer {
    state: State,
    buf: Vec<u8, MAX_FRAME>,
    last_byte: Instant,
    stats: FramerStats,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            buf: Vec::new(),
            last_byte: Instant::from_ticks(0),
            stats: FramerStats {
                checksum_errors: 0,
                short_frames: 0,
                overflows: 0,
            },
        }
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Offer one received byte.
    pub fn push(&mut self, byte: u8, now: Instant) -> Push {
        match self.state {
            State::Complete => Push::Blocked,
            State::Idle => {
                self.buf.clear();
                // capacity 21 > 0, cannot fail on an empty buffer
                let _ = self.buf.push(byte);
                self.last_byte = now;
                self.state = State::Receiving;
                Push::Consumed
            }
            State::Receiving => {
                if gap(now, self.last_byte) > J1708_BYTE_GAP {
                    if self.finish_frame() {
                        // the gap byte opens the next message
                        return Push::MessageReady;
                    }
                    // bad frame discarded; restart with this byte
                    self.buf.clear();
                    let _ = self.buf.push(byte);
                    self.last_byte = now;
                    return Push::Consumed;
                }
                if self.buf.push(byte).is_err() {
                    self.stats.overflows += 1;
                    self.buf.clear();
                    self.state = State::Idle;
                    return Push::Consumed;
                }
                self.last_byte = now;
                Push::Consumed
            }
        }
    }

    /// Close out a frame on bus silence with no trailing byte (end of a
    /// burst). Returns true when a message became ready.
    pub fn poll_gap(&mut self, now: Instant) -> bool {
        if self.state == State::Receiving && gap(now, self.last_byte) > J1708_BYTE_GAP {
            if self.finish_frame() {
                return true;
            }
            self.buf.clear();
            self.state = State::Idle;
        }
        false
    }

    /// Drain the completed message, freeing the framer for new bytes.
    pub fn take(&mut self) -> Option<Message> {
        if self.state != State::Complete {
            return None;
        }
        let msg = Message::parse(&self.buf, self.last_byte);
        self.buf.clear();
        self.state = State::Idle;
        msg
    }

    /// Validate the buffered frame; `true` moves the framer to Complete.
    fn finish_frame(&mut self) -> bool {
        if self.buf.len() < 2 {
            self.stats.short_frames += 1;
            return false;
        }
        if !checksum::validate(&self.buf) {
            self.stats.checksum_errors += 1;
            return false;
        }
        self.state = State::Complete;
        true
    }
}

fn gap(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::from_ticks(0))
}
