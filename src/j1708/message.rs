//! J1587 message structure and checksum.

use embassy_time::Instant;
use heapless::Vec;

use super::{checksum, pids, MAX_FRAME};

/// A 21-byte frame can hold at most nine two-byte parameters after MID and
/// checksum.
pub const MAX_PARAMS: usize = 9;

/// One parameter as framed on the wire: PID plus up to 8 data bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Param {
    pub pid: u8,
    pub data: Vec<u8, 8>,
}

/// A framed and parsed J1587 message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    /// Message identifier of the transmitter.
    pub mid: u8,
    /// Parameters in wire order.
    pub params: Vec<Param, MAX_PARAMS>,
    /// The raw frame, checksum included.
    pub raw: Vec<u8, MAX_FRAME>,
    pub checksum_ok: bool,
    /// Time the final byte arrived.
    pub timestamp: Instant,
}

impl Message {
    /// Parse a raw frame (MID, parameters, checksum).
    ///
    /// Fails only on impossible lengths; a checksum mismatch is recorded in
    /// `checksum_ok` so diagnostic consumers can still look at the bytes.
    pub fn parse(raw: &[u8], timestamp: Instant) -> Option<Self> {
        if raw.len() < 2 || raw.len() > MAX_FRAME {
            return None;
        }
        Some(Self {
            mid: raw[0],
            params: parse_params(&raw[1..raw.len() - 1]),
            raw: Vec::from_slice(raw).ok()?,
            checksum_ok: checksum::validate(raw),
            timestamp,
        })
    }

    /// Build a frame from parts and append the checksum. Fails when the
    /// parts exceed the 21-byte frame budget.
    pub fn encode(mid: u8, params: &[(u8, &[u8])]) -> Option<Vec<u8, MAX_FRAME>> {
        let mut raw: Vec<u8, MAX_FRAME> = Vec::new();
        raw.push(mid).ok()?;
        for (pid, data) in params {
            raw.push(*pid).ok()?;
            raw.extend_from_slice(data).ok()?;
        }
        raw.push(checksum::calculate(&raw)).ok()?;
        Some(raw)
    }
}

/// Walk the parameter list. Truncation stops at the last complete
/// parameter; data is capped at 8 bytes per parameter.
fn parse_params(body: &[u8]) -> Vec<Param, MAX_PARAMS> {
    let mut params = Vec::new();
    let mut i = 0;
    while i < body.len() {
        let pid = body[i];
        i += 1;
        let len = match pids::data_length(pid) {
            pids::PidLength::Fixed(n) => n as usize,
            pids::PidLength::Prefixed => {
                let Some(&n) = body.get(i) else { break };
                i += 1;
                n as usize
            }
        };
        if i + len > body.len() {
            break;
        }
        let data = Vec::from_slice(&body[i..i + len.min(8)]).unwrap_or_default();
        i += len;
        if params.push(Param { pid, data }).is_err() {
            break;
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_and_reparse() {
        let raw = Message::encode(128, &[(110, &[212])]).unwrap();
        let msg = Message::parse(&raw, Instant::from_millis(0)).unwrap();
        assert!(msg.checksum_ok);
        assert_eq!(msg.mid, 128);
        assert_eq!(msg.params.len(), 1);
        assert_eq!(msg.params[0].pid, 110);
        assert_eq!(&msg.params[0].data[..], &[212]);
    }

    #[test]
    fn two_byte_and_one_byte_params() {
        let raw = Message::encode(128, &[(190, &[0x40, 0x1F]), (84, &[120])]).unwrap();
        let msg = Message::parse(&raw, Instant::from_millis(0)).unwrap();
        assert_eq!(msg.params.len(), 2);
        assert_eq!(&msg.params[0].data[..], &[0x40, 0x1F]);
        assert_eq!(&msg.params[1].data[..], &[120]);
    }

    #[test]
    fn prefixed_length_pid() {
        // PID 209 is not in the catalogue, so it carries a length byte
        let raw = Message::encode(128, &[(209, &[3, 1, 2, 3])]).unwrap();
        let msg = Message::parse(&raw, Instant::from_millis(0)).unwrap();
        assert_eq!(msg.params.len(), 1);
        assert_eq!(&msg.params[0].data[..], &[1, 2, 3]);
    }

    #[test]
    fn truncated_parameter_is_dropped() {
        // engine speed claims two bytes but only one remains before checksum
        let frame = [128u8, 84, 120, 190, 0x40, 0x00];
        let mut raw: Vec<u8, MAX_FRAME> = Vec::from_slice(&frame[..5]).unwrap();
        raw.push(checksum::calculate(&raw)).unwrap();
        let msg = Message::parse(&raw, Instant::from_millis(0)).unwrap();
        assert_eq!(msg.params.len(), 1);
        assert_eq!(msg.params[0].pid, 84);
    }

    #[test]
    fn minimum_frame_has_no_params() {
        let raw = Message::encode(172, &[]).unwrap();
        assert_eq!(raw.len(), 2);
        let msg = Message::parse(&raw, Instant::from_millis(0)).unwrap();
        assert!(msg.params.is_empty());
        assert!(msg.checksum_ok);
    }
}
