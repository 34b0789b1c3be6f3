//! A received J1939 message: parsed identifier plus payload and timestamp.

use embassy_time::Instant;
use heapless::Vec;

use super::id::CanId;

/// One J1939 message as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    /// Parameter group number.
    pub pgn: u32,
    /// Transmitting ECU.
    pub source_address: u8,
    /// Receiving ECU, 0xFF for broadcast.
    pub destination_address: u8,
    /// Priority, 0 (highest) to 7.
    pub priority: u8,
    /// Payload, 1-8 bytes.
    pub data: Vec<u8, 8>,
    /// Reception time, host supplied.
    pub timestamp: Instant,
}

impl Message {
    /// Decode a raw frame. Fails on an empty or over-length payload; unknown
    /// PGNs pass through and simply find no signal decoder downstream.
    pub fn decode(raw_id: u32, payload: &[u8], timestamp: Instant) -> Option<Self> {
        if payload.is_empty() || payload.len() > 8 {
            return None;
        }
        let id = CanId::parse(raw_id);
        Some(Self {
            pgn: id.pgn,
            source_address: id.source_address,
            destination_address: id.destination_address,
            priority: id.priority,
            data: Vec::from_slice(payload).ok()?,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_carries_id_fields() {
        let msg = Message::decode(0x18FEEE17, &[0x8C, 0xFF, 0xFF], Instant::from_millis(5)).unwrap();
        assert_eq!(msg.pgn, 65262);
        assert_eq!(msg.source_address, 0x17);
        assert_eq!(msg.data.len(), 3);
        assert_eq!(msg.timestamp, Instant::from_millis(5));
    }

    #[test]
    fn decode_rejects_bad_lengths() {
        assert!(Message::decode(0x18FEEE00, &[], Instant::from_millis(0)).is_none());
        assert!(Message::decode(0x18FEEE00, &[0u8; 9], Instant::from_millis(0)).is_none());
    }
}
