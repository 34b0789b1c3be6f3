//! DM1: active diagnostic trouble codes and lamp status (J1939-73).
//!
//! A DM1 payload is two lamp bytes followed by zero or more 4-byte DTC
//! records. Short payloads fit one CAN frame; anything longer arrives via
//! the transport protocol and is parsed from the reassembled buffer with
//! the same routine.

use heapless::Vec;

/// Dashboard lamp commands from the first two payload bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LampStatus {
    pub protect: bool,
    pub amber_warning: bool,
    pub red_stop: bool,
    pub malfunction: bool,
}

impl LampStatus {
    pub fn parse(byte0: u8, byte1: u8) -> Self {
        Self {
            protect: byte0 & 0x04 != 0,
            amber_warning: byte0 & 0x10 != 0,
            red_stop: byte1 & 0x04 != 0,
            malfunction: byte1 & 0x10 != 0,
        }
    }

    pub fn any(&self) -> bool {
        self.protect || self.amber_warning || self.red_stop || self.malfunction
    }
}

/// One active diagnostic trouble code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dtc {
    /// Suspect parameter number, 19 bits.
    pub spn: u32,
    /// Failure mode identifier, 5 bits.
    pub fmi: u8,
    /// Occurrence count, 7 bits.
    pub occurrence_count: u8,
    /// SPN conversion method bit.
    pub conversion_method: bool,
    /// ECU that reported the fault.
    pub source_address: u8,
}

impl Dtc {
    /// Unpack the 4-byte wire record.
    ///
    /// ```text
    /// spn[7:0]  spn[15:8]  (spn[18:16]<<5)|fmi  (cm<<7)|oc
    /// ```
    pub fn from_bytes(bytes: [u8; 4], source_address: u8) -> Self {
        Self {
            spn: bytes[0] as u32 | (bytes[1] as u32) << 8 | ((bytes[2] & 0xE0) as u32) << 11,
            fmi: bytes[2] & 0x1F,
            occurrence_count: bytes[3] & 0x7F,
            conversion_method: bytes[3] & 0x80 != 0,
            source_address,
        }
    }

    /// Pack back into the wire layout. Used by test traffic generators.
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            self.spn as u8,
            (self.spn >> 8) as u8,
            ((self.spn >> 11) as u8 & 0xE0) | (self.fmi & 0x1F),
            ((self.conversion_method as u8) << 7) | (self.occurrence_count & 0x7F),
        ]
    }
}

/// Parse a DM1 payload (single-frame or reassembled).
///
/// Lamp status comes back directly; DTC records are appended to `dtcs` up
/// to its capacity. The all-zero record that encodes "no active faults" is
/// skipped. Returns `None` when the payload is too short to carry lamps.
pub fn parse<const N: usize>(
    data: &[u8],
    source_address: u8,
    dtcs: &mut Vec<Dtc, N>,
) -> Option<LampStatus> {
    if data.len() < 2 {
        return None;
    }
    let lamps = LampStatus::parse(data[0], data[1]);

    let mut offset = 2;
    while offset + 4 <= data.len() {
        let record = Dtc::from_bytes(
            [
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ],
            source_address,
        );
        offset += 4;
        if record.spn == 0 && record.fmi == 0 {
            continue;
        }
        if dtcs.push(record).is_err() {
            break;
        }
    }
    Some(lamps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fault_frame() {
        let mut dtcs: Vec<Dtc, 8> = Vec::new();
        let lamps = parse(
            &[0x00, 0x10, 0x6E, 0x00, 0x00, 0x01, 0xFF, 0xFF],
            0x00,
            &mut dtcs,
        )
        .unwrap();
        assert!(lamps.malfunction);
        assert!(!lamps.protect && !lamps.amber_warning && !lamps.red_stop);
        assert_eq!(dtcs.len(), 1);
        assert_eq!(dtcs[0].spn, 110);
        assert_eq!(dtcs[0].fmi, 0);
        assert_eq!(dtcs[0].occurrence_count, 1);
        assert!(!dtcs[0].conversion_method);
    }

    #[test]
    fn no_faults_record_is_skipped() {
        let mut dtcs: Vec<Dtc, 8> = Vec::new();
        let lamps = parse(
            &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF],
            0x00,
            &mut dtcs,
        )
        .unwrap();
        assert!(!lamps.any());
        assert!(dtcs.is_empty());
    }

    #[test]
    fn lamp_bits() {
        let lamps = LampStatus::parse(0x14, 0x14);
        assert!(lamps.protect && lamps.amber_warning && lamps.red_stop && lamps.malfunction);
    }

    #[test]
    fn high_spn_bits() {
        // SPN 0x7FFFF uses all 19 bits
        let dtc = Dtc::from_bytes([0xFF, 0xFF, 0xFF, 0x85], 0x21);
        assert_eq!(dtc.spn, 0x7FFFF);
        assert_eq!(dtc.fmi, 0x1F);
        assert_eq!(dtc.occurrence_count, 5);
        assert!(dtc.conversion_method);
        assert_eq!(dtc.source_address, 0x21);
    }

    #[test]
    fn record_round_trips() {
        let dtc = Dtc {
            spn: 100_000,
            fmi: 3,
            occurrence_count: 42,
            conversion_method: false,
            source_address: 0x00,
        };
        assert_eq!(Dtc::from_bytes(dtc.to_bytes(), 0x00), dtc);
    }

    #[test]
    fn multi_record_payload() {
        // reassembled DM1 with three records
        let mut data: Vec<u8, 16> = Vec::new();
        data.extend_from_slice(&[0x04, 0x00]).unwrap();
        for spn in [110u32, 190, 100] {
            data.extend_from_slice(
                &Dtc {
                    spn,
                    fmi: 1,
                    occurrence_count: 2,
                    conversion_method: false,
                    source_address: 0,
                }
                .to_bytes(),
            )
            .unwrap();
        }
        let mut dtcs: Vec<Dtc, 8> = Vec::new();
        let lamps = parse(&data, 0x00, &mut dtcs).unwrap();
        assert!(lamps.protect);
        assert_eq!(dtcs.len(), 3);
        assert_eq!(dtcs[1].spn, 190);
    }

    #[test]
    fn capacity_caps_output() {
        let mut data: Vec<u8, 21> = Vec::new();
        data.extend_from_slice(&[0x00, 0x00]).unwrap();
        for spn in 1u32..=4 {
            data.extend_from_slice(&Dtc::from_bytes([spn as u8, 0, 1, 1], 0).to_bytes())
                .unwrap();
        }
        let mut dtcs: Vec<Dtc, 2> = Vec::new();
        parse(&data, 0, &mut dtcs).unwrap();
        assert_eq!(dtcs.len(), 2);
    }
}
