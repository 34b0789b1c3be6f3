//! J1587 parameter identifiers: length catalogue, value decode and fault
//! entries.
//!
//! Values are converted to the SI units the parameter store expects
//! (km/h, °C, kPa, V, rpm), whatever the bus-native unit is.

use heapless::Vec;

use crate::param::ParamId;

/// Road speed.
pub const PID_ROAD_SPEED: u8 = 84;
/// Fuel level.
pub const PID_FUEL_LEVEL: u8 = 96;
/// Engine oil pressure.
pub const PID_OIL_PRESSURE: u8 = 100;
/// Engine coolant temperature.
pub const PID_COOLANT_TEMP: u8 = 110;
/// Battery voltage.
pub const PID_BATTERY_VOLTAGE: u8 = 168;
/// Transmission oil temperature.
pub const PID_TRANS_OIL_TEMP: u8 = 177;
/// Fuel rate.
pub const PID_FUEL_RATE: u8 = 183;
/// Engine speed.
pub const PID_ENGINE_SPEED: u8 = 190;
/// Diagnostic data, standard-fault form.
pub const PID_DIAGNOSTICS_1: u8 = 194;
/// Diagnostic data, expansion form.
pub const PID_DIAGNOSTICS_2: u8 = 195;
/// Total vehicle distance.
pub const PID_TOTAL_DISTANCE: u8 = 245;
/// Total engine hours.
pub const PID_ENGINE_HOURS: u8 = 247;

const MPH_TO_KMH: f32 = 1.60934;

/// How many data bytes follow a PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PidLength {
    /// The catalogue knows the width; no length byte on the wire.
    Fixed(u8),
    /// An explicit length byte follows the PID.
    Prefixed,
}

/// Expected data length for a PID.
///
/// PIDs the catalogue knows carry no length byte. Everything else,
/// including the 194/195 diagnostic containers and the unrecognised part of
/// the 192-254 band, is framed with an explicit length prefix.
pub fn data_length(pid: u8) -> PidLength {
    match pid {
        PID_ROAD_SPEED | PID_FUEL_LEVEL | PID_OIL_PRESSURE | PID_COOLANT_TEMP
        | PID_BATTERY_VOLTAGE => PidLength::Fixed(1),
        PID_TRANS_OIL_TEMP | PID_FUEL_RATE | PID_ENGINE_SPEED => PidLength::Fixed(2),
        PID_TOTAL_DISTANCE | PID_ENGINE_HOURS => PidLength::Fixed(4),
        _ => PidLength::Prefixed,
    }
}

/// Decode a parameter to (identity, SI value).
///
/// Returns `None` for PIDs without a value mapping or data shorter than
/// the PID needs.
pub fn decode(pid: u8, data: &[u8]) -> Option<(ParamId, f32)> {
    let b0 = || data.first().map(|&b| b as f32);
    let le16 = || {
        (data.len() >= 2).then(|| u16::from_le_bytes([data[0], data[1]]) as f32)
    };
    let le32 = || {
        (data.len() >= 4)
            .then(|| u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as f32)
    };

    Some(match pid {
        PID_ROAD_SPEED => (ParamId::VehicleSpeed, b0()? * 0.5 * MPH_TO_KMH),
        PID_FUEL_LEVEL => (ParamId::FuelLevel1, b0()? * 0.5),
        PID_OIL_PRESSURE => (ParamId::OilPressure, b0()? * 4.0),
        PID_COOLANT_TEMP => (ParamId::CoolantTemp, (b0()? - 32.0) * 5.0 / 9.0),
        PID_BATTERY_VOLTAGE => (ParamId::BatteryVoltage, b0()? * 0.05),
        PID_TRANS_OIL_TEMP => (ParamId::TransOilTemp, le16()? * 0.25 - 273.0),
        PID_ENGINE_SPEED => (ParamId::EngineSpeed, le16()? * 0.25),
        PID_TOTAL_DISTANCE => (ParamId::TotalDistance, le32()? * 0.1 * MPH_TO_KMH),
        PID_ENGINE_HOURS => (ParamId::EngineHours, le32()? * 0.05),
        _ => return None,
    })
}

/// One entry under PID 194/195.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fault {
    /// PID or SID the fault is reported against, low 7 bits of the id byte.
    pub id: u8,
    /// The id byte's high bit: set means a subsystem (SID), clear a
    /// parameter (PID).
    pub subsystem: bool,
    /// Failure mode, low nibble of the second byte.
    pub fmi: u8,
    /// J1587 fault entries carry no count; reported as one occurrence.
    pub occurrence_count: u8,
}

/// Unpack the 2-byte fault entries of a 194/195 parameter. A trailing odd
/// byte is ignored.
pub fn parse_faults<const N: usize>(data: &[u8]) -> Vec<Fault, N> {
    let mut faults = Vec::new();
    for entry in data.chunks_exact(2) {
        let fault = Fault {
            id: entry[0] & 0x7F,
            subsystem: entry[0] & 0x80 != 0,
            fmi: entry[1] & 0x0F,
            occurrence_count: 1,
        };
        if faults.push(fault).is_err() {
            break;
        }
    }
    faults
}
