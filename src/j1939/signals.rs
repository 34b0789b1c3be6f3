//! Signal catalogue and scaling for the decoded parameter groups.
//!
//! Each entry carries the J1939-71 placement and scaling of one signal.
//! All multi-byte raws are little-endian. Raw sentinel ranges mark a signal
//! as in error or not available; a decoder never turns a sentinel into a
//! physical value.

use crate::param::ParamId;

use super::pgn;

/// Raw width of a signal on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalWidth {
    /// One byte; raws 0xFE (error) and 0xFF (not available) are invalid.
    U8,
    /// Two bytes LE; any raw >= 0xFE00 is invalid.
    U16,
    /// Four bytes LE; the all-ones raw is invalid.
    U32,
}

/// Placement and scaling of one signal within its parameter group.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalDef {
    /// Parameter group carrying the signal.
    pub pgn: u32,
    /// Identity the decoded value is stored under.
    pub param: ParamId,
    /// First payload byte of the raw value.
    pub start_byte: u8,
    /// Raw width and sentinel policy.
    pub width: SignalWidth,
    /// Engineering-unit scale per bit.
    pub scale: f32,
    /// Offset added after scaling.
    pub offset: f32,
    /// Scalar surfaced by [`value_or_sentinel`] when the signal is invalid.
    pub unavailable: f32,
}

/// Everything this crate decodes, ordered by PGN.
pub static SIGNAL_DEFS: &[SignalDef] = &[
    SignalDef {
        pgn: pgn::EEC2,
        param: ParamId::ThrottlePosition,
        start_byte: 1,
        width: SignalWidth::U8,
        scale: 0.4,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::EEC1,
        param: ParamId::EngineSpeed,
        start_byte: 3,
        width: SignalWidth::U16,
        scale: 0.125,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::ETC2,
        param: ParamId::CurrentGear,
        start_byte: 3,
        width: SignalWidth::U8,
        scale: 1.0,
        offset: -125.0,
        unavailable: -126.0,
    },
    SignalDef {
        pgn: pgn::HOURS,
        param: ParamId::EngineHours,
        start_byte: 0,
        width: SignalWidth::U32,
        scale: 0.05,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::ET1,
        param: ParamId::CoolantTemp,
        start_byte: 0,
        width: SignalWidth::U8,
        scale: 1.0,
        offset: -40.0,
        unavailable: -9999.0,
    },
    SignalDef {
        pgn: pgn::EFLP1,
        param: ParamId::OilPressure,
        start_byte: 3,
        width: SignalWidth::U8,
        scale: 4.0,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::CCVS,
        param: ParamId::VehicleSpeed,
        start_byte: 1,
        width: SignalWidth::U16,
        scale: 1.0 / 256.0,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::LFE,
        param: ParamId::FuelRate,
        start_byte: 0,
        width: SignalWidth::U16,
        scale: 0.05,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::AMB,
        param: ParamId::AmbientTemp,
        start_byte: 3,
        width: SignalWidth::U16,
        scale: 0.03125,
        offset: -273.0,
        unavailable: -9999.0,
    },
    SignalDef {
        pgn: pgn::IC1,
        param: ParamId::BoostPressure,
        start_byte: 1,
        width: SignalWidth::U8,
        scale: 2.0,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::VEP1,
        param: ParamId::BatteryVoltage,
        start_byte: 6,
        width: SignalWidth::U16,
        scale: 0.05,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::TRF1,
        param: ParamId::TransOilTemp,
        start_byte: 4,
        width: SignalWidth::U16,
        scale: 0.03125,
        offset: -273.0,
        unavailable: -9999.0,
    },
    SignalDef {
        pgn: pgn::DD,
        param: ParamId::FuelLevel1,
        start_byte: 1,
        width: SignalWidth::U8,
        scale: 0.4,
        offset: 0.0,
        unavailable: -1.0,
    },
    SignalDef {
        pgn: pgn::DD,
        param: ParamId::FuelLevel2,
        start_byte: 6,
        width: SignalWidth::U8,
        scale: 0.4,
        offset: 0.0,
        unavailable: -1.0,
    },
];

/// All signal definitions living in one parameter group.
pub fn defs_for_pgn(parameter_group: u32) -> impl Iterator<Item = &'static SignalDef> {
    SIGNAL_DEFS
        .iter()
        .filter(move |def| def.pgn == parameter_group)
}

/// Extract the raw value, or `None` when the payload is too short or the
/// raw is a sentinel.
fn extract_raw(def: &SignalDef, data: &[u8]) -> Option<u32> {
    let start = def.start_byte as usize;
    match def.width {
        SignalWidth::U8 => {
            let raw = *data.get(start)?;
            (raw < 0xFE).then_some(raw as u32)
        }
        SignalWidth::U16 => {
            let raw = u16::from_le_bytes([*data.get(start)?, *data.get(start + 1)?]);
            (raw < 0xFE00).then_some(raw as u32)
        }
        SignalWidth::U32 => {
            let raw = u32::from_le_bytes([
                *data.get(start)?,
                *data.get(start + 1)?,
                *data.get(start + 2)?,
                *data.get(start + 3)?,
            ]);
            (raw != u32::MAX).then_some(raw)
        }
    }
}

/// Decode one signal to engineering units.
pub fn decode(def: &SignalDef, data: &[u8]) -> Option<f32> {
    extract_raw(def, data).map(|raw| raw as f32 * def.scale + def.offset)
}

/// Decode, surfacing the per-signal sentinel instead of `None`.
///
/// Only meant for display-side consumers that already treat the sentinel as
/// a tagged value; everything feeding the parameter store uses [`decode`].
pub fn value_or_sentinel(def: &SignalDef, data: &[u8]) -> f32 {
    decode(def, data).unwrap_or(def.unavailable)
}
