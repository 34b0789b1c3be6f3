//! The closed catalogue of parameter identities.
//!
//! Every value a decoder, analogue input or computed channel can produce is
//! keyed by one of these identities, whatever bus it came from. The store
//! is a dense array indexed by the discriminant, so the enumeration must
//! stay contiguous and below 256 entries.

/// Stable identity of one vehicle parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ParamId {
    /// Reserved; updates against it are silently ignored.
    None = 0,

    EngineSpeed,
    ThrottlePosition,
    CoolantTemp,
    OilPressure,
    BoostPressure,
    EngineHours,

    TransOilTemp,
    CurrentGear,

    VehicleSpeed,

    FuelLevel1,
    FuelLevel2,
    FuelRate,

    BatteryVoltage,

    AmbientTemp,

    TripDistance,
    TotalDistance,

    ActiveDtcCount,

    InstantEconomy,
    AvgEconomy,
}

/// Number of identities, the size of the dense store.
pub const PARAM_COUNT: usize = 20;

/// Functional grouping of identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Domain {
    Engine,
    Transmission,
    Vehicle,
    Fuel,
    Electrical,
    Environmental,
    Distance,
    Diagnostics,
    Computed,
}

impl ParamId {
    /// Every identity except `None`, in discriminant order.
    pub const ALL: [ParamId; PARAM_COUNT - 1] = [
        ParamId::EngineSpeed,
        ParamId::ThrottlePosition,
        ParamId::CoolantTemp,
        ParamId::OilPressure,
        ParamId::BoostPressure,
        ParamId::EngineHours,
        ParamId::TransOilTemp,
        ParamId::CurrentGear,
        ParamId::VehicleSpeed,
        ParamId::FuelLevel1,
        ParamId::FuelLevel2,
        ParamId::FuelRate,
        ParamId::BatteryVoltage,
        ParamId::AmbientTemp,
        ParamId::TripDistance,
        ParamId::TotalDistance,
        ParamId::ActiveDtcCount,
        ParamId::InstantEconomy,
        ParamId::AvgEconomy,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name for display and logging.
    pub const fn name(self) -> &'static str {
        match self {
            ParamId::None => "none",
            ParamId::EngineSpeed => "Engine Speed",
            ParamId::ThrottlePosition => "Throttle Position",
            ParamId::CoolantTemp => "Coolant Temp",
            ParamId::OilPressure => "Oil Pressure",
            ParamId::BoostPressure => "Boost Pressure",
            ParamId::EngineHours => "Engine Hours",
            ParamId::TransOilTemp => "Trans Oil Temp",
            ParamId::CurrentGear => "Current Gear",
            ParamId::VehicleSpeed => "Vehicle Speed",
            ParamId::FuelLevel1 => "Fuel Level 1",
            ParamId::FuelLevel2 => "Fuel Level 2",
            ParamId::FuelRate => "Fuel Rate",
            ParamId::BatteryVoltage => "Battery Voltage",
            ParamId::AmbientTemp => "Ambient Temp",
            ParamId::TripDistance => "Trip Distance",
            ParamId::TotalDistance => "Total Distance",
            ParamId::ActiveDtcCount => "Active Faults",
            ParamId::InstantEconomy => "Instant Economy",
            ParamId::AvgEconomy => "Average Economy",
        }
    }

    /// Canonical unit of the stored value.
    pub const fn unit(self) -> &'static str {
        match self {
            ParamId::None | ParamId::CurrentGear | ParamId::ActiveDtcCount => "",
            ParamId::EngineSpeed => "rpm",
            ParamId::ThrottlePosition | ParamId::FuelLevel1 | ParamId::FuelLevel2 => "%",
            ParamId::CoolantTemp | ParamId::TransOilTemp | ParamId::AmbientTemp => "°C",
            ParamId::OilPressure | ParamId::BoostPressure => "kPa",
            ParamId::EngineHours => "h",
            ParamId::VehicleSpeed => "km/h",
            ParamId::FuelRate => "L/h",
            ParamId::BatteryVoltage => "V",
            ParamId::TripDistance | ParamId::TotalDistance => "km",
            ParamId::InstantEconomy | ParamId::AvgEconomy => "L/100km",
        }
    }

    pub const fn domain(self) -> Domain {
        match self {
            ParamId::None => Domain::Computed,
            ParamId::EngineSpeed
            | ParamId::ThrottlePosition
            | ParamId::CoolantTemp
            | ParamId::OilPressure
            | ParamId::BoostPressure
            | ParamId::EngineHours => Domain::Engine,
            ParamId::TransOilTemp | ParamId::CurrentGear => Domain::Transmission,
            ParamId::VehicleSpeed => Domain::Vehicle,
            ParamId::FuelLevel1 | ParamId::FuelLevel2 | ParamId::FuelRate => Domain::Fuel,
            ParamId::BatteryVoltage => Domain::Electrical,
            ParamId::AmbientTemp => Domain::Environmental,
            ParamId::TripDistance | ParamId::TotalDistance => Domain::Distance,
            ParamId::ActiveDtcCount => Domain::Diagnostics,
            ParamId::InstantEconomy | ParamId::AvgEconomy => Domain::Computed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense() {
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i + 1);
        }
        assert!(PARAM_COUNT <= 256);
    }

    #[test]
    fn catalogue_is_filled_in() {
        for id in ParamId::ALL {
            assert!(!id.name().is_empty());
        }
        assert_eq!(ParamId::EngineSpeed.unit(), "rpm");
        assert_eq!(ParamId::CoolantTemp.domain(), Domain::Engine);
        assert_eq!(ParamId::ActiveDtcCount.domain(), Domain::Diagnostics);
    }
}
