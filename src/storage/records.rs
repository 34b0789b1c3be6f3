//! Persisted record types: trips, lifetime totals, settings, system state.
//!
//! Each type knows how to load itself from and save itself into an open
//! namespace handle. Absent keys load as defaults, which is also the
//! first-boot path.

use super::NamespaceHandle;

/// Distance under which trip economy reads 0 instead of dividing noise.
const ECONOMY_MIN_DISTANCE_KM: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl From<u32> for UnitSystem {
    fn from(v: u32) -> Self {
        match v {
            1 => Self::Imperial,
            _ => Self::Metric,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl From<u32> for TempUnit {
    fn from(v: u32) -> Self {
        match v {
            1 => Self::Fahrenheit,
            _ => Self::Celsius,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PressureUnit {
    #[default]
    Kpa,
    Psi,
    Bar,
}

impl From<u32> for PressureUnit {
    fn from(v: u32) -> Self {
        match v {
            1 => Self::Psi,
            2 => Self::Bar,
            _ => Self::Kpa,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EconomyUnit {
    #[default]
    LitersPer100Km,
    Mpg,
    KmPerLiter,
}

impl From<u32> for EconomyUnit {
    fn from(v: u32) -> Self {
        match v {
            1 => Self::Mpg,
            2 => Self::KmPerLiter,
            _ => Self::LitersPer100Km,
        }
    }
}

/// One resettable trip meter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TripRecord {
    pub distance_km: f64,
    pub fuel_l: f64,
    /// Epoch seconds, caller supplied.
    pub start_time: u32,
    pub active: bool,
    pub duration_s: u32,
    pub avg_speed_kmh: f32,
    pub avg_economy_l_per_100km: f32,
}

impl TripRecord {
    pub const fn new() -> Self {
        Self {
            distance_km: 0.0,
            fuel_l: 0.0,
            start_time: 0,
            active: false,
            duration_s: 0,
            avg_speed_kmh: 0.0,
            avg_economy_l_per_100km: 0.0,
        }
    }

    /// Zero everything and start counting from `now_epoch`.
    pub fn reset(&mut self, now_epoch: u32) {
        *self = Self::new();
        self.active = true;
        self.start_time = now_epoch;
    }

    /// Fold in travelled distance, burned fuel and elapsed time, then
    /// refresh the derived averages.
    pub fn accumulate(&mut self, distance_km: f64, fuel_l: f64, duration_s: u32) {
        self.distance_km += distance_km;
        self.fuel_l += fuel_l;
        self.duration_s = self.duration_s.saturating_add(duration_s);

        if self.duration_s > 0 {
            self.avg_speed_kmh = (self.distance_km * 3600.0 / self.duration_s as f64) as f32;
        }
        self.avg_economy_l_per_100km = if self.distance_km >= ECONOMY_MIN_DISTANCE_KM {
            (self.fuel_l * 100.0 / self.distance_km) as f32
        } else {
            0.0
        };
    }

    pub fn load<H: NamespaceHandle>(&mut self, h: &mut H) -> Result<(), H::Error> {
        self.distance_km = h.get_f64("dist")?.unwrap_or(0.0);
        self.fuel_l = h.get_f64("fuel")?.unwrap_or(0.0);
        self.start_time = h.get_u32("start")?.unwrap_or(0);
        self.active = h.get_u32("active")?.unwrap_or(0) != 0;
        self.duration_s = h.get_u32("dur")?.unwrap_or(0);
        // derived values are recomputed, not stored
        self.accumulate(0.0, 0.0, 0);
        Ok(())
    }

    pub fn save<H: NamespaceHandle>(&self, h: &mut H) -> Result<(), H::Error> {
        h.set_f64("dist", self.distance_km)?;
        h.set_f64("fuel", self.fuel_l)?;
        h.set_u32("start", self.start_time)?;
        h.set_u32("active", self.active as u32)?;
        h.set_u32("dur", self.duration_s)?;
        h.commit()
    }
}

/// Totals over the vehicle's recorded life.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LifetimeRecord {
    pub total_distance_km: f64,
    pub total_fuel_l: f64,
    /// Last engine-hours reading from the bus, not accumulated locally.
    pub engine_hours: f64,
    pub boot_count: u32,
    pub best_mpg: f32,
    pub worst_mpg: f32,
    /// Epoch seconds of the very first boot.
    pub first_boot: u32,
    pub total_runtime_s: u64,
}

impl Default for LifetimeRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeRecord {
    /// Economy extremes start inverted so the first sample becomes both.
    pub const fn new() -> Self {
        Self {
            total_distance_km: 0.0,
            total_fuel_l: 0.0,
            engine_hours: 0.0,
            boot_count: 0,
            best_mpg: 0.0,
            worst_mpg: 999.0,
            first_boot: 0,
            total_runtime_s: 0,
        }
    }

    pub fn load<H: NamespaceHandle>(&mut self, h: &mut H) -> Result<(), H::Error> {
        self.total_distance_km = h.get_f64("total_dist")?.unwrap_or(0.0);
        self.total_fuel_l = h.get_f64("total_fuel")?.unwrap_or(0.0);
        self.engine_hours = h.get_f64("eng_hours")?.unwrap_or(0.0);
        self.boot_count = h.get_u32("boot_cnt")?.unwrap_or(0);
        self.first_boot = h.get_u32("first_boot")?.unwrap_or(0);
        self.total_runtime_s = h.get_u64("runtime")?.unwrap_or(0);
        Ok(())
    }

    pub fn save<H: NamespaceHandle>(&self, h: &mut H) -> Result<(), H::Error> {
        h.set_f64("total_dist", self.total_distance_km)?;
        h.set_f64("total_fuel", self.total_fuel_l)?;
        h.set_f64("eng_hours", self.engine_hours)?;
        h.set_u32("boot_cnt", self.boot_count)?;
        h.set_u32("first_boot", self.first_boot)?;
        h.set_u64("runtime", self.total_runtime_s)?;
        h.commit()
    }

    /// Load the economy extremes from the fuel-economy namespace.
    pub fn load_economy<H: NamespaceHandle>(&mut self, h: &mut H) -> Result<(), H::Error> {
        self.best_mpg = h.get_f32("best_mpg")?.unwrap_or(0.0);
        self.worst_mpg = h.get_f32("worst_mpg")?.unwrap_or(999.0);
        Ok(())
    }

    pub fn save_economy<H: NamespaceHandle>(&self, h: &mut H) -> Result<(), H::Error> {
        h.set_f32("best_mpg", self.best_mpg)?;
        h.set_f32("worst_mpg", self.worst_mpg)?;
        h.commit()
    }
}

/// Operator preferences.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    pub unit_system: UnitSystem,
    /// 0-100.
    pub brightness: u8,
    pub default_page: u8,
    pub temp_unit: TempUnit,
    pub pressure_unit: PressureUnit,
    pub economy_unit: EconomyUnit,
    pub tank1_capacity_l: f32,
    pub tank2_capacity_l: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub const fn new() -> Self {
        Self {
            unit_system: UnitSystem::Metric,
            brightness: 75,
            default_page: 0,
            temp_unit: TempUnit::Celsius,
            pressure_unit: PressureUnit::Kpa,
            economy_unit: EconomyUnit::LitersPer100Km,
            tank1_capacity_l: 200.0,
            tank2_capacity_l: 200.0,
        }
    }

    pub fn load<H: NamespaceHandle>(&mut self, h: &mut H) -> Result<(), H::Error> {
        let defaults = Self::new();
        self.unit_system = h.get_u32("units")?.map(UnitSystem::from).unwrap_or_default();
        self.brightness = h
            .get_u32("bright")?
            .map(|v| v.min(100) as u8)
            .unwrap_or(defaults.brightness);
        self.default_page = h
            .get_u32("def_page")?
            .map(|v| v as u8)
            .unwrap_or(defaults.default_page);
        self.temp_unit = h.get_u32("temp_unit")?.map(TempUnit::from).unwrap_or_default();
        self.pressure_unit = h
            .get_u32("press_unit")?
            .map(PressureUnit::from)
            .unwrap_or_default();
        self.economy_unit = h
            .get_u32("econ_unit")?
            .map(EconomyUnit::from)
            .unwrap_or_default();
        self.tank1_capacity_l = h.get_f32("tank1")?.unwrap_or(defaults.tank1_capacity_l);
        self.tank2_capacity_l = h.get_f32("tank2")?.unwrap_or(defaults.tank2_capacity_l);
        Ok(())
    }

    pub fn save<H: NamespaceHandle>(&self, h: &mut H) -> Result<(), H::Error> {
        h.set_u32("units", self.unit_system as u32)?;
        h.set_u32("bright", self.brightness as u32)?;
        h.set_u32("def_page", self.default_page as u32)?;
        h.set_u32("temp_unit", self.temp_unit as u32)?;
        h.set_u32("press_unit", self.pressure_unit as u32)?;
        h.set_u32("econ_unit", self.economy_unit as u32)?;
        h.set_f32("tank1", self.tank1_capacity_l)?;
        h.set_f32("tank2", self.tank2_capacity_l)?;
        h.commit()
    }
}

/// Boot/shutdown bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemState {
    /// False from boot until [`shutdown`](super::DataManager::shutdown)
    /// wrote it back; a boot that finds it false knows power was lost.
    pub clean_shutdown: bool,
    /// Monotonic milliseconds at the last successful flush.
    pub last_save_time_ms: u64,
    pub boot_count: u32,
    pub crash_count: u32,
    /// Distance and fuel accumulated but not yet folded at the moment the
    /// system namespace was last written; what a crash loses.
    pub pending_distance_km: f64,
    pub pending_fuel_l: f64,
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemState {
    pub const fn new() -> Self {
        Self {
            // a device that never persisted anything has nothing to crash
            clean_shutdown: true,
            last_save_time_ms: 0,
            boot_count: 0,
            crash_count: 0,
            pending_distance_km: 0.0,
            pending_fuel_l: 0.0,
        }
    }

    pub fn load<H: NamespaceHandle>(&mut self, h: &mut H) -> Result<(), H::Error> {
        self.clean_shutdown = h.get_u32("clean_shut")?.unwrap_or(1) != 0;
        self.last_save_time_ms = h.get_u64("last_ts")?.unwrap_or(0);
        self.boot_count = h.get_u32("boot_cnt")?.unwrap_or(0);
        self.crash_count = h.get_u32("crash_cnt")?.unwrap_or(0);
        self.pending_distance_km = h.get_f64("pend_dist")?.unwrap_or(0.0);
        self.pending_fuel_l = h.get_f64("pend_fuel")?.unwrap_or(0.0);
        Ok(())
    }

    pub fn save<H: NamespaceHandle>(&self, h: &mut H) -> Result<(), H::Error> {
        h.set_u32("clean_shut", self.clean_shutdown as u32)?;
        h.set_u64("last_ts", self.last_save_time_ms)?;
        h.set_u32("boot_cnt", self.boot_count)?;
        h.set_u32("crash_cnt", self.crash_count)?;
        h.set_f64("pend_dist", self.pending_distance_km)?;
        h.set_f64("pend_fuel", self.pending_fuel_l)?;
        h.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemStorage, Namespace, Storage};

    #[test]
    fn trip_math() {
        let mut trip = TripRecord::new();
        trip.reset(1_700_000_000);
        assert!(trip.active);

        // 30 km in 1800 s on 9 L
        trip.accumulate(30.0, 9.0, 1800);
        assert!((trip.avg_speed_kmh - 60.0).abs() < 0.01);
        assert!((trip.avg_economy_l_per_100km - 30.0).abs() < 0.01);
    }

    #[test]
    fn short_trip_economy_reads_zero() {
        let mut trip = TripRecord::new();
        trip.reset(0);
        trip.accumulate(0.4, 0.5, 60);
        assert_eq!(trip.avg_economy_l_per_100km, 0.0);
        trip.accumulate(0.6, 0.5, 60);
        assert!(trip.avg_economy_l_per_100km > 0.0);
    }

    #[test]
    fn trip_persists() {
        let mut storage = MemStorage::new();
        let mut trip = TripRecord::new();
        trip.reset(123);
        trip.accumulate(12.0, 3.0, 600);
        trip.save(&mut storage.open(Namespace::TripA).unwrap()).unwrap();

        let mut loaded = TripRecord::new();
        loaded
            .load(&mut storage.open(Namespace::TripA).unwrap())
            .unwrap();
        assert_eq!(loaded.distance_km, 12.0);
        assert_eq!(loaded.start_time, 123);
        assert!(loaded.active);
        assert!((loaded.avg_speed_kmh - 72.0).abs() < 0.01);
    }

    #[test]
    fn lifetime_first_sample_sets_both_extremes() {
        let lifetime = LifetimeRecord::new();
        let sample = 7.5f32;
        assert!(sample > lifetime.best_mpg);
        assert!(sample < lifetime.worst_mpg);
    }

    #[test]
    fn settings_default_on_empty_storage() {
        let mut storage = MemStorage::new();
        let mut settings = Settings::new();
        settings
            .load(&mut storage.open(Namespace::Settings).unwrap())
            .unwrap();
        assert_eq!(settings, Settings::new());
        assert_eq!(settings.brightness, 75);
        assert_eq!(settings.tank1_capacity_l, 200.0);
    }

    #[test]
    fn settings_round_trip() {
        let mut storage = MemStorage::new();
        let mut settings = Settings::new();
        settings.unit_system = UnitSystem::Imperial;
        settings.brightness = 40;
        settings.temp_unit = TempUnit::Fahrenheit;
        settings.tank2_capacity_l = 150.0;
        settings
            .save(&mut storage.open(Namespace::Settings).unwrap())
            .unwrap();

        let mut loaded = Settings::new();
        loaded
            .load(&mut storage.open(Namespace::Settings).unwrap())
            .unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn system_state_round_trip() {
        let mut storage = MemStorage::new();
        let mut state = SystemState::new();
        state.clean_shutdown = false;
        state.boot_count = 12;
        state.crash_count = 2;
        state.pending_distance_km = 0.7;
        state
            .save(&mut storage.open(Namespace::System).unwrap())
            .unwrap();

        let mut loaded = SystemState::new();
        loaded
            .load(&mut storage.open(Namespace::System).unwrap())
            .unwrap();
        assert_eq!(loaded, state);
    }
}
