//! Persistence orchestration: dirty-flag batching, accumulators, flush
//! triggers and the clean/dirty-shutdown protocol.

use embassy_time::Instant;

use crate::timing::FLUSH_PERIOD;

use super::dtc_log::DtcLog;
use super::records::{LifetimeRecord, Settings, SystemState, TripRecord};
use super::{Namespace, Storage};

/// Accumulated distance that forces a flush.
pub const FLUSH_DISTANCE_KM: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    trip_a: bool,
    trip_b: bool,
    lifetime: bool,
    dtc: bool,
    settings: bool,
    fuel_econ: bool,
}

impl Dirty {
    fn set_all(&mut self) {
        *self = Self {
            trip_a: true,
            trip_b: true,
            lifetime: true,
            dtc: true,
            settings: true,
            fuel_econ: true,
        };
    }
}

/// Owner of all persisted state.
///
/// Updates land in memory and set per-namespace dirty flags; flash sees
/// them only when a trigger fires: the 5-minute period, 1 km of travel, an
/// emergency, or shutdown.
pub struct DataManager<S: Storage> {
    backend: S,
    pub trips: [TripRecord; 2],
    pub lifetime: LifetimeRecord,
    pub settings: Settings,
    pub system: SystemState,
    pub dtc_log: DtcLog,
    dirty: Dirty,
    accum_distance_km: f64,
    accum_fuel_l: f64,
    last_flush: Instant,
}

impl<S: Storage> DataManager<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            trips: [TripRecord::new(); 2],
            lifetime: LifetimeRecord::new(),
            settings: Settings::new(),
            system: SystemState::new(),
            dtc_log: DtcLog::new(),
            dirty: Dirty::default(),
            accum_distance_km: 0.0,
            accum_fuel_l: 0.0,
            last_flush: Instant::from_ticks(0),
        }
    }

    /// Release the backend, e.g. across a simulated reboot in tests.
    pub fn into_backend(self) -> S {
        self.backend
    }

    /// Load everything and run the boot half of the shutdown protocol.
    ///
    /// Returns whether the previous run ended without a clean shutdown.
    /// The clean-shutdown flag goes back to flash as false right away, so
    /// a power loss from here on is detectable.
    pub fn boot(&mut self, now: Instant, now_epoch: u32) -> Result<bool, S::Error> {
        self.trips[0].load(&mut self.backend.open(Namespace::TripA)?)?;
        self.trips[1].load(&mut self.backend.open(Namespace::TripB)?)?;
        self.lifetime.load(&mut self.backend.open(Namespace::Lifetime)?)?;
        self.lifetime
            .load_economy(&mut self.backend.open(Namespace::FuelEconomy)?)?;
        self.settings.load(&mut self.backend.open(Namespace::Settings)?)?;
        self.system.load(&mut self.backend.open(Namespace::System)?)?;
        self.dtc_log.load(&mut self.backend.open(Namespace::DtcHistory)?)?;

        let crashed = !self.system.clean_shutdown;
        self.system.boot_count += 1;
        if crashed {
            self.system.crash_count += 1;
            info!(
                "dirty boot: {} of {} boots crashed",
                self.system.crash_count, self.system.boot_count
            );
        }
        self.lifetime.boot_count = self.system.boot_count;
        if self.lifetime.first_boot == 0 {
            self.lifetime.first_boot = now_epoch;
            self.dirty.lifetime = true;
        }

        self.system.clean_shutdown = false;
        self.system.save(&mut self.backend.open(Namespace::System)?)?;

        self.last_flush = now;
        Ok(crashed)
    }

    /// Periodic housekeeping from the persistence task.
    ///
    /// Deltas go into the accumulators; when a trigger condition holds, the
    /// accumulators fold into trips and lifetime and dirty namespaces hit
    /// flash. Returns whether a flush ran.
    pub fn tick(
        &mut self,
        now: Instant,
        delta_distance_km: f64,
        delta_fuel_l: f64,
    ) -> Result<bool, S::Error> {
        self.accum_distance_km += delta_distance_km;
        self.accum_fuel_l += delta_fuel_l;

        let elapsed = now
            .checked_duration_since(self.last_flush)
            .unwrap_or(embassy_time::Duration::from_ticks(0));
        if elapsed >= FLUSH_PERIOD || self.accum_distance_km >= FLUSH_DISTANCE_KM {
            self.flush(now)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Fold accumulators and write every dirty namespace.
    pub fn flush(&mut self, now: Instant) -> Result<(), S::Error> {
        self.fold(now);

        self.write_dirty(now)
    }

    /// Power-loss precondition detected: everything is dirty, write now.
    pub fn emergency_flush(&mut self, now: Instant) -> Result<(), S::Error> {
        self.fold(now);
        self.dirty.set_all();
        self.write_dirty(now)
    }

    /// Orderly shutdown: flush everything, then mark the shutdown clean.
    pub fn shutdown(&mut self, now: Instant) -> Result<(), S::Error> {
        self.emergency_flush(now)?;
        self.system.clean_shutdown = true;
        self.system.save(&mut self.backend.open(Namespace::System)?)
    }

    /// Zero a trip meter. Trip ids are 0 (A) and 1 (B).
    pub fn trip_reset(&mut self, trip: usize, now_epoch: u32) -> bool {
        let Some(record) = self.trips.get_mut(trip) else {
            return false;
        };
        record.reset(now_epoch);
        match trip {
            0 => self.dirty.trip_a = true,
            _ => self.dirty.trip_b = true,
        }
        true
    }

    /// Direct trip increment, outside the accumulator path.
    pub fn trip_update(
        &mut self,
        trip: usize,
        delta_distance_km: f64,
        delta_fuel_l: f64,
        delta_duration_s: u32,
    ) -> bool {
        let Some(record) = self.trips.get_mut(trip) else {
            return false;
        };
        record.accumulate(delta_distance_km, delta_fuel_l, delta_duration_s);
        match trip {
            0 => self.dirty.trip_a = true,
            _ => self.dirty.trip_b = true,
        }
        true
    }

    /// Engine hours come verbatim from the bus, never accumulated here.
    pub fn set_engine_hours(&mut self, hours: f64) {
        if (hours - self.lifetime.engine_hours).abs() > f64::EPSILON {
            self.lifetime.engine_hours = hours;
            self.dirty.lifetime = true;
        }
    }

    /// Track economy extremes. With the 0/999 defaults the first sample
    /// becomes both the best and the worst.
    pub fn record_economy(&mut self, mpg: f32) {
        let mut changed = false;
        if mpg > self.lifetime.best_mpg {
            self.lifetime.best_mpg = mpg;
            changed = true;
        }
        if mpg < self.lifetime.worst_mpg {
            self.lifetime.worst_mpg = mpg;
            changed = true;
        }
        if changed {
            self.dirty.fuel_econ = true;
        }
    }

    pub fn record_dtc(&mut self, spn: u32, fmi: u8, source_address: u8, now_epoch: u32, active: bool) {
        self.dtc_log.store(spn, fmi, source_address, now_epoch, active);
        self.dirty.dtc = true;
    }

    pub fn clear_active_dtcs(&mut self) {
        self.dtc_log.clear_active();
        self.dirty.dtc = true;
    }

    pub fn clear_dtc_history(&mut self) {
        self.dtc_log.clear_all();
        self.dirty.dtc = true;
    }

    /// Mutate settings and mark them for the next flush.
    pub fn update_settings(&mut self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings);
        self.dirty.settings = true;
    }

    /// Fold the accumulators into the active trips and the lifetime
    /// totals. Runtime accrues by wall time between flushes.
    fn fold(&mut self, now: Instant) {
        let elapsed_s = now
            .checked_duration_since(self.last_flush)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if self.accum_distance_km > 0.0 || self.accum_fuel_l > 0.0 {
            for (i, trip) in self.trips.iter_mut().enumerate() {
                if trip.active {
                    trip.accumulate(
                        self.accum_distance_km,
                        self.accum_fuel_l,
                        elapsed_s as u32,
                    );
                    match i {
                        0 => self.dirty.trip_a = true,
                        _ => self.dirty.trip_b = true,
                    }
                }
            }
            self.lifetime.total_distance_km += self.accum_distance_km;
            self.lifetime.total_fuel_l += self.accum_fuel_l;
            self.dirty.lifetime = true;
        }

        self.lifetime.total_runtime_s += elapsed_s;
        self.accum_distance_km = 0.0;
        self.accum_fuel_l = 0.0;
    }

    fn write_dirty(&mut self, now: Instant) -> Result<(), S::Error> {
        if self.dirty.trip_a {
            self.trips[0].save(&mut self.backend.open(Namespace::TripA)?)?;
            self.dirty.trip_a = false;
        }
        if self.dirty.trip_b {
            self.trips[1].save(&mut self.backend.open(Namespace::TripB)?)?;
            self.dirty.trip_b = false;
        }
        if self.dirty.lifetime {
            self.lifetime.save(&mut self.backend.open(Namespace::Lifetime)?)?;
            self.dirty.lifetime = false;
        }
        if self.dirty.fuel_econ {
            self.lifetime
                .save_economy(&mut self.backend.open(Namespace::FuelEconomy)?)?;
            self.dirty.fuel_econ = false;
        }
        if self.dirty.dtc {
            self.dtc_log.save(&mut self.backend.open(Namespace::DtcHistory)?)?;
            self.dirty.dtc = false;
        }
        if self.dirty.settings {
            self.settings.save(&mut self.backend.open(Namespace::Settings)?)?;
            self.dirty.settings = false;
        }

        // the system namespace rides along on every flush
        self.system.last_save_time_ms = now.as_millis();
        self.system.pending_distance_km = self.accum_distance_km;
        self.system.pending_fuel_l = self.accum_fuel_l;
        self.system.save(&mut self.backend.open(Namespace::System)?)?;

        self.last_flush = now;
        Ok(())
    }
}
