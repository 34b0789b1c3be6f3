//! The central timestamped parameter map.
//!
//! One record per identity, created on first update and kept for the
//! process lifetime. Every downstream layer (watch list, persistence,
//! display) reads this map and nothing else.

use embassy_time::{Duration, Instant};

use super::id::{ParamId, PARAM_COUNT};

/// Value changes smaller than this do not notify observers.
pub const CHANGE_EPSILON: f32 = 1e-3;

/// Bounded observer list size.
pub const MAX_OBSERVERS: usize = 4;

/// Where a value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// Never updated.
    #[default]
    Unknown,
    J1939,
    J1708,
    Analog,
    Computed,
    Stored,
}

/// Change callback: (identity, new value, previous value). Runs on the
/// writer's context and must not block.
pub type ChangeHook = fn(ParamId, f32, f32);

/// Handle for removing a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObserverToken(usize);

#[derive(Debug, Clone, Copy)]
struct Record {
    value: f32,
    prev_value: f32,
    timestamp: Instant,
    update_count: u32,
    source: Source,
    valid: bool,
}

impl Record {
    const EMPTY: Self = Self {
        value: 0.0,
        prev_value: 0.0,
        timestamp: Instant::from_ticks(0),
        update_count: 0,
        source: Source::Unknown,
        valid: false,
    };
}

/// Dense identity-to-record map with change notification.
pub struct ParamStore {
    records: [Record; PARAM_COUNT],
    observers: [Option<ChangeHook>; MAX_OBSERVERS],
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamStore {
    pub const fn new() -> Self {
        Self {
            records: [Record::EMPTY; PARAM_COUNT],
            observers: [None; MAX_OBSERVERS],
        }
    }

    /// Install a new value.
    ///
    /// The newest timestamp wins: an update stamped older than the record
    /// is discarded. Updates to [`ParamId::None`] are no-ops. Observers
    /// fire when the record becomes valid or the value moved by more than
    /// [`CHANGE_EPSILON`].
    pub fn update(&mut self, id: ParamId, value: f32, source: Source, timestamp: Instant) {
        if id == ParamId::None {
            return;
        }
        let record = &mut self.records[id.index()];
        if record.update_count > 0 && timestamp < record.timestamp {
            return;
        }

        let was_valid = record.valid;
        let prev = if record.update_count == 0 {
            value
        } else {
            record.value
        };

        record.prev_value = prev;
        record.value = value;
        record.timestamp = timestamp;
        record.update_count = record.update_count.saturating_add(1);
        record.source = source;
        record.valid = true;

        if !was_valid || (value - prev).abs() > CHANGE_EPSILON {
            for hook in self.observers.iter().flatten() {
                hook(id, value, prev);
            }
        }
    }

    /// Current value, if the record is valid.
    pub fn get(&self, id: ParamId) -> Option<f32> {
        let record = self.record(id)?;
        record.valid.then_some(record.value)
    }

    /// Current value and its timestamp.
    pub fn get_with_time(&self, id: ParamId) -> Option<(f32, Instant)> {
        let record = self.record(id)?;
        record.valid.then_some((record.value, record.timestamp))
    }

    /// Value of the update before the current one.
    pub fn previous(&self, id: ParamId) -> Option<f32> {
        let record = self.record(id)?;
        record.valid.then_some(record.prev_value)
    }

    /// Which bus or layer produced the current value.
    pub fn source(&self, id: ParamId) -> Option<Source> {
        let record = self.record(id)?;
        record.valid.then_some(record.source)
    }

    pub fn update_count(&self, id: ParamId) -> u32 {
        self.record(id).map(|r| r.update_count).unwrap_or(0)
    }

    /// Valid and no older than `max_age`.
    pub fn is_fresh(&self, id: ParamId, now: Instant, max_age: Duration) -> bool {
        match self.get_with_time(id) {
            Some((_, ts)) => age_of(now, ts) <= max_age,
            None => false,
        }
    }

    /// Age of the record, saturating to `Duration::MAX` when invalid.
    pub fn age(&self, id: ParamId, now: Instant) -> Duration {
        match self.get_with_time(id) {
            Some((_, ts)) => age_of(now, ts),
            None => Duration::MAX,
        }
    }

    /// Clear the valid flag without erasing history. The next update
    /// re-validates and re-notifies.
    pub fn invalidate(&mut self, id: ParamId) {
        if id == ParamId::None {
            return;
        }
        self.records[id.index()].valid = false;
    }

    /// Install a change callback. Fails when all observer slots are taken.
    pub fn register_observer(&mut self, hook: ChangeHook) -> Option<ObserverToken> {
        let slot = self.observers.iter().position(|s| s.is_none())?;
        self.observers[slot] = Some(hook);
        Some(ObserverToken(slot))
    }

    pub fn remove_observer(&mut self, token: ObserverToken) {
        if let Some(slot) = self.observers.get_mut(token.0) {
            *slot = None;
        }
    }

    fn record(&self, id: ParamId) -> Option<&Record> {
        (id != ParamId::None).then(|| &self.records[id.index()])
    }
}

fn age_of(now: Instant, ts: Instant) -> Duration {
    now.checked_duration_since(ts)
        .unwrap_or(Duration::from_ticks(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn first_update_creates_record() {
        let mut store = ParamStore::new();
        assert!(store.get(ParamId::EngineSpeed).is_none());
        store.update(ParamId::EngineSpeed, 800.0, Source::J1939, Instant::from_millis(10));
        assert_eq!(store.get(ParamId::EngineSpeed), Some(800.0));
        assert_eq!(store.previous(ParamId::EngineSpeed), Some(800.0));
        assert_eq!(store.source(ParamId::EngineSpeed), Some(Source::J1939));
        assert_eq!(store.update_count(ParamId::EngineSpeed), 1);
    }

    #[test]
    fn previous_tracks_last_two_updates() {
        let mut store = ParamStore::new();
        store.update(ParamId::CoolantTemp, 80.0, Source::J1939, Instant::from_millis(0));
        store.update(ParamId::CoolantTemp, 82.0, Source::J1939, Instant::from_millis(10));
        assert_eq!(store.get(ParamId::CoolantTemp), Some(82.0));
        assert_eq!(store.previous(ParamId::CoolantTemp), Some(80.0));
    }

    #[test]
    fn older_stamped_update_is_discarded() {
        let mut store = ParamStore::new();
        store.update(ParamId::VehicleSpeed, 50.0, Source::J1939, Instant::from_millis(100));
        store.update(ParamId::VehicleSpeed, 40.0, Source::J1708, Instant::from_millis(90));
        assert_eq!(store.get(ParamId::VehicleSpeed), Some(50.0));
        assert_eq!(store.source(ParamId::VehicleSpeed), Some(Source::J1939));
        // equal timestamps are accepted
        store.update(ParamId::VehicleSpeed, 45.0, Source::J1708, Instant::from_millis(100));
        assert_eq!(store.get(ParamId::VehicleSpeed), Some(45.0));
    }

    #[test]
    fn invalidate_hides_value_but_keeps_history() {
        let mut store = ParamStore::new();
        store.update(ParamId::OilPressure, 300.0, Source::J1939, Instant::from_millis(5));
        store.invalidate(ParamId::OilPressure);
        assert!(store.get(ParamId::OilPressure).is_none());
        assert_eq!(store.update_count(ParamId::OilPressure), 1);
        store.update(ParamId::OilPressure, 310.0, Source::J1939, Instant::from_millis(6));
        assert_eq!(store.get(ParamId::OilPressure), Some(310.0));
        assert_eq!(store.previous(ParamId::OilPressure), Some(300.0));
    }

    #[test]
    fn freshness_and_age() {
        let mut store = ParamStore::new();
        store.update(ParamId::FuelLevel1, 60.0, Source::J1939, Instant::from_millis(1000));
        let now = Instant::from_millis(4000);
        assert!(store.is_fresh(ParamId::FuelLevel1, now, Duration::from_millis(5000)));
        assert!(!store.is_fresh(ParamId::FuelLevel1, now, Duration::from_millis(1000)));
        assert_eq!(store.age(ParamId::FuelLevel1, now), Duration::from_millis(3000));
        assert_eq!(store.age(ParamId::BoostPressure, now), Duration::MAX);
    }

    #[test]
    fn none_is_a_silent_no_op() {
        let mut store = ParamStore::new();
        store.update(ParamId::None, 1.0, Source::Computed, Instant::from_millis(0));
        assert!(store.get(ParamId::None).is_none());
    }

    static FIRES: AtomicU32 = AtomicU32::new(0);

    fn counting_hook(_id: ParamId, _new: f32, _prev: f32) {
        FIRES.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn observers_fire_on_first_valid_and_real_changes() {
        FIRES.store(0, Ordering::Relaxed);
        let mut store = ParamStore::new();
        let token = store.register_observer(counting_hook).unwrap();

        // first valid fires even though prev == value
        store.update(ParamId::BatteryVoltage, 13.8, Source::J1939, Instant::from_millis(0));
        assert_eq!(FIRES.load(Ordering::Relaxed), 1);

        // sub-epsilon wiggle is suppressed
        store.update(ParamId::BatteryVoltage, 13.8005, Source::J1939, Instant::from_millis(10));
        assert_eq!(FIRES.load(Ordering::Relaxed), 1);

        // real change fires
        store.update(ParamId::BatteryVoltage, 14.1, Source::J1939, Instant::from_millis(20));
        assert_eq!(FIRES.load(Ordering::Relaxed), 2);

        // re-validation after invalidate fires again
        store.invalidate(ParamId::BatteryVoltage);
        store.update(ParamId::BatteryVoltage, 14.1, Source::J1939, Instant::from_millis(30));
        assert_eq!(FIRES.load(Ordering::Relaxed), 3);

        store.remove_observer(token);
        store.update(ParamId::BatteryVoltage, 15.0, Source::J1939, Instant::from_millis(40));
        assert_eq!(FIRES.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn observer_slots_are_bounded() {
        let mut store = ParamStore::new();
        for _ in 0..MAX_OBSERVERS {
            assert!(store.register_observer(counting_hook).is_some());
        }
        assert!(store.register_observer(counting_hook).is_none());
    }
}
