//! Watch list: a dashboard-shaped projection of the parameter store with
//! per-entry thresholds and severity bands.

use heapless::{String, Vec};

use crate::param::{ParamId, ParamStore};

/// Entries the list can hold.
pub const MAX_ITEMS: usize = 16;

/// Logical dashboard pages.
pub const MAX_PAGES: u8 = 4;

/// How an entry wants to be drawn. The core never renders; the tag rides
/// along for the display adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Widget {
    Circular,
    Linear,
    Semicircle,
    Numeric,
    Indicator,
}

/// Alert severity, ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    #[default]
    None,
    Warning,
    Critical,
}

/// Warning and critical bands. A disabled bound saturates to infinity of
/// the harmless side.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    pub warn_low: f32,
    pub warn_high: f32,
    pub crit_low: f32,
    pub crit_high: f32,
}

impl Thresholds {
    pub const DISABLED: Self = Self {
        warn_low: f32::NEG_INFINITY,
        warn_high: f32::INFINITY,
        crit_low: f32::NEG_INFINITY,
        crit_high: f32::INFINITY,
    };

    /// Severity of a value against these bands. Critical wins over warning.
    pub fn severity(&self, value: f32) -> Severity {
        if value <= self.crit_low || value >= self.crit_high {
            Severity::Critical
        } else if value <= self.warn_low || value >= self.warn_high {
            Severity::Warning
        } else {
            Severity::None
        }
    }
}

/// One watched parameter and its place on the dashboard.
#[derive(Debug, Clone)]
pub struct WatchItem {
    pub param: ParamId,
    pub widget: Widget,
    pub page: u8,
    pub position: u8,
    pub decimals: u8,
    /// Display-name override; the identity catalogue name otherwise.
    pub label: Option<String<16>>,
    /// Unit override, same idea.
    pub unit: Option<String<8>>,
    pub gauge_min: f32,
    pub gauge_max: f32,
    pub thresholds: Thresholds,
    pub enabled: bool,
    /// Outcome of the last [`WatchList::update`].
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    AlreadyWatched,
    Full,
    PageOutOfRange,
    NotFound,
}

/// The bounded list of watch items.
#[derive(Default)]
pub struct WatchList {
    items: Vec<WatchItem, MAX_ITEMS>,
}

impl WatchList {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Watch a parameter. Defaults: enabled, one decimal place, disabled
    /// thresholds, gauge range 0..100.
    pub fn add(&mut self, param: ParamId, widget: Widget, page: u8, position: u8) -> Result<usize, Error> {
        if page >= MAX_PAGES {
            return Err(Error::PageOutOfRange);
        }
        if self.find(param).is_some() {
            return Err(Error::AlreadyWatched);
        }
        let item = WatchItem {
            param,
            widget,
            page,
            position,
            decimals: 1,
            label: None,
            unit: None,
            gauge_min: 0.0,
            gauge_max: 100.0,
            thresholds: Thresholds::DISABLED,
            enabled: true,
            severity: Severity::None,
        };
        self.items.push(item).map_err(|_| Error::Full)?;
        Ok(self.items.len() - 1)
    }

    pub fn remove(&mut self, param: ParamId) -> Result<(), Error> {
        let idx = self.find(param).ok_or(Error::NotFound)?;
        self.items.remove(idx);
        Ok(())
    }

    pub fn set_thresholds(
        &mut self,
        param: ParamId,
        warn_low: f32,
        warn_high: f32,
        crit_low: f32,
        crit_high: f32,
    ) -> Result<(), Error> {
        let item = self.find_mut(param)?;
        item.thresholds = Thresholds {
            warn_low,
            warn_high,
            crit_low,
            crit_high,
        };
        Ok(())
    }

    pub fn set_gauge_range(&mut self, param: ParamId, min: f32, max: f32) -> Result<(), Error> {
        let item = self.find_mut(param)?;
        item.gauge_min = min;
        item.gauge_max = max;
        Ok(())
    }

    /// Override label and unit. Oversized strings are truncated.
    pub fn set_custom_label(&mut self, param: ParamId, label: &str, unit: &str) -> Result<(), Error> {
        let item = self.find_mut(param)?;
        item.label = Some(truncated(label));
        item.unit = Some(truncated(unit));
        Ok(())
    }

    /// Recompute severities from current store values.
    ///
    /// Entries whose parameter has no valid value keep their last severity;
    /// staleness policy belongs to the consumer.
    pub fn update(&mut self, store: &ParamStore) {
        for item in self.items.iter_mut().filter(|i| i.enabled) {
            if let Some(value) = store.get(item.param) {
                item.severity = item.thresholds.severity(value);
            }
        }
    }

    /// Enabled entries on one page.
    pub fn page_items(&self, page: u8) -> impl Iterator<Item = &WatchItem> {
        self.items
            .iter()
            .filter(move |i| i.enabled && i.page == page)
    }

    /// Worst severity across enabled entries.
    pub fn highest_alert(&self) -> Severity {
        self.items
            .iter()
            .filter(|i| i.enabled)
            .map(|i| i.severity)
            .max()
            .unwrap_or(Severity::None)
    }

    /// Enabled entries at or above `level`.
    pub fn alert_count(&self, level: Severity) -> usize {
        self.items
            .iter()
            .filter(|i| i.enabled && i.severity >= level)
            .count()
    }

    pub fn get(&self, param: ParamId) -> Option<&WatchItem> {
        self.find(param).map(|i| &self.items[i])
    }

    /// Install the canonical four-page truck layout: engine, fuel,
    /// transmission, diagnostics.
    pub fn setup_defaults(&mut self) -> Result<(), Error> {
        self.items.clear();

        self.add(ParamId::EngineSpeed, Widget::Circular, 0, 0)?;
        self.set_thresholds(ParamId::EngineSpeed, 400.0, 2200.0, 300.0, 2500.0)?;
        self.set_gauge_range(ParamId::EngineSpeed, 0.0, 3000.0)?;

        self.add(ParamId::CoolantTemp, Widget::Linear, 0, 1)?;
        self.set_thresholds(ParamId::CoolantTemp, 70.0, 100.0, 50.0, 110.0)?;
        self.set_gauge_range(ParamId::CoolantTemp, 40.0, 120.0)?;

        self.add(ParamId::OilPressure, Widget::Linear, 0, 2)?;
        self.set_thresholds(
            ParamId::OilPressure,
            150.0,
            f32::INFINITY,
            100.0,
            f32::INFINITY,
        )?;
        self.set_gauge_range(ParamId::OilPressure, 0.0, 700.0)?;

        self.add(ParamId::BoostPressure, Widget::Semicircle, 0, 3)?;
        self.set_gauge_range(ParamId::BoostPressure, 0.0, 300.0)?;

        self.add(ParamId::VehicleSpeed, Widget::Circular, 1, 0)?;
        self.set_gauge_range(ParamId::VehicleSpeed, 0.0, 140.0)?;

        self.add(ParamId::FuelLevel1, Widget::Linear, 1, 1)?;
        self.set_thresholds(
            ParamId::FuelLevel1,
            15.0,
            f32::INFINITY,
            10.0,
            f32::INFINITY,
        )?;

        self.add(ParamId::TransOilTemp, Widget::Linear, 2, 0)?;
        self.set_thresholds(
            ParamId::TransOilTemp,
            f32::NEG_INFINITY,
            100.0,
            f32::NEG_INFINITY,
            120.0,
        )?;
        self.set_gauge_range(ParamId::TransOilTemp, 0.0, 150.0)?;

        self.add(ParamId::BatteryVoltage, Widget::Numeric, 3, 0)?;
        self.set_thresholds(ParamId::BatteryVoltage, 12.0, 15.0, 11.5, 15.5)?;

        self.add(ParamId::ActiveDtcCount, Widget::Indicator, 3, 1)?;
        self.set_thresholds(
            ParamId::ActiveDtcCount,
            f32::NEG_INFINITY,
            0.5,
            f32::NEG_INFINITY,
            0.5,
        )?;

        Ok(())
    }

    fn find(&self, param: ParamId) -> Option<usize> {
        self.items.iter().position(|i| i.param == param)
    }

    fn find_mut(&mut self, param: ParamId) -> Result<&mut WatchItem, Error> {
        self.items
            .iter_mut()
            .find(|i| i.param == param)
            .ok_or(Error::NotFound)
    }
}

fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
