//! Wear-aware persistent storage.
//!
//! The substrate is an NVS-style key-value flash: short keys inside named
//! namespaces, typed scalars and blobs. The crate talks to it through the
//! [`Storage`] trait so hardware backends and the in-memory test backend
//! are interchangeable. Handles are scoped borrows: a namespace is opened
//! for one read or write sequence and released when the handle drops.

pub mod dtc_log;
pub mod manager;
pub mod mem;
pub mod records;

pub use dtc_log::{DtcLog, StoredDtc};
pub use manager::DataManager;
pub use mem::MemStorage;
pub use records::{
    EconomyUnit, LifetimeRecord, PressureUnit, Settings, SystemState, TempUnit, TripRecord,
    UnitSystem,
};

/// Longest key a backend must accept.
pub const MAX_KEY_LEN: usize = 15;

/// The fixed set of namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Namespace {
    TripA,
    TripB,
    Lifetime,
    DtcHistory,
    Settings,
    System,
    FuelEconomy,
}

impl Namespace {
    pub const ALL: [Namespace; 7] = [
        Namespace::TripA,
        Namespace::TripB,
        Namespace::Lifetime,
        Namespace::DtcHistory,
        Namespace::Settings,
        Namespace::System,
        Namespace::FuelEconomy,
    ];

    /// On-flash namespace name.
    pub const fn name(self) -> &'static str {
        match self {
            Namespace::TripA => "trip_a",
            Namespace::TripB => "trip_b",
            Namespace::Lifetime => "lifetime",
            Namespace::DtcHistory => "dtc_hist",
            Namespace::Settings => "settings",
            Namespace::System => "system",
            Namespace::FuelEconomy => "fuel_econ",
        }
    }
}

/// A persistent key-value substrate.
pub trait Storage {
    type Error: core::fmt::Debug;
    type Handle<'a>: NamespaceHandle<Error = Self::Error>
    where
        Self: 'a;

    /// Open a namespace for one operation sequence. The handle releases on
    /// drop, on every exit path.
    fn open(&mut self, ns: Namespace) -> Result<Self::Handle<'_>, Self::Error>;
}

/// Typed access inside one open namespace.
///
/// Getters return `Ok(None)` for absent keys so callers can fall back to
/// defaults; errors are reserved for the backend actually failing.
pub trait NamespaceHandle {
    type Error: core::fmt::Debug;

    fn get_u32(&mut self, key: &str) -> Result<Option<u32>, Self::Error>;
    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), Self::Error>;

    fn get_u64(&mut self, key: &str) -> Result<Option<u64>, Self::Error>;
    fn set_u64(&mut self, key: &str, value: u64) -> Result<(), Self::Error>;

    fn get_f32(&mut self, key: &str) -> Result<Option<f32>, Self::Error>;
    fn set_f32(&mut self, key: &str, value: f32) -> Result<(), Self::Error>;

    fn get_f64(&mut self, key: &str) -> Result<Option<f64>, Self::Error>;
    fn set_f64(&mut self, key: &str, value: f64) -> Result<(), Self::Error>;

    /// Copy a blob into `buf`, returning how many bytes it held.
    fn get_blob(&mut self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;
    fn set_blob(&mut self, key: &str, value: &[u8]) -> Result<(), Self::Error>;

    /// Make everything written through this handle durable.
    fn commit(&mut self) -> Result<(), Self::Error>;
}
