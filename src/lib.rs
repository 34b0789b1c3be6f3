//! Protocol and data core for a heavy-duty truck dashboard.
//!
//! This crate ingests the two classic heavy-duty vehicle buses, SAE J1939
//! (29-bit-id CAN at 250 kbit/s) and SAE J1708/J1587 (9600 bit/s half-duplex
//! serial), decodes vehicle parameters and diagnostic trouble codes, and
//! deposits them into a central timestamped parameter store observed by a
//! watch-list/alerting layer and a wear-aware persistence layer.
//!
//! The core is a passive pipeline: hardware drivers, display rendering and
//! any CLI/telemetry adapters live outside and talk to it through byte/frame
//! entry points and callback interfaces.
//!
//! ```text
//!   CAN frames ─► j1939 decoder ─┐
//!                                ├─► param store ─┬─► watch list (alerts)
//!   serial bytes ─► j1708 framer │                ├─► storage (NVS)
//!     ─► j1587 decoder ──────────┘                └─► external consumers
//! ```
//!
//! Listen-only operation: the core never transmits requests, claims an
//! address, or controls the vehicle. All timestamps are monotonic
//! [`embassy_time::Instant`]s supplied by the host; the core never queries a
//! clock itself.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod ingest;
pub mod j1708;
pub mod j1939;
pub mod param;
pub mod storage;
pub mod timing;
pub mod watch;

pub use ingest::{CanRx, Dm1Report, FaultReport, SerialRx};
pub use param::{ParamId, ParamStore, SharedParamStore, Source};
pub use watch::{Severity, WatchList};
