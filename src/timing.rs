//! Nominal bus timing.
//!
//! Broadcast periods follow the SAE J1939-71 transmission-rate column for
//! the PGNs this crate decodes; the remaining constants are the protocol
//! timeouts the receivers enforce.

use embassy_time::Duration;

use crate::j1939::pgn;

/// Inter-packet silence after which a transport-protocol session is
/// abandoned.
pub const TP_PACKET_TIMEOUT: Duration = Duration::from_millis(750);

/// Inter-byte silence that terminates a J1708 frame. J1708 allows 2 bit
/// times (~208 us at 9600 bit/s) within a message; the framer keeps a
/// generous safety margin.
pub const J1708_BYTE_GAP: Duration = Duration::from_millis(10);

/// Default window for [`crate::ParamStore::is_fresh`] style checks.
pub const FRESHNESS_DEFAULT: Duration = Duration::from_millis(5000);

/// Periodic flash-flush interval of the persistence layer.
pub const FLUSH_PERIOD: Duration = Duration::from_secs(300);

/// Nominal broadcast period of a decoded PGN.
///
/// Slow parameters (temperatures, pressures, levels, hours) are announced
/// once a second; the engine controller groups are much faster. DM1 repeats
/// at 1 s while a fault is active.
pub fn broadcast_period(parameter_group: u32) -> Duration {
    match parameter_group {
        pgn::EEC1 => Duration::from_millis(10),
        pgn::EEC2 => Duration::from_millis(50),
        pgn::CCVS | pgn::LFE | pgn::ETC2 => Duration::from_millis(100),
        _ => Duration::from_millis(1000),
    }
}
