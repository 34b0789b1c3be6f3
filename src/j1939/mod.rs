//! SAE J1939 application layer: identifier decode, signal scaling, the
//! Broadcast Announce transport protocol and DM1 diagnostics.

pub mod dm1;
pub mod id;
pub mod message;
pub mod signals;
pub mod transport;

pub use dm1::{Dtc, LampStatus};
pub use id::CanId;
pub use message::Message;
pub use signals::{SignalDef, SignalWidth};
pub use transport::Assembler;

/// Parameter group numbers decoded by this crate.
pub mod pgn {
    /// Electronic Engine Controller 1 (engine speed).
    pub const EEC1: u32 = 61444;
    /// Electronic Engine Controller 2 (accelerator pedal).
    pub const EEC2: u32 = 61443;
    /// Electronic Transmission Controller 2 (gears).
    pub const ETC2: u32 = 61445;
    /// Engine Temperature 1 (coolant).
    pub const ET1: u32 = 65262;
    /// Engine Fluid Level/Pressure 1 (oil pressure).
    pub const EFLP1: u32 = 65263;
    /// Cruise Control/Vehicle Speed.
    pub const CCVS: u32 = 65265;
    /// Fuel Economy (fuel rate).
    pub const LFE: u32 = 65266;
    /// Ambient Conditions.
    pub const AMB: u32 = 65269;
    /// Inlet/Exhaust Conditions 1 (boost).
    pub const IC1: u32 = 65270;
    /// Vehicle Electrical Power 1 (battery).
    pub const VEP1: u32 = 65271;
    /// Transmission Fluids 1 (transmission oil temperature).
    pub const TRF1: u32 = 65272;
    /// Dash Display (fuel levels).
    pub const DD: u32 = 65276;
    /// Engine Hours/Revolutions.
    pub const HOURS: u32 = 65253;
    /// Active diagnostic trouble codes.
    pub const DM1: u32 = 65226;
    /// Transport Protocol connection management (BAM lives here).
    pub const TP_CM: u32 = 60416;
    /// Transport Protocol data transfer.
    pub const TP_DT: u32 = 60160;
}
