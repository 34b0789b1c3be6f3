//! SAE J1708 data link and J1587 application layer.
//!
//! J1708 is a 9600 bit/s half-duplex serial bus; frames are delimited by
//! inter-byte silence and guarded by a modulo-256 checksum. J1587 layers a
//! MID + parameter-list structure on top.

pub mod checksum;
pub mod framer;
pub mod message;
pub mod pids;

pub use framer::{Framer, Push};
pub use message::{Message, Param};
pub use pids::{Fault, PidLength};

/// Longest legal frame on the wire, checksum included.
pub const MAX_FRAME: usize = 21;
