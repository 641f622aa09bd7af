//! Home mesh: packet protocol for a home-automation radio mesh
//!
//! A gateway talks to irrigation stations and outlets, optionally through
//! repeaters, using small fixed-size packets over a lossy radio link. Three
//! protocol revisions are supported; every device on a segment speaks the
//! same one.

pub mod core;
pub mod device;
pub mod network;
pub mod protocol;

// Re-export commonly used items
pub use crate::core::{Config, Error, ProtocolError, Result, Uid};
pub use crate::protocol::{Gateway, Packet, Peripheral, Repeater, Revision, StateSlot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
