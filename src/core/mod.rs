//! Core types and traits for the mesh protocol
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{
    DecodeError,
    Error,
    HardwareError,
    InvalidSlotValue,
    ProtocolError,
    RadioError,
    Result,
};
pub use self::types::{Config, Uid};

/// Largest payload a single radio frame can carry (nRF24L01 payload width)
pub const MAX_FRAME_LEN: usize = 32;

/// Default time a gateway waits for a response
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 500;

/// Default number of requests a gateway keeps outstanding at once
pub const DEFAULT_MAX_PENDING: usize = 8;
