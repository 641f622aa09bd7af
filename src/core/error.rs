use std::io;
use thiserror::Error;

use crate::protocol::registry::{EnumKind, ErrorCode, SlotKind};

/// Custom error types for the mesh protocol
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid slot: {0}")]
    InvalidSlot(#[from] InvalidSlotValue),

    #[error("Radio error: {0}")]
    Radio(#[from] RadioError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Packet error: {0}")]
    Packet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new packet construction error
    pub fn packet(msg: impl Into<String>) -> Self {
        Error::Packet(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a new invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }
}

/// Failure to turn a received frame into a packet.
///
/// Always recovered locally by dropping the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("unknown {kind} ordinal {raw}")]
    UnknownEnumValue { kind: EnumKind, raw: u32 },

    #[error(transparent)]
    InvalidSlot(#[from] InvalidSlotValue),
}

/// A slot value outside the domain of its slot kind.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("value {value} is not valid for a {kind:?} slot")]
pub struct InvalidSlotValue {
    pub kind: SlotKind,
    pub value: i16,
}

/// Errors reported by a radio driver.
#[derive(Error, Debug)]
pub enum RadioError {
    #[error("radio I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("frame of {0} bytes exceeds the radio payload limit")]
    FrameTooLarge(usize),

    #[error("radio link closed")]
    Closed,
}

/// Errors reported by device sensor/actuator I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HardwareError {
    #[error("device cannot apply {0:?} state")]
    Unsupported(SlotKind),

    #[error("device fault: {0}")]
    Fault(String),
}

/// Terminal outcome of a failed gateway request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("radio error")]
    RadioError,

    #[error("node not connected")]
    NodeNotConnected,

    #[error("node not responding")]
    NodeNotResponding,

    #[error("gateway received a wrong response")]
    GatewayWrongResponse,

    #[error("device fault")]
    DeviceFault,

    #[error("error response without an error code")]
    Unspecified,
}

impl ProtocolError {
    /// The wire error code for this error, if it has one
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ProtocolError::RadioError => Some(ErrorCode::RadioError),
            ProtocolError::NodeNotConnected => Some(ErrorCode::NodeNotConnected),
            ProtocolError::NodeNotResponding => Some(ErrorCode::NodeNotResponding),
            ProtocolError::GatewayWrongResponse => Some(ErrorCode::GatewayWrongResponse),
            ProtocolError::DeviceFault => Some(ErrorCode::DeviceFault),
            ProtocolError::Unspecified => None,
        }
    }
}

impl From<ErrorCode> for ProtocolError {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::RadioError => ProtocolError::RadioError,
            ErrorCode::NodeNotConnected => ProtocolError::NodeNotConnected,
            ErrorCode::NodeNotResponding => ProtocolError::NodeNotResponding,
            ErrorCode::GatewayWrongResponse => ProtocolError::GatewayWrongResponse,
            ErrorCode::DeviceFault => ProtocolError::DeviceFault,
        }
    }
}
