//! Wire enumerations and their per-revision ordinal tables
//!
//! The Rust enums below are revision independent. Which variants exist on the
//! wire, and which ordinal each one is sent as, is decided by the [`Registry`]
//! of the revision a mesh segment is configured for. Ordinals are positions in
//! the registry tables, so a table may only ever grow at the end.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::DecodeError;

/// Role of the device that sent a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Coordinates the mesh (the NRF proxy in the first revision)
    Gateway,
    IrrigationStation,
    Outlet,
    Repeater,
}

/// Message kind carried by a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Ping,
    Pong,
    Ok,
    Error,
    Scan,
    SetState,
    GetState,
    Devices,
}

impl EventType {
    /// Returns whether a gateway may send this event as a request
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            EventType::Ping | EventType::Scan | EventType::SetState | EventType::GetState
        )
    }
}

/// Tag of a state slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    NoState,
    ErrorCode,
    Device,
    OnOff,
    SoilMoisture,
}

/// Error codes carried in `ErrorCode` slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    RadioError,
    NodeNotConnected,
    NodeNotResponding,
    GatewayWrongResponse,
    DeviceFault,
}

/// Names the enumeration a raw ordinal belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumKind {
    DeviceType,
    EventType,
    SlotKind,
    ErrorCode,
}

impl fmt::Display for EnumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnumKind::DeviceType => "device type",
            EnumKind::EventType => "event type",
            EnumKind::SlotKind => "slot kind",
            EnumKind::ErrorCode => "error code",
        };
        f.write_str(name)
    }
}

/// An enumeration whose wire ordinals are defined by a [`Registry`]
pub trait WireEnum: Copy + Eq + fmt::Debug + 'static {
    /// Which enumeration this is
    const KIND: EnumKind;

    /// Ordinal table of this enumeration in `registry`
    fn table(registry: &Registry) -> &'static [Self];
}

impl WireEnum for DeviceType {
    const KIND: EnumKind = EnumKind::DeviceType;

    fn table(registry: &Registry) -> &'static [Self] {
        registry.device_types
    }
}

impl WireEnum for EventType {
    const KIND: EnumKind = EnumKind::EventType;

    fn table(registry: &Registry) -> &'static [Self] {
        registry.events
    }
}

impl WireEnum for SlotKind {
    const KIND: EnumKind = EnumKind::SlotKind;

    fn table(registry: &Registry) -> &'static [Self] {
        registry.slot_kinds
    }
}

impl WireEnum for ErrorCode {
    const KIND: EnumKind = EnumKind::ErrorCode;

    fn table(registry: &Registry) -> &'static [Self] {
        registry.error_codes
    }
}

/// Bytes taken by `uid` and `device_type`, ahead of the event field
pub const HEADER_LEN: usize = 2;

/// Bytes taken by one slot: kind ordinal plus a 16-bit value
pub const SLOT_LEN: usize = 3;

/// A named, fixed protocol configuration
///
/// The revision is not carried on the wire; every device on a segment must be
/// configured with the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    /// Eight slots, event sent as a 4-byte enum, no error reporting
    V1,
    /// Four slots, 1-byte event, error codes and repeaters
    V2,
    /// Adds device discovery (`Devices` event and `Device` slots)
    V3,
}

impl Revision {
    /// The newest revision
    pub const LATEST: Revision = Revision::V3;

    /// Every revision, oldest first
    pub const ALL: [Revision; 3] = [Revision::V1, Revision::V2, Revision::V3];

    /// Number of slots in every packet
    pub const fn slot_count(self) -> usize {
        match self {
            Revision::V1 => 8,
            Revision::V2 | Revision::V3 => 4,
        }
    }

    /// Width of the event field in bytes
    pub const fn event_width(self) -> usize {
        match self {
            Revision::V1 => 4,
            Revision::V2 | Revision::V3 => 1,
        }
    }

    /// Size of every encoded packet in bytes
    pub const fn frame_len(self) -> usize {
        HEADER_LEN + self.event_width() + self.slot_count() * SLOT_LEN
    }

    /// Ordinal tables of this revision
    pub fn registry(self) -> &'static Registry {
        match self {
            Revision::V1 => &REVISION_1,
            Revision::V2 => &REVISION_2,
            Revision::V3 => &REVISION_3,
        }
    }
}

const _: () = {
    assert!(Revision::V1.frame_len() <= crate::core::MAX_FRAME_LEN);
    assert!(Revision::V2.frame_len() <= crate::core::MAX_FRAME_LEN);
    assert!(Revision::V3.frame_len() <= crate::core::MAX_FRAME_LEN);
};

/// Ordinal tables for one revision
#[derive(Debug)]
pub struct Registry {
    revision: Revision,
    device_types: &'static [DeviceType],
    events: &'static [EventType],
    slot_kinds: &'static [SlotKind],
    error_codes: &'static [ErrorCode],
}

static REVISION_1: Registry = Registry {
    revision: Revision::V1,
    device_types: &[
        DeviceType::Gateway,
        DeviceType::IrrigationStation,
        DeviceType::Outlet,
    ],
    events: &[
        EventType::Ping,
        EventType::Pong,
        EventType::Ok,
        EventType::Error,
        EventType::Scan,
        EventType::SetState,
        EventType::GetState,
    ],
    slot_kinds: &[SlotKind::NoState, SlotKind::OnOff, SlotKind::SoilMoisture],
    error_codes: &[],
};

static REVISION_2: Registry = Registry {
    revision: Revision::V2,
    device_types: &[
        DeviceType::Gateway,
        DeviceType::IrrigationStation,
        DeviceType::Outlet,
        DeviceType::Repeater,
    ],
    events: &[
        EventType::Ping,
        EventType::Pong,
        EventType::Ok,
        EventType::Error,
        EventType::Scan,
        EventType::SetState,
        EventType::GetState,
    ],
    slot_kinds: &[
        SlotKind::NoState,
        SlotKind::ErrorCode,
        SlotKind::OnOff,
        SlotKind::SoilMoisture,
    ],
    error_codes: &[
        ErrorCode::RadioError,
        ErrorCode::NodeNotConnected,
        ErrorCode::NodeNotResponding,
        ErrorCode::GatewayWrongResponse,
        ErrorCode::DeviceFault,
    ],
};

static REVISION_3: Registry = Registry {
    revision: Revision::V3,
    device_types: &[
        DeviceType::Gateway,
        DeviceType::IrrigationStation,
        DeviceType::Outlet,
        DeviceType::Repeater,
    ],
    events: &[
        EventType::Ping,
        EventType::Pong,
        EventType::Ok,
        EventType::Error,
        EventType::Scan,
        EventType::SetState,
        EventType::GetState,
        EventType::Devices,
    ],
    slot_kinds: &[
        SlotKind::NoState,
        SlotKind::ErrorCode,
        SlotKind::Device,
        SlotKind::OnOff,
        SlotKind::SoilMoisture,
    ],
    error_codes: &[
        ErrorCode::RadioError,
        ErrorCode::NodeNotConnected,
        ErrorCode::NodeNotResponding,
        ErrorCode::GatewayWrongResponse,
        ErrorCode::DeviceFault,
    ],
};

impl Registry {
    /// The revision these tables belong to
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Wire ordinal of `value`, or `None` if this revision does not know it
    pub fn ordinal<T: WireEnum>(&self, value: T) -> Option<u32> {
        T::table(self)
            .iter()
            .position(|known| *known == value)
            .map(|index| index as u32)
    }

    /// Maps a raw wire ordinal back to its variant
    pub fn lookup<T: WireEnum>(&self, raw: u32) -> Result<T, DecodeError> {
        usize::try_from(raw)
            .ok()
            .and_then(|index| T::table(self).get(index))
            .copied()
            .ok_or(DecodeError::UnknownEnumValue { kind: T::KIND, raw })
    }

    /// Returns whether this revision can carry `value`
    pub fn supports<T: WireEnum>(&self, value: T) -> bool {
        self.ordinal(value).is_some()
    }

    /// Returns whether `raw` is a known ordinal of the `kind` enumeration
    pub fn is_known(&self, raw: u32, kind: EnumKind) -> bool {
        let len = match kind {
            EnumKind::DeviceType => self.device_types.len(),
            EnumKind::EventType => self.events.len(),
            EnumKind::SlotKind => self.slot_kinds.len(),
            EnumKind::ErrorCode => self.error_codes.len(),
        };
        usize::try_from(raw).map_or(false, |index| index < len)
    }
}
