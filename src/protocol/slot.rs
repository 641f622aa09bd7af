//! Typed state slots carried in every packet

use crate::core::{Error, InvalidSlotValue, Result, Uid};
use super::registry::{DeviceType, ErrorCode, Registry, SlotKind};

/// Compact description of a device, as reported during discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    /// The device's uid
    pub uid: Uid,
    /// The device's role
    pub device_type: DeviceType,
}

/// One tagged entry of a packet's slot array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSlot {
    /// Unused slot
    NoState,
    /// Error reported by a peripheral
    ErrorCode(ErrorCode),
    /// Device descriptor, sent in answer to a scan
    Device(DeviceDescriptor),
    /// Relay or valve state
    OnOff(bool),
    /// Raw soil moisture sensor reading
    SoilMoisture(i16),
}

impl StateSlot {
    /// The tag this slot is sent with
    pub fn kind(&self) -> SlotKind {
        match self {
            StateSlot::NoState => SlotKind::NoState,
            StateSlot::ErrorCode(_) => SlotKind::ErrorCode,
            StateSlot::Device(_) => SlotKind::Device,
            StateSlot::OnOff(_) => SlotKind::OnOff,
            StateSlot::SoilMoisture(_) => SlotKind::SoilMoisture,
        }
    }

    /// Returns whether this slot carries nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, StateSlot::NoState)
    }
}

impl Default for StateSlot {
    fn default() -> Self {
        StateSlot::NoState
    }
}

impl Registry {
    /// Builds a slot from its wire tag and value
    ///
    /// Fails when `value` lies outside the domain of `kind`, or when this
    /// revision has no such slot kind.
    pub fn build_slot(&self, kind: SlotKind, value: i16) -> std::result::Result<StateSlot, InvalidSlotValue> {
        let invalid = InvalidSlotValue { kind, value };
        if !self.supports(kind) {
            return Err(invalid);
        }

        match kind {
            SlotKind::NoState if value == 0 => Ok(StateSlot::NoState),
            SlotKind::NoState => Err(invalid),
            SlotKind::OnOff => match value {
                0 => Ok(StateSlot::OnOff(false)),
                1 => Ok(StateSlot::OnOff(true)),
                _ => Err(invalid),
            },
            SlotKind::SoilMoisture => Ok(StateSlot::SoilMoisture(value)),
            SlotKind::ErrorCode => u32::try_from(value)
                .ok()
                .and_then(|raw| self.lookup::<ErrorCode>(raw).ok())
                .map(StateSlot::ErrorCode)
                .ok_or(invalid),
            SlotKind::Device => {
                let raw = value as u16;
                self.lookup::<DeviceType>(u32::from(raw & 0x00FF))
                    .map(|device_type| StateSlot::Device(DeviceDescriptor {
                        uid: Uid((raw >> 8) as u8),
                        device_type,
                    }))
                    .map_err(|_| invalid)
            }
        }
    }

    /// Wire value of `slot`, or `None` if this revision cannot carry it
    pub fn slot_value(&self, slot: &StateSlot) -> Option<i16> {
        if !self.supports(slot.kind()) {
            return None;
        }

        match slot {
            StateSlot::NoState => Some(0),
            StateSlot::OnOff(on) => Some(i16::from(*on)),
            StateSlot::SoilMoisture(reading) => Some(*reading),
            StateSlot::ErrorCode(code) => self.ordinal(*code).map(|ordinal| ordinal as i16),
            StateSlot::Device(descriptor) => self.ordinal(descriptor.device_type).map(|ordinal| {
                ((u16::from(descriptor.uid.raw()) << 8) | ordinal as u16) as i16
            }),
        }
    }
}

/// Fills `slots` up to `n` entries with `NoState`
pub fn pad_to(slots: impl IntoIterator<Item = StateSlot>, n: usize) -> Result<Vec<StateSlot>> {
    let mut padded: Vec<StateSlot> = slots.into_iter().collect();
    if padded.len() > n {
        return Err(Error::packet(format!(
            "{} slots do not fit in a {}-slot packet",
            padded.len(),
            n
        )));
    }
    padded.resize(n, StateSlot::NoState);
    Ok(padded)
}
