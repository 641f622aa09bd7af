//! Device sensor and actuator I/O
//!
//! Peripherals read and change their physical state only through
//! [`DeviceHardware`]. The simulated devices here share their state between
//! clones, so a test or demo can hand one clone to a peripheral and inspect
//! the other.

use std::sync::atomic::{AtomicBool, AtomicI16, Ordering};
use std::sync::Arc;

use crate::core::HardwareError;
use crate::protocol::registry::{DeviceType, SlotKind};
use crate::protocol::slot::StateSlot;

/// Sensor and actuator access for one peripheral
pub trait DeviceHardware: Send {
    /// Role this hardware plays in the mesh
    fn device_type(&self) -> DeviceType;

    /// Reads the current state, primary value first
    fn read_state(&self) -> Vec<StateSlot>;

    /// Returns whether slots of `kind` can be applied at all
    ///
    /// A state change is only started when every requested slot is accepted.
    fn accepts(&self, _kind: SlotKind) -> bool {
        true
    }

    /// Applies one requested state change
    ///
    /// Slots are applied in order. A fault on a later slot leaves the earlier
    /// ones applied.
    fn apply_state(&mut self, slot: StateSlot) -> Result<(), HardwareError>;
}

/// A switchable mains outlet
#[derive(Debug, Clone, Default)]
pub struct SimulatedOutlet {
    relay: Arc<AtomicBool>,
}

impl SimulatedOutlet {
    /// Creates an outlet with its relay off
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the relay is closed
    pub fn is_on(&self) -> bool {
        self.relay.load(Ordering::SeqCst)
    }
}

impl DeviceHardware for SimulatedOutlet {
    fn device_type(&self) -> DeviceType {
        DeviceType::Outlet
    }

    fn read_state(&self) -> Vec<StateSlot> {
        vec![StateSlot::OnOff(self.is_on())]
    }

    fn accepts(&self, kind: SlotKind) -> bool {
        kind == SlotKind::OnOff
    }

    fn apply_state(&mut self, slot: StateSlot) -> Result<(), HardwareError> {
        match slot {
            StateSlot::OnOff(on) => {
                self.relay.store(on, Ordering::SeqCst);
                Ok(())
            }
            other => Err(HardwareError::Unsupported(other.kind())),
        }
    }
}

/// An irrigation station with one valve and a soil moisture probe
#[derive(Debug, Clone, Default)]
pub struct SimulatedStation {
    valve: Arc<AtomicBool>,
    moisture: Arc<AtomicI16>,
}

impl SimulatedStation {
    /// Creates a station with the valve closed and a dry probe
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the valve is open
    pub fn is_watering(&self) -> bool {
        self.valve.load(Ordering::SeqCst)
    }

    /// Sets the raw reading the moisture probe reports
    pub fn set_soil_moisture(&self, reading: i16) {
        self.moisture.store(reading, Ordering::SeqCst);
    }
}

impl DeviceHardware for SimulatedStation {
    fn device_type(&self) -> DeviceType {
        DeviceType::IrrigationStation
    }

    fn read_state(&self) -> Vec<StateSlot> {
        vec![
            StateSlot::OnOff(self.is_watering()),
            StateSlot::SoilMoisture(self.moisture.load(Ordering::SeqCst)),
        ]
    }

    fn accepts(&self, kind: SlotKind) -> bool {
        kind == SlotKind::OnOff
    }

    fn apply_state(&mut self, slot: StateSlot) -> Result<(), HardwareError> {
        match slot {
            StateSlot::OnOff(open) => {
                self.valve.store(open, Ordering::SeqCst);
                Ok(())
            }
            // The probe is read-only
            StateSlot::SoilMoisture(_) => Err(HardwareError::Unsupported(SlotKind::SoilMoisture)),
            other => Err(HardwareError::Unsupported(other.kind())),
        }
    }
}
