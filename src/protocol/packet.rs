use crate::core::{Error, Result, Uid};
use super::registry::{DeviceType, EventType, Revision};
use super::slot::{pad_to, DeviceDescriptor, StateSlot};

/// The unit exchanged over the radio link
///
/// A packet is bound to the revision it was built for and can only exist in a
/// shape that revision is able to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    revision: Revision,
    uid: Uid,
    device_type: DeviceType,
    event: EventType,
    data: Vec<StateSlot>,
}

impl Packet {
    /// Builds a packet, padding `slots` to the revision's slot count
    pub fn new(
        revision: Revision,
        uid: Uid,
        device_type: DeviceType,
        event: EventType,
        slots: impl IntoIterator<Item = StateSlot>,
    ) -> Result<Self> {
        let registry = revision.registry();
        if !registry.supports(device_type) {
            return Err(Error::packet(format!(
                "{:?} devices do not exist in revision {:?}",
                device_type, revision
            )));
        }
        if !registry.supports(event) {
            return Err(Error::packet(format!(
                "{:?} events do not exist in revision {:?}",
                event, revision
            )));
        }

        let data = pad_to(slots, revision.slot_count())?;
        if let Some(slot) = data.iter().find(|slot| registry.slot_value(slot).is_none()) {
            return Err(Error::packet(format!(
                "{:?} cannot be carried in revision {:?}",
                slot, revision
            )));
        }

        Ok(Packet { revision, uid, device_type, event, data })
    }

    /// Assembles a packet whose fields were already validated by the decoder
    pub(super) fn from_wire(
        revision: Revision,
        uid: Uid,
        device_type: DeviceType,
        event: EventType,
        data: Vec<StateSlot>,
    ) -> Self {
        Packet { revision, uid, device_type, event, data }
    }

    /// Revision this packet is encoded with
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Destination or source device
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Role of the sender
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Message kind
    pub fn event(&self) -> EventType {
        self.event
    }

    /// All slots, including trailing `NoState` padding
    pub fn data(&self) -> &[StateSlot] {
        &self.data
    }

    /// Slots that carry a value, in wire order
    pub fn states(&self) -> impl Iterator<Item = &StateSlot> + '_ {
        self.data.iter().filter(|slot| !slot.is_empty())
    }

    /// The first slot carrying a value, conventionally the primary payload
    pub fn primary(&self) -> Option<&StateSlot> {
        self.states().next()
    }

    /// Descriptor of the sending device, taken from the header
    pub fn sender(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            uid: self.uid,
            device_type: self.device_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::registry::ErrorCode;

    #[test]
    fn test_packet_is_padded() {
        let packet = Packet::new(
            Revision::V1,
            Uid(5),
            DeviceType::Gateway,
            EventType::SetState,
            [StateSlot::OnOff(true)],
        ).unwrap();

        assert_eq!(packet.data().len(), 8);
        assert_eq!(packet.primary(), Some(&StateSlot::OnOff(true)));
        assert_eq!(packet.states().count(), 1);
    }

    #[test]
    fn test_states_skip_empty_slots() {
        let packet = Packet::new(
            Revision::V3,
            Uid(7),
            DeviceType::IrrigationStation,
            EventType::Ok,
            [StateSlot::NoState, StateSlot::SoilMoisture(410), StateSlot::NoState, StateSlot::OnOff(false)],
        ).unwrap();

        let states: Vec<_> = packet.states().copied().collect();
        assert_eq!(states, vec![StateSlot::SoilMoisture(410), StateSlot::OnOff(false)]);
        assert_eq!(packet.primary(), Some(&StateSlot::SoilMoisture(410)));
    }

    #[test]
    fn test_rejects_variants_outside_revision() {
        let repeater = Packet::new(Revision::V1, Uid(2), DeviceType::Repeater, EventType::Pong, []);
        assert!(matches!(repeater, Err(Error::Packet(_))));

        let devices = Packet::new(Revision::V2, Uid(2), DeviceType::Outlet, EventType::Devices, []);
        assert!(matches!(devices, Err(Error::Packet(_))));

        let error_slot = Packet::new(
            Revision::V1,
            Uid(2),
            DeviceType::Outlet,
            EventType::Error,
            [StateSlot::ErrorCode(ErrorCode::DeviceFault)],
        );
        assert!(matches!(error_slot, Err(Error::Packet(_))));
    }

    #[test]
    fn test_rejects_too_many_slots() {
        let slots = vec![StateSlot::OnOff(true); 5];
        let packet = Packet::new(Revision::V3, Uid(1), DeviceType::Gateway, EventType::SetState, slots);
        assert!(matches!(packet, Err(Error::Packet(_))));
    }
}
