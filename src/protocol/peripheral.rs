use tracing::{debug, info, trace, warn};

use crate::core::{Error, ProtocolError, Result, Uid};
use crate::device::DeviceHardware;
use crate::network::Radio;
use super::codec;
use super::packet::Packet;
use super::registry::{DeviceType, EventType, Revision, SlotKind};
use super::slot::{DeviceDescriptor, StateSlot};
use super::state::NodeState;

/// Peripheral role: answers gateway requests on behalf of its hardware
///
/// A peripheral never initiates traffic. It answers requests addressed to its
/// uid, and scans addressed to the broadcast uid.
pub struct Peripheral<H> {
    uid: Uid,
    revision: Revision,
    hardware: H,
    state: NodeState,
}

impl<H: DeviceHardware> Peripheral<H> {
    /// Creates a peripheral for `hardware` at `uid`
    pub fn new(uid: Uid, revision: Revision, hardware: H) -> Result<Self> {
        if uid.is_broadcast() {
            return Err(Error::config(format!("uid {} is reserved for broadcast", uid)));
        }
        let device_type = hardware.device_type();
        if matches!(device_type, DeviceType::Gateway | DeviceType::Repeater) {
            return Err(Error::config(format!("{:?} is not a peripheral role", device_type)));
        }
        if !revision.registry().supports(device_type) {
            return Err(Error::config(format!(
                "{:?} devices do not exist in revision {:?}",
                device_type, revision
            )));
        }

        Ok(Peripheral {
            uid,
            revision,
            hardware,
            state: NodeState::Idle,
        })
    }

    /// Returns the uid this peripheral answers to
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Returns the revision spoken by this peripheral
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns the current protocol state
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Returns the hardware this peripheral drives
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Descriptor this peripheral reports when scanned
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            uid: self.uid,
            device_type: self.hardware.device_type(),
        }
    }

    /// Processes one received packet, returning the reply to send, if any
    pub fn handle_packet(&mut self, packet: &Packet) -> Result<Option<Packet>> {
        if packet.device_type() != DeviceType::Gateway {
            trace!(uid = %packet.uid(), "ignoring packet not sent by a gateway");
            return Ok(None);
        }

        let event = packet.event();
        let addressed = packet.uid() == self.uid;
        if !addressed && !(event == EventType::Scan && packet.uid().is_broadcast()) {
            return Ok(None);
        }
        if !event.is_request() {
            debug!(uid = %self.uid, ?event, "ignoring non-request event");
            return Ok(None);
        }

        self.state = NodeState::Responding { event };
        let reply = self.respond(packet);
        self.state = NodeState::Idle;
        reply.map(Some)
    }

    /// Answers requests until the radio link closes
    pub async fn serve<R: Radio>(&mut self, radio: &mut R) -> Result<()> {
        info!(uid = %self.uid, device_type = ?self.hardware.device_type(), "peripheral listening");

        while let Some(frame) = radio.receive().await {
            let packet = match codec::decode(self.revision, &frame) {
                Ok(packet) => packet,
                Err(e) => {
                    debug!(uid = %self.uid, error = %e, "dropping undecodable frame");
                    continue;
                }
            };

            let reply = match self.handle_packet(&packet) {
                Ok(Some(reply)) => reply,
                Ok(None) => continue,
                Err(e) => {
                    warn!(uid = %self.uid, event = ?packet.event(), error = %e, "failed to build reply");
                    continue;
                }
            };
            if let Err(e) = radio.send(&codec::encode(&reply)).await {
                warn!(uid = %self.uid, error = %e, "failed to transmit reply");
            }
        }

        info!(uid = %self.uid, "radio link closed");
        Ok(())
    }

    fn respond(&mut self, request: &Packet) -> Result<Packet> {
        match request.event() {
            EventType::Ping => self.reply(EventType::Pong, Vec::new()),
            EventType::Scan => {
                if self.revision.registry().supports(EventType::Devices) {
                    self.reply(EventType::Devices, vec![StateSlot::Device(self.descriptor())])
                } else {
                    self.reply(EventType::Pong, Vec::new())
                }
            }
            EventType::GetState => self.state_reply(),
            EventType::SetState => {
                if let Some(slot) = request.states().find(|slot| !self.hardware.accepts(slot.kind())) {
                    warn!(uid = %self.uid, ?slot, "state change not supported, nothing applied");
                    return self.fault();
                }
                for slot in request.states() {
                    if let Err(e) = self.hardware.apply_state(*slot) {
                        warn!(uid = %self.uid, ?slot, error = %e, "failed to apply state");
                        return self.fault();
                    }
                }
                self.state_reply()
            }
            other => Err(Error::invalid_state(format!("{:?} is not a request", other))),
        }
    }

    /// Reports the hardware state, or a fault when the revision cannot carry it
    fn state_reply(&self) -> Result<Packet> {
        match self.reply(EventType::Ok, self.hardware.read_state()) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(uid = %self.uid, error = %e, "hardware state cannot be reported");
                self.fault()
            }
        }
    }

    fn fault(&self) -> Result<Packet> {
        let registry = self.revision.registry();
        let slots = ProtocolError::DeviceFault
            .error_code()
            .filter(|code| registry.supports(SlotKind::ErrorCode) && registry.supports(*code))
            .map(StateSlot::ErrorCode);
        self.reply(EventType::Error, slots)
    }

    fn reply(&self, event: EventType, slots: impl IntoIterator<Item = StateSlot>) -> Result<Packet> {
        let slots: Vec<_> = slots.into_iter().take(self.revision.slot_count()).collect();
        Packet::new(self.revision, self.uid, self.hardware.device_type(), event, slots)
    }
}
