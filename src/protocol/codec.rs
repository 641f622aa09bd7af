//! Fixed-layout packet encoding
//!
//! Every field is packed without padding, in declaration order, little endian:
//!
//! | field       | width                          |
//! |-------------|--------------------------------|
//! | uid         | 1                              |
//! | device_type | 1                              |
//! | event       | 4 (revision 1) or 1            |
//! | data        | slot count × (kind 1, value 2) |
//!
//! There is no length prefix or checksum; the frame size alone is checked.
//! Frames are not interchangeable with a C struct of the same fields, which a
//! compiler pads to its own alignment.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use std::io;

use crate::core::{DecodeError, Uid};
use super::packet::Packet;
use super::registry::{DeviceType, EventType, Revision, SlotKind};

/// Encodes a packet into exactly `packet.revision().frame_len()` bytes
pub fn encode(packet: &Packet) -> Bytes {
    let revision = packet.revision();
    let registry = revision.registry();
    let mut buf = BytesMut::with_capacity(revision.frame_len());

    // Packet::new only admits variants known to the packet's revision.
    buf.put_u8(packet.uid().raw());
    buf.put_u8(registry.ordinal(packet.device_type()).unwrap_or_default() as u8);

    let event = registry.ordinal(packet.event()).unwrap_or_default();
    match revision.event_width() {
        4 => buf.put_u32_le(event),
        _ => buf.put_u8(event as u8),
    }

    for slot in packet.data() {
        buf.put_u8(registry.ordinal(slot.kind()).unwrap_or_default() as u8);
        buf.put_i16_le(registry.slot_value(slot).unwrap_or_default());
    }

    buf.freeze()
}

/// Decodes one frame of the given revision
///
/// Decoding is all or nothing: any size, ordinal or slot value problem
/// rejects the whole frame.
pub fn decode(revision: Revision, frame: &[u8]) -> Result<Packet, DecodeError> {
    let expected = revision.frame_len();
    if frame.len() != expected {
        return Err(DecodeError::SizeMismatch { expected, actual: frame.len() });
    }

    let registry = revision.registry();
    let mut src = frame;

    let uid = Uid(src.get_u8());
    let device_type = registry.lookup::<DeviceType>(u32::from(src.get_u8()))?;
    let raw_event = match revision.event_width() {
        4 => src.get_u32_le(),
        _ => u32::from(src.get_u8()),
    };
    let event = registry.lookup::<EventType>(raw_event)?;

    let mut data = Vec::with_capacity(revision.slot_count());
    for _ in 0..revision.slot_count() {
        let kind = registry.lookup::<SlotKind>(u32::from(src.get_u8()))?;
        let value = src.get_i16_le();
        data.push(registry.build_slot(kind, value)?);
    }

    Ok(Packet::from_wire(revision, uid, device_type, event, data))
}

/// Splits a byte stream into fixed-size frames
///
/// Used for radios attached over a byte stream (a serial link to a radio
/// module, for instance), where frame boundaries follow from the revision's
/// frame size alone.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    frame_len: usize,
}

impl FrameCodec {
    /// Creates a frame codec for the given revision
    pub fn new(revision: Revision) -> Self {
        FrameCodec {
            frame_len: revision.frame_len(),
        }
    }

    /// Size of each frame
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < self.frame_len {
            // Need more data to complete the frame
            src.reserve(self.frame_len - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(self.frame_len)))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() != self.frame_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame is {} bytes, expected {}", item.len(), self.frame_len),
            ));
        }

        dst.extend_from_slice(&item);
        Ok(())
    }
}
