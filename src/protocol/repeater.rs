use bytes::Bytes;
use tracing::{debug, info, trace, warn};

use crate::core::{Error, Result, Uid};
use crate::network::Radio;
use super::codec;
use super::packet::Packet;
use super::registry::{DeviceType, EventType, Revision};

/// What a repeater does with one received frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Retransmit the frame unchanged on the other segment
    Forward,
    /// Answer on the segment the frame came from
    Reply(Packet),
    /// Discard the frame
    Drop,
}

/// Traffic counters of a repeater
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepeaterStats {
    /// Frames retransmitted on the other segment
    pub forwarded: u64,
    /// Frames discarded, undecodable or addressed here without an answer
    pub dropped: u64,
    /// Frames addressed here that got a local reply
    pub answered: u64,
}

/// Repeater role: relays packets between two link segments
///
/// Payloads are not interpreted. Both segments must speak the repeater's
/// revision.
pub struct Repeater {
    uid: Uid,
    revision: Revision,
    stats: RepeaterStats,
}

#[derive(Debug)]
enum Heard {
    A(Option<Bytes>),
    B(Option<Bytes>),
}

impl Repeater {
    /// Creates a repeater at `uid`
    pub fn new(uid: Uid, revision: Revision) -> Result<Self> {
        if uid.is_broadcast() {
            return Err(Error::config(format!("uid {} is reserved for broadcast", uid)));
        }

        Ok(Repeater {
            uid,
            revision,
            stats: RepeaterStats::default(),
        })
    }

    /// Returns the uid this repeater answers to
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Returns the revision spoken on both segments
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns the traffic counters so far
    pub fn stats(&self) -> RepeaterStats {
        self.stats
    }

    /// Decides what to do with a frame heard on either segment
    pub fn route(&mut self, frame: &[u8]) -> Route {
        let packet = match codec::decode(self.revision, frame) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(uid = %self.uid, error = %e, "dropping undecodable frame");
                self.stats.dropped += 1;
                return Route::Drop;
            }
        };

        if packet.uid() != self.uid {
            trace!(uid = %packet.uid(), event = ?packet.event(), "forwarding");
            self.stats.forwarded += 1;
            return Route::Forward;
        }

        match self.local_reply(&packet) {
            Some(reply) => {
                self.stats.answered += 1;
                Route::Reply(reply)
            }
            None => {
                self.stats.dropped += 1;
                Route::Drop
            }
        }
    }

    /// Answer to a packet addressed to this repeater, if it warrants one
    pub fn local_reply(&self, packet: &Packet) -> Option<Packet> {
        if packet.device_type() != DeviceType::Gateway || packet.event() != EventType::Ping {
            return None;
        }
        // Only revisions that know the role can name it in a reply
        Packet::new(self.revision, self.uid, DeviceType::Repeater, EventType::Pong, []).ok()
    }

    /// Relays traffic between two segments until either link closes
    pub async fn bridge<A: Radio, B: Radio>(&mut self, a: &mut A, b: &mut B) -> Result<()> {
        info!(uid = %self.uid, revision = ?self.revision, "repeater bridging segments");

        loop {
            let heard = tokio::select! {
                frame = a.receive() => Heard::A(frame),
                frame = b.receive() => Heard::B(frame),
            };

            let (frame, from_a) = match heard {
                Heard::A(Some(frame)) => (frame, true),
                Heard::B(Some(frame)) => (frame, false),
                Heard::A(None) | Heard::B(None) => {
                    info!(uid = %self.uid, stats = ?self.stats, "segment closed, repeater stopping");
                    return Ok(());
                }
            };

            let sent = match (self.route(&frame), from_a) {
                (Route::Forward, true) => b.send(&frame).await,
                (Route::Forward, false) => a.send(&frame).await,
                (Route::Reply(reply), true) => a.send(&codec::encode(&reply)).await,
                (Route::Reply(reply), false) => b.send(&codec::encode(&reply)).await,
                (Route::Drop, _) => Ok(()),
            };
            if let Err(e) = sent {
                warn!(uid = %self.uid, error = %e, "failed to relay frame");
            }
        }
    }
}
