//! Protocol implementation module
//!
//! This module defines the revision registries, packets and their wire codec,
//! and the state machines of the gateway, peripheral and repeater roles.

pub mod codec;
pub mod packet;
pub mod peripheral;
pub mod registry;
pub mod repeater;
pub mod slot;
pub mod state;

pub use self::codec::{decode, encode, FrameCodec};
pub use self::packet::Packet;
pub use self::peripheral::Peripheral;
pub use self::registry::{DeviceType, ErrorCode, EventType, Registry, Revision, SlotKind};
pub use self::repeater::{Repeater, RepeaterStats, Route};
pub use self::slot::{DeviceDescriptor, StateSlot};
pub use self::state::{Completion, Gateway, NodeState, PendingRequest, Response};
