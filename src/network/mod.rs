//! Radio links
//!
//! The protocol core never talks to radio hardware directly. It hands whole
//! frames to a [`Radio`] and receives whole frames back; retransmission and
//! link-level acknowledgement stay inside the driver.

mod medium;
mod stream;
mod udp;

pub use self::medium::{ChannelRadio, Medium};
pub use self::stream::StreamRadio;
pub use self::udp::UdpRadio;

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::RadioError;

/// A radio driver able to move whole frames
#[async_trait]
pub trait Radio: Send {
    /// Transmits one frame
    async fn send(&mut self, frame: &[u8]) -> Result<(), RadioError>;

    /// Waits for the next received frame
    ///
    /// Returns `None` once the link is closed for good.
    async fn receive(&mut self) -> Option<Bytes>;
}

/// Rejects frames larger than a radio payload
pub(crate) fn check_frame_len(frame: &[u8]) -> Result<(), RadioError> {
    if frame.len() > crate::core::MAX_FRAME_LEN {
        return Err(RadioError::FrameTooLarge(frame.len()));
    }
    Ok(())
}
