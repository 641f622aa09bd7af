use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::warn;

use crate::core::RadioError;
use crate::protocol::codec::FrameCodec;
use crate::protocol::registry::Revision;
use super::{check_frame_len, Radio};

/// A radio reached over a byte stream, such as a serial-attached radio module
///
/// Frames are written back to back without any delimiter, so both ends must
/// use the same revision.
pub struct StreamRadio<T> {
    framed: Framed<T, FrameCodec>,
}

impl<T> StreamRadio<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps a byte stream carrying frames of the given revision
    pub fn new(io: T, revision: Revision) -> Self {
        StreamRadio {
            framed: Framed::new(io, FrameCodec::new(revision)),
        }
    }

    /// Returns the underlying stream
    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }
}

#[async_trait]
impl<T> Radio for StreamRadio<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        check_frame_len(frame)?;
        self.framed.send(Bytes::copy_from_slice(frame)).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Option<Bytes> {
        match self.framed.next().await {
            Some(Ok(frame)) => Some(frame.freeze()),
            Some(Err(e)) => {
                warn!(error = %e, "radio stream failed");
                None
            }
            None => None,
        }
    }
}
