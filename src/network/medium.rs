use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

use crate::core::RadioError;
use super::{check_frame_len, Radio};

#[derive(Debug, Clone)]
struct Frame {
    from: usize,
    bytes: Bytes,
}

/// An in-memory radio segment
///
/// Every attached radio hears every frame sent by the others. A receiver that
/// falls more than `capacity` frames behind loses the oldest ones, the same
/// way a busy radio drops packets.
#[derive(Clone)]
pub struct Medium {
    tx: broadcast::Sender<Frame>,
    next_id: Arc<AtomicUsize>,
}

impl Medium {
    /// Creates a segment buffering up to `capacity` frames per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Medium {
            tx,
            next_id: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Attaches a new radio to the segment
    ///
    /// The radio only hears frames sent after it was attached.
    pub fn attach(&self) -> ChannelRadio {
        ChannelRadio {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

/// A radio attached to a [`Medium`]
pub struct ChannelRadio {
    id: usize,
    tx: broadcast::Sender<Frame>,
    rx: broadcast::Receiver<Frame>,
}

#[async_trait]
impl Radio for ChannelRadio {
    async fn send(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        check_frame_len(frame)?;
        self.tx
            .send(Frame {
                from: self.id,
                bytes: Bytes::copy_from_slice(frame),
            })
            .map(|_| ())
            .map_err(|_| RadioError::Closed)
    }

    async fn receive(&mut self) -> Option<Bytes> {
        loop {
            match self.rx.recv().await {
                Ok(frame) if frame.from == self.id => continue,
                Ok(frame) => {
                    trace!(radio = self.id, len = frame.bytes.len(), "frame received");
                    return Some(frame.bytes);
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(radio = self.id, missed, "receiver lagged, frames lost");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
