use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::core::{Error, RadioError, Result, MAX_FRAME_LEN};
use super::{check_frame_len, Radio};

/// Simulates a radio link with UDP datagrams, one frame per datagram
///
/// Useful for running gateways and peripherals as separate host processes.
pub struct UdpRadio {
    /// Socket connected to the peer radio
    socket: UdpSocket,
    /// Buffer for receiving data
    recv_buffer: [u8; MAX_FRAME_LEN + 1],
}

impl UdpRadio {
    /// Binds a radio to a local address
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| Error::config(format!("Failed to bind radio socket {}: {}", bind_addr, e)))?;

        Ok(UdpRadio {
            socket,
            recv_buffer: [0u8; MAX_FRAME_LEN + 1],
        })
    }

    /// Sets the peer radio frames are sent to and accepted from
    pub async fn connect(&self, peer: SocketAddr) -> Result<()> {
        self.socket.connect(peer).await?;
        Ok(())
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl Radio for UdpRadio {
    async fn send(&mut self, frame: &[u8]) -> std::result::Result<(), RadioError> {
        check_frame_len(frame)?;
        self.socket.send(frame).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Option<Bytes> {
        loop {
            match self.socket.recv(&mut self.recv_buffer).await {
                Ok(size) if size > MAX_FRAME_LEN => {
                    debug!(size, "dropping oversized datagram");
                }
                Ok(size) => return Some(Bytes::copy_from_slice(&self.recv_buffer[..size])),
                // The peer is not listening yet; datagrams are lossy anyway
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    debug!("peer radio unreachable");
                }
                Err(e) => {
                    warn!(error = %e, "radio socket failed");
                    return None;
                }
            }
        }
    }
}
