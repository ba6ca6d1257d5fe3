use anyhow::{Context, Result};
use api::{LandmarkFrame, LandmarkSource};
use log::{info, warn};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Receives JSON-encoded landmark frames from the detector process over UDP.
pub struct UdpLandmarkSource {
    listen_address: String,
    socket: Option<UdpSocket>,
    buf: Vec<u8>,
}

impl UdpLandmarkSource {
    pub fn new(listen_address: String) -> Self {
        Self {
            listen_address,
            socket: None,
            buf: vec![0u8; 65535],
        }
    }
}

pub fn decode_frame(packet: &[u8]) -> Result<LandmarkFrame> {
    serde_json::from_slice(packet).context("Malformed landmark packet")
}

impl LandmarkSource for UdpLandmarkSource {
    fn initialize(&mut self) -> Result<()> {
        let socket = UdpSocket::bind(&self.listen_address)
            .with_context(|| format!("Failed to bind landmark socket {}", self.listen_address))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .context("Failed to set read timeout")?;
        info!("Listening for landmark frames on {}", self.listen_address);
        self.socket = Some(socket);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        let Some(socket) = &self.socket else {
            return Ok(None);
        };

        match socket.recv_from(&mut self.buf) {
            Ok((amt, src)) => match decode_frame(&self.buf[..amt]) {
                Ok(frame) => Ok(Some(frame)),
                Err(e) => {
                    warn!("Dropping packet from {}: {:#}", src, e);
                    Ok(None)
                }
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(e).context("Failed to receive landmark packet"),
        }
    }

    fn shutdown(&mut self) {
        if self.socket.take().is_some() {
            info!("Landmark receiver stopped");
        }
    }
}
