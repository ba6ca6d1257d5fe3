use anyhow::{Context, Result};
use common::{GazePoint, GazeSink};
use log::{info, trace};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicU64, Ordering};

/// Streams gaze points as JSON datagrams, one per emitted frame.
///
/// The socket is non-blocking; when the kernel buffer is full the point is dropped
/// and the next frame's point takes its place.
pub struct GenericUdpStrategy {
    socket: Option<UdpSocket>,
    target_address: String,
    dropped: AtomicU64,
}

impl GenericUdpStrategy {
    pub fn new(target_address: String) -> Self {
        Self {
            socket: None,
            target_address,
            dropped: AtomicU64::new(0),
        }
    }

    /// Points skipped because the socket could not take them without blocking.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl GazeSink for GenericUdpStrategy {
    fn initialize(&mut self) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind gaze output socket")?;
        socket
            .connect(&self.target_address)
            .with_context(|| format!("Failed to connect gaze output to {}", self.target_address))?;
        socket
            .set_nonblocking(true)
            .context("Failed to set non-blocking mode")?;

        self.socket = Some(socket);
        info!("Streaming gaze points to udp://{}", self.target_address);
        Ok(())
    }

    fn send(&self, point: &GazePoint) -> Result<()> {
        let Some(socket) = &self.socket else {
            return Ok(());
        };
        let datagram = serde_json::to_vec(point)?;
        match socket.send(&datagram) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(
                    "Output busy, gaze point at {}ms dropped ({} total)",
                    point.timestamp_ms,
                    dropped
                );
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Gaze output to {}", self.target_address)),
        }
    }
}
