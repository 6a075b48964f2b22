//! Streaming viewer handle
//!
//! A `Client` owns the write side of a viewer's connection. Dropping the last
//! `Arc<Client>` closes the socket; [`Client::close`] shuts it down eagerly.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Unique identifier of a registered viewer
pub type ClientId = u64;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// A connected, authenticated viewer
pub struct Client {
    id: ClientId,
    peer_addr: SocketAddr,
    connected_at: Instant,
    writer: Mutex<Writer>,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl Client {
    /// Wrap a writable stream
    pub fn new<W>(id: ClientId, peer_addr: SocketAddr, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
            writer: Mutex::new(Box::new(writer)),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    /// Client ID
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Time since the viewer was admitted
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Frames delivered so far
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Bytes delivered so far
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Write one multipart part (header followed by the frame)
    ///
    /// A write that does not complete within `timeout` fails with
    /// `ErrorKind::TimedOut`, so a stalled viewer cannot hold up the others.
    pub async fn send_part(&self, header: &[u8], frame: &[u8], timeout: Duration) -> io::Result<()> {
        let mut writer = self.writer.lock().await;

        let write = async {
            writer.write_all(header).await?;
            writer.write_all(frame).await?;
            writer.flush().await
        };

        match tokio::time::timeout(timeout, write).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "viewer did not accept frame in time",
                ))
            }
        }

        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add((header.len() + frame.len()) as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Shut down the connection
    ///
    /// Errors are ignored; the peer may already be gone.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("frames_sent", &self.frames_sent())
            .finish()
    }
}
