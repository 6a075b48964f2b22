//! MJPEG server
//!
//! Two long-lived tasks do the work:
//!
//! ```text
//!  TcpListener ──► [Acceptor] ──(HTTP + auth)──► ClientRegistry
//!                                                     │ snapshot
//!  put_frame() ──► FrameQueue ──► [Broadcaster] ──────┴──► viewers
//! ```
//!
//! The acceptor runs each connection's handshake on its own task so a slow
//! client cannot hold up others. The broadcaster takes one frame at a time
//! and writes it to every viewer, dropping viewers whose writes fail.

pub mod broadcaster;
pub mod config;
pub mod connection;
pub mod listener;
pub mod state;

pub use broadcaster::{broadcast_frame, BroadcastReport};
pub use config::ServerConfig;
pub use listener::MjpegServer;
pub use state::ServerState;

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::media::FrameQueue;
use crate::registry::ClientRegistry;
use crate::stats::ServerMetrics;

/// State shared between the server handle and its tasks
pub(crate) struct Shared {
    pub config: ServerConfig,
    pub auth: Arc<dyn Authenticator>,
    pub queue: FrameQueue,
    pub registry: ClientRegistry,
    pub metrics: ServerMetrics,
}
