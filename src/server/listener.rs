//! MJPEG server handle
//!
//! Owns the listening socket lifecycle and the two worker tasks.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use crate::auth::{self, Credentials};
use crate::error::{Error, LifecycleError, Result};
use crate::media::{FrameQueue, PutOutcome};
use crate::registry::ClientRegistry;
use crate::server::broadcaster;
use crate::server::config::ServerConfig;
use crate::server::connection::{Connection, HandshakeOutcome};
use crate::server::state::{AtomicState, ServerState};
use crate::server::Shared;
use crate::stats::{ServerMetrics, ServerStats};

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct Workers {
    shutdown: watch::Sender<bool>,
    acceptor: JoinHandle<()>,
    broadcaster: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// MJPEG broadcast server
///
/// ```no_run
/// use mjpeg_rs::{Credentials, MjpegServer, ServerConfig};
///
/// # async fn demo() -> mjpeg_rs::Result<()> {
/// let credentials = Credentials::new().with("admin", "secret");
/// let server = MjpegServer::new(ServerConfig::default(), credentials);
///
/// server.start().await?;
/// server.put_frame(std::fs::read("frame.jpg")?);
/// server.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct MjpegServer {
    shared: Arc<Shared>,
    state: Arc<AtomicState>,
    workers: Mutex<Option<Workers>>,
}

impl MjpegServer {
    /// Create a stopped server
    pub fn new(config: ServerConfig, credentials: Credentials) -> Self {
        let auth = auth::build(
            config.auth_scheme,
            &config.realm,
            credentials,
            config.log_auth_digests,
        );
        let queue = FrameQueue::new(config.max_queued_frames);
        let registry = ClientRegistry::new(config.max_clients);

        Self {
            shared: Arc::new(Shared {
                config,
                auth,
                queue,
                registry,
                metrics: ServerMetrics::new(),
            }),
            state: Arc::new(AtomicState::new(ServerState::Stopped)),
            workers: Mutex::new(None),
        }
    }

    /// Bind the listening socket and spawn the acceptor and broadcaster
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested.
    pub async fn start(&self) -> Result<SocketAddr> {
        self.state
            .transition(ServerState::Stopped, ServerState::Starting)
            .map_err(|_| Error::Lifecycle(LifecycleError::AlreadyStarted))?;

        let bind_addr = self.shared.config.bind_addr;
        let listener = match TcpListener::bind(bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(addr = %bind_addr, error = %e, "Failed to bind MJPEG server");
                self.state.set(ServerState::Stopped);
                return Err(e.into());
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.state.set(ServerState::Stopped);
                return Err(e.into());
            }
        };

        self.shared.registry.reopen().await;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let acceptor = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.shared),
            shutdown_rx.clone(),
        ));
        let broadcaster = tokio::spawn(broadcaster::run(Arc::clone(&self.shared), shutdown_rx));

        *self.workers() = Some(Workers {
            shutdown,
            acceptor,
            broadcaster,
            local_addr,
        });

        self.shared.metrics.mark_started();
        self.state.set(ServerState::Running);

        tracing::info!(
            addr = %local_addr,
            auth = %self.shared.config.auth_scheme,
            max_clients = self.shared.config.max_clients,
            max_queued_frames = self.shared.queue.capacity(),
            "MJPEG server listening"
        );

        Ok(local_addr)
    }

    /// Stop accepting, stop broadcasting and disconnect every viewer
    ///
    /// Returns once both worker tasks have exited. Frames still queued are
    /// discarded.
    pub async fn stop(&self) -> Result<()> {
        self.state
            .transition(ServerState::Running, ServerState::Stopping)
            .map_err(|_| Error::Lifecycle(LifecycleError::NotRunning))?;

        let workers = self.workers().take();

        // Runs to completion even if the caller drops this future
        let task = tokio::spawn(teardown(
            workers,
            Arc::clone(&self.shared),
            Arc::clone(&self.state),
        ));

        if let Err(e) = task.await {
            tracing::error!(error = %e, "Shutdown task failed");
            self.state.set(ServerState::Stopped);
        }

        Ok(())
    }

    /// Hand a JPEG frame to the broadcaster
    ///
    /// Never blocks; safe to call from a non-async capture thread. Frames put
    /// while the server is stopped are queued and sent after the next start
    /// only if a viewer connects before they are displaced.
    pub fn put_frame(&self, frame: impl Into<Bytes>) -> PutOutcome {
        let outcome = self.shared.queue.put(frame.into());

        match outcome {
            PutOutcome::Queued { dropped } => {
                self.shared.metrics.add_frames_queued(1);
                if dropped > 0 {
                    self.shared.metrics.add_frames_dropped(dropped as u64);
                    tracing::trace!(dropped, "Frame queue full, dropped oldest");
                }
            }
            PutOutcome::Rejected => {
                self.shared.metrics.add_frames_rejected(1);
                tracing::debug!("Empty frame ignored");
            }
        }

        outcome
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    /// Whether the server is accepting viewers
    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.workers().as_ref().map(|w| w.local_addr)
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Number of registered viewers
    pub async fn client_count(&self) -> usize {
        self.shared.registry.len().await
    }

    /// Point-in-time statistics
    pub async fn stats(&self) -> ServerStats {
        let viewers = self.shared.registry.len().await;
        self.shared.metrics.snapshot(viewers, self.shared.queue.len())
    }

    fn workers(&self) -> MutexGuard<'_, Option<Workers>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MjpegServer {
    fn drop(&mut self) {
        let workers = self
            .workers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(workers) = workers {
            let _ = workers.shutdown.send(true);
            workers.acceptor.abort();
            workers.broadcaster.abort();
        }
    }
}

async fn teardown(workers: Option<Workers>, shared: Arc<Shared>, state: Arc<AtomicState>) {
    if let Some(workers) = workers {
        let _ = workers.shutdown.send(true);

        if let Err(e) = workers.acceptor.await {
            tracing::error!(error = %e, "Acceptor task failed");
        }
        if let Err(e) = workers.broadcaster.await {
            tracing::error!(error = %e, "Broadcaster task failed");
        }
    }

    let closed = shared.registry.close_all().await;
    shared.queue.clear();
    shared.metrics.mark_stopped();
    state.set(ServerState::Stopped);

    tracing::info!(viewers_closed = closed, "MJPEG server stopped");
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut handshakes: JoinSet<HandshakeOutcome> = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            Some(joined) = handshakes.join_next(), if !handshakes.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Handshake task failed");
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, peer_addr)) => {
                    handle_connection(&shared, &mut handshakes, socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    // Connections still mid-handshake are dropped unanswered.
    handshakes.shutdown().await;
    tracing::debug!("Acceptor stopped");
}

fn handle_connection(
    shared: &Arc<Shared>,
    handshakes: &mut JoinSet<HandshakeOutcome>,
    socket: TcpStream,
    peer_addr: SocketAddr,
) {
    let id = shared.registry.next_id();
    shared.metrics.add_connections_accepted(1);

    tracing::debug!(client_id = id, peer = %peer_addr, "New connection");

    if shared.config.tcp_nodelay {
        if let Err(e) = socket.set_nodelay(true) {
            tracing::warn!(client_id = id, error = %e, "Failed to configure socket");
        }
    }

    let connection = Connection::new(id, socket, peer_addr, Arc::clone(shared));
    handshakes.spawn(connection.run());
}
