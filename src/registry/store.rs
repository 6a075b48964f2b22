//! Client registry implementation
//!
//! Thread-safe set of streaming viewers, guarded by a single lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, RwLock};

use super::client::{Client, ClientId};
use super::error::RegistryError;

#[derive(Default)]
struct Inner {
    /// Registered viewers in admission order
    clients: Vec<Arc<Client>>,
    /// Set by `close_all`; refuses new registrations until `reopen`
    closed: bool,
}

/// Registry of streaming viewers
pub struct ClientRegistry {
    inner: RwLock<Inner>,
    /// Maximum number of viewers (0 = unlimited)
    max_clients: usize,
    next_id: AtomicU64,
    registered: Notify,
}

impl ClientRegistry {
    /// Create a registry admitting at most `max_clients` viewers (0 = unlimited)
    pub fn new(max_clients: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_clients,
            next_id: AtomicU64::new(1),
            registered: Notify::new(),
        }
    }

    /// Maximum number of viewers (0 = unlimited)
    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Allocate a fresh client ID
    pub fn next_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a viewer
    pub async fn register(&self, client: Client) -> Result<Arc<Client>, RegistryError> {
        let mut inner = self.inner.write().await;

        if inner.closed {
            return Err(RegistryError::Closed);
        }
        if self.max_clients > 0 && inner.clients.len() >= self.max_clients {
            return Err(RegistryError::Full(self.max_clients));
        }
        if inner.clients.iter().any(|c| c.id() == client.id()) {
            return Err(RegistryError::Duplicate(client.id()));
        }

        let client = Arc::new(client);
        inner.clients.push(Arc::clone(&client));

        tracing::info!(
            client_id = client.id(),
            peer = %client.peer_addr(),
            viewers = inner.clients.len(),
            "Viewer registered"
        );

        drop(inner);
        self.registered.notify_one();

        Ok(client)
    }

    /// Point-in-time copy of the viewers, bounded to `max_clients`
    pub async fn snapshot(&self) -> Vec<Arc<Client>> {
        let inner = self.inner.read().await;
        let limit = if self.max_clients > 0 {
            self.max_clients
        } else {
            inner.clients.len()
        };

        inner.clients.iter().take(limit).cloned().collect()
    }

    /// Remove a batch of viewers under one lock acquisition
    ///
    /// Returns the removed handles so the caller can close them after the
    /// lock is released.
    pub async fn remove(&self, ids: &[ClientId]) -> Vec<Arc<Client>> {
        if ids.is_empty() {
            return Vec::new();
        }

        let mut inner = self.inner.write().await;
        let mut removed = Vec::with_capacity(ids.len());

        inner.clients.retain(|client| {
            if ids.contains(&client.id()) {
                removed.push(Arc::clone(client));
                false
            } else {
                true
            }
        });

        tracing::debug!(
            removed = removed.len(),
            viewers = inner.clients.len(),
            "Viewers removed"
        );

        removed
    }

    /// Number of registered viewers
    pub async fn len(&self) -> usize {
        self.inner.read().await.clients.len()
    }

    /// Whether no viewers are registered
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.clients.is_empty()
    }

    /// Whether another viewer would be refused for capacity
    pub async fn is_full(&self) -> bool {
        self.max_clients > 0 && self.len().await >= self.max_clients
    }

    /// Wait until a viewer may have been registered
    ///
    /// Like [`FrameQueue::ready`](crate::media::FrameQueue::ready), wakeups can
    /// be spurious but are never lost.
    pub async fn registered(&self) {
        self.registered.notified().await;
    }

    /// Close the registry and shut down every viewer
    ///
    /// Returns the number of viewers closed.
    pub async fn close_all(&self) -> usize {
        let clients = {
            let mut inner = self.inner.write().await;
            inner.closed = true;
            std::mem::take(&mut inner.clients)
        };

        for client in &clients {
            client.close().await;
        }

        clients.len()
    }

    /// Accept registrations again after [`close_all`](Self::close_all)
    pub async fn reopen(&self) {
        self.inner.write().await.closed = false;
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(0)
    }
}
