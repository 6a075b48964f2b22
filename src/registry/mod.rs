//! Registry of streaming viewers
//!
//! The acceptor promotes a socket into the registry once the HTTP handshake
//! succeeds; the broadcaster snapshots it for every frame and removes viewers
//! whose writes fail.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ClientRegistry>
//!                    ┌─────────────────────────┐
//!   [Acceptor] ────► │ RwLock<Vec<Arc<Client>>>│ ◄──── remove(lost)
//!    register()      └───────────┬─────────────┘
//!                                │ snapshot()
//!                                ▼
//!                          [Broadcaster]
//!                     client.send_part() ──► TCP
//! ```
//!
//! The registry lock only guards the list. Writes happen on the snapshot,
//! outside the lock, each under the client's own writer lock.

pub mod client;
pub mod error;
pub mod store;

pub use client::{Client, ClientId};
pub use error::RegistryError;
pub use store::ClientRegistry;
