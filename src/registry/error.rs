//! Registry error types
//!
//! Error types for client registry operations.

use super::client::ClientId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry already holds the maximum number of viewers
    Full(usize),
    /// Registry is closed because the server is stopping
    Closed,
    /// A client with this ID is already registered
    Duplicate(ClientId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Full(max) => write!(f, "Client limit reached ({} viewers)", max),
            RegistryError::Closed => write!(f, "Registry is closed"),
            RegistryError::Duplicate(id) => write!(f, "Client already registered: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}
