//! Error types
//!
//! Only start-up and lifecycle failures reach the caller. Per-connection and
//! per-viewer errors are contained inside the acceptor and broadcaster tasks,
//! where they are logged and the offending socket is dropped.

use std::fmt;
use std::io;

use crate::http::HttpError;
use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or file I/O failure
    Io(io::Error),
    /// Malformed HTTP request
    Http(HttpError),
    /// Invalid server lifecycle transition
    Lifecycle(LifecycleError),
    /// Client registry refused an operation
    Registry(RegistryError),
    /// Invalid configuration or credential data
    Config(ConfigError),
}

/// Server lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// `start()` called while the server is not stopped
    AlreadyStarted,
    /// `stop()` called while the server is not running
    NotRunning,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown authentication scheme name
    UnknownAuthScheme(String),
    /// Credential line without a `:` separator (1-based line number)
    InvalidCredential(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Lifecycle(e) => write!(f, "Lifecycle error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Http(e) => Some(e),
            Error::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::AlreadyStarted => write!(f, "MJPEG server already started"),
            LifecycleError::NotRunning => write!(f, "MJPEG server is not running"),
        }
    }
}

impl std::error::Error for LifecycleError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownAuthScheme(name) => {
                write!(f, "unknown authentication scheme '{}' (expected none, basic or digest)", name)
            }
            ConfigError::InvalidCredential(line) => {
                write!(f, "credential on line {} is not in 'username:password' form", line)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<HttpError> for Error {
    fn from(e: HttpError) -> Self {
        Error::Http(e)
    }
}

impl From<LifecycleError> for Error {
    fn from(e: LifecycleError) -> Self {
        Error::Lifecycle(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}
