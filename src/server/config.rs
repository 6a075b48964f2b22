//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::{AuthScheme, DEFAULT_REALM};
use crate::media::queue::DEFAULT_CAPACITY;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8090;

/// Default maximum number of concurrent viewers
pub const DEFAULT_MAX_CLIENTS: usize = 16;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum frames waiting for the broadcaster; older frames are dropped
    pub max_queued_frames: usize,

    /// Maximum concurrent viewers (0 = unlimited)
    pub max_clients: usize,

    /// Realm announced in authentication challenges
    pub realm: String,

    /// Authentication scheme
    pub auth_scheme: AuthScheme,

    /// Time allowed for a client to send its request headers
    pub handshake_timeout: Duration,

    /// Time allowed for one frame write before a viewer is dropped
    pub write_timeout: Duration,

    /// Maximum request header size in bytes
    pub max_request_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Log digest intermediate hashes at trace level
    pub log_auth_digests: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_queued_frames: DEFAULT_CAPACITY,
            max_clients: DEFAULT_MAX_CLIENTS,
            realm: DEFAULT_REALM.to_string(),
            auth_scheme: AuthScheme::Digest,
            handshake_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            max_request_size: 8 * 1024, // 8KB
            tcp_nodelay: true, // Frames are written as soon as they are captured
            log_auth_digests: false,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the listening port, keeping the bind IP
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set maximum queued frames
    pub fn max_queued_frames(mut self, max: usize) -> Self {
        self.max_queued_frames = max.max(1);
        self
    }

    /// Set maximum concurrent viewers
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the authentication realm
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Set the authentication scheme
    pub fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable trace logging of digest hashes
    pub fn log_auth_digests(mut self, enabled: bool) -> Self {
        self.log_auth_digests = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8090);
        assert_eq!(config.max_queued_frames, 8);
        assert_eq!(config.max_clients, 16);
        assert_eq!(config.realm, "mjpeg server");
        assert_eq!(config.auth_scheme, AuthScheme::Digest);
        assert!(config.tcp_nodelay);
        assert!(!config.log_auth_digests);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:8091".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 8091);
    }

    #[test]
    fn test_builder_port_keeps_ip() {
        let addr: SocketAddr = "127.0.0.1:8090".parse().unwrap();
        let config = ServerConfig::with_addr(addr).port(0);

        assert_eq!(config.bind_addr, "127.0.0.1:0".parse().unwrap());
    }

    #[test]
    fn test_builder_max_queued_frames_clamped() {
        let config = ServerConfig::default().max_queued_frames(0);

        assert_eq!(config.max_queued_frames, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_clients(4)
            .max_queued_frames(2)
            .realm("garage")
            .auth_scheme(AuthScheme::Basic)
            .handshake_timeout(Duration::from_secs(3))
            .write_timeout(Duration::from_secs(1))
            .log_auth_digests(true);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_clients, 4);
        assert_eq!(config.max_queued_frames, 2);
        assert_eq!(config.realm, "garage");
        assert_eq!(config.auth_scheme, AuthScheme::Basic);
        assert_eq!(config.handshake_timeout, Duration::from_secs(3));
        assert_eq!(config.write_timeout, Duration::from_secs(1));
        assert!(config.log_auth_digests);
    }
}
