//! # mjpeg-rs
//!
//! MJPEG-over-HTTP broadcast server.
//!
//! A producer (typically a camera capture thread) hands JPEG frames to
//! [`MjpegServer::put_frame`]. Every authenticated HTTP viewer receives the
//! frames as one endless `multipart/x-mixed-replace` response, so plain
//! browsers can display the stream in an `<img>` tag.
//!
//! - HTTP Basic and Digest (RFC 2617, MD5, `qop=auth`) authentication
//! - Bounded frame queue that drops the oldest frames when viewers lag
//! - Per-viewer write timeouts; a broken viewer never stalls the others
//! - Viewer limit with `503 Service Unavailable` overflow
//!
//! ## Example
//!
//! ```no_run
//! use mjpeg_rs::{AuthScheme, Credentials, MjpegServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> mjpeg_rs::Result<()> {
//!     let config = ServerConfig::default()
//!         .port(8090)
//!         .auth_scheme(AuthScheme::Basic);
//!     let credentials = Credentials::new().with("viewer", "secret");
//!
//!     let server = MjpegServer::new(config, credentials);
//!     server.start().await?;
//!
//!     let jpeg = std::fs::read("frame.jpg")?;
//!     server.put_frame(jpeg);
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await
//! }
//! ```

pub mod auth;
pub mod error;
pub mod http;
pub mod media;
pub mod registry;
pub mod server;
pub mod stats;

pub use auth::{AuthScheme, Credentials};
pub use error::{Error, Result};
pub use media::PutOutcome;
pub use server::{MjpegServer, ServerConfig, ServerState};
pub use stats::ServerStats;
