//! Frame handling for MJPEG streaming
//!
//! This module provides:
//! - Multipart part framing for `multipart/x-mixed-replace` bodies
//! - The bounded frame queue between the producer and the broadcaster

pub mod part;
pub mod queue;

pub use part::{part_header, BOUNDARY};
pub use queue::{FrameQueue, PutOutcome};
