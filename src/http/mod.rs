//! Minimal HTTP/1.0 handling for the MJPEG handshake
//!
//! Each viewer connection carries exactly one request (headers only, no body)
//! and one response. After a `200` the socket is handed to the broadcaster and
//! never read again.

pub mod request;
pub mod response;

pub use request::{read_request, Request};
pub use response::{Response, StatusCode};

/// Error produced while reading or parsing a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Request line is missing the method or the URL
    MalformedRequestLine(String),
    /// Request bytes are not valid UTF-8
    InvalidEncoding,
    /// Header block did not fit in the read buffer
    RequestTooLarge(usize),
    /// Peer closed the connection before sending a request
    EmptyRequest,
    /// Socket error while reading the request
    Disconnected(std::io::ErrorKind),
    /// Peer did not finish the request within the handshake timeout
    Timeout,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::MalformedRequestLine(line) => write!(f, "Malformed request line: {:?}", line),
            HttpError::InvalidEncoding => write!(f, "Request is not valid UTF-8"),
            HttpError::RequestTooLarge(limit) => {
                write!(f, "Request headers exceed {} bytes", limit)
            }
            HttpError::EmptyRequest => write!(f, "Connection closed before request"),
            HttpError::Disconnected(kind) => write!(f, "Connection lost while reading request: {}", kind),
            HttpError::Timeout => write!(f, "Timed out waiting for request"),
        }
    }
}

impl std::error::Error for HttpError {}
