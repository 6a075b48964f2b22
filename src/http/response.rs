//! Response serialization

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::media::BOUNDARY;

/// Status codes the server emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Unauthorized,
    ServiceUnavailable,
}

impl StatusCode {
    /// Numeric status code
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    /// Reason phrase
    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// An HTTP/1.0 response head
///
/// Every response carries `Connection: close`; headers follow in the order
/// they were added.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(&'static str, String)>,
}

impl Response {
    /// Create a response with only the mandatory `Connection: close` header
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// The `200` head that opens an MJPEG stream
    pub fn stream() -> Self {
        Self::new(StatusCode::Ok)
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header(
                "Content-Type",
                format!("multipart/x-mixed-replace; boundary={}", BOUNDARY),
            )
    }

    /// An empty-bodied error response
    pub fn error(status: StatusCode) -> Self {
        Self::new(status).header("Content-Length", "0")
    }

    /// A `401` carrying an authentication challenge
    pub fn unauthorized(challenge: Option<String>) -> Self {
        let response = Self::error(StatusCode::Unauthorized);
        match challenge {
            Some(challenge) => response.header("WWW-Authenticate", challenge),
            None => response,
        }
    }

    /// Append a header
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Response status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Serialize the response head
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(128);

        buf.put_slice(b"HTTP/1.0 ");
        buf.put_slice(self.status.to_string().as_bytes());
        buf.put_slice(b"\r\nConnection: close\r\n");
        for (name, value) in &self.headers {
            buf.put_slice(name.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");

        buf.freeze()
    }

    /// Write the response head to `writer`
    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.encode()).await?;
        writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_response() {
        let encoded = Response::stream().encode();

        assert_eq!(
            &encoded[..],
            b"HTTP/1.0 200 OK\r\n\
              Connection: close\r\n\
              Cache-Control: no-cache\r\n\
              Pragma: no-cache\r\n\
              Content-Type: multipart/x-mixed-replace; boundary=mjpegstream\r\n\
              \r\n"
        );
    }

    #[test]
    fn test_error_response() {
        let encoded = Response::error(StatusCode::BadRequest).encode();

        assert_eq!(
            &encoded[..],
            b"HTTP/1.0 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn test_unauthorized_with_challenge() {
        let response = Response::unauthorized(Some("Basic realm=\"cam\"".into()));
        let text = String::from_utf8(response.encode().to_vec()).unwrap();

        assert_eq!(response.status(), StatusCode::Unauthorized);
        assert!(text.starts_with("HTTP/1.0 401 Unauthorized\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.contains("WWW-Authenticate: Basic realm=\"cam\"\r\n"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusCode::Ok.code(), 200);
        assert_eq!(StatusCode::Unauthorized.code(), 401);
        assert_eq!(StatusCode::ServiceUnavailable.to_string(), "503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_write_to() {
        let mut writer = tokio_test::io::Builder::new()
            .write(b"HTTP/1.0 503 Service Unavailable\r\nConnection: close\r\nContent-Length: 0\r\n\r\n")
            .build();

        Response::error(StatusCode::ServiceUnavailable)
            .write_to(&mut writer)
            .await
            .unwrap();
    }
}
