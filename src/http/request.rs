//! Request parsing
//!
//! Viewers in the wild (IP camera apps, browsers, `curl`, embedded players)
//! are sloppy, so the parser is lenient: bare `\n` line endings are accepted,
//! header names match case-insensitively, and lines without a colon are
//! skipped rather than rejected.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::HttpError;

const READ_CHUNK: usize = 1024;

/// A parsed request head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request method (e.g. "GET")
    pub method: String,
    /// Request target as sent by the client
    pub url: String,
    /// Protocol token (e.g. "HTTP/1.1"); empty for HTTP/0.9-style requests
    pub protocol: String,
    headers: Vec<(String, String)>,
}

impl Request {
    /// Parse a request head from raw bytes
    ///
    /// Anything after the first empty line is ignored.
    pub fn parse(raw: &[u8]) -> Result<Self, HttpError> {
        let text = std::str::from_utf8(raw).map_err(|_| HttpError::InvalidEncoding)?;
        let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let (method, url) = match (parts.next(), parts.next()) {
            (Some(method), Some(url)) => (method.to_string(), url.to_string()),
            _ => return Err(HttpError::MalformedRequestLine(request_line.to_string())),
        };
        let protocol = parts.next().unwrap_or_default().to_string();

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        Ok(Self {
            method,
            url,
            protocol,
            headers,
        })
    }

    /// Look up a header value by case-insensitive name (first occurrence)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `Authorization` header, if present and non-empty
    pub fn authorization(&self) -> Option<&str> {
        self.header("Authorization").filter(|v| !v.is_empty())
    }

    /// All headers in the order received
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Read a request head from `reader`
///
/// Reads until the blank line that ends the header block, the peer closes,
/// or `max_size` bytes have arrived. The whole read is bounded by `timeout`.
pub async fn read_request<R>(
    reader: &mut R,
    max_size: usize,
    timeout: Duration,
) -> Result<Request, HttpError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK.min(max_size));
    let mut chunk = [0u8; READ_CHUNK];

    let read = async {
        while header_end(&buf).is_none() {
            if buf.len() >= max_size {
                return Err(HttpError::RequestTooLarge(max_size));
            }

            let want = READ_CHUNK.min(max_size - buf.len());
            let n = reader
                .read(&mut chunk[..want])
                .await
                .map_err(|e| HttpError::Disconnected(e.kind()))?;

            if n == 0 {
                // Some clients never send the blank line; parse what arrived
                if buf.is_empty() {
                    return Err(HttpError::EmptyRequest);
                }
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    };

    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| HttpError::Timeout)??;

    let end = header_end(&buf).unwrap_or(buf.len());
    Request::parse(&buf[..end])
}

/// Offset just past the header terminator, accepting `\r\n\r\n` or `\n\n`
fn header_end(buf: &[u8]) -> Option<usize> {
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4);
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| p + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
