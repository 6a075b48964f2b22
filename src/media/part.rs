//! Multipart part framing
//!
//! Each JPEG is sent as one part of the `multipart/x-mixed-replace` body:
//!
//! ```text
//! --mjpegstream\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <N>\r\n
//! \r\n
//! <N bytes of JPEG>
//! ```
//!
//! Viewers key on the literal boundary token, so it must not change.

use bytes::{BufMut, Bytes, BytesMut};

/// Boundary token announced in the `Content-Type` of the stream response
pub const BOUNDARY: &str = "mjpegstream";

/// Build the part header preceding a frame of `len` bytes
pub fn part_header(len: usize) -> Bytes {
    let len = len.to_string();
    let mut buf = BytesMut::with_capacity(64 + len.len());

    buf.put_slice(b"--");
    buf.put_slice(BOUNDARY.as_bytes());
    buf.put_slice(b"\r\nContent-Type: image/jpeg\r\nContent-Length: ");
    buf.put_slice(len.as_bytes());
    buf.put_slice(b"\r\n\r\n");

    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_header() {
        assert_eq!(
            &part_header(10)[..],
            b"--mjpegstream\r\nContent-Type: image/jpeg\r\nContent-Length: 10\r\n\r\n"
        );
    }

    #[test]
    fn test_part_header_large_frame() {
        let header = part_header(1_048_576);
        let text = std::str::from_utf8(&header).unwrap();

        assert!(text.contains("Content-Length: 1048576\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }
}
