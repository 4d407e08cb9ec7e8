//! Owned frames and their multipart encoding.

use bytes::{BufMut, Bytes, BytesMut};

use crate::playback::Cursor;

/// Multipart boundary token used on the video stream.
pub const BOUNDARY: &str = "frame";

/// `Content-Type` of the video stream response.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// `Content-Type` of every part.
pub const FRAME_CONTENT_TYPE: &str = "image/jpeg";

/// One encoded image, copied out of the engine. Cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Strictly increasing per pump.
    pub seq: u64,
    /// Cursor read in the tick that produced the frame.
    pub cursor: Cursor,
    pub data: Bytes,
}

impl Frame {
    pub fn new(seq: u64, cursor: Cursor, data: Bytes) -> Self {
        Self { seq, cursor, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encode as one `multipart/x-mixed-replace` part:
    ///
    /// ```text
    /// --frame\r\n
    /// Content-Type: image/jpeg\r\n
    /// Content-Length: <N>\r\n\r\n
    /// <N bytes>\r\n
    /// ```
    pub fn to_multipart_chunk(&self) -> Bytes {
        let header = format!(
            "--{BOUNDARY}\r\nContent-Type: {FRAME_CONTENT_TYPE}\r\nContent-Length: {}\r\n\r\n",
            self.data.len()
        );
        let mut chunk = BytesMut::with_capacity(header.len() + self.data.len() + 2);
        chunk.put_slice(header.as_bytes());
        chunk.put_slice(&self.data);
        chunk.put_slice(b"\r\n");
        chunk.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_layout() {
        let frame = Frame::new(7, Cursor::ORIGIN, Bytes::from_static(b"\xFF\xD8jpeg\xFF\xD9"));
        let chunk = frame.to_multipart_chunk();

        let expected: &[u8] =
            b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 8\r\n\r\n\xFF\xD8jpeg\xFF\xD9\r\n";
        assert_eq!(&chunk[..], expected);
    }

    #[test]
    fn content_length_matches_body() {
        let data = Bytes::from(vec![0xAB; 4096]);
        let chunk = Frame::new(1, Cursor::ORIGIN, data).to_multipart_chunk();

        let text = String::from_utf8_lossy(&chunk[..80]);
        assert!(text.contains("Content-Length: 4096\r\n\r\n"));

        let header_end = chunk.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        assert_eq!(chunk.len() - header_end - 2, 4096);
        assert!(chunk.ends_with(b"\r\n"));
    }

    #[test]
    fn clones_share_payload() {
        let frame = Frame::new(1, Cursor::new(1.0, 2.0), Bytes::from(vec![1, 2, 3]));
        let copy = frame.clone();
        assert_eq!(frame.data.as_ptr(), copy.data.as_ptr());
        assert_eq!(copy.len(), 3);
    }
}
