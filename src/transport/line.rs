//! Newline-terminated framing.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::FrameError;

/// Splits on `\n`, dropping an optional trailing `\r`.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_len: usize,
    /// Bytes already scanned without finding a terminator.
    next_index: usize,
}

impl LineCodec {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            next_index: 0,
        }
    }
}

fn strip_cr(mut line: BytesMut) -> BytesMut {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line
}

impl Decoder for LineCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
        match src[self.next_index..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                let mut line = src.split_to(end + 1);
                line.truncate(end);
                let line = strip_cr(line);
                if line.len() > self.max_len {
                    return Err(FrameError::TooLong { max: self.max_len });
                }
                Ok(Some(line))
            }
            None => {
                // A pending `\r` may still turn out to be part of the terminator.
                let pending = match src.last() {
                    Some(&b'\r') => src.len() - 1,
                    _ => src.len(),
                };
                if pending > self.max_len {
                    return Err(FrameError::TooLong { max: self.max_len });
                }
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        // A final line without terminator still counts.
        let line = src.split_to(src.len());
        Ok(Some(strip_cr(line)))
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        dst.reserve(item.len() + 1);
        dst.put(item);
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines_only() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from(&b"Lshared/passdb/bob\r\nH2"[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"Lshared/passdb/bob");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\t0\n");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"H2\t0");
        assert!(buf.is_empty());
    }

    #[test]
    fn final_unterminated_line_is_delivered() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from(&b"virtual a@b"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        let frame = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"virtual a@b");
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn rejects_oversized_lines() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from(&b"toolong"[..]);
        assert!(matches!(codec.decode(&mut buf), Err(FrameError::TooLong { max: 4 })));
    }

    #[test]
    fn crlf_line_of_exactly_max_len_is_accepted() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from(&b"get \r"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\nabcd\r\nabcde\r\n");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"get ");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"abcd");
        assert!(matches!(codec.decode(&mut buf), Err(FrameError::TooLong { max: 4 })));
    }

    #[test]
    fn wraps_with_newline() {
        let mut codec = LineCodec::new(64);
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"NOTFOUND "), &mut dst).unwrap();
        assert_eq!(&dst[..], b"NOTFOUND \n");
    }
}
