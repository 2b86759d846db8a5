//! Netstring framing: `<decimal length>:<payload>,`.
//!
//! Postfix speaks this on socketmap connections.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::FrameError;

#[derive(Debug, Clone)]
pub struct NetstringCodec {
    max_len: usize,
    max_digits: usize,
}

impl NetstringCodec {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            max_digits: max_len.to_string().len(),
        }
    }
}

impl Decoder for NetstringCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
        let colon = match src.iter().position(|&b| b == b':') {
            Some(i) => i,
            None => {
                if src.len() > self.max_digits {
                    return Err(FrameError::Malformed("length prefix too long"));
                }
                if !src.iter().all(u8::is_ascii_digit) {
                    return Err(FrameError::Malformed("non-digit in length prefix"));
                }
                return Ok(None);
            }
        };

        let digits = &src[..colon];
        if digits.is_empty() || digits.len() > self.max_digits {
            return Err(FrameError::Malformed("bad length prefix"));
        }
        let mut len = 0usize;
        for &d in digits {
            if !d.is_ascii_digit() {
                return Err(FrameError::Malformed("non-digit in length prefix"));
            }
            len = len * 10 + usize::from(d - b'0');
        }
        if len > self.max_len {
            return Err(FrameError::TooLong { max: self.max_len });
        }

        let total = colon + 1 + len + 1;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }
        if src[total - 1] != b',' {
            return Err(FrameError::Malformed("missing trailing comma"));
        }

        src.advance(colon + 1);
        let payload = src.split_to(len);
        src.advance(1);
        Ok(Some(payload))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::Malformed("truncated netstring")),
        }
    }
}

impl Encoder<Bytes> for NetstringCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        let prefix = format!("{}:", item.len());
        dst.reserve(prefix.len() + item.len() + 1);
        dst.put_slice(prefix.as_bytes());
        dst.put(item);
        dst.put_u8(b',');
        Ok(())
    }
}
