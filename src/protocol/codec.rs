use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{ErrorCode, ProtocolError, Value, HEADER_LEN};

/// Frames requests and responses. The read side consumes complete frames
/// from the front of a `BytesMut` and leaves partial ones in place.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    max_message_size: usize,
    max_args: usize,
}

impl Codec {
    pub fn new(max_message_size: usize, max_args: usize) -> Self {
        Self {
            max_message_size,
            max_args,
        }
    }

    /// Removes one complete frame from `buf`, or returns `None` if more
    /// bytes are needed.
    fn split_frame(&self, buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let len = (&buf[..HEADER_LEN]).get_u32_le() as usize;
        if len > self.max_message_size {
            return Err(ProtocolError::TooLong {
                len,
                max: self.max_message_size,
            });
        }
        if buf.len() < HEADER_LEN + len {
            return Ok(None);
        }
        buf.advance(HEADER_LEN);
        Ok(Some(buf.split_to(len).freeze()))
    }

    /// Decodes the next request into its argument list.
    pub fn decode_request(&self, buf: &mut BytesMut) -> Result<Option<Vec<Vec<u8>>>, ProtocolError> {
        let Some(mut payload) = self.split_frame(buf)? else {
            return Ok(None);
        };
        if payload.remaining() < 4 {
            return Err(ProtocolError::Truncated);
        }
        let count = payload.get_u32_le() as usize;
        if count > self.max_args {
            return Err(ProtocolError::TooManyArgs {
                count,
                max: self.max_args,
            });
        }
        let mut args = Vec::with_capacity(count.min(payload.remaining() / 4));
        for _ in 0..count {
            if payload.remaining() < 4 {
                return Err(ProtocolError::Truncated);
            }
            let len = payload.get_u32_le() as usize;
            if payload.remaining() < len {
                return Err(ProtocolError::Truncated);
            }
            args.push(payload.split_to(len).to_vec());
        }
        if payload.has_remaining() {
            return Err(ProtocolError::TrailingBytes(payload.remaining()));
        }
        Ok(Some(args))
    }

    /// Appends a framed response. A body over the size limit is replaced
    /// with an `ERR_TOO_BIG` error.
    pub fn encode_response(&self, value: &Value, out: &mut BytesMut) {
        let header_at = out.len();
        out.put_u32_le(0);
        value.encode(out);
        let mut len = out.len() - header_at - HEADER_LEN;
        if len > self.max_message_size {
            out.truncate(header_at + HEADER_LEN);
            Value::error(ErrorCode::TooBig, "response is too big.").encode(out);
            len = out.len() - header_at - HEADER_LEN;
        }
        out[header_at..header_at + HEADER_LEN].copy_from_slice(&(len as u32).to_le_bytes());
    }

    /// Appends a framed request built from `args`.
    pub fn encode_request<A: AsRef<[u8]>>(&self, args: &[A], out: &mut BytesMut) {
        let body: usize = 4 + args.iter().map(|a| 4 + a.as_ref().len()).sum::<usize>();
        out.reserve(HEADER_LEN + body);
        out.put_u32_le(body as u32);
        out.put_u32_le(args.len() as u32);
        for arg in args {
            let arg = arg.as_ref();
            out.put_u32_le(arg.len() as u32);
            out.put_slice(arg);
        }
    }

    /// Decodes the next response frame.
    pub fn decode_response(&self, buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        let Some(mut payload) = self.split_frame(buf)? else {
            return Ok(None);
        };
        let value = Value::decode(&mut payload)?;
        if payload.has_remaining() {
            return Err(ProtocolError::TrailingBytes(payload.remaining()));
        }
        Ok(Some(value))
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(32 << 20, 200_000)
    }
}
