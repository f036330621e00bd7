pub mod codec;
pub mod value;

pub use codec::Codec;
pub use value::{ErrorCode, Value};

use thiserror::Error;

/// Length of the frame header, a little-endian `u32` payload length.
pub const HEADER_LEN: usize = 4;

/// Framing failures. Any of these ends the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("truncated frame")]
    Truncated,
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLong { len: usize, max: usize },
    #[error("request declares {count} arguments, limit is {max}")]
    TooManyArgs { count: usize, max: usize },
    #[error("{0} unparsed bytes after the last argument")]
    TrailingBytes(usize),
    #[error("unknown value tag {0}")]
    UnknownTag(u8),
}
