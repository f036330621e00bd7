use std::fmt;

use bytes::{Buf, BufMut};

use super::ProtocolError;

const TAG_NIL: u8 = 0;
const TAG_ERR: u8 = 1;
const TAG_STR: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_DOUBLE: u8 = 4;
const TAG_ARRAY: u8 = 5;

/// Error codes carried by [`Value::Err`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Unknown = 1,
    TooBig = 2,
    Type = 3,
    Arg = 4,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// A serialized response value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Err { code: u32, message: String },
    Str(Vec<u8>),
    Int(i64),
    Double(f64),
    Array(Vec<Value>),
}

impl Value {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Value::Err {
            code: code.code(),
            message: message.into(),
        }
    }

    pub fn str(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Str(bytes.into())
    }

    pub fn encode<B: BufMut>(&self, out: &mut B) {
        match self {
            Value::Nil => out.put_u8(TAG_NIL),
            Value::Err { code, message } => {
                out.put_u8(TAG_ERR);
                out.put_u32_le(*code);
                out.put_u32_le(message.len() as u32);
                out.put_slice(message.as_bytes());
            }
            Value::Str(bytes) => {
                out.put_u8(TAG_STR);
                out.put_u32_le(bytes.len() as u32);
                out.put_slice(bytes);
            }
            Value::Int(n) => {
                out.put_u8(TAG_INT);
                out.put_i64_le(*n);
            }
            Value::Double(d) => {
                out.put_u8(TAG_DOUBLE);
                out.put_f64_le(*d);
            }
            Value::Array(items) => {
                out.put_u8(TAG_ARRAY);
                out.put_u32_le(items.len() as u32);
                for item in items {
                    item.encode(out);
                }
            }
        }
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Value, ProtocolError> {
        need(buf, 1)?;
        match buf.get_u8() {
            TAG_NIL => Ok(Value::Nil),
            TAG_ERR => {
                need(buf, 8)?;
                let code = buf.get_u32_le();
                let len = buf.get_u32_le() as usize;
                let message = take_bytes(buf, len)?;
                Ok(Value::Err {
                    code,
                    message: String::from_utf8_lossy(&message).into_owned(),
                })
            }
            TAG_STR => {
                need(buf, 4)?;
                let len = buf.get_u32_le() as usize;
                Ok(Value::Str(take_bytes(buf, len)?))
            }
            TAG_INT => {
                need(buf, 8)?;
                Ok(Value::Int(buf.get_i64_le()))
            }
            TAG_DOUBLE => {
                need(buf, 8)?;
                Ok(Value::Double(buf.get_f64_le()))
            }
            TAG_ARRAY => {
                need(buf, 4)?;
                let count = buf.get_u32_le() as usize;
                // Every element takes at least one byte.
                need(buf, count)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(Value::decode(buf)?);
                }
                Ok(Value::Array(items))
            }
            tag => Err(ProtocolError::UnknownTag(tag)),
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            Value::Nil => writeln!(f, "{}(nil)", indent),
            Value::Err { code, message } => writeln!(f, "{}(err {}) {}", indent, code, message),
            Value::Str(bytes) => writeln!(f, "{}(str) {}", indent, String::from_utf8_lossy(bytes)),
            Value::Int(n) => writeln!(f, "{}(int) {}", indent, n),
            Value::Double(d) => writeln!(f, "{}(dbl) {}", indent, d),
            Value::Array(items) => {
                writeln!(f, "{}(arr) len={}", indent, items.len())?;
                for item in items {
                    item.render(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

fn need<B: Buf>(buf: &B, n: usize) -> Result<(), ProtocolError> {
    if buf.remaining() < n {
        return Err(ProtocolError::Truncated);
    }
    Ok(())
}

fn take_bytes<B: Buf>(buf: &mut B, len: usize) -> Result<Vec<u8>, ProtocolError> {
    need(buf, len)?;
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    Ok(bytes)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}
