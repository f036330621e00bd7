pub mod executor;
pub mod parser;

pub use executor::{CommandExecutor, KvCommandExecutor};
pub use parser::CommandParser;

use thiserror::Error;

use crate::protocol::{ErrorCode, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Keys,
    Get(Vec<u8>),
    Set(Vec<u8>, Vec<u8>),
    Del(Vec<u8>),
    PExpire(Vec<u8>, i64),
    PTtl(Vec<u8>),
    ZAdd {
        key: Vec<u8>,
        score: f64,
        member: Vec<u8>,
    },
    ZRem {
        key: Vec<u8>,
        member: Vec<u8>,
    },
    ZScore {
        key: Vec<u8>,
        member: Vec<u8>,
    },
    ZQuery {
        key: Vec<u8>,
        score: f64,
        member: Vec<u8>,
        offset: i64,
        limit: i64,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("wrong number of arguments for '{command}', expected {expected}")]
    Arity {
        command: &'static str,
        expected: usize,
    },
    #[error("{0}")]
    InvalidArgument(String),
}

impl CommandError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CommandError::Empty | CommandError::Unknown(_) => ErrorCode::Unknown,
            CommandError::Arity { .. } | CommandError::InvalidArgument(_) => ErrorCode::Arg,
        }
    }

    /// The error value sent back to the client.
    pub fn to_value(&self) -> Value {
        match self {
            CommandError::Empty | CommandError::Unknown(_) => {
                Value::error(self.code(), "unknown command.")
            }
            _ => Value::error(self.code(), self.to_string()),
        }
    }
}
