pub mod client;
pub mod commands;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::{Command, CommandExecutor, CommandParser};
pub use protocol::{Codec, Value};
pub use server::{KvServer, ServerConfig};
