use std::time::{Duration, Instant};

use super::Command;
use crate::protocol::{ErrorCode, Value};
use crate::storage::{
    MemoryStorage, Storage, StorageError, StorageExpiry, StorageZSet, Ttl,
};

pub trait CommandExecutor {
    fn execute(&mut self, command: Command) -> Value;
}

/// Runs commands against the keyspace. TTL deadlines are kept as
/// milliseconds since the executor was created.
pub struct KvCommandExecutor {
    storage: MemoryStorage,
    started: Instant,
}

impl KvCommandExecutor {
    pub fn new() -> Self {
        Self {
            storage: MemoryStorage::new(),
            started: Instant::now(),
        }
    }

    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    fn now_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started).as_millis() as u64
    }

    /// When the earliest TTL falls due, if any key has one.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.storage
            .next_deadline()
            .map(|deadline| self.started + Duration::from_millis(deadline))
    }

    /// Drops the whole keyspace.
    pub fn flush(&mut self) {
        let dropped = self.storage.clear();
        log::info!("Dropped {} keys", dropped);
    }

    /// Deletes at most `max_work` keys whose TTL has passed at `now`.
    pub fn expire_keys(&mut self, now: Instant, max_work: usize) -> usize {
        let now_ms = self.now_ms(now);
        let expired = self.storage.expire_due(now_ms, max_work);
        if expired > 0 {
            log::debug!("Expired {} keys", expired);
        }
        expired
    }
}

fn type_error() -> Value {
    Value::error(ErrorCode::Type, "expect zset")
}

fn string_type_error() -> Value {
    Value::error(ErrorCode::Type, "expect string type")
}

impl CommandExecutor for KvCommandExecutor {
    fn execute(&mut self, command: Command) -> Value {
        log::debug!("Executing command: {:?}", command);

        match command {
            Command::Keys => Value::Array(self.storage.keys().into_iter().map(Value::Str).collect()),
            Command::Get(key) => match self.storage.get(&key) {
                Ok(Some(value)) => Value::Str(value),
                Ok(None) => Value::Nil,
                Err(StorageError::WrongType) => string_type_error(),
            },
            Command::Set(key, value) => match self.storage.set(&key, &value) {
                Ok(()) => Value::Nil,
                Err(StorageError::WrongType) => string_type_error(),
            },
            Command::Del(key) => Value::Int(self.storage.delete(&key) as i64),
            Command::PExpire(key, ttl_ms) => {
                let now_ms = self.now_ms(Instant::now());
                Value::Int(self.storage.expire(&key, ttl_ms, now_ms) as i64)
            }
            Command::PTtl(key) => {
                let now_ms = self.now_ms(Instant::now());
                match self.storage.ttl(&key, now_ms) {
                    Ttl::Missing => Value::Int(-2),
                    Ttl::Persistent => Value::Int(-1),
                    Ttl::Remaining(ms) => Value::Int(ms as i64),
                }
            }
            Command::ZAdd { key, score, member } => match self.storage.zadd(&key, score, &member) {
                Ok(added) => Value::Int(added as i64),
                Err(StorageError::WrongType) => type_error(),
            },
            Command::ZRem { key, member } => match self.storage.zrem(&key, &member) {
                Ok(removed) => Value::Int(removed as i64),
                Err(StorageError::WrongType) => type_error(),
            },
            Command::ZScore { key, member } => match self.storage.zscore(&key, &member) {
                Ok(Some(score)) => Value::Double(score),
                Ok(None) => Value::Nil,
                Err(StorageError::WrongType) => type_error(),
            },
            Command::ZQuery {
                key,
                score,
                member,
                offset,
                limit,
            } => {
                // Non-positive limits give an empty array.
                let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
                match self.storage.zquery(&key, score, &member, offset, limit) {
                    Ok(pairs) => Value::Array(
                        pairs
                            .into_iter()
                            .flat_map(|(name, score)| [Value::Str(name), Value::Double(score)])
                            .collect(),
                    ),
                    Err(StorageError::WrongType) => type_error(),
                }
            }
        }
    }
}

impl Default for KvCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}
