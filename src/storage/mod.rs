pub mod avl;
pub mod entry;
pub mod hashtable;
pub mod heap;
pub mod memory;
pub mod zset;

pub use entry::{Entry, EntryData};
pub use memory::MemoryStorage;
pub use zset::SortedSet;

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("operation against a key holding the wrong kind of value")]
    WrongType,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Missing,
    Persistent,
    Remaining(u64),
}

pub trait Storage {
    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;
    fn set(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()>;
    fn delete(&mut self, key: &[u8]) -> bool;
    fn keys(&self) -> Vec<Vec<u8>>;
}

pub trait StorageZSet {
    fn zadd(&mut self, key: &[u8], score: f64, member: &[u8]) -> StorageResult<bool>;
    fn zrem(&mut self, key: &[u8], member: &[u8]) -> StorageResult<bool>;
    fn zscore(&mut self, key: &[u8], member: &[u8]) -> StorageResult<Option<f64>>;
    fn zquery(
        &mut self,
        key: &[u8],
        score: f64,
        member: &[u8],
        offset: i64,
        limit: usize,
    ) -> StorageResult<Vec<(Vec<u8>, f64)>>;
}

/// Deadlines are monotonic milliseconds supplied by the caller.
pub trait StorageExpiry {
    /// Sets a key's TTL, or clears it when `ttl_ms` is negative. Returns
    /// false when the key does not exist.
    fn expire(&mut self, key: &[u8], ttl_ms: i64, now_ms: u64) -> bool;
    fn ttl(&mut self, key: &[u8], now_ms: u64) -> Ttl;
    fn next_deadline(&self) -> Option<u64>;
    /// Deletes up to `max_work` keys whose deadline is at or before `now_ms`.
    fn expire_due(&mut self, now_ms: u64, max_work: usize) -> usize;
}
