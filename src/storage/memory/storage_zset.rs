use super::MemoryStorage;
use crate::storage::{Entry, SortedSet, StorageError, StorageResult, StorageZSet};

impl MemoryStorage {
    /// The sorted set stored under `key`, or `None` if the key is missing.
    fn zset_mut(&mut self, key: &[u8]) -> StorageResult<Option<&mut SortedSet>> {
        let Some(id) = self.find(key) else {
            return Ok(None);
        };
        match self.entries[id].data.as_zset_mut() {
            Some(zset) => Ok(Some(zset)),
            None => Err(StorageError::WrongType),
        }
    }
}

impl StorageZSet for MemoryStorage {
    fn zadd(&mut self, key: &[u8], score: f64, member: &[u8]) -> StorageResult<bool> {
        log::debug!(
            "Adding member '{}' with score {} to sorted set '{}'",
            String::from_utf8_lossy(member),
            score,
            String::from_utf8_lossy(key)
        );
        let id = match self.find(key) {
            Some(id) => id,
            None => self.insert_entry(Entry::new_zset(key)),
        };
        let zset = self.entries[id]
            .data
            .as_zset_mut()
            .ok_or(StorageError::WrongType)?;
        Ok(zset.add(member, score))
    }

    fn zrem(&mut self, key: &[u8], member: &[u8]) -> StorageResult<bool> {
        log::debug!(
            "Removing member '{}' from sorted set '{}'",
            String::from_utf8_lossy(member),
            String::from_utf8_lossy(key)
        );
        Ok(self
            .zset_mut(key)?
            .is_some_and(|zset| zset.remove(member)))
    }

    fn zscore(&mut self, key: &[u8], member: &[u8]) -> StorageResult<Option<f64>> {
        Ok(self.zset_mut(key)?.and_then(|zset| zset.find(member)))
    }

    fn zquery(
        &mut self,
        key: &[u8],
        score: f64,
        member: &[u8],
        offset: i64,
        limit: usize,
    ) -> StorageResult<Vec<(Vec<u8>, f64)>> {
        log::debug!(
            "Querying sorted set '{}' from ({}, '{}') offset {} limit {}",
            String::from_utf8_lossy(key),
            score,
            String::from_utf8_lossy(member),
            offset,
            limit
        );
        let Some(zset) = self.zset_mut(key)? else {
            return Ok(Vec::new());
        };
        Ok(zset
            .query(score, member, offset, limit)
            .map(|node| (node.name.clone(), node.score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    #[test]
    fn zadd_creates_the_set_on_first_use() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.zadd(b"zs", 1.0, b"a"), Ok(true));
        assert_eq!(storage.zadd(b"zs", 2.0, b"b"), Ok(true));
        assert_eq!(storage.zadd(b"zs", 3.0, b"a"), Ok(false));
        assert_eq!(storage.zscore(b"zs", b"a"), Ok(Some(3.0)));
        assert_eq!(
            storage.zquery(b"zs", 0.0, b"", 0, 10),
            Ok(vec![(b"b".to_vec(), 2.0), (b"a".to_vec(), 3.0)])
        );
    }

    #[test]
    fn missing_key_acts_as_empty_set() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.zrem(b"nope", b"a"), Ok(false));
        assert_eq!(storage.zscore(b"nope", b"a"), Ok(None));
        assert_eq!(storage.zquery(b"nope", 0.0, b"", 0, 10), Ok(vec![]));
        assert!(storage.is_empty());
    }

    #[test]
    fn zset_ops_reject_strings() {
        let mut storage = MemoryStorage::new();
        storage.set(b"s", b"v").unwrap();
        assert_eq!(storage.zadd(b"s", 1.0, b"a"), Err(StorageError::WrongType));
        assert_eq!(storage.zrem(b"s", b"a"), Err(StorageError::WrongType));
        assert_eq!(storage.zscore(b"s", b"a"), Err(StorageError::WrongType));
        assert_eq!(
            storage.zquery(b"s", 0.0, b"", 0, 1),
            Err(StorageError::WrongType)
        );
    }

    #[test]
    fn zrem_removes_member() {
        let mut storage = MemoryStorage::new();
        storage.zadd(b"zs", 1.0, b"a").unwrap();
        assert_eq!(storage.zrem(b"zs", b"a"), Ok(true));
        assert_eq!(storage.zrem(b"zs", b"a"), Ok(false));
        assert_eq!(storage.zscore(b"zs", b"a"), Ok(None));
    }
}
