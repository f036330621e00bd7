use super::MemoryStorage;
use crate::storage::{Entry, EntryData, Storage, StorageError, StorageResult};

impl Storage for MemoryStorage {
    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        log::debug!("Getting value for key '{}'", String::from_utf8_lossy(key));
        let Some(id) = self.find(key) else {
            return Ok(None);
        };
        match self.entries[id].data.as_string() {
            Some(value) => Ok(Some(value.clone())),
            None => Err(StorageError::WrongType),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        log::debug!("Setting key '{}'", String::from_utf8_lossy(key));
        match self.find(key) {
            Some(id) => match &mut self.entries[id].data {
                EntryData::Str(current) => {
                    current.clear();
                    current.extend_from_slice(value);
                    Ok(())
                }
                EntryData::ZSet(_) => Err(StorageError::WrongType),
            },
            None => {
                self.insert_entry(Entry::new_string(key, value));
                Ok(())
            }
        }
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        log::debug!("Deleting key '{}'", String::from_utf8_lossy(key));
        match self.find(key) {
            Some(id) => self.remove_entry(id).is_some(),
            None => false,
        }
    }

    fn keys(&self) -> Vec<Vec<u8>> {
        let mut keys = Vec::with_capacity(self.len());
        let entries = &self.entries;
        self.keys.scan(|&id| keys.push(entries[id].key.clone()));
        keys
    }
}
