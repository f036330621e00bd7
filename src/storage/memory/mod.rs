use slab::Slab;

use super::hashtable::{hash_bytes, HashTable};
use super::heap::Heap;
use super::Entry;

mod storage;
mod storage_expiry;
mod storage_zset;

type EntryId = usize;

/// The keyspace. Entries live in a slab; the hash table maps key hashes to
/// slab ids and the heap orders the ids of entries that carry a TTL.
#[derive(Debug)]
pub struct MemoryStorage {
    keys: HashTable<EntryId>,
    entries: Slab<Entry>,
    expiry: Heap<EntryId>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            keys: HashTable::new(),
            entries: Slab::new(),
            expiry: Heap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drops every key and TTL. Returns how many keys were dropped.
    pub fn clear(&mut self) -> usize {
        let entries = &mut self.entries;
        let mut dropped = 0;
        self.keys.dispose(|id| {
            entries.remove(id);
            dropped += 1;
        });
        self.expiry = Heap::new();
        log::debug!("Cleared {} keys", dropped);
        dropped
    }

    fn find(&mut self, key: &[u8]) -> Option<EntryId> {
        let entries = &self.entries;
        self.keys
            .lookup(hash_bytes(key), |&id| {
                entries.get(id).is_some_and(|entry| entry.key == key)
            })
            .copied()
    }

    fn insert_entry(&mut self, entry: Entry) -> EntryId {
        let hcode = hash_bytes(&entry.key);
        let id = self.entries.insert(entry);
        self.keys.insert(hcode, id);
        id
    }

    fn remove_entry(&mut self, id: EntryId) -> Option<Entry> {
        let hcode = hash_bytes(&self.entries.get(id)?.key);
        self.keys.remove(hcode, |&other| other == id)?;
        let entry = self.entries.remove(id);
        if let Some(slot) = entry.heap_slot {
            let entries = &mut self.entries;
            self.expiry
                .remove(slot, |owner, slot| entries[owner].heap_slot = Some(slot));
        }
        Some(entry)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}
