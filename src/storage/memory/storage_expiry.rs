use super::{EntryId, MemoryStorage};
use crate::storage::{StorageExpiry, Ttl};

impl MemoryStorage {
    fn set_entry_ttl(&mut self, id: EntryId, ttl_ms: i64, now_ms: u64) {
        let slot = self.entries[id].heap_slot;
        let entries = &mut self.entries;
        if ttl_ms < 0 {
            if let Some(slot) = slot {
                self.expiry
                    .remove(slot, |owner, slot| entries[owner].heap_slot = Some(slot));
                entries[id].heap_slot = None;
            }
            return;
        }

        let deadline = now_ms.saturating_add(ttl_ms as u64);
        match slot {
            Some(slot) => self
                .expiry
                .update(slot, deadline, |owner, slot| entries[owner].heap_slot = Some(slot)),
            None => self
                .expiry
                .push(deadline, id, |owner, slot| entries[owner].heap_slot = Some(slot)),
        }
    }
}

impl StorageExpiry for MemoryStorage {
    fn expire(&mut self, key: &[u8], ttl_ms: i64, now_ms: u64) -> bool {
        log::debug!(
            "Setting TTL of key '{}' to {} ms",
            String::from_utf8_lossy(key),
            ttl_ms
        );
        match self.find(key) {
            Some(id) => {
                self.set_entry_ttl(id, ttl_ms, now_ms);
                true
            }
            None => false,
        }
    }

    fn ttl(&mut self, key: &[u8], now_ms: u64) -> Ttl {
        let Some(id) = self.find(key) else {
            return Ttl::Missing;
        };
        match self.entries[id]
            .heap_slot
            .and_then(|slot| self.expiry.get(slot))
        {
            Some(item) => Ttl::Remaining(item.deadline.saturating_sub(now_ms)),
            None => Ttl::Persistent,
        }
    }

    fn next_deadline(&self) -> Option<u64> {
        self.expiry.peek().map(|item| item.deadline)
    }

    fn expire_due(&mut self, now_ms: u64, max_work: usize) -> usize {
        let mut expired = 0;
        while expired < max_work {
            let Some(top) = self.expiry.peek().copied() else {
                break;
            };
            if top.deadline > now_ms {
                break;
            }
            match self.remove_entry(top.owner) {
                Some(entry) => {
                    log::debug!("Key '{}' has expired", String::from_utf8_lossy(&entry.key));
                }
                None => {
                    log::warn!("TTL heap referenced missing entry {}", top.owner);
                    let entries = &mut self.entries;
                    self.expiry.remove(0, |owner, slot| {
                        if let Some(entry) = entries.get_mut(owner) {
                            entry.heap_slot = Some(slot);
                        }
                    });
                }
            }
            expired += 1;
        }
        expired
    }
}
