use super::zset::SortedSet;

#[derive(Debug)]
pub enum EntryData {
    Str(Vec<u8>),
    ZSet(SortedSet),
}

impl EntryData {
    pub fn as_string(&self) -> Option<&Vec<u8>> {
        if let EntryData::Str(ref s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_zset_mut(&mut self) -> Option<&mut SortedSet> {
        if let EntryData::ZSet(ref mut z) = self {
            Some(z)
        } else {
            None
        }
    }
}

/// A stored key. `heap_slot` is the entry's current position in the TTL
/// heap and is kept up to date by the heap itself.
#[derive(Debug)]
pub struct Entry {
    pub key: Vec<u8>,
    pub data: EntryData,
    pub heap_slot: Option<usize>,
}

impl Entry {
    pub fn new_string(key: &[u8], value: &[u8]) -> Self {
        Entry {
            key: key.to_vec(),
            data: EntryData::Str(value.to_vec()),
            heap_slot: None,
        }
    }

    pub fn new_zset(key: &[u8]) -> Self {
        Entry {
            key: key.to_vec(),
            data: EntryData::ZSet(SortedSet::new()),
            heap_slot: None,
        }
    }
}
