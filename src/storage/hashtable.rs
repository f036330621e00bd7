use std::mem;

/// Average chain length that triggers a resize.
pub const MAX_LOAD_FACTOR: usize = 8;

/// Buckets migrated from the draining generation per operation.
pub const REHASH_WORK: usize = 128;

const INITIAL_BUCKETS: usize = 4;

/// FNV-style string hash used for every key in the store.
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u32 = 0x811C_9DC5;
    for &byte in data {
        h = h.wrapping_add(byte as u32).wrapping_mul(0x0100_0193);
    }
    h as u64
}

#[derive(Debug)]
struct HNode<T> {
    next: Option<Box<HNode<T>>>,
    hcode: u64,
    value: T,
}

#[derive(Debug)]
struct Generation<T> {
    slots: Vec<Option<Box<HNode<T>>>>,
    mask: usize,
    size: usize,
}

impl<T> Generation<T> {
    fn empty() -> Self {
        Self {
            slots: Vec::new(),
            mask: 0,
            size: 0,
        }
    }

    fn with_buckets(buckets: usize) -> Self {
        debug_assert!(buckets.is_power_of_two());
        let mut slots = Vec::with_capacity(buckets);
        slots.resize_with(buckets, || None);
        Self {
            slots,
            mask: buckets - 1,
            size: 0,
        }
    }

    fn is_allocated(&self) -> bool {
        !self.slots.is_empty()
    }

    fn push(&mut self, mut node: Box<HNode<T>>) {
        let idx = (node.hcode as usize) & self.mask;
        node.next = self.slots[idx].take();
        self.slots[idx] = Some(node);
        self.size += 1;
    }

    fn find<F>(&self, hcode: u64, eq: &F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        if !self.is_allocated() {
            return None;
        }
        let mut cur = self.slots[(hcode as usize) & self.mask].as_deref();
        while let Some(node) = cur {
            if node.hcode == hcode && eq(&node.value) {
                return Some(&node.value);
            }
            cur = node.next.as_deref();
        }
        None
    }

    fn find_mut<F>(&mut self, hcode: u64, eq: &F) -> Option<&mut T>
    where
        F: Fn(&T) -> bool,
    {
        if !self.is_allocated() {
            return None;
        }
        let mut cur = self.slots[(hcode as usize) & self.mask].as_deref_mut();
        while let Some(node) = cur {
            if node.hcode == hcode && eq(&node.value) {
                return Some(&mut node.value);
            }
            cur = node.next.as_deref_mut();
        }
        None
    }

    fn detach<F>(&mut self, hcode: u64, eq: &F) -> Option<Box<HNode<T>>>
    where
        F: Fn(&T) -> bool,
    {
        if !self.is_allocated() {
            return None;
        }
        let mut cur = &mut self.slots[(hcode as usize) & self.mask];
        loop {
            let hit = match cur.as_deref() {
                None => return None,
                Some(node) => node.hcode == hcode && eq(&node.value),
            };
            if hit {
                break;
            }
            cur = &mut cur.as_mut()?.next;
        }
        let mut node = cur.take()?;
        *cur = node.next.take();
        self.size -= 1;
        Some(node)
    }

    fn for_each<F>(&self, f: &mut F)
    where
        F: FnMut(&T),
    {
        for slot in &self.slots {
            let mut cur = slot.as_deref();
            while let Some(node) = cur {
                f(&node.value);
                cur = node.next.as_deref();
            }
        }
    }
}

/// Chained hash table with incremental rehashing.
///
/// Once `newer` reaches [`MAX_LOAD_FACTOR`] it becomes `older` and a table
/// twice the size takes its place. Every `insert`, `lookup` and `remove`
/// then migrates up to [`REHASH_WORK`] buckets from `older` into `newer`.
///
/// Callers pass a cached hash code and an equality closure instead of a key.
#[derive(Debug)]
pub struct HashTable<T> {
    newer: Generation<T>,
    older: Generation<T>,
    migrate_pos: usize,
}

impl<T> HashTable<T> {
    pub fn new() -> Self {
        Self {
            newer: Generation::empty(),
            older: Generation::empty(),
            migrate_pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.newer.size + self.older.size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a draining generation is still being migrated.
    pub fn is_rehashing(&self) -> bool {
        self.older.is_allocated()
    }

    /// Bucket count of the live generation.
    pub fn capacity(&self) -> usize {
        self.newer.slots.len()
    }

    /// Inserts a value under `hcode`. Duplicates are not checked; callers
    /// look the key up first.
    pub fn insert(&mut self, hcode: u64, value: T) {
        self.help_rehash();
        if !self.newer.is_allocated() {
            self.newer = Generation::with_buckets(INITIAL_BUCKETS);
        }
        self.newer.push(Box::new(HNode {
            next: None,
            hcode,
            value,
        }));
        if !self.older.is_allocated() && self.newer.size >= self.newer.slots.len() * MAX_LOAD_FACTOR
        {
            self.start_rehash();
        }
    }

    pub fn lookup<F>(&mut self, hcode: u64, eq: F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        self.help_rehash();
        self.newer
            .find(hcode, &eq)
            .or_else(|| self.older.find(hcode, &eq))
    }

    pub fn lookup_mut<F>(&mut self, hcode: u64, eq: F) -> Option<&mut T>
    where
        F: Fn(&T) -> bool,
    {
        self.help_rehash();
        match self.newer.find_mut(hcode, &eq) {
            Some(value) => Some(value),
            None => self.older.find_mut(hcode, &eq),
        }
    }

    pub fn remove<F>(&mut self, hcode: u64, eq: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.help_rehash();
        self.newer
            .detach(hcode, &eq)
            .or_else(|| self.older.detach(hcode, &eq))
            .map(|node| node.value)
    }

    /// Visits every value in both generations, in no particular order.
    pub fn scan<F>(&self, mut visit: F)
    where
        F: FnMut(&T),
    {
        self.newer.for_each(&mut visit);
        self.older.for_each(&mut visit);
    }

    /// Moves every value out of the table, leaving it empty.
    pub fn dispose<F>(&mut self, mut visit: F)
    where
        F: FnMut(T),
    {
        let generations = [
            mem::replace(&mut self.newer, Generation::empty()),
            mem::replace(&mut self.older, Generation::empty()),
        ];
        self.migrate_pos = 0;
        for generation in generations {
            for slot in generation.slots {
                let mut chain = slot;
                while let Some(mut node) = chain {
                    chain = node.next.take();
                    visit(node.value);
                }
            }
        }
    }

    fn start_rehash(&mut self) {
        let buckets = self.newer.slots.len() * 2;
        self.older = mem::replace(&mut self.newer, Generation::with_buckets(buckets));
        self.migrate_pos = 0;
    }

    fn help_rehash(&mut self) {
        let mut work = 0;
        while work < REHASH_WORK
            && self.older.size > 0
            && self.migrate_pos < self.older.slots.len()
        {
            let mut chain = self.older.slots[self.migrate_pos].take();
            while let Some(mut node) = chain {
                chain = node.next.take();
                self.older.size -= 1;
                self.newer.push(node);
            }
            self.migrate_pos += 1;
            work += 1;
        }
        if self.older.is_allocated() && self.older.size == 0 {
            self.older = Generation::empty();
            self.migrate_pos = 0;
        }
    }
}

impl<T> Default for HashTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
