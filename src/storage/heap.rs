#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapItem<R> {
    pub deadline: u64,
    pub owner: R,
}

/// Min-heap of deadlines. Whenever an item lands in a new slot the heap
/// calls `track(owner, slot)` so the owner can find its entry again.
#[derive(Debug)]
pub struct Heap<R> {
    items: Vec<HeapItem<R>>,
}

fn parent(i: usize) -> usize {
    (i + 1) / 2 - 1
}

fn left_child(i: usize) -> usize {
    i * 2 + 1
}

impl<R: Copy> Heap<R> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek(&self) -> Option<&HeapItem<R>> {
        self.items.first()
    }

    pub fn get(&self, slot: usize) -> Option<&HeapItem<R>> {
        self.items.get(slot)
    }

    pub fn push<F>(&mut self, deadline: u64, owner: R, mut track: F)
    where
        F: FnMut(R, usize),
    {
        self.items.push(HeapItem { deadline, owner });
        let last = self.items.len() - 1;
        self.restore(last, &mut track);
    }

    pub fn update<F>(&mut self, slot: usize, deadline: u64, mut track: F)
    where
        F: FnMut(R, usize),
    {
        if slot >= self.items.len() {
            return;
        }
        self.items[slot].deadline = deadline;
        self.restore(slot, &mut track);
    }

    /// Removes the item at `slot`, moving the last item into its place.
    pub fn remove<F>(&mut self, slot: usize, mut track: F) -> Option<HeapItem<R>>
    where
        F: FnMut(R, usize),
    {
        if slot >= self.items.len() {
            return None;
        }
        let removed = self.items.swap_remove(slot);
        if slot < self.items.len() {
            self.restore(slot, &mut track);
        }
        Some(removed)
    }

    fn restore<F>(&mut self, slot: usize, track: &mut F)
    where
        F: FnMut(R, usize),
    {
        if slot > 0 && self.items[parent(slot)].deadline > self.items[slot].deadline {
            self.sift_up(slot, track);
        } else {
            self.sift_down(slot, track);
        }
    }

    fn sift_up<F>(&mut self, mut pos: usize, track: &mut F)
    where
        F: FnMut(R, usize),
    {
        let item = self.items[pos];
        while pos > 0 {
            let up = parent(pos);
            if self.items[up].deadline <= item.deadline {
                break;
            }
            self.items[pos] = self.items[up];
            track(self.items[pos].owner, pos);
            pos = up;
        }
        self.items[pos] = item;
        track(item.owner, pos);
    }

    fn sift_down<F>(&mut self, mut pos: usize, track: &mut F)
    where
        F: FnMut(R, usize),
    {
        let item = self.items[pos];
        let len = self.items.len();
        loop {
            let mut child = left_child(pos);
            if child >= len {
                break;
            }
            if child + 1 < len && self.items[child + 1].deadline < self.items[child].deadline {
                child += 1;
            }
            if item.deadline <= self.items[child].deadline {
                break;
            }
            self.items[pos] = self.items[child];
            track(self.items[pos].owner, pos);
            pos = child;
        }
        self.items[pos] = item;
        track(item.owner, pos);
    }
}

impl<R: Copy> Default for Heap<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    // Owners are indices into a slot table standing in for entries.
    struct Owners {
        slots: Vec<Option<usize>>,
        deadlines: Vec<u64>,
    }

    fn check(heap: &Heap<usize>, owners: &Owners) {
        for (i, item) in heap.items.iter().enumerate() {
            assert_eq!(owners.slots[item.owner], Some(i), "stale back-reference");
            if i > 0 {
                assert!(heap.items[parent(i)].deadline <= item.deadline);
            }
        }
    }

    #[test]
    fn push_and_pop_in_order() {
        let mut heap = Heap::new();
        let mut slots = vec![None; 5];
        for (owner, deadline) in [50u64, 10, 40, 20, 30].into_iter().enumerate() {
            heap.push(deadline, owner, |o, s| slots[o] = Some(s));
        }
        let mut popped = Vec::new();
        while let Some(top) = heap.peek().copied() {
            popped.push(top.deadline);
            let slot = slots[top.owner].take().expect("tracked");
            heap.remove(slot, |o, s| slots[o] = Some(s));
        }
        assert_eq!(popped, vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn update_moves_both_ways() {
        let mut heap = Heap::new();
        let mut slots = vec![None; 3];
        for (owner, deadline) in [10u64, 20, 30].into_iter().enumerate() {
            heap.push(deadline, owner, |o, s| slots[o] = Some(s));
        }
        let slot = slots[2].expect("tracked");
        heap.update(slot, 1, |o, s| slots[o] = Some(s));
        assert_eq!(heap.peek().map(|i| i.owner), Some(2));

        let slot = slots[2].expect("tracked");
        heap.update(slot, 100, |o, s| slots[o] = Some(s));
        assert_eq!(heap.peek().map(|i| i.owner), Some(0));
        assert_eq!(heap.get(slots[2].expect("tracked")).map(|i| i.deadline), Some(100));
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut heap: Heap<usize> = Heap::new();
        assert!(heap.remove(3, |_, _| {}).is_none());
        heap.update(3, 7, |_, _| {});
        assert!(heap.is_empty());
    }

    #[derive(Clone, Debug)]
    enum Op {
        Push(u64),
        Update(usize, u64),
        Delete(usize),
    }

    proptest! {
        #[test]
        fn peek_matches_reference_queue(ops in prop::collection::vec(
            prop_oneof![
                3 => (0u64..1000).prop_map(Op::Push),
                2 => (0usize..64, 0u64..1000).prop_map(|(o, d)| Op::Update(o, d)),
                2 => (0usize..64).prop_map(Op::Delete),
            ],
            0..300,
        )) {
            let mut heap = Heap::new();
            let mut owners = Owners { slots: Vec::new(), deadlines: Vec::new() };
            for op in ops {
                match op {
                    Op::Push(deadline) => {
                        let owner = owners.slots.len();
                        owners.slots.push(None);
                        owners.deadlines.push(deadline);
                        let slots = &mut owners.slots;
                        heap.push(deadline, owner, |o, s| slots[o] = Some(s));
                    }
                    Op::Update(owner, deadline) => {
                        if let Some(slot) = owners.slots.get(owner).copied().flatten() {
                            owners.deadlines[owner] = deadline;
                            let slots = &mut owners.slots;
                            heap.update(slot, deadline, |o, s| slots[o] = Some(s));
                        }
                    }
                    Op::Delete(owner) => {
                        if let Some(slot) = owners.slots.get(owner).copied().flatten() {
                            owners.slots[owner] = None;
                            let slots = &mut owners.slots;
                            let removed = heap.remove(slot, |o, s| slots[o] = Some(s));
                            prop_assert_eq!(removed.map(|i| i.owner), Some(owner));
                        }
                    }
                }
                check(&heap, &owners);

                let reference: BinaryHeap<Reverse<u64>> = owners
                    .slots
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.is_some())
                    .map(|(o, _)| Reverse(owners.deadlines[o]))
                    .collect();
                prop_assert_eq!(heap.peek().map(|i| i.deadline), reference.peek().map(|r| r.0));
                prop_assert_eq!(heap.len(), reference.len());
            }
        }
    }
}
