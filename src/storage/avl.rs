use slab::Slab;

pub type NodeId = usize;

#[derive(Debug)]
struct AvlNode<T> {
    value: T,
    height: u32,
    size: u32,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

impl<T> AvlNode<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            height: 1,
            size: 1,
            left: None,
            right: None,
            parent: None,
        }
    }

    fn reset_links(&mut self) {
        self.height = 1;
        self.size = 1;
        self.left = None;
        self.right = None;
        self.parent = None;
    }
}

/// AVL tree augmented with subtree sizes. Nodes live in a [`Slab`] and
/// link by index.
///
/// Callers pass a `less` comparator when linking a node, and must not
/// change a linked value's ordering except through [`AvlTree::reposition`].
#[derive(Debug)]
pub struct AvlTree<T> {
    nodes: Slab<AvlNode<T>>,
    root: Option<NodeId>,
}

impl<T> AvlTree<T> {
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.size(self.root) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id).map(|node| &node.value)
    }

    /// Links a new value into the tree and returns its stable id.
    pub fn insert<F>(&mut self, value: T, less: F) -> NodeId
    where
        F: Fn(&T, &T) -> bool,
    {
        let id = self.nodes.insert(AvlNode::new(value));
        self.link(id, &less);
        id
    }

    /// Unlinks and frees a node.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        if !self.nodes.contains(id) {
            return None;
        }
        self.unlink(id);
        Some(self.nodes.remove(id).value)
    }

    /// Changes a linked value's sort key. The node keeps its id.
    pub fn reposition<U, F>(&mut self, id: NodeId, update: U, less: F)
    where
        U: FnOnce(&mut T),
        F: Fn(&T, &T) -> bool,
    {
        if !self.nodes.contains(id) {
            return;
        }
        self.unlink(id);
        update(&mut self.nodes[id].value);
        self.link(id, &less);
    }

    /// Leftmost node.
    pub fn first(&self) -> Option<NodeId> {
        let mut cur = self.root?;
        while let Some(left) = self.nodes[cur].left {
            cur = left;
        }
        Some(cur)
    }

    /// Smallest node for which `is_less` returns false.
    pub fn lower_bound<F>(&self, is_less: F) -> Option<NodeId>
    where
        F: Fn(&T) -> bool,
    {
        let mut found = None;
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = &self.nodes[id];
            if is_less(&node.value) {
                cur = node.right;
            } else {
                found = Some(id);
                cur = node.left;
            }
        }
        found
    }

    /// The node `offset` positions away from `id` in sorted order.
    pub fn offset(&self, id: NodeId, offset: i64) -> Option<NodeId> {
        if !self.nodes.contains(id) {
            return None;
        }
        let mut node = id;
        let mut pos: i64 = 0;
        while pos != offset {
            let cur = &self.nodes[node];
            let right_size = self.size(cur.right) as i64;
            let left_size = self.size(cur.left) as i64;
            if pos < offset && pos + right_size >= offset {
                // Target is inside the right subtree.
                node = cur.right?;
                pos += self.size(self.nodes[node].left) as i64 + 1;
            } else if pos > offset && pos - left_size <= offset {
                node = cur.left?;
                pos -= self.size(self.nodes[node].right) as i64 + 1;
            } else {
                let parent = cur.parent?;
                if self.nodes[parent].right == Some(node) {
                    pos -= left_size + 1;
                } else {
                    pos += right_size + 1;
                }
                node = parent;
            }
        }
        Some(node)
    }

    /// In-order iterator starting at `start`.
    pub fn iter_from(&self, start: Option<NodeId>) -> Iter<'_, T> {
        Iter {
            tree: self,
            next: start,
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.iter_from(self.first())
    }

    fn height(&self, id: Option<NodeId>) -> u32 {
        id.map_or(0, |id| self.nodes[id].height)
    }

    fn size(&self, id: Option<NodeId>) -> u32 {
        id.map_or(0, |id| self.nodes[id].size)
    }

    fn update(&mut self, id: NodeId) {
        let (left, right) = (self.nodes[id].left, self.nodes[id].right);
        let height = 1 + self.height(left).max(self.height(right));
        let size = 1 + self.size(left) + self.size(right);
        let node = &mut self.nodes[id];
        node.height = height;
        node.size = size;
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: Option<NodeId>) {
        let node = &mut self.nodes[parent];
        if node.left == Some(old) {
            node.left = new;
        } else {
            node.right = new;
        }
    }

    //     a              b
    //    / \            / \
    //   x   b    =>    a   z
    //      / \        / \
    //     y   z      x   y
    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let Some(new_root) = self.nodes[id].right else {
            return id;
        };
        let inner = self.nodes[new_root].left;
        self.nodes[id].right = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(id);
        }
        self.nodes[new_root].parent = self.nodes[id].parent;
        self.nodes[new_root].left = Some(id);
        self.nodes[id].parent = Some(new_root);
        self.update(id);
        self.update(new_root);
        new_root
    }

    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let Some(new_root) = self.nodes[id].left else {
            return id;
        };
        let inner = self.nodes[new_root].right;
        self.nodes[id].left = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(id);
        }
        self.nodes[new_root].parent = self.nodes[id].parent;
        self.nodes[new_root].right = Some(id);
        self.nodes[id].parent = Some(new_root);
        self.update(id);
        self.update(new_root);
        new_root
    }

    // Left subtree is two levels taller.
    fn fix_left(&mut self, id: NodeId) -> NodeId {
        if let Some(left) = self.nodes[id].left {
            let (ll, lr) = (self.nodes[left].left, self.nodes[left].right);
            if self.height(ll) < self.height(lr) {
                let sub = self.rotate_left(left);
                self.nodes[id].left = Some(sub);
            }
        }
        self.rotate_right(id)
    }

    // Right subtree is two levels taller.
    fn fix_right(&mut self, id: NodeId) -> NodeId {
        if let Some(right) = self.nodes[id].right {
            let (rl, rr) = (self.nodes[right].left, self.nodes[right].right);
            if self.height(rr) < self.height(rl) {
                let sub = self.rotate_right(right);
                self.nodes[id].right = Some(sub);
            }
        }
        self.rotate_left(id)
    }

    /// Refreshes height and size from `id` up to the root, rotating where
    /// the balance invariant broke. Returns the new root.
    fn fix(&mut self, mut id: NodeId) -> NodeId {
        loop {
            self.update(id);
            let parent = self.nodes[id].parent;
            let left = self.height(self.nodes[id].left);
            let right = self.height(self.nodes[id].right);
            let subtree = if left == right + 2 {
                self.fix_left(id)
            } else if left + 2 == right {
                self.fix_right(id)
            } else {
                id
            };
            match parent {
                None => return subtree,
                Some(parent) => {
                    self.replace_child(parent, id, Some(subtree));
                    id = parent;
                }
            }
        }
    }

    fn link<F>(&mut self, id: NodeId, less: &F)
    where
        F: Fn(&T, &T) -> bool,
    {
        self.nodes[id].reset_links();
        let mut parent = None;
        let mut go_left = false;
        let mut cur = self.root;
        while let Some(c) = cur {
            parent = Some(c);
            go_left = less(&self.nodes[id].value, &self.nodes[c].value);
            cur = if go_left {
                self.nodes[c].left
            } else {
                self.nodes[c].right
            };
        }
        match parent {
            None => self.root = Some(id),
            Some(parent) => {
                if go_left {
                    self.nodes[parent].left = Some(id);
                } else {
                    self.nodes[parent].right = Some(id);
                }
                self.nodes[id].parent = Some(parent);
                self.root = Some(self.fix(parent));
            }
        }
    }

    fn unlink(&mut self, id: NodeId) {
        match self.nodes[id].right {
            None => {
                let parent = self.nodes[id].parent;
                let left = self.nodes[id].left;
                if let Some(left) = left {
                    self.nodes[left].parent = parent;
                }
                match parent {
                    Some(parent) => {
                        self.replace_child(parent, id, left);
                        self.root = Some(self.fix(parent));
                    }
                    None => self.root = left,
                }
            }
            Some(right) => {
                // Detach the in-order successor, then let it take our place.
                let mut successor = right;
                while let Some(left) = self.nodes[successor].left {
                    successor = left;
                }
                self.unlink(successor);

                let node = &self.nodes[id];
                let (left, right, parent) = (node.left, node.right, node.parent);
                let (height, size) = (node.height, node.size);
                let succ = &mut self.nodes[successor];
                succ.left = left;
                succ.right = right;
                succ.parent = parent;
                succ.height = height;
                succ.size = size;
                if let Some(left) = left {
                    self.nodes[left].parent = Some(successor);
                }
                if let Some(right) = right {
                    self.nodes[right].parent = Some(successor);
                }
                match parent {
                    Some(parent) => self.replace_child(parent, id, Some(successor)),
                    None => self.root = Some(successor),
                }
            }
        }
        self.nodes[id].reset_links();
    }
}

impl<T> Default for AvlTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    tree: &'a AvlTree<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.offset(id, 1);
        Some((id, &self.tree.nodes[id].value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn less(a: &i32, b: &i32) -> bool {
        a < b
    }

    // Returns the subtree height and checks every stored invariant below `id`.
    fn check_subtree<T>(tree: &AvlTree<T>, id: Option<NodeId>, parent: Option<NodeId>) -> u32 {
        let Some(id) = id else {
            return 0;
        };
        let node = &tree.nodes[id];
        assert_eq!(node.parent, parent, "parent link of node {}", id);
        let left = check_subtree(tree, node.left, Some(id));
        let right = check_subtree(tree, node.right, Some(id));
        assert!(left.abs_diff(right) <= 1, "node {} is unbalanced", id);
        assert_eq!(node.height, 1 + left.max(right));
        assert_eq!(
            node.size,
            1 + tree.size(node.left) + tree.size(node.right)
        );
        node.height
    }

    fn check(tree: &AvlTree<i32>) {
        check_subtree(tree, tree.root, None);
        let values: Vec<i32> = tree.iter().map(|(_, v)| *v).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(values.len(), tree.len());
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut tree = AvlTree::new();
        for i in 0..200 {
            tree.insert(i, less);
            check(&tree);
        }
        assert_eq!(tree.len(), 200);
        // AVL height is bounded by 1.44 * log2(n + 2).
        assert!(check_subtree(&tree, tree.root, None) <= 11);
    }

    #[test]
    fn remove_root_and_inner_nodes() {
        let mut tree = AvlTree::new();
        let ids: Vec<NodeId> = (0..50).map(|i| tree.insert(i, less)).collect();
        for (i, id) in ids.iter().enumerate().filter(|(i, _)| i % 3 == 0) {
            assert_eq!(tree.remove(*id), Some(i as i32));
            check(&tree);
        }
        while let Some(root) = tree.root {
            tree.remove(root);
            check(&tree);
        }
        assert!(tree.is_empty());
        assert_eq!(tree.remove(ids[1]), None);
    }

    #[test]
    fn offset_walks_in_both_directions() {
        let mut tree = AvlTree::new();
        let ids: Vec<NodeId> = (0..100).map(|i| tree.insert(i * 10, less)).collect();
        for (i, &id) in ids.iter().enumerate() {
            for k in -(i as i64)..(100 - i as i64) {
                let target = tree.offset(id, k).expect("offset within bounds");
                assert_eq!(tree.get(target), Some(&(((i as i64 + k) * 10) as i32)));
            }
            assert_eq!(tree.offset(id, -(i as i64) - 1), None);
            assert_eq!(tree.offset(id, 100 - i as i64), None);
        }
    }

    #[test]
    fn lower_bound_finds_first_not_less() {
        let mut tree = AvlTree::new();
        for v in [10, 20, 30, 40] {
            tree.insert(v, less);
        }
        let at = |target: i32| tree.lower_bound(|v| *v < target).and_then(|id| tree.get(id)).copied();
        assert_eq!(at(5), Some(10));
        assert_eq!(at(20), Some(20));
        assert_eq!(at(21), Some(30));
        assert_eq!(at(41), None);
    }

    #[test]
    fn reposition_keeps_id() {
        let mut tree = AvlTree::new();
        let ids: Vec<NodeId> = (0..20).map(|i| tree.insert(i, less)).collect();
        tree.reposition(ids[3], |v| *v = 100, less);
        check(&tree);
        assert_eq!(tree.get(ids[3]), Some(&100));
        assert_eq!(tree.iter().last().map(|(id, _)| id), Some(ids[3]));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    proptest! {
        #[test]
        fn matches_sorted_reference(ops in prop::collection::vec(
            prop_oneof![
                2 => (0i32..300).prop_map(Op::Insert),
                1 => (0i32..300).prop_map(Op::Remove),
            ],
            0..400,
        )) {
            let mut tree = AvlTree::new();
            let mut ids: HashMap<i32, NodeId> = HashMap::new();
            for op in ops {
                match op {
                    Op::Insert(v) => {
                        if !ids.contains_key(&v) {
                            ids.insert(v, tree.insert(v, less));
                        }
                    }
                    Op::Remove(v) => {
                        if let Some(id) = ids.remove(&v) {
                            prop_assert_eq!(tree.remove(id), Some(v));
                        }
                    }
                }
            }
            check(&tree);

            let mut reference: Vec<i32> = ids.keys().copied().collect();
            reference.sort_unstable();
            let in_order: Vec<i32> = tree.iter().map(|(_, v)| *v).collect();
            prop_assert_eq!(&in_order, &reference);

            for (pos, v) in reference.iter().enumerate() {
                let id = ids[v];
                for k in [-3i64, -1, 0, 1, 2, 7] {
                    let expected = reference.get((pos as i64 + k) as usize).filter(|_| pos as i64 + k >= 0);
                    let got = tree.offset(id, k).and_then(|n| tree.get(n));
                    prop_assert_eq!(got, expected);
                }
            }
        }
    }
}
