use super::avl::{AvlTree, NodeId};
use super::hashtable::{hash_bytes, HashTable};

/// One sorted-set member.
#[derive(Debug, Clone, PartialEq)]
pub struct ZNode {
    pub name: Vec<u8>,
    pub score: f64,
}

/// Orders by score, then by name. Scores are never NaN.
fn zless(node: &ZNode, score: f64, name: &[u8]) -> bool {
    if node.score != score {
        return node.score < score;
    }
    node.name.as_slice() < name
}

fn node_less(lhs: &ZNode, rhs: &ZNode) -> bool {
    zless(lhs, rhs.score, &rhs.name)
}

/// Member set indexed twice: by name for O(1) membership, and by
/// `(score, name)` for ordered range queries.
#[derive(Debug, Default)]
pub struct SortedSet {
    members: HashTable<NodeId>,
    tree: AvlTree<ZNode>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn lookup(&mut self, name: &[u8]) -> Option<NodeId> {
        let tree = &self.tree;
        self.members
            .lookup(hash_bytes(name), |&id| {
                tree.get(id).is_some_and(|node| node.name == name)
            })
            .copied()
    }

    /// Adds a member or updates its score. Returns true only when the
    /// member did not exist before.
    pub fn add(&mut self, name: &[u8], score: f64) -> bool {
        match self.lookup(name) {
            Some(id) => {
                if self.tree.get(id).map(|node| node.score) != Some(score) {
                    self.tree.reposition(id, |node| node.score = score, node_less);
                }
                false
            }
            None => {
                let id = self.tree.insert(
                    ZNode {
                        name: name.to_vec(),
                        score,
                    },
                    node_less,
                );
                self.members.insert(hash_bytes(name), id);
                true
            }
        }
    }

    pub fn remove(&mut self, name: &[u8]) -> bool {
        let tree = &self.tree;
        let removed = self.members.remove(hash_bytes(name), |&id| {
            tree.get(id).is_some_and(|node| node.name == name)
        });
        match removed {
            Some(id) => {
                self.tree.remove(id);
                true
            }
            None => false,
        }
    }

    pub fn find(&mut self, name: &[u8]) -> Option<f64> {
        let id = self.lookup(name)?;
        self.tree.get(id).map(|node| node.score)
    }

    /// Members in ascending `(score, name)` order, starting `offset`
    /// positions from the first member not less than `(score, name)`, at
    /// most `limit` of them.
    pub fn query(
        &self,
        score: f64,
        name: &[u8],
        offset: i64,
        limit: usize,
    ) -> impl Iterator<Item = &ZNode> + '_ {
        let start = self
            .tree
            .lower_bound(|node| zless(node, score, name))
            .and_then(|id| self.tree.offset(id, offset));
        self.tree
            .iter_from(start)
            .map(|(_, node)| node)
            .take(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn pairs<'a>(it: impl Iterator<Item = &'a ZNode>) -> Vec<(String, f64)> {
        it.map(|n| (String::from_utf8_lossy(&n.name).into_owned(), n.score))
            .collect()
    }

    #[test]
    fn add_reports_creation_only_once() {
        let mut zset = SortedSet::new();
        assert!(zset.add(b"a", 1.0));
        assert!(!zset.add(b"a", 1.0));
        assert!(!zset.add(b"a", 5.0));
        assert_eq!(zset.len(), 1);
        assert_eq!(zset.find(b"a"), Some(5.0));
    }

    #[test]
    fn score_update_reorders() {
        let mut zset = SortedSet::new();
        zset.add(b"a", 1.0);
        zset.add(b"b", 2.0);
        zset.add(b"c", 3.0);
        zset.add(b"a", 10.0);
        let all = pairs(zset.query(f64::NEG_INFINITY, b"", 0, 10));
        assert_eq!(
            all,
            vec![
                ("b".to_string(), 2.0),
                ("c".to_string(), 3.0),
                ("a".to_string(), 10.0)
            ]
        );
    }

    #[test]
    fn ties_are_broken_by_name() {
        let mut zset = SortedSet::new();
        for name in ["d", "b", "c", "a"] {
            zset.add(name.as_bytes(), 1.0);
        }
        let names: Vec<String> = pairs(zset.query(1.0, b"b", 0, 10))
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn remove_drops_from_both_indexes() {
        let mut zset = SortedSet::new();
        zset.add(b"a", 1.0);
        zset.add(b"b", 2.0);
        assert!(zset.remove(b"a"));
        assert!(!zset.remove(b"a"));
        assert_eq!(zset.find(b"a"), None);
        assert_eq!(pairs(zset.query(0.0, b"", 0, 10)), vec![("b".to_string(), 2.0)]);
    }

    #[test]
    fn query_with_offsets_and_limits() {
        let mut zset = SortedSet::new();
        for i in 0..10 {
            zset.add(format!("m{}", i).as_bytes(), i as f64);
        }
        let names = |offset: i64, limit: usize| -> Vec<String> {
            pairs(zset.query(4.0, b"", offset, limit))
                .into_iter()
                .map(|(n, _)| n)
                .collect()
        };
        assert_eq!(names(0, 2), vec!["m4", "m5"]);
        assert_eq!(names(-2, 3), vec!["m2", "m3", "m4"]);
        assert_eq!(names(5, 10), vec!["m9"]);
        assert!(names(6, 10).is_empty());
        assert!(names(-5, 10).is_empty());
        assert!(names(0, 0).is_empty());
        assert!(pairs(zset.query(100.0, b"", -3, 10)).is_empty());
    }

    proptest! {
        #[test]
        fn query_matches_sorted_reference(
            adds in prop::collection::vec((0u8..40, 0i32..8), 0..120),
            removes in prop::collection::vec(0u8..40, 0..30),
            seek in (0i32..9, 0u8..40),
            offset in -10i64..10,
            limit in 0usize..15,
        ) {
            let mut zset = SortedSet::new();
            let mut reference: HashMap<Vec<u8>, f64> = HashMap::new();
            for (name, score) in adds {
                let name = format!("n{:02}", name).into_bytes();
                let created = zset.add(&name, score as f64);
                prop_assert_eq!(created, reference.insert(name, score as f64).is_none());
            }
            for name in removes {
                let name = format!("n{:02}", name).into_bytes();
                prop_assert_eq!(zset.remove(&name), reference.remove(&name).is_some());
            }
            prop_assert_eq!(zset.len(), reference.len());

            let mut sorted: Vec<(f64, Vec<u8>)> =
                reference.iter().map(|(n, s)| (*s, n.clone())).collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

            let (score, name) = (seek.0 as f64, format!("n{:02}", seek.1).into_bytes());
            let position = sorted
                .iter()
                .position(|(s, n)| (*s, n) >= (score, &name))
                .unwrap_or(sorted.len());
            let start = position as i64 + offset;
            let expected: Vec<(f64, Vec<u8>)> =
                if position == sorted.len() || start < 0 || start >= sorted.len() as i64 {
                    Vec::new()
                } else {
                    let start = start as usize;
                    let end = (start + limit).min(sorted.len());
                    sorted[start..end].to_vec()
                };
            let got: Vec<(f64, Vec<u8>)> = zset
                .query(score, &name, offset, limit)
                .map(|n| (n.score, n.name.clone()))
                .collect();
            prop_assert_eq!(got, expected);
        }
    }
}
