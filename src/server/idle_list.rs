use std::collections::HashMap;

use mio::Token;

#[derive(Debug, Clone, Copy, Default)]
struct Links {
    prev: Option<Token>,
    next: Option<Token>,
}

/// Connections ordered by last activity, least recent at the front.
///
/// A doubly-linked list threaded through a map so that touching or
/// removing a connection is O(1) by token.
#[derive(Debug, Default)]
pub struct IdleList {
    links: HashMap<Token, Links>,
    head: Option<Token>,
    tail: Option<Token>,
}

impl IdleList {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Least recently active connection.
    pub fn front(&self) -> Option<Token> {
        self.head
    }

    /// Appends `token` as the most recently active. A token already in the
    /// list is moved.
    pub fn push_back(&mut self, token: Token) {
        self.remove(token);
        let links = Links {
            prev: self.tail,
            next: None,
        };
        match self.tail {
            Some(tail) => {
                if let Some(tail_links) = self.links.get_mut(&tail) {
                    tail_links.next = Some(token);
                }
            }
            None => self.head = Some(token),
        }
        self.tail = Some(token);
        self.links.insert(token, links);
    }

    pub fn touch(&mut self, token: Token) {
        if self.tail != Some(token) {
            self.push_back(token);
        }
    }

    pub fn remove(&mut self, token: Token) -> bool {
        let Some(links) = self.links.remove(&token) else {
            return false;
        };
        match links.prev {
            Some(prev) => {
                if let Some(prev_links) = self.links.get_mut(&prev) {
                    prev_links.next = links.next;
                }
            }
            None => self.head = links.next,
        }
        match links.next {
            Some(next) => {
                if let Some(next_links) = self.links.get_mut(&next) {
                    next_links.prev = links.prev;
                }
            }
            None => self.tail = links.prev,
        }
        true
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        std::iter::successors(self.head, move |token| {
            self.links.get(token).and_then(|links| links.next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn order(list: &IdleList) -> Vec<usize> {
        list.iter().map(|token| token.0).collect()
    }

    #[test]
    fn touch_moves_to_back() {
        let mut list = IdleList::new();
        for i in 1..=4 {
            list.push_back(Token(i));
        }
        assert_eq!(order(&list), vec![1, 2, 3, 4]);
        list.touch(Token(1));
        assert_eq!(order(&list), vec![2, 3, 4, 1]);
        list.touch(Token(3));
        assert_eq!(order(&list), vec![2, 4, 1, 3]);
        assert_eq!(list.front(), Some(Token(2)));
    }

    #[test]
    fn remove_relinks_neighbours() {
        let mut list = IdleList::new();
        for i in 1..=3 {
            list.push_back(Token(i));
        }
        assert!(list.remove(Token(2)));
        assert!(!list.remove(Token(2)));
        assert_eq!(order(&list), vec![1, 3]);
        assert!(list.remove(Token(1)));
        assert!(list.remove(Token(3)));
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        list.push_back(Token(7));
        assert_eq!(order(&list), vec![7]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Touch(usize),
        Remove(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..16usize).prop_map(Op::Touch),
            (0..16usize).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn matches_vec_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut list = IdleList::new();
            let mut model: Vec<usize> = Vec::new();
            for op in ops {
                match op {
                    Op::Touch(i) => {
                        list.touch(Token(i));
                        model.retain(|&x| x != i);
                        model.push(i);
                    }
                    Op::Remove(i) => {
                        let existed = model.contains(&i);
                        model.retain(|&x| x != i);
                        prop_assert_eq!(list.remove(Token(i)), existed);
                    }
                }
                prop_assert_eq!(order(&list), model.clone());
                prop_assert_eq!(list.len(), model.len());
            }
        }
    }
}
