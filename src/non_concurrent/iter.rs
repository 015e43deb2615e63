use std::iter::FusedIterator;

use super::{Balance, NodeRef, Tree};

/// In-order walk over a tree's nodes, one step at a time.
///
/// Holds only the next node and a count: each step either descends to the leftmost node of the
/// right subtree or climbs parent links until it arrives from a left child. No key comparisons,
/// no stack. The walk borrows the tree, so the tree cannot be mutated between steps.
pub struct Nodes<'a, K, V, B: Balance> {
    tree: &'a Tree<K, V, B>,
    next: NodeRef,
    remaining: usize,
}

impl<'a, K, V, B: Balance> Nodes<'a, K, V, B> {
    pub(crate) fn new(tree: &'a Tree<K, V, B>) -> Self {
        Self {
            tree,
            next: tree.leftmost(tree.root()),
            remaining: tree.len(),
        }
    }
}

impl<K, V, B: Balance> Iterator for Nodes<'_, K, V, B> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        if self.remaining == 0 || self.tree.is_nil(self.next) {
            return None;
        }
        let current = self.next;
        self.next = self.tree.successor(current);
        self.remaining -= 1;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, B: Balance> ExactSizeIterator for Nodes<'_, K, V, B> {}
impl<K, V, B: Balance> FusedIterator for Nodes<'_, K, V, B> {}

/// Entries of a tree in ascending key order. Created by [`Tree::iter`].
///
/// One-shot: once exhausted it keeps returning `None`; call `iter()` again for another pass.
pub struct Iter<'a, K, V, B: Balance> {
    nodes: Nodes<'a, K, V, B>,
}

impl<'a, K, V, B: Balance> Iter<'a, K, V, B> {
    pub(crate) fn new(tree: &'a Tree<K, V, B>) -> Self {
        Self { nodes: Nodes::new(tree) }
    }
}

impl<'a, K, V, B: Balance> Iterator for Iter<'a, K, V, B> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.nodes.tree;
        let node = self.nodes.next()?;
        tree.entry(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<K, V, B: Balance> ExactSizeIterator for Iter<'_, K, V, B> {}
impl<K, V, B: Balance> FusedIterator for Iter<'_, K, V, B> {}

impl<'a, K, V, B: Balance> IntoIterator for &'a Tree<K, V, B> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_logging, AvlTree, RBTree};

    #[test]
    fn empty_tree_yields_nothing() {
        test_logging::init();
        let tree = <Tree<i32, ()>>::new();
        let mut iter = tree.iter();
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn single_node() {
        test_logging::init();
        let mut tree: Tree<_, _> = Tree::new();
        tree.insert(1, "a").unwrap();
        assert_eq!(tree.iter().collect::<Vec<_>>(), [(&1, &"a")]);
    }

    #[test]
    fn steps_can_be_taken_one_at_a_time() {
        test_logging::init();
        let mut tree = RBTree::new();
        tree.try_extend((1..=10).map(|k| (k, k * 10))).unwrap();
        let mut iter = tree.iter();
        assert_eq!(iter.len(), 10);
        assert_eq!(iter.next(), Some((&1, &10)));
        assert_eq!(iter.next(), Some((&2, &20)));
        assert_eq!(iter.len(), 8);
        let rest: Vec<i32> = iter.map(|(k, _)| *k).collect();
        assert_eq!(rest, (3..=10).collect::<Vec<_>>());
    }

    #[test]
    fn every_shape_is_walked_in_order() {
        test_logging::init();
        // degenerate chains and a zig-zag, none of which rebalance
        for keys in [vec![1, 2, 3, 4, 5], vec![5, 4, 3, 2, 1], vec![1, 5, 2, 4, 3], vec![3, 1, 5, 2, 4]] {
            let mut tree: Tree<_, _> = Tree::new();
            for &k in &keys {
                tree.insert(k, ()).unwrap();
            }
            let walked: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
            assert_eq!(walked, [1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn nodes_match_entries() {
        test_logging::init();
        let mut tree = AvlTree::new();
        tree.try_extend([(3, 'c'), (1, 'a'), (2, 'b')]).unwrap();
        let via_nodes: Vec<char> = tree.nodes().filter_map(|n| tree.value(n).copied()).collect();
        let via_iter: Vec<char> = (&tree).into_iter().map(|(_, v)| *v).collect();
        assert_eq!(via_nodes, via_iter);
        assert_eq!(via_iter, ['a', 'b', 'c']);
    }
}
