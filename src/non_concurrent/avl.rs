use log::trace;

use crate::error::{Result, TreeError};

use super::balance::{Balance, Sealed};
use super::{NodeRef, Removed, Tree};

/// Height-balanced policy: the subtrees under any node differ in height by at most one.
///
/// Each node's metadata is the height of its subtree, counting the node itself; the sentinel
/// has height 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Avl;

pub type AvlTree<K, V> = Tree<K, V, Avl>;

impl Sealed for Avl {}

impl Balance for Avl {
    type Meta = usize;

    const SENTINEL: usize = 0;
    const FRESH: usize = 1;

    fn after_insert<K, V>(tree: &mut AvlTree<K, V>, node: NodeRef) -> Result<()> {
        let parent = tree.parent(node);
        rebalance_upward(tree, parent)
    }

    fn after_delete<K, V>(tree: &mut AvlTree<K, V>, removed: &Removed<usize>) -> Result<()> {
        // the anchor's own subtree is untouched, repair starts at its parent
        rebalance_upward(tree, removed.anchor_parent)
    }

    fn check<K, V>(tree: &AvlTree<K, V>) -> Result<()> {
        checked_height(tree, tree.root()).map(|_| ())
    }
}

impl<K, V> Tree<K, V, Avl> {
    /// Height of the left subtree minus height of the right subtree.
    pub fn balance_factor(&self, node: NodeRef) -> isize {
        self.meta(self.left(node)) as isize - self.meta(self.right(node)) as isize
    }

    fn update_height(&mut self, node: NodeRef) {
        if self.is_nil(node) {
            return;
        }
        let height = 1 + self.meta(self.left(node)).max(self.meta(self.right(node)));
        self.set_meta(node, height);
    }

    /// Rotates and fixes both heights, returning the node that took `node`'s place.
    fn rotate_left_updating(&mut self, node: NodeRef) -> Result<NodeRef> {
        let pivot = self.right(node);
        self.rotate_left(node)?;
        self.update_height(node);
        self.update_height(pivot);
        Ok(pivot)
    }

    fn rotate_right_updating(&mut self, node: NodeRef) -> Result<NodeRef> {
        let pivot = self.left(node);
        self.rotate_right(node)?;
        self.update_height(node);
        self.update_height(pivot);
        Ok(pivot)
    }
}

/// Walks from `start` towards the root, refreshing heights and rotating any node whose
/// balance factor left {-1, 0, 1}. Stops as soon as a subtree comes out of a step with the
/// height it had before, since nothing above it can have changed.
fn rebalance_upward<K, V>(tree: &mut AvlTree<K, V>, start: Option<NodeRef>) -> Result<()> {
    let mut next = start;
    while let Some(node) = next {
        let before = tree.meta(node);
        tree.update_height(node);

        let balance = tree.balance_factor(node);
        let top = if balance > 1 {
            let child = tree.left(node);
            if tree.balance_factor(child) < 0 {
                trace!("left-right imbalance at {node:?}");
                tree.rotate_left_updating(child)?;
            } else {
                trace!("left-left imbalance at {node:?}");
            }
            tree.rotate_right_updating(node)?
        } else if balance < -1 {
            let child = tree.right(node);
            if tree.balance_factor(child) > 0 {
                trace!("right-left imbalance at {node:?}");
                tree.rotate_right_updating(child)?;
            } else {
                trace!("right-right imbalance at {node:?}");
            }
            tree.rotate_left_updating(node)?
        } else {
            node
        };

        if tree.meta(top) == before {
            trace!("height change absorbed at {top:?}");
            break;
        }
        next = tree.parent(top);
    }
    Ok(())
}

fn checked_height<K, V>(tree: &AvlTree<K, V>, node: NodeRef) -> Result<usize> {
    if tree.is_nil(node) {
        return Ok(0);
    }
    let left = checked_height(tree, tree.left(node))?;
    let right = checked_height(tree, tree.right(node))?;
    if left.abs_diff(right) > 1 {
        return Err(TreeError::Invariant { node, what: "subtree heights differ by more than one" });
    }
    let height = 1 + left.max(right);
    if tree.meta(node) != height {
        return Err(TreeError::Invariant { node, what: "stored height is stale" });
    }
    Ok(height)
}
