use log::trace;

use crate::error::{Result, TreeError};

use super::balance::{Balance, Sealed};
use super::{NodeRef, Removed, Tree};

// LEMMA: any node with height `h` has black height at least `h/2`
// LEMMA: the subtree located at any node `x` contains at least `2^bh(x) - 1` nodes
// so an RBTree with `n` nodes has height at most `2*log₂(n+1)`

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn is_red(self) -> bool {
        matches!(self, Self::Red)
    }

    pub fn is_black(self) -> bool {
        matches!(self, Self::Black)
    }
}

/// Red-black policy. The sentinel and the root are black, no red node has a red child, and
/// every path from a node down to the sentinel crosses the same number of black nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedBlack;

pub type RBTree<K, V> = Tree<K, V, RedBlack>;

impl Sealed for RedBlack {}

impl Balance for RedBlack {
    type Meta = Color;

    const SENTINEL: Color = Color::Black;
    const FRESH: Color = Color::Red;

    fn after_insert<K, V>(tree: &mut RBTree<K, V>, node: NodeRef) -> Result<()> {
        tree.balance_insert(node)
    }

    fn after_delete<K, V>(tree: &mut RBTree<K, V>, removed: &Removed<Color>) -> Result<()> {
        tree.balance_delete(removed)
    }

    fn check<K, V>(tree: &RBTree<K, V>) -> Result<()> {
        if tree.color(tree.root()).is_red() {
            return Err(TreeError::Invariant { node: tree.root(), what: "root is red" });
        }
        checked_black_height(tree, tree.root()).map(|_| ())
    }
}

impl<K, V> Tree<K, V, RedBlack> {
    pub fn color(&self, node: NodeRef) -> Color {
        self.meta(node)
    }

    /// Black nodes on any path from the root down to the sentinel, the sentinel included.
    pub fn black_height(&self) -> usize {
        let mut node = self.root();
        let mut height = 1;
        while !self.is_nil(node) {
            height += usize::from(self.color(node).is_black());
            node = self.left(node);
        }
        height
    }

    fn paint(&mut self, node: NodeRef, color: Color) {
        if !self.is_nil(node) {
            self.set_meta(node, color);
        }
    }

    fn is_red(&self, node: NodeRef) -> bool {
        self.color(node).is_red()
    }

    fn balance_insert(&mut self, mut node: NodeRef) -> Result<()> {
        while let Some(parent) = self.parent(node) {
            if !self.is_red(parent) {
                break;
            }
            let Some(grandparent) = self.parent(parent) else {
                trace!("red root {parent:?} repainted black");
                self.paint(parent, Color::Black);
                break;
            };

            let parent_is_left = self.is_left_child(parent)?;
            let uncle = if parent_is_left { self.right(grandparent) } else { self.left(grandparent) };

            if self.is_red(uncle) {
                trace!("red uncle {uncle:?}, pushing red up to {grandparent:?}");
                self.paint(parent, Color::Black);
                self.paint(uncle, Color::Black);
                self.paint(grandparent, Color::Red);
                node = grandparent;
                continue;
            }

            if self.is_left_child(node)? != parent_is_left {
                // inner grandchild: straighten the line, recolor on the next pass
                trace!("zig-zag at {parent:?}");
                if parent_is_left {
                    self.rotate_left(parent)?;
                } else {
                    self.rotate_right(parent)?;
                }
                node = parent;
                continue;
            }

            trace!("straight line at {grandparent:?}");
            if parent_is_left {
                self.rotate_right(grandparent)?;
            } else {
                self.rotate_left(grandparent)?;
            }
            self.paint(parent, Color::Black);
            self.paint(grandparent, Color::Red);
            break;
        }

        let root = self.root();
        self.paint(root, Color::Black);
        Ok(())
    }

    fn balance_delete(&mut self, removed: &Removed<Color>) -> Result<()> {
        let mut node = removed.anchor;

        if removed.meta.is_red() {
            // a red node left, black heights are unchanged
            return Ok(());
        }
        if self.is_red(node) {
            trace!("red replacement {node:?} absorbs the missing black");
            self.paint(node, Color::Black);
            return Ok(());
        }

        // `node` is short one black on every path through it
        let mut parent = removed.anchor_parent;
        let mut node_is_left = removed.anchor_is_left;
        while let Some(p) = parent {
            if self.is_red(node) {
                break;
            }
            let sibling = if node_is_left { self.right(p) } else { self.left(p) };

            if self.is_red(sibling) {
                trace!("red sibling {sibling:?}, rotating it above {p:?}");
                if node_is_left {
                    self.rotate_left(p)?;
                } else {
                    self.rotate_right(p)?;
                }
                self.paint(sibling, Color::Black);
                self.paint(p, Color::Red);
                continue;
            }

            let (close, distant) = if node_is_left {
                (self.left(sibling), self.right(sibling))
            } else {
                (self.right(sibling), self.left(sibling))
            };

            if self.is_red(close) {
                trace!("red close nephew {close:?}, rotating it above {sibling:?}");
                if node_is_left {
                    self.rotate_right(sibling)?;
                } else {
                    self.rotate_left(sibling)?;
                }
                self.paint(close, Color::Black);
                self.paint(sibling, Color::Red);
                continue;
            }

            if self.is_red(distant) {
                trace!("red distant nephew {distant:?}, rotating {p:?}");
                if node_is_left {
                    self.rotate_left(p)?;
                } else {
                    self.rotate_right(p)?;
                }
                let parent_color = self.color(p);
                self.paint(sibling, parent_color);
                self.paint(p, Color::Black);
                self.paint(distant, Color::Black);
                return Ok(());
            }

            if self.is_red(p) {
                trace!("red parent {p:?} takes the missing black");
                self.paint(p, Color::Black);
                self.paint(sibling, Color::Red);
                return Ok(());
            }

            trace!("all black around {p:?}, moving the deficit up");
            self.paint(sibling, Color::Red);
            node = p;
            parent = self.parent(p);
            if parent.is_some() {
                node_is_left = self.is_left_child(p)?;
            }
        }

        self.paint(node, Color::Black);
        Ok(())
    }
}

fn checked_black_height<K, V>(tree: &RBTree<K, V>, node: NodeRef) -> Result<usize> {
    if tree.is_nil(node) {
        return Ok(1);
    }
    let (left, right) = (tree.left(node), tree.right(node));
    if tree.is_red(node) && (tree.is_red(left) || tree.is_red(right)) {
        return Err(TreeError::Invariant { node, what: "red node has a red child" });
    }
    let left_height = checked_black_height(tree, left)?;
    let right_height = checked_black_height(tree, right)?;
    if left_height != right_height {
        return Err(TreeError::Invariant { node, what: "black heights differ" });
    }
    Ok(left_height + usize::from(tree.color(node).is_black()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_logging;

    fn build(keys: impl IntoIterator<Item = i32>) -> RBTree<i32, ()> {
        test_logging::init();
        let mut tree = RBTree::new();
        for k in keys {
            tree.insert(k, ()).unwrap();
            tree.check().unwrap();
        }
        tree
    }

    fn color_of(tree: &RBTree<i32, ()>, key: i32) -> Color {
        let node = tree.find(&key);
        assert!(!tree.is_nil(node), "{key} is missing");
        tree.color(node)
    }

    fn root_key(tree: &RBTree<i32, ()>) -> Option<i32> {
        tree.key(tree.root()).copied()
    }

    fn assert_red_children_under_black_root(tree: &RBTree<i32, ()>, root: i32, left: i32, right: i32) {
        let r = tree.root();
        assert_eq!(root_key(tree), Some(root));
        assert_eq!(tree.color(r), Color::Black);
        assert_eq!(tree.find(&left), tree.left(r));
        assert_eq!(tree.color(tree.left(r)), Color::Red);
        assert_eq!(tree.find(&right), tree.right(r));
        assert_eq!(tree.color(tree.right(r)), Color::Red);
    }

    #[test]
    fn sequential_insert_rotates_left() {
        assert_red_children_under_black_root(&build([1, 2, 3]), 2, 1, 3);
    }

    #[test]
    fn descending_insert_rotates_right() {
        assert_red_children_under_black_root(&build([3, 2, 1]), 2, 1, 3);
    }

    #[test]
    fn left_right_insert() {
        assert_red_children_under_black_root(&build([9, 5, 7]), 7, 5, 9);
    }

    #[test]
    fn right_left_insert() {
        assert_red_children_under_black_root(&build([5, 9, 7]), 7, 5, 9);
    }

    #[test]
    fn sentinel_stays_black() {
        let tree = build([1, 2, 3]);
        assert_eq!(tree.color(RBTree::<i32, ()>::NIL), Color::Black);
    }

    #[test]
    fn ascending_run_settles_on_four() {
        let tree = build(1..=10);
        assert_eq!(root_key(&tree), Some(4));
        assert_eq!(color_of(&tree, 8), Color::Red);
        assert_eq!(color_of(&tree, 10), Color::Red);
        assert_eq!(tree.black_height(), 4);
    }

    #[test]
    fn delete_red_leaf() {
        let mut tree = build(1..=10);
        assert!(tree.delete(&10).unwrap());
        assert_eq!(color_of(&tree, 9), Color::Black);
        assert_eq!(root_key(&tree), Some(4));
        tree.check().unwrap();
    }

    #[test]
    fn delete_inner_black_node() {
        let mut tree = build(1..=10);
        assert!(tree.delete(&6).unwrap());
        assert_eq!(root_key(&tree), Some(4));
        assert_eq!(tree.key(tree.right(tree.root())), Some(&7));
        assert_eq!(color_of(&tree, 9), Color::Red);
        tree.check().unwrap();
    }

    #[test]
    fn delete_black_leaf_with_black_parent_moves_root() {
        let mut tree = build(1..=10);
        assert!(tree.delete(&1).unwrap());
        assert_eq!(color_of(&tree, 2), Color::Black);
        assert_eq!(color_of(&tree, 3), Color::Red);
        assert_eq!(root_key(&tree), Some(6));
        assert_eq!(tree.color(tree.right(tree.root())), Color::Black);
        tree.check().unwrap();
    }

    #[test]
    fn delete_black_leaf_with_red_parent() {
        let mut tree = build(1..=10);
        assert!(tree.delete(&7).unwrap());
        assert_eq!(color_of(&tree, 8), Color::Black);
        assert_eq!(color_of(&tree, 9), Color::Red);
        assert_eq!(root_key(&tree), Some(4));
        tree.check().unwrap();
    }

    #[test]
    fn delete_black_leaf_with_distant_red_nephew() {
        let mut tree = build(1..=10);
        assert!(tree.delete(&5).unwrap());
        assert_eq!(color_of(&tree, 6), Color::Black);
        assert_eq!(color_of(&tree, 7), Color::Red);
        assert_eq!(color_of(&tree, 8), Color::Black);
        assert_eq!(root_key(&tree), Some(4));
        tree.check().unwrap();
    }

    #[test]
    fn delete_with_red_sibling() {
        // 2 is black with a red sibling 4 that carries two black children
        let mut tree = build([2, 1, 4, 3, 5, 6]);
        assert_eq!(color_of(&tree, 4), Color::Red);
        assert!(tree.delete(&1).unwrap());
        assert_eq!(root_key(&tree), Some(4));
        tree.check().unwrap();
    }

    #[test]
    fn delete_with_red_close_nephew() {
        let mut tree = build([2, 1, 4, 3]);
        assert_eq!(color_of(&tree, 3), Color::Red);
        assert!(tree.delete(&1).unwrap());
        assert_eq!(root_key(&tree), Some(3));
        assert_eq!(color_of(&tree, 2), Color::Black);
        assert_eq!(color_of(&tree, 4), Color::Black);
        tree.check().unwrap();
    }

    #[test]
    fn delete_right_child_with_red_sibling() {
        let mut tree = build([4, 5, 2, 3, 1, 0]);
        assert_eq!(color_of(&tree, 2), Color::Red);
        assert!(tree.delete(&5).unwrap());
        assert_eq!(root_key(&tree), Some(2));
        assert_eq!(color_of(&tree, 4), Color::Black);
        assert_eq!(color_of(&tree, 3), Color::Red);
        tree.check().unwrap();
    }

    #[test]
    fn delete_right_child_with_red_close_nephew() {
        let mut tree = build([3, 4, 1, 2]);
        assert_eq!(color_of(&tree, 2), Color::Red);
        assert!(tree.delete(&4).unwrap());
        assert_eq!(root_key(&tree), Some(2));
        assert_eq!(color_of(&tree, 1), Color::Black);
        assert_eq!(color_of(&tree, 3), Color::Black);
        tree.check().unwrap();
    }

    #[test]
    fn delete_everything_leaves_nil_root() {
        let mut tree = build([1, 3, 5, 7, 9, 11, 13, 6]);
        for k in [7, 1, 13, 6, 3, 11, 5, 9] {
            assert!(tree.delete(&k).unwrap());
            tree.check().unwrap();
        }
        assert!(tree.is_nil(tree.root()));
        assert!(!tree.delete(&7).unwrap());
    }
}
