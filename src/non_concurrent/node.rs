use std::fmt;

/// Handle to a node slot in a tree's arena.
///
/// Slot 0 is always the sentinel ([`Tree::NIL`](super::Tree::NIL)). Handles are only meaningful
/// for the tree that produced them, and only until that tree is next mutated: deleted slots are
/// reused by later inserts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) usize);

impl NodeRef {
    pub(crate) const NIL: NodeRef = NodeRef(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NIL {
            f.write_str("NodeRef(nil)")
        } else {
            write!(f, "NodeRef({})", self.0)
        }
    }
}

pub(crate) struct Node<K, V, M> {
    // `None` only for the sentinel and for slots sitting on the free list
    pub(crate) entry: Option<(K, V)>,
    pub(crate) left: NodeRef,
    pub(crate) right: NodeRef,
    pub(crate) parent: Option<NodeRef>,
    pub(crate) meta: M,
}

impl<K, V, M> Node<K, V, M> {
    pub(crate) fn sentinel(meta: M) -> Self {
        Self {
            entry: None,
            left: NodeRef::NIL,
            right: NodeRef::NIL,
            parent: None,
            meta,
        }
    }

    pub(crate) fn new(key: K, value: V, meta: M) -> Self {
        Self {
            entry: Some((key, value)),
            left: NodeRef::NIL,
            right: NodeRef::NIL,
            parent: None,
            meta,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.left == NodeRef::NIL && self.right == NodeRef::NIL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_a_leaf_without_entry() {
        let nil = Node::<i32, (), ()>::sentinel(());
        assert!(nil.is_leaf());
        assert!(nil.entry.is_none());
        assert!(nil.parent.is_none());
    }

    #[test]
    fn debug_names_the_sentinel() {
        assert_eq!(format!("{:?}", NodeRef::NIL), "NodeRef(nil)");
        assert_eq!(format!("{:?}", NodeRef(3)), "NodeRef(3)");
    }
}
