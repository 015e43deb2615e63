use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use log::{debug, trace};

use crate::error::{Result, TreeError};

use super::balance::{Balance, Unbalanced};
use super::node::{Node, NodeRef};

/// What a structural delete left behind, for the policy's fix-up walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removed<M> {
    /// The node now sitting where the deleted node was: the sentinel, its only child, or its
    /// in-order successor.
    pub successor: NodeRef,
    /// The node now sitting in the slot that physically disappeared. Differs from `successor`
    /// only when a successor was spliced up from deeper in the tree. May be the sentinel.
    pub anchor: NodeRef,
    /// Parent of `anchor`, `None` if the anchor became the root.
    pub anchor_parent: Option<NodeRef>,
    /// Whether `anchor` hangs from the left of `anchor_parent`.
    pub anchor_is_left: bool,
    /// Metadata that left the tree. A spliced successor adopts the deleted node's metadata, so
    /// this is the successor's original metadata in that case.
    pub meta: M,
}

/// Sentinel-terminated binary search tree over an arena, rebalanced by the policy `B`.
///
/// Not synchronized: mutation needs `&mut self`, so callers sharing a tree across threads have
/// to serialize access themselves.
pub struct Tree<K, V, B: Balance = Unbalanced> {
    nodes: Vec<Node<K, V, B::Meta>>,
    free: Vec<NodeRef>,
    root: NodeRef,
    len: usize,
    _policy: PhantomData<B>,
}

impl<K, V, B: Balance> Tree<K, V, B> {
    /// The sentinel. Every absent child points here, and `find` returns it for missing keys.
    pub const NIL: NodeRef = NodeRef::NIL;

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::sentinel(B::SENTINEL)],
            free: Vec::new(),
            root: Self::NIL,
            len: 0,
            _policy: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0] = Node::sentinel(B::SENTINEL);
        self.free.clear();
        self.root = Self::NIL;
        self.len = 0;
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn is_nil(&self, node: NodeRef) -> bool {
        node == Self::NIL
    }

    fn node(&self, node: NodeRef) -> &Node<K, V, B::Meta> {
        &self.nodes[node.0]
    }

    fn node_mut(&mut self, node: NodeRef) -> &mut Node<K, V, B::Meta> {
        &mut self.nodes[node.0]
    }

    pub fn entry(&self, node: NodeRef) -> Option<(&K, &V)> {
        self.nodes.get(node.0)?.entry.as_ref().map(|(k, v)| (k, v))
    }

    pub fn key(&self, node: NodeRef) -> Option<&K> {
        self.entry(node).map(|(k, _)| k)
    }

    pub fn value(&self, node: NodeRef) -> Option<&V> {
        self.entry(node).map(|(_, v)| v)
    }

    pub fn value_mut(&mut self, node: NodeRef) -> Option<&mut V> {
        self.nodes.get_mut(node.0)?.entry.as_mut().map(|(_, v)| v)
    }

    pub fn left(&self, node: NodeRef) -> NodeRef {
        self.node(node).left
    }

    pub fn right(&self, node: NodeRef) -> NodeRef {
        self.node(node).right
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.node(node).parent
    }

    pub fn meta(&self, node: NodeRef) -> B::Meta {
        self.node(node).meta
    }

    pub(crate) fn set_meta(&mut self, node: NodeRef, meta: B::Meta) {
        self.node_mut(node).meta = meta;
    }

    /// Whether `node` is its parent's left child, decided by identity.
    pub fn is_left_child(&self, node: NodeRef) -> Result<bool> {
        let parent = self.parent(node).ok_or(TreeError::NoParent(node))?;
        if self.left(parent) == node {
            Ok(true)
        } else if self.right(parent) == node {
            Ok(false)
        } else {
            Err(TreeError::NotAChild { node, parent })
        }
    }

    /// Points whatever referenced `old` (its parent, or the root) at `new`.
    /// `new`'s own parent link is left to the caller.
    fn replace_child(&mut self, old: NodeRef, new: NodeRef) -> Result<()> {
        match self.parent(old) {
            None => {
                debug!("root moves from {old:?} to {new:?}");
                self.root = new;
            }
            Some(parent) => {
                if self.is_left_child(old)? {
                    self.node_mut(parent).left = new;
                } else {
                    self.node_mut(parent).right = new;
                }
            }
        }
        Ok(())
    }

    /// Promotes `node`'s right child into its place. No-op on the sentinel or without a right
    /// child. Metadata is not touched; on a balanced tree the caller is responsible for it.
    pub fn rotate_left(&mut self, node: NodeRef) -> Result<()> {
        if self.is_nil(node) {
            return Ok(());
        }
        let pivot = self.right(node);
        if self.is_nil(pivot) {
            return Ok(());
        }
        let inner = self.left(pivot);

        self.replace_child(node, pivot)?;
        let parent = self.parent(node);
        self.node_mut(pivot).parent = parent;

        self.node_mut(node).right = inner;
        if !self.is_nil(inner) {
            self.node_mut(inner).parent = Some(node);
        }

        self.node_mut(pivot).left = node;
        self.node_mut(node).parent = Some(pivot);

        trace!("rotated {node:?} left, {pivot:?} took its place");
        Ok(())
    }

    /// Mirror of [`rotate_left`](Self::rotate_left).
    pub fn rotate_right(&mut self, node: NodeRef) -> Result<()> {
        if self.is_nil(node) {
            return Ok(());
        }
        let pivot = self.left(node);
        if self.is_nil(pivot) {
            return Ok(());
        }
        let inner = self.right(pivot);

        self.replace_child(node, pivot)?;
        let parent = self.parent(node);
        self.node_mut(pivot).parent = parent;

        self.node_mut(node).left = inner;
        if !self.is_nil(inner) {
            self.node_mut(inner).parent = Some(node);
        }

        self.node_mut(pivot).right = node;
        self.node_mut(node).parent = Some(pivot);

        trace!("rotated {node:?} right, {pivot:?} took its place");
        Ok(())
    }

    /// Leftmost node of the subtree at `node` (the sentinel for an empty subtree).
    pub fn leftmost(&self, mut node: NodeRef) -> NodeRef {
        if self.is_nil(node) {
            return node;
        }
        while !self.is_nil(self.left(node)) {
            node = self.left(node);
        }
        node
    }

    pub fn rightmost(&self, mut node: NodeRef) -> NodeRef {
        if self.is_nil(node) {
            return node;
        }
        while !self.is_nil(self.right(node)) {
            node = self.right(node);
        }
        node
    }

    /// Next node in key order, following parent links. The sentinel after the last node.
    pub fn successor(&self, node: NodeRef) -> NodeRef {
        if self.is_nil(node) {
            return node;
        }
        let right = self.right(node);
        if !self.is_nil(right) {
            return self.leftmost(right);
        }
        let mut child = node;
        while let Some(parent) = self.parent(child) {
            if self.left(parent) == child {
                return parent;
            }
            child = parent;
        }
        Self::NIL
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.entry(self.leftmost(self.root))
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        self.entry(self.rightmost(self.root))
    }

    /// Number of nodes on the longest root-to-leaf path; 0 when empty.
    pub fn height(&self) -> usize {
        let mut tallest = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((node, depth)) = stack.pop() {
            if self.is_nil(node) {
                continue;
            }
            tallest = tallest.max(depth);
            stack.push((self.left(node), depth + 1));
            stack.push((self.right(node), depth + 1));
        }
        tallest
    }

    fn alloc(&mut self, key: K, value: V) -> NodeRef {
        let node = Node::new(key, value, B::FRESH);
        self.len += 1;
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot.0] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                NodeRef(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, node: NodeRef) -> Option<(K, V)> {
        let slot = self.node_mut(node);
        let entry = slot.entry.take();
        slot.left = Self::NIL;
        slot.right = Self::NIL;
        slot.parent = None;
        slot.meta = B::SENTINEL;
        self.free.push(node);
        self.len -= 1;
        entry
    }

    /// Splices `to_delete` out of the tree without freeing it.
    ///
    /// Returns `None` when `to_delete` is the sentinel or not a live node. The anchor's parent
    /// link is set even when the anchor is the sentinel, so the fix-up walk can start there.
    fn delete_node(&mut self, to_delete: NodeRef) -> Result<Option<Removed<B::Meta>>> {
        if self.key(to_delete).is_none() {
            return Ok(None);
        }
        let node = self.node(to_delete);
        let (left, right, parent, meta) = (node.left, node.right, node.parent, node.meta);
        let side = match parent {
            Some(_) => self.is_left_child(to_delete)?,
            None => false,
        };

        let single = if node.is_leaf() {
            Some(Self::NIL)
        } else if self.is_nil(right) {
            Some(left)
        } else if self.is_nil(left) {
            Some(right)
        } else {
            None
        };

        let removed = match single {
            Some(child) => {
                self.replace_child(to_delete, child)?;
                self.node_mut(child).parent = parent;
                Removed {
                    successor: child,
                    anchor: child,
                    anchor_parent: parent,
                    anchor_is_left: side,
                    meta,
                }
            }
            None => {
                let successor = self.leftmost(right);
                let anchor = self.right(successor);
                let vanished = self.meta(successor);

                let (anchor_parent, anchor_is_left) = if successor != right {
                    let old_parent = self.parent(successor).ok_or(TreeError::NoParent(successor))?;
                    self.node_mut(old_parent).left = anchor;
                    self.node_mut(anchor).parent = Some(old_parent);
                    self.node_mut(successor).right = right;
                    self.node_mut(right).parent = Some(successor);
                    (old_parent, true)
                } else {
                    self.node_mut(anchor).parent = Some(successor);
                    (successor, false)
                };

                self.node_mut(successor).left = left;
                self.node_mut(left).parent = Some(successor);

                self.replace_child(to_delete, successor)?;
                let spliced = self.node_mut(successor);
                spliced.parent = parent;
                spliced.meta = meta;

                Removed {
                    successor,
                    anchor,
                    anchor_parent: Some(anchor_parent),
                    anchor_is_left,
                    meta: vanished,
                }
            }
        };

        debug!("unlinked {to_delete:?}, replaced by {:?}", removed.successor);
        Ok(Some(removed))
    }

    pub fn iter(&self) -> super::Iter<'_, K, V, B> {
        super::Iter::new(self)
    }

    pub fn nodes(&self) -> super::Nodes<'_, K, V, B> {
        super::Nodes::new(self)
    }

    fn check_links(&self) -> Result<()> {
        let nil = self.node(Self::NIL);
        if nil.entry.is_some() || !nil.is_leaf() || nil.parent.is_some() || nil.meta != B::SENTINEL {
            return Err(TreeError::Invariant { node: Self::NIL, what: "sentinel was modified" });
        }
        if !self.is_nil(self.root) && self.parent(self.root).is_some() {
            return Err(TreeError::Invariant { node: self.root, what: "root has a parent" });
        }

        let mut seen = 0;
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if self.is_nil(node) {
                continue;
            }
            seen += 1;
            if seen > self.len {
                return Err(TreeError::Invariant { node, what: "more linked nodes than entries" });
            }
            if self.key(node).is_none() {
                return Err(TreeError::Invariant { node, what: "linked node has no entry" });
            }
            for child in [self.left(node), self.right(node)] {
                if !self.is_nil(child) && self.parent(child) != Some(node) {
                    return Err(TreeError::Invariant { node: child, what: "child does not point back to its parent" });
                }
                stack.push(child);
            }
        }
        if seen != self.len {
            return Err(TreeError::Invariant { node: self.root, what: "fewer linked nodes than entries" });
        }
        Ok(())
    }
}

impl<K: PartialOrd, V, B: Balance> Tree<K, V, B> {
    /// Iterative descent from the root. Returns the sentinel when the key is absent.
    pub fn find<Q>(&self, key: &Q) -> NodeRef
    where
        K: Borrow<Q>,
        Q: PartialOrd + ?Sized,
    {
        let mut current = self.root;
        while let Some(k) = self.key(current) {
            current = match key.partial_cmp(k.borrow()) {
                Some(Ordering::Less) => self.left(current),
                Some(Ordering::Greater) => self.right(current),
                Some(Ordering::Equal) => return current,
                None => return Self::NIL,
            };
        }
        current
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: PartialOrd + ?Sized,
    {
        self.value(self.find(key))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: PartialOrd + ?Sized,
    {
        let node = self.find(key);
        self.value_mut(node)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: PartialOrd + ?Sized,
    {
        !self.is_nil(self.find(key))
    }

    /// Inserts `key` unless it is already present; an existing value is never overwritten.
    ///
    /// Returns whether a node was added. Fails with [`TreeError::InvalidKey`] for a key that
    /// does not compare equal to itself, before anything is changed.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool> {
        if key.partial_cmp(&key) != Some(Ordering::Equal) {
            return Err(TreeError::InvalidKey);
        }
        let Some(node) = self.insert_node(key, value)? else {
            return Ok(false);
        };
        B::after_insert(self, node)?;
        Ok(true)
    }

    /// Links a new leaf for `key`, or returns `None` if the key is already present.
    fn insert_node(&mut self, key: K, value: V) -> Result<Option<NodeRef>> {
        let mut parent = None;
        let mut is_left = false;
        let mut current = self.root;
        while let Some(k) = self.key(current) {
            parent = Some(current);
            match key.partial_cmp(k) {
                Some(Ordering::Less) => {
                    current = self.left(current);
                    is_left = true;
                }
                Some(Ordering::Greater) => {
                    current = self.right(current);
                    is_left = false;
                }
                Some(Ordering::Equal) => return Ok(None),
                None => return Err(TreeError::InvalidKey),
            }
        }

        let node = self.alloc(key, value);
        self.node_mut(node).parent = parent;
        match parent {
            None => self.root = node,
            Some(parent) if is_left => self.node_mut(parent).left = node,
            Some(parent) => self.node_mut(parent).right = node,
        }
        debug!("linked {node:?} under {parent:?}");
        Ok(Some(node))
    }

    /// Removes `key`, handing back the stored entry. `Ok(None)` if it was absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<Option<(K, V)>>
    where
        K: Borrow<Q>,
        Q: PartialOrd + ?Sized,
    {
        let to_delete = self.find(key);
        let Some(removed) = self.delete_node(to_delete)? else {
            return Ok(None);
        };
        let entry = self.release(to_delete);

        let fixed = B::after_delete(self, &removed);
        self.node_mut(Self::NIL).parent = None;
        fixed?;
        Ok(entry)
    }

    /// Whether a node existed for `key` and was removed.
    pub fn delete<Q>(&mut self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: PartialOrd + ?Sized,
    {
        Ok(self.remove(key)?.is_some())
    }

    /// Inserts every pair, returning how many keys were new.
    pub fn try_extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) -> Result<usize> {
        let mut added = 0;
        for (key, value) in iter {
            added += usize::from(self.insert(key, value)?);
        }
        Ok(added)
    }

    /// Verifies links, key order and size, then the policy's own invariants.
    pub fn check(&self) -> Result<()> {
        self.check_links()?;
        let mut previous: Option<&K> = None;
        for node in self.nodes() {
            let key = self.key(node);
            if let (Some(a), Some(b)) = (previous, key) {
                if a.partial_cmp(b) != Some(Ordering::Less) {
                    return Err(TreeError::Invariant { node, what: "keys out of order" });
                }
            }
            previous = key;
        }
        B::check(self)
    }
}

impl<K, V, B: Balance> Default for Tree<K, V, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, B: Balance> fmt::Debug for Tree<K, V, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
