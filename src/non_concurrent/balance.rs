use std::fmt;

use crate::error::Result;

use super::tree::{Removed, Tree};
use super::NodeRef;

mod sealed {
    pub trait Sealed {}
}

pub(crate) use sealed::Sealed;

/// A rebalancing policy plugged into [`Tree`].
///
/// The tree does every structural change itself (linking a new node, splicing a node out,
/// rotating). A policy only owns the per-node metadata and the fix-up walk that runs after an
/// insert or a delete has changed the shape.
pub trait Balance: Sealed + Sized {
    /// Per-node bookkeeping, e.g. a subtree height or a color.
    type Meta: Copy + PartialEq + fmt::Debug;

    /// Metadata carried by the sentinel.
    const SENTINEL: Self::Meta;

    /// Metadata of a freshly built node, before it is linked in.
    const FRESH: Self::Meta;

    /// Restores the policy's invariants after `node` was linked in as a leaf.
    fn after_insert<K, V>(tree: &mut Tree<K, V, Self>, node: NodeRef) -> Result<()>;

    /// Restores the policy's invariants after a node was spliced out.
    fn after_delete<K, V>(tree: &mut Tree<K, V, Self>, removed: &Removed<Self::Meta>) -> Result<()>;

    /// Verifies the policy's invariants over the whole tree.
    fn check<K, V>(tree: &Tree<K, V, Self>) -> Result<()>;
}

/// A plain binary search tree: no metadata, no fix-up.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbalanced;

impl Sealed for Unbalanced {}

impl Balance for Unbalanced {
    type Meta = ();

    const SENTINEL: () = ();
    const FRESH: () = ();

    fn after_insert<K, V>(_tree: &mut Tree<K, V, Self>, _node: NodeRef) -> Result<()> {
        Ok(())
    }

    fn after_delete<K, V>(_tree: &mut Tree<K, V, Self>, _removed: &Removed<()>) -> Result<()> {
        Ok(())
    }

    fn check<K, V>(_tree: &Tree<K, V, Self>) -> Result<()> {
        Ok(())
    }
}
