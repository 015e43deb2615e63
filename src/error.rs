use thiserror::Error;

use crate::non_concurrent::NodeRef;

pub type Result<T> = std::result::Result<T, TreeError>;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The key does not compare equal to itself (e.g. `f64::NAN`), so it has no place in the order.
    #[error("key is not comparable with itself")]
    InvalidKey,

    #[error("node {0:?} has no parent")]
    NoParent(NodeRef),

    #[error("node {node:?} claims {parent:?} as its parent, but is neither of its children")]
    NotAChild { node: NodeRef, parent: NodeRef },

    #[error("invariant violated at {node:?}: {what}")]
    Invariant { node: NodeRef, what: &'static str },
}
