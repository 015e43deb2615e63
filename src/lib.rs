#![deny(unsafe_code)]

// error types shared by every tree
pub mod error;

// not concurrent
pub mod non_concurrent;

pub use error::{Result, TreeError};
pub use non_concurrent::{
    Avl, AvlTree, Balance, Color, Iter, NodeRef, Nodes, RBTree, RedBlack, Removed, Tree, TreeMap,
    Unbalanced,
};
