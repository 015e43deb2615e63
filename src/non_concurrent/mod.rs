//! Single-threaded ordered containers.
//!
//! [`Tree`] is a sentinel-terminated binary search tree stored in an arena. How it stays
//! balanced is a type parameter: [`Unbalanced`], [`Avl`] or [`RedBlack`]. [`TreeMap`] pairs a
//! red-black tree with a hash map for constant-time lookups.

mod avl;
mod balance;
mod iter;
mod node;
mod rbtree;
mod tree;
mod tree_map;

pub use avl::{Avl, AvlTree};
pub use balance::{Balance, Unbalanced};
pub use iter::{Iter, Nodes};
pub use node::NodeRef;
pub use rbtree::{Color, RBTree, RedBlack};
pub use tree::{Removed, Tree};
pub use tree_map::TreeMap;
