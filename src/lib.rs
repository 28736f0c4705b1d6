//! An unbalanced binary search tree with parent back-links.

pub mod binary_tree;
pub mod error;
pub mod tree;

pub use binary_tree::{IntoIter, Iter, NodeRef, OrderedTree};
pub use error::InvariantError;
pub use tree::TreeOps;

pub type Value = i64;
