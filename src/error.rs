use thiserror::Error;

use crate::Value;

/// A structural invariant of an [`OrderedTree`](crate::OrderedTree) that
/// [`validate`](crate::OrderedTree::validate) found broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("value {value} lies outside its subtree bounds (lower {lower:?}, upper {upper:?})")]
    OutOfOrder {
        value: Value,
        lower: Option<Value>,
        upper: Option<Value>,
    },
    #[error("node holding {child} does not link back to its parent holding {parent}")]
    BrokenParentLink { parent: Value, child: Value },
    #[error("root node holding {value} has a parent link")]
    RootHasParent { value: Value },
    #[error("tree records {recorded} nodes but {reachable} were reached")]
    SizeMismatch { recorded: usize, reachable: usize },
}
