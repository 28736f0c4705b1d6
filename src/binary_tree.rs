use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::Value;
use crate::error::InvariantError;
use crate::tree::TreeOps;

/// An unbalanced binary search tree of distinct [`Value`]s.
///
/// Every node owns its two children and keeps a non-owning link back to its
/// parent, so neighbours in sorted order can be reached by climbing as well
/// as by descending. Nothing is ever rotated: inserting sorted input yields a
/// chain as tall as the tree is long.
pub struct OrderedTree {
    root: Link,
    len: usize,
    _marker: PhantomData<Box<Node>>,
}

struct Node {
    value: Value,
    parent: Link,
    left: Link,
    right: Link,
}

// INVARIANT: every `NonNull<Node>` stored in a tree was produced by
// `Node::alloc`, is reachable from exactly one owning link and stays live
// until `free` is called on it during removal.
type Link = Option<NonNull<Node>>;

/// A borrowed handle to a node stored in an [`OrderedTree`].
///
/// Handles compare by node identity, not by value.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    ptr: NonNull<Node>,
    _marker: PhantomData<&'a Node>,
}

/// In-order iterator over the values of a tree.
pub struct Iter<'a> {
    next: Link,
    remaining: usize,
    _marker: PhantomData<&'a Node>,
}

/// Owning in-order iterator, draining the tree from its minimum.
pub struct IntoIter {
    tree: OrderedTree,
}

impl TreeOps for OrderedTree {
    fn insert(&mut self, value: Value) -> bool {
        let Some(mut cur) = self.root else {
            self.root = Some(Node::alloc(value, None));
            self.len += 1;
            return true;
        };

        loop {
            // SAFETY: `cur` is reachable from the root, so it is live.
            let node = unsafe { cur.as_mut() };
            let slot = match value.cmp(&node.value) {
                Ordering::Equal => {
                    tracing::trace!("discarding duplicate insert of {value}");
                    return false;
                }
                Ordering::Less => &mut node.left,
                Ordering::Greater => &mut node.right,
            };

            match *slot {
                Some(next) => cur = next,
                None => {
                    *slot = Some(Node::alloc(value, Some(cur)));
                    self.len += 1;
                    return true;
                }
            }
        }
    }

    fn search(&self, value: Value) -> bool {
        self.find_node(value).is_some()
    }

    fn remove(&mut self, value: Value) -> bool {
        let Some(ptr) = self.find_node(value) else {
            tracing::debug!("no node holds {value}, nothing removed");
            return false;
        };

        self.remove_node(ptr);
        true
    }

    fn len(&self) -> usize {
        self.len
    }

    fn min(&self) -> Option<Value> {
        // SAFETY: `leftmost` only returns live nodes of this tree.
        self.root.map(|root| unsafe { leftmost(root).as_ref().value })
    }

    fn max(&self) -> Option<Value> {
        // SAFETY: `rightmost` only returns live nodes of this tree.
        self.root.map(|root| unsafe { rightmost(root).as_ref().value })
    }
}

impl OrderedTree {
    pub fn new() -> Self {
        OrderedTree {
            root: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Inserts `value` by recursive descent.
    ///
    /// Produces exactly the tree [`TreeOps::insert`] would for the same input
    /// sequence.
    pub fn insert_recursive(&mut self, value: Value) -> bool {
        let inserted = Self::insert_below(&mut self.root, None, value);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    fn insert_below(slot: &mut Link, parent: Link, value: Value) -> bool {
        let Some(mut ptr) = *slot else {
            *slot = Some(Node::alloc(value, parent));
            return true;
        };

        // SAFETY: `ptr` is reachable from the root, so it is live.
        let node = unsafe { ptr.as_mut() };
        match value.cmp(&node.value) {
            Ordering::Equal => {
                tracing::trace!("discarding duplicate insert of {value}");
                false
            }
            Ordering::Less => Self::insert_below(&mut node.left, Some(ptr), value),
            Ordering::Greater => Self::insert_below(&mut node.right, Some(ptr), value),
        }
    }

    /// Returns a handle to the node holding `value`, if any.
    pub fn find(&self, value: Value) -> Option<NodeRef<'_>> {
        self.find_node(value).map(NodeRef::new)
    }

    /// Value stored immediately before `value` in sorted order.
    ///
    /// Absent when `value` is not stored or is the minimum.
    pub fn predecessor(&self, value: Value) -> Option<Value> {
        self.find(value)?.predecessor().map(|node| node.value())
    }

    /// Value stored immediately after `value` in sorted order.
    ///
    /// Absent when `value` is not stored or is the maximum.
    pub fn successor(&self, value: Value) -> Option<Value> {
        self.find(value)?.successor().map(|node| node.value())
    }

    pub fn root(&self) -> Option<Value> {
        self.root_node().map(|node| node.value())
    }

    pub fn root_node(&self) -> Option<NodeRef<'_>> {
        self.root.map(NodeRef::new)
    }

    /// Number of edges on the longest root-to-leaf path, `None` when empty.
    pub fn height(&self) -> Option<usize> {
        let root = self.root?;
        let mut height = 0;
        let mut level = vec![root];
        loop {
            let mut next = Vec::new();
            for ptr in level {
                // SAFETY: nodes queued here were reached from the root.
                let node = unsafe { ptr.as_ref() };
                next.extend(node.left);
                next.extend(node.right);
            }
            if next.is_empty() {
                return Some(height);
            }
            height += 1;
            level = next;
        }
    }

    /// Values in breadth-first order, front to back.
    pub fn traverse(&self) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.len);
        let mut queue: VecDeque<NonNull<Node>> = self.root.into_iter().collect();
        while let Some(ptr) = queue.pop_front() {
            // SAFETY: nodes queued here were reached from the root.
            let node = unsafe { ptr.as_ref() };
            values.push(node.value);
            queue.extend(node.left);
            queue.extend(node.right);
        }
        values
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.root.map(leftmost),
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    pub fn clear(&mut self) {
        while let Some(ptr) = self.root {
            self.remove_node(ptr);
        }
    }

    /// Walks the whole tree and reports the first broken structural invariant.
    ///
    /// Checks strict ordering of every subtree, parent links of every child,
    /// the absence of a parent on the root and that the recorded size matches
    /// the number of reachable nodes.
    pub fn validate(&self) -> Result<(), InvariantError> {
        let Some(root) = self.root else {
            if self.len != 0 {
                return Err(InvariantError::SizeMismatch {
                    recorded: self.len,
                    reachable: 0,
                });
            }
            return Ok(());
        };

        // SAFETY: the root is live while the tree is borrowed.
        let root_node = unsafe { root.as_ref() };
        if root_node.parent.is_some() {
            return Err(InvariantError::RootHasParent {
                value: root_node.value,
            });
        }

        let mut reachable = 0;
        let mut stack: Vec<(NonNull<Node>, Option<Value>, Option<Value>)> =
            vec![(root, None, None)];
        while let Some((ptr, lower, upper)) = stack.pop() {
            reachable += 1;
            // a cycle or shared subtree would otherwise never terminate
            if reachable > self.len {
                return Err(InvariantError::SizeMismatch {
                    recorded: self.len,
                    reachable,
                });
            }

            // SAFETY: only children of visited nodes are pushed.
            let node = unsafe { ptr.as_ref() };
            if lower.is_some_and(|lower| node.value <= lower)
                || upper.is_some_and(|upper| node.value >= upper)
            {
                return Err(InvariantError::OutOfOrder {
                    value: node.value,
                    lower,
                    upper,
                });
            }

            let children = [
                (node.left, lower, Some(node.value)),
                (node.right, Some(node.value), upper),
            ];
            for (child, lower, upper) in children {
                let Some(child_ptr) = child else {
                    continue;
                };
                // SAFETY: children of live nodes are live.
                let child_node = unsafe { child_ptr.as_ref() };
                if child_node.parent != Some(ptr) {
                    return Err(InvariantError::BrokenParentLink {
                        parent: node.value,
                        child: child_node.value,
                    });
                }
                stack.push((child_ptr, lower, upper));
            }
        }

        if reachable != self.len {
            return Err(InvariantError::SizeMismatch {
                recorded: self.len,
                reachable,
            });
        }
        Ok(())
    }

    fn find_node(&self, value: Value) -> Link {
        let mut cur = self.root;
        while let Some(ptr) = cur {
            // SAFETY: `ptr` is reachable from the root, so it is live.
            let node = unsafe { ptr.as_ref() };
            match value.cmp(&node.value) {
                Ordering::Less => cur = node.left,
                Ordering::Greater => cur = node.right,
                Ordering::Equal => return cur,
            }
        }
        None
    }

    /// Unlinks the node at `ptr` and returns the value it held on entry.
    fn remove_node(&mut self, ptr: NonNull<Node>) -> Value {
        // SAFETY: callers only pass nodes found in this tree.
        let (value, left, right) = unsafe {
            let node = ptr.as_ref();
            (node.value, node.left, node.right)
        };

        match (left, right) {
            (Some(_), Some(_)) => self.remove_with_two_children(ptr),
            (None, None) => self.remove_leaf(ptr),
            _ => self.remove_with_one_child(ptr),
        }

        self.len -= 1;
        value
    }

    fn remove_leaf(&mut self, ptr: NonNull<Node>) {
        // SAFETY: callers only pass nodes found in this tree.
        let node = unsafe { ptr.as_ref() };
        assert!(
            node.left.is_none() && node.right.is_none(),
            "leaf removal called on node holding {} which has children",
            node.value
        );

        self.replace_in_parent(ptr, None);
        free(ptr);
    }

    fn remove_with_one_child(&mut self, ptr: NonNull<Node>) {
        // SAFETY: callers only pass nodes found in this tree.
        let node = unsafe { ptr.as_ref() };
        let replacement = match (node.left, node.right) {
            (Some(child), None) | (None, Some(child)) => child,
            _ => panic!(
                "single-child removal called on node holding {} without exactly one child",
                node.value
            ),
        };

        self.replace_in_parent(ptr, Some(replacement));
        free(ptr);
    }

    /// Overwrites the node's value with its predecessor's, then unlinks the
    /// predecessor node. The node at `ptr` keeps its identity and position.
    fn remove_with_two_children(&mut self, mut ptr: NonNull<Node>) {
        // SAFETY: callers only pass nodes found in this tree.
        let node = unsafe { ptr.as_ref() };
        assert!(
            node.left.is_some() && node.right.is_some(),
            "two-child removal called on node holding {} without two children",
            node.value
        );

        let pred_ptr = predecessor(ptr).expect("node with a left subtree has a predecessor");
        // SAFETY: the predecessor lives in the left subtree, distinct from `ptr`.
        let (pred_value, pred_has_child) = unsafe {
            let pred = pred_ptr.as_ref();
            (pred.value, pred.left.is_some() || pred.right.is_some())
        };

        tracing::debug!(
            "removing {} by relocating its predecessor {pred_value}",
            node.value
        );
        // SAFETY: no other reference to this node is alive.
        unsafe { ptr.as_mut().value = pred_value };

        if pred_has_child {
            self.remove_with_one_child(pred_ptr);
        } else {
            self.remove_leaf(pred_ptr);
        }
    }

    /// Points whichever link owned `ptr` at `replacement` instead, and
    /// re-parents `replacement` accordingly.
    fn replace_in_parent(&mut self, ptr: NonNull<Node>, replacement: Link) {
        // SAFETY: `ptr` is live and its parent, if any, is live too.
        unsafe {
            let parent = ptr.as_ref().parent;
            if let Some(mut replacement_ptr) = replacement {
                replacement_ptr.as_mut().parent = parent;
            }

            match parent {
                None => self.root = replacement,
                Some(mut parent_ptr) => {
                    let parent_node = parent_ptr.as_mut();
                    if parent_node.left == Some(ptr) {
                        parent_node.left = replacement;
                    } else {
                        parent_node.right = replacement;
                    }
                }
            }
        }
    }
}

impl Node {
    fn alloc(value: Value, parent: Link) -> NonNull<Node> {
        NonNull::from(Box::leak(Box::new(Node {
            value,
            parent,
            left: None,
            right: None,
        })))
    }
}

fn free(ptr: NonNull<Node>) {
    // SAFETY: `ptr` came from `Box::leak` in `Node::alloc` and has just been
    // unlinked, so this is the only remaining reference to it.
    drop(unsafe { Box::from_raw(ptr.as_ptr()) });
}

fn leftmost(mut cur: NonNull<Node>) -> NonNull<Node> {
    // SAFETY: links only ever point at live nodes.
    while let Some(left) = unsafe { cur.as_ref().left } {
        cur = left;
    }
    cur
}

fn rightmost(mut cur: NonNull<Node>) -> NonNull<Node> {
    // SAFETY: links only ever point at live nodes.
    while let Some(right) = unsafe { cur.as_ref().right } {
        cur = right;
    }
    cur
}

fn predecessor(ptr: NonNull<Node>) -> Link {
    // SAFETY: links only ever point at live nodes.
    match unsafe { ptr.as_ref().left } {
        Some(left) => Some(rightmost(left)),
        None => climb_to_predecessor(ptr),
    }
}

fn successor(ptr: NonNull<Node>) -> Link {
    // SAFETY: links only ever point at live nodes.
    match unsafe { ptr.as_ref().right } {
        Some(right) => Some(leftmost(right)),
        None => climb_to_successor(ptr),
    }
}

/// Climbs while coming from a left branch; the first parent reached from a
/// right branch is the predecessor.
fn climb_to_predecessor(mut cur: NonNull<Node>) -> Link {
    // SAFETY: parent links only ever point at live nodes.
    unsafe {
        while let Some(parent) = cur.as_ref().parent {
            if parent.as_ref().left != Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
    }
    None
}

fn climb_to_successor(mut cur: NonNull<Node>) -> Link {
    // SAFETY: parent links only ever point at live nodes.
    unsafe {
        while let Some(parent) = cur.as_ref().parent {
            if parent.as_ref().right != Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
    }
    None
}

impl<'a> NodeRef<'a> {
    fn new(ptr: NonNull<Node>) -> Self {
        NodeRef {
            ptr,
            _marker: PhantomData,
        }
    }

    fn node(&self) -> &'a Node {
        // SAFETY: the tree is borrowed for 'a, so no node can be freed or
        // rewired while this handle exists.
        unsafe { self.ptr.as_ref() }
    }

    pub fn value(&self) -> Value {
        self.node().value
    }

    /// `None` for the root.
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(NodeRef::new)
    }

    pub fn left(&self) -> Option<NodeRef<'a>> {
        self.node().left.map(NodeRef::new)
    }

    pub fn right(&self) -> Option<NodeRef<'a>> {
        self.node().right.map(NodeRef::new)
    }

    /// The node immediately before this one in sorted order.
    pub fn predecessor(&self) -> Option<NodeRef<'a>> {
        predecessor(self.ptr).map(NodeRef::new)
    }

    /// The node immediately after this one in sorted order.
    pub fn successor(&self) -> Option<NodeRef<'a>> {
        successor(self.ptr).map(NodeRef::new)
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("NodeRef")
            .field("value", &self.value())
            .field("parent", &self.parent().map(|node| node.value()))
            .finish()
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        let ptr = self.next?;
        self.next = successor(ptr);
        self.remaining -= 1;
        // SAFETY: the tree is borrowed for 'a.
        Some(unsafe { ptr.as_ref().value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl Iterator for IntoIter {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        let min = self.tree.root.map(leftmost)?;
        Some(self.tree.remove_node(min))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len, Some(self.tree.len))
    }
}

impl ExactSizeIterator for IntoIter {}

impl IntoIterator for OrderedTree {
    type Item = Value;
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter { tree: self }
    }
}

impl<'a> IntoIterator for &'a OrderedTree {
    type Item = Value;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl Extend<Value> for OrderedTree {
    fn extend<I: IntoIterator<Item = Value>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl FromIterator<Value> for OrderedTree {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut tree = OrderedTree::new();
        tree.extend(iter);
        tree
    }
}

impl Default for OrderedTree {
    fn default() -> Self {
        OrderedTree::new()
    }
}

impl Drop for OrderedTree {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Display for OrderedTree {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_list().entries(self.traverse()).finish()
    }
}

impl fmt::Debug for OrderedTree {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: the root is live while the tree is borrowed.
        fmt.debug_struct("OrderedTree")
            .field("len", &self.len)
            .field("root", &self.root.map(|ptr| unsafe { ptr.as_ref() }))
            .finish()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: links of a live node point at live nodes.
        fmt.debug_struct("Node")
            .field("value", &self.value)
            .field(
                "parent",
                &self.parent.map(|ptr| unsafe { ptr.as_ref().value }),
            )
            .field("left", &self.left.map(|ptr| unsafe { ptr.as_ref() }))
            .field("right", &self.right.map(|ptr| unsafe { ptr.as_ref() }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::seq::SliceRandom;

    use super::*;

    fn tree_of(values: &[Value]) -> OrderedTree {
        let mut tree = OrderedTree::new();
        for &value in values {
            tree.insert(value);
        }
        tree
    }

    fn shuffled(count: Value, seed: u64) -> Vec<Value> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut values: Vec<Value> = (0..count).collect();
        values.shuffle(&mut rng);
        values
    }

    #[test]
    fn empty_after_creation() {
        let mut tree = OrderedTree::new();
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.min(), None);
        assert_eq!(tree.max(), None);
        assert_eq!(tree.root(), None);
        assert_eq!(tree.height(), None);
        assert!(tree.traverse().is_empty());
        assert!(!tree.remove(42));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn insert_yields_sorted_order() {
        let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);
        assert_eq!(tree.iter().collect::<Vec<_>>(), [1, 3, 4, 5, 7, 8, 9]);
        assert_eq!(tree.traverse(), [5, 3, 8, 1, 4, 7, 9]);
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.height(), Some(2));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn remove_root_with_two_children() {
        let mut tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);
        assert!(tree.remove(5));
        assert_eq!(tree.root(), Some(4));
        assert_eq!(tree.iter().collect::<Vec<_>>(), [1, 3, 4, 7, 8, 9]);
        assert_eq!(tree.traverse(), [4, 3, 8, 1, 7, 9]);
        assert_eq!(tree.len(), 6);
        assert!(!tree.search(5));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn two_child_removal_keeps_node_in_place() {
        let mut tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);
        let root_before = tree.root;
        let left_before = tree.find(3).map(|node| node.ptr);

        assert!(tree.remove(5));
        assert_eq!(tree.root, root_before);
        assert_eq!(tree.find(3).map(|node| node.ptr), left_before);
        assert_eq!(tree.find(3).and_then(|node| node.right()), None);
    }

    #[test]
    fn two_child_removal_with_predecessor_having_child() {
        // predecessor of 10 is 6, which still has left child 5
        let mut tree = tree_of(&[10, 4, 15, 2, 6, 5]);
        assert!(tree.remove(10));
        assert_eq!(tree.root(), Some(6));
        assert_eq!(tree.traverse(), [6, 4, 15, 2, 5]);
        let five = tree.find(5).unwrap();
        assert_eq!(five.parent().map(|node| node.value()), Some(4));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut tree = OrderedTree::new();
        assert!(tree.insert(10));
        assert!(!tree.insert(10));
        assert_eq!(tree.len(), 1);
        assert!(tree.search(10));

        let mut tree = tree_of(&[5, 3, 8]);
        let shape = tree.traverse();
        assert!(!tree.insert(3));
        assert!(!tree.insert_recursive(8));
        assert_eq!(tree.traverse(), shape);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn remove_root_with_one_child() {
        let mut tree = tree_of(&[2, 1]);
        assert!(tree.remove(2));
        assert_eq!(tree.root(), Some(1));
        assert!(!tree.search(2));
        assert_eq!(tree.root_node().and_then(|node| node.parent()), None);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn remove_root_of_right_chain() {
        let mut tree = tree_of(&[1, 2, 3]);
        assert_eq!(tree.height(), Some(2));
        assert!(tree.remove(1));
        assert_eq!(tree.root(), Some(2));
        assert_eq!(tree.traverse(), [2, 3]);
        assert_eq!(tree.height(), Some(1));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn remove_leaf_and_last_node() {
        let mut tree = tree_of(&[2, 1, 3]);
        assert!(tree.remove(3));
        assert_eq!(tree.find(2).and_then(|node| node.right()), None);
        assert!(tree.remove(1));
        assert!(tree.remove(2));
        assert_eq!(tree.root(), None);
        assert!(tree.is_empty());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn remove_missing_value_leaves_tree_unchanged() {
        let mut tree = tree_of(&[5, 3, 8]);
        assert!(!tree.remove(4));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.traverse(), [5, 3, 8]);
    }

    #[test]
    fn recursive_insert_matches_iterative() {
        let mut values = shuffled(100, 42);
        values.extend(shuffled(50, 7));

        let iterative = tree_of(&values);
        let mut recursive = OrderedTree::new();
        for &value in &values {
            recursive.insert_recursive(value);
        }

        assert_eq!(recursive.len(), 100);
        assert_eq!(recursive.len(), iterative.len());
        assert_eq!(recursive.traverse(), iterative.traverse());
        assert!(recursive.validate().is_ok());
    }

    #[test]
    fn node_links_are_consistent() {
        let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);
        let three = tree.find(3).unwrap();
        assert_eq!(three.parent(), tree.root_node());
        assert_eq!(three.left().map(|node| node.value()), Some(1));
        assert_eq!(three.right().map(|node| node.value()), Some(4));
        assert_eq!(three.left().and_then(|node| node.parent()), Some(three));
        assert!(tree.find(6).is_none());
    }

    #[test]
    fn predecessor_and_successor() {
        let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);

        // down into the left subtree, then toward its maximum
        assert_eq!(tree.predecessor(5), Some(4));
        assert_eq!(tree.predecessor(8), Some(7));
        // climbing out of a left branch
        assert_eq!(tree.predecessor(7), Some(5));
        assert_eq!(tree.predecessor(4), Some(3));
        assert_eq!(tree.predecessor(1), None);

        assert_eq!(tree.successor(5), Some(7));
        assert_eq!(tree.successor(3), Some(4));
        assert_eq!(tree.successor(4), Some(5));
        assert_eq!(tree.successor(7), Some(8));
        assert_eq!(tree.successor(9), None);

        assert_eq!(tree.predecessor(6), None);
        assert_eq!(tree.successor(6), None);
    }

    #[test]
    fn predecessor_walk_matches_reverse_order() {
        let tree = tree_of(&shuffled(64, 3));
        let mut walked = Vec::new();
        let mut cur = tree.find(63);
        while let Some(node) = cur {
            walked.push(node.value());
            cur = node.predecessor();
        }
        assert_eq!(walked, (0..64).rev().collect::<Vec<_>>());
    }

    #[test]
    fn min_max_track_contents() {
        let mut tree = OrderedTree::new();
        let mut model = BTreeSet::new();
        for value in shuffled(200, 11) {
            tree.insert(value);
            model.insert(value);
            assert_eq!(tree.min(), model.first().copied());
            assert_eq!(tree.max(), model.last().copied());
        }
        for value in shuffled(200, 12) {
            assert!(tree.remove(value));
            model.remove(&value);
            assert_eq!(tree.min(), model.first().copied());
            assert_eq!(tree.max(), model.last().copied());
        }
        assert_eq!(tree.min(), None);
        assert_eq!(tree.max(), None);
    }

    #[test]
    fn random_removals_preserve_structure() {
        let mut tree = tree_of(&shuffled(300, 42));
        let removals = shuffled(300, 43);
        for (i, &value) in removals.iter().enumerate() {
            assert!(tree.remove(value));
            assert!(!tree.remove(value));
            assert_eq!(tree.len(), 300 - i - 1);
            assert!(!tree.search(value), "{tree:?}");
            assert!(tree.validate().is_ok(), "{tree:?}");
        }
        for &value in &removals[..10] {
            assert!(!tree.search(value));
        }
    }

    #[test]
    fn sorted_insert_degenerates_to_chain() {
        let tree = tree_of(&(0..10).collect::<Vec<_>>());
        assert_eq!(tree.height(), Some(9));
        assert_eq!(tree.traverse(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn iter_desc_insert() {
        let tree = tree_of(&(0..10).rev().collect::<Vec<_>>());
        let mut iter = tree.iter();
        assert_eq!(iter.len(), 10);
        for i in 0..10 {
            assert_eq!(iter.next(), Some(i));
        }
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn into_iter_drains_in_order() {
        let tree = tree_of(&shuffled(50, 5));
        let values: Vec<_> = tree.into_iter().collect();
        assert_eq!(values, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn collect_and_extend_drop_duplicates() {
        let mut tree: OrderedTree = [3, 1, 3, 2].into_iter().collect();
        assert_eq!(tree.len(), 3);
        tree.extend([2, 4]);
        assert_eq!((&tree).into_iter().collect::<Vec<_>>(), [1, 2, 3, 4]);
    }

    #[test]
    fn clear_empties_tree() {
        let mut tree = tree_of(&shuffled(20, 1));
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn display_is_level_order() {
        let tree = tree_of(&[5, 3, 8, 1]);
        assert_eq!(tree.to_string(), "[5, 3, 8, 1]");
    }

    #[test]
    fn validate_reports_size_mismatch() {
        let mut tree = tree_of(&[2, 1, 3]);
        tree.len = 4;
        assert_eq!(
            tree.validate(),
            Err(InvariantError::SizeMismatch {
                recorded: 4,
                reachable: 3,
            })
        );
        tree.len = 3;
    }

    #[test]
    fn validate_reports_out_of_order_and_broken_links() {
        let mut tree = tree_of(&[2, 1, 3]);
        let mut left = tree.find(1).unwrap().ptr;

        unsafe { left.as_mut().value = 5 };
        assert!(matches!(
            tree.validate(),
            Err(InvariantError::OutOfOrder { value: 5, .. })
        ));
        unsafe { left.as_mut().value = 1 };

        unsafe { left.as_mut().parent = None };
        assert_eq!(
            tree.validate(),
            Err(InvariantError::BrokenParentLink {
                parent: 2,
                child: 1,
            })
        );
        unsafe { left.as_mut().parent = tree.root };
        assert!(tree.validate().is_ok());
    }

    #[test]
    #[should_panic(expected = "leaf removal")]
    fn leaf_removal_rejects_inner_node() {
        let mut tree = tree_of(&[2, 1]);
        let root = tree.root.unwrap();
        tree.remove_leaf(root);
    }
}
