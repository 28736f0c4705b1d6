use crate::Value;

/// Operations shared by ordered containers of distinct values.
pub trait TreeOps {
    /// Returns `false` and leaves the container untouched if `value` is
    /// already present.
    fn insert(&mut self, value: Value) -> bool;
    fn search(&self, value: Value) -> bool;
    fn remove(&mut self, value: Value) -> bool;
    fn len(&self) -> usize;
    fn min(&self) -> Option<Value>;
    fn max(&self) -> Option<Value>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
