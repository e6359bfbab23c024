//! Write Batch
//!
//! An ordered list of pending mutations, applied to a database as one atomic
//! unit by [`Database::write`](crate::Database::write).
//!
//! A batch never touches storage on its own. It can be built before any
//! database is open, applied to several databases, and applied again; each
//! application has the same net effect.

use crate::wal::Operation;

/// Ordered set of pending puts and deletes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    operations: Vec<Operation>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a put. A later operation on the same key wins.
    pub fn put(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> &mut Self {
        self.operations.push(Operation::Put {
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        });
        self
    }

    /// Record a delete. A later operation on the same key wins.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> &mut Self {
        self.operations.push(Operation::Delete {
            key: key.as_ref().to_vec(),
        });
        self
    }

    /// Remove all recorded operations
    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Number of recorded operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    pub(crate) fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

impl<'a> IntoIterator for &'a WriteBatch {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
