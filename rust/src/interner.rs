//! Dense indexing of task ids.
//!
//! Graph algorithms work on `u32` positions into flat vectors; this index maps a
//! snapshot's string ids to those positions and back.

use rustc_hash::FxHashMap;

/// Position of a task in a [`TaskIndex`].
pub type TaskIdx = u32;

/// Bidirectional id <-> position map. Positions follow insertion order.
#[derive(Debug, Clone, Default)]
pub struct TaskIndex {
    positions: FxHashMap<String, TaskIdx>,
    ids: Vec<String>,
}

impl TaskIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Assign the next position to `id`, or `None` if it is already indexed.
    pub fn insert(&mut self, id: &str) -> Option<TaskIdx> {
        if self.positions.contains_key(id) {
            return None;
        }
        let idx = self.ids.len() as TaskIdx;
        self.ids.push(id.to_string());
        self.positions.insert(id.to_string(), idx);
        Some(idx)
    }

    #[inline]
    pub fn position(&self, id: &str) -> Option<TaskIdx> {
        self.positions.get(id).copied()
    }

    /// The id at `idx`; empty for an index this map never produced.
    #[inline]
    pub fn id(&self, idx: TaskIdx) -> &str {
        self.ids.get(idx as usize).map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut index = TaskIndex::with_capacity(4);

        assert_eq!(index.insert("design"), Some(0));
        assert_eq!(index.insert("build"), Some(1));
        assert_eq!(index.insert("design"), None);

        assert_eq!(index.position("build"), Some(1));
        assert_eq!(index.position("ship"), None);
        assert_eq!(index.id(0), "design");
        assert_eq!(index.id(7), "");
        assert_eq!(index.len(), 2);
    }
}
