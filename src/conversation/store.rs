//! Append-only transcript shared between the orchestrator and readers

use super::Turn;
use std::sync::{Arc, PoisonError, RwLock};

/// Ordered, append-only list of turns.
///
/// Clones share the same transcript. Only the orchestrator appends; any
/// number of readers may take snapshots concurrently since existing entries
/// are never touched.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    turns: Arc<RwLock<Vec<Turn>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, turn: Turn) {
        self.turns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(turn);
    }

    /// Copy of the transcript as of the latest append
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<Turn> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_latest_append() {
        let store = ConversationStore::new();
        assert!(store.is_empty());
        let reader = store.clone();

        store.append(Turn::user("one"));
        assert_eq!(reader.snapshot(), vec![Turn::user("one")]);

        store.append(Turn::agent("two"));
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.last(), Some(Turn::agent("two")));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = ConversationStore::new();
        store.append(Turn::user("one"));
        let snapshot = store.snapshot();
        store.append(Turn::user("two"));
        assert_eq!(snapshot.len(), 1);
    }
}
