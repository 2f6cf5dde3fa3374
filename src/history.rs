use crate::classes::ClassRegistry;
use crate::store::AnnotationStore;

/// One immutable deep snapshot of the session's mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub store: AnnotationStore,
    pub registry: ClassRegistry,
}

/// Linear undo/redo stack over full state snapshots.
///
/// `snapshot` is the only way state enters history and must be called after
/// every successful mutation, never speculatively. Pushing after an undo
/// discards the redo tail. Full deep copies are intentional: sessions hold
/// tens to low hundreds of annotations, so snapshot cost is negligible
/// compared to a reversible-command log.
#[derive(Debug, Default)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-copy both components, drop any redo tail, and append.
    pub fn snapshot(&mut self, store: &AnnotationStore, registry: &ClassRegistry) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(HistoryEntry {
            store: store.clone(),
            registry: registry.clone(),
        });
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry; no-op at the oldest state.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    /// Step forward one entry; no-op at the newest state.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.entries.is_empty() || self.cursor + 1 == self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
