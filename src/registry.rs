//! Bookkeeping for pinned windows and their markers.

use crate::locator::WindowHandle;
use crate::marker::MarkerOverlay;

/// One pinned window. The marker is owned exclusively by the entry,
/// so a marker can never outlive (or predate) its registry slot.
pub struct PinnedEntry {
    pub window: WindowHandle,
    pub marker: Box<dyn MarkerOverlay>,
}

impl std::fmt::Debug for PinnedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedEntry")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered collection of pinned windows, newest last. At
/// most one entry per window handle.
#[derive(Default)]
pub struct PinRegistry {
    entries: Vec<PinnedEntry>,
}

impl PinRegistry {
    pub fn contains(&self, window: WindowHandle) -> bool {
        self.entries.iter().any(|e| e.window == window)
    }

    /// Insert an entry, rejecting duplicates. Returns the entry back
    /// to the caller when the handle is already registered.
    pub fn insert(&mut self, entry: PinnedEntry) -> Result<(), PinnedEntry> {
        if self.contains(entry.window) {
            return Err(entry);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Remove and return the most recently pinned entry.
    pub fn pop(&mut self) -> Option<PinnedEntry> {
        self.entries.pop()
    }

    /// Remove a specific window's entry, wherever it sits in the
    /// order. Used when a pinned window disappears underneath us.
    pub fn remove(&mut self, window: WindowHandle) -> Option<PinnedEntry> {
        let idx = self.entries.iter().position(|e| e.window == window)?;
        Some(self.entries.remove(idx))
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut PinnedEntry> {
        self.entries.iter_mut()
    }

    pub fn windows(&self) -> Vec<WindowHandle> {
        self.entries.iter().map(|e| e.window).collect()
    }

    pub fn drain(&mut self) -> Vec<PinnedEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::NoopMarker;

    fn entry(id: isize) -> PinnedEntry {
        PinnedEntry {
            window: WindowHandle(id),
            marker: Box::new(NoopMarker),
        }
    }

    #[test]
    fn rejects_duplicate_handles() {
        let mut registry = PinRegistry::default();
        assert!(registry.insert(entry(1)).is_ok());
        assert!(registry.insert(entry(1)).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn pop_is_lifo() {
        let mut registry = PinRegistry::default();
        registry.insert(entry(1)).unwrap();
        registry.insert(entry(2)).unwrap();
        registry.insert(entry(3)).unwrap();

        assert_eq!(registry.pop().map(|e| e.window), Some(WindowHandle(3)));
        assert_eq!(registry.pop().map(|e| e.window), Some(WindowHandle(2)));
        assert_eq!(registry.windows(), vec![WindowHandle(1)]);
    }

    #[test]
    fn remove_preserves_order_of_the_rest() {
        let mut registry = PinRegistry::default();
        registry.insert(entry(1)).unwrap();
        registry.insert(entry(2)).unwrap();
        registry.insert(entry(3)).unwrap();

        assert!(registry.remove(WindowHandle(2)).is_some());
        assert!(registry.remove(WindowHandle(2)).is_none());
        assert_eq!(registry.windows(), vec![WindowHandle(1), WindowHandle(3)]);
        assert_eq!(registry.pop().map(|e| e.window), Some(WindowHandle(3)));
    }

    #[test]
    fn drain_empties_the_registry() {
        let mut registry = PinRegistry::default();
        registry.insert(entry(1)).unwrap();
        registry.insert(entry(2)).unwrap();

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }
}
