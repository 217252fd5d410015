//! Ordered component registry.
//!
//! Order is precedence: earlier entries are tried first. Callers never touch
//! indices directly; they insert at the front or back and remove by kind.

use std::sync::Arc;

/// Entries expose a kind used for lookup and removal.
pub trait Kinded {
    type Kind: PartialEq + Copy;

    fn kind(&self) -> Self::Kind;
}

#[derive(Debug)]
pub struct OrderedRegistry<T> {
    entries: Vec<Arc<T>>,
}

impl<T> Default for OrderedRegistry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Kinded> OrderedRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert_at(&mut self, index: usize, entry: T) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, Arc::new(entry));
    }

    pub fn insert_first(&mut self, entry: T) {
        self.insert_at(0, entry);
    }

    pub fn append_last(&mut self, entry: T) {
        self.entries.push(Arc::new(entry));
    }

    /// Remove every entry of `kind`, preserving the order of the rest.
    /// Returns how many entries were removed.
    pub fn remove_where(&mut self, kind: T::Kind) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.kind() != kind);
        before - self.entries.len()
    }

    pub fn kinds(&self) -> Vec<T::Kind> {
        self.entries.iter().map(|entry| entry.kind()).collect()
    }

    /// Clone the current entries so callers can await on them without
    /// holding whatever lock guards the registry.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter()
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

    #[derive(Debug)]
    struct Entry(char);

    impl Kinded for Entry {
        type Kind = char;

        fn kind(&self) -> char {
            self.0
        }
    }

    fn registry(kinds: &str) -> OrderedRegistry<Entry> {
        let mut registry = OrderedRegistry::new();
        for kind in kinds.chars() {
            registry.append_last(Entry(kind));
        }
        registry
    }

    #[test]
    fn insert_first_takes_precedence() {
        let mut registry = registry("ab");
        registry.insert_first(Entry('z'));
        assert_eq!(registry.kinds(), vec!['z', 'a', 'b']);
    }

    #[test]
    fn insert_at_clamps_past_end() {
        let mut registry = registry("ab");
        registry.insert_at(10, Entry('z'));
        assert_eq!(registry.kinds(), vec!['a', 'b', 'z']);
    }

    #[test]
    fn remove_where_keeps_remaining_order() {
        let mut registry = registry("abcb");
        assert_eq!(registry.remove_where('b'), 2);
        assert_eq!(registry.kinds(), vec!['a', 'c']);
        assert_eq!(registry.remove_where('x'), 0);
    }

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let mut registry = registry("ab");
        let snapshot = registry.snapshot();
        registry.remove_where('a');
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 1);
    }
}
