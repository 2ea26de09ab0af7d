//! Point-in-time view of the series namespace

use std::sync::Arc;

use crate::types::{SeriesEntry, SeriesId};

/// Immutable snapshot of all series registered at one instant
///
/// Entries are stored in id order, so `entries[i].id() == i`. A snapshot
/// never changes after it is taken; series registered later are simply not
/// part of it.
#[derive(Debug, Clone, Default)]
pub struct NamespaceSnapshot {
    entries: Arc<[Arc<SeriesEntry>]>,
}

impl NamespaceSnapshot {
    /// Build a snapshot from entries in id order
    pub fn new(entries: Vec<Arc<SeriesEntry>>) -> Self {
        debug_assert!(entries
            .iter()
            .enumerate()
            .all(|(i, e)| e.id() as usize == i));
        Self {
            entries: entries.into(),
        }
    }

    /// Number of series in the snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a series by id
    pub fn get(&self, id: SeriesId) -> Option<&Arc<SeriesEntry>> {
        self.entries.get(id as usize)
    }

    /// Look up a series by exact name (linear scan)
    pub fn find(&self, name: &str) -> Option<&Arc<SeriesEntry>> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Iterate over all entries in id order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SeriesEntry>> {
        self.entries.iter()
    }

    /// Entries as a slice (used for parallel matching)
    pub fn entries(&self) -> &[Arc<SeriesEntry>] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeriesType;

    fn snapshot(names: &[&str]) -> NamespaceSnapshot {
        NamespaceSnapshot::new(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| Arc::new(SeriesEntry::new(i as SeriesId, (*n).into(), SeriesType::Float)))
                .collect(),
        )
    }

    #[test]
    fn test_lookup() {
        let snap = snapshot(&["a1", "a2", "b1"]);
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.get(1).map(|e| e.name()), Some("a2"));
        assert_eq!(snap.find("b1").map(|e| e.id()), Some(2));
        assert!(snap.find("c1").is_none());
        assert!(snap.get(3).is_none());
    }

    #[test]
    fn test_empty() {
        let snap = NamespaceSnapshot::default();
        assert!(snap.is_empty());
        assert_eq!(snap.iter().count(), 0);
    }
}
