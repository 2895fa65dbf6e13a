use std::collections::HashMap;

use super::key::ReportKey;

/// Insert-ordered map from [`ReportKey`] to an aggregated value.
///
/// Entries occupy stable slots: nothing is ever removed, so a slot index
/// stays valid for the table's whole lifetime. Snapshot cursor positions
/// are plain slot indices for exactly this reason.
pub struct ReportTable<V> {
    entries: Vec<(ReportKey, V)>,
    index: HashMap<ReportKey, usize>,
}

impl<V> ReportTable<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ReportKey) -> Option<&V> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    /// Key stored at `slot`. Panics when `slot` is out of range.
    pub fn key_at(&self, slot: usize) -> ReportKey {
        self.entries[slot].0
    }

    /// Value stored at `slot`. Panics when `slot` is out of range.
    pub fn value_at(&self, slot: usize) -> &V {
        &self.entries[slot].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReportKey, &V)> + '_ {
        self.entries.iter().map(|(key, value)| (key, value))
    }
}

impl<V: Default> ReportTable<V> {
    /// Returns the value slot for `key`, inserting a default entry on first
    /// sight. New entries append, preserving insertion order.
    pub fn entry(&mut self, key: ReportKey) -> &mut V {
        match self.index.get(&key) {
            Some(&slot) => &mut self.entries[slot].1,
            None => {
                let slot = self.entries.len();
                self.entries.push((key, V::default()));
                self.index.insert(key, slot);
                &mut self.entries[slot].1
            }
        }
    }
}

impl<V> Default for ReportTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
