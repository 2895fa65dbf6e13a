use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::report::key::WordId;

/// Interning dictionary mapping metric words to dense integer ids.
///
/// Producers intern words to build report keys; reporting resolves ids back
/// to text when rendering. Safe for concurrent use from any thread: the
/// word-to-id map is sharded, the id-to-word table sits behind a read-write
/// lock because resolution vastly outnumbers interning.
pub struct Dictionary {
    ids: DashMap<Arc<str>, WordId>,
    words: RwLock<Vec<Arc<str>>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            ids: DashMap::new(),
            words: RwLock::new(Vec::new()),
        }
    }

    /// Returns the id for `word`, interning it first if unseen.
    pub fn get_or_add(&self, word: &str) -> WordId {
        if let Some(id) = self.ids.get(word) {
            return *id;
        }

        // Interning is rare past warm-up. Take the table lock before the
        // map entry so a handed-out id always resolves.
        let mut words = self.words.write();
        match self.ids.entry(Arc::from(word)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = words.len() as WordId;
                words.push(entry.key().clone());
                entry.insert(id);
                id
            }
        }
    }

    /// Resolves an id to its word.
    ///
    /// Unknown ids resolve to the empty string so key rendering never fails
    /// on ids this dictionary has not seen.
    pub fn get_word(&self, id: WordId) -> Arc<str> {
        self.words
            .read()
            .get(id as usize)
            .cloned()
            .unwrap_or_else(|| Arc::from(""))
    }

    /// Number of interned words.
    pub fn len(&self) -> usize {
        self.words.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary").field("len", &self.len()).finish()
    }
}
