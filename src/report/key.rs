use std::fmt;
use std::hash::{Hash, Hasher};

use crate::dictionary::Dictionary;

/// Dictionary word identifier.
pub type WordId = u32;

/// Maximum number of components a report key can carry.
pub const MAX_KEY_PARTS: usize = 8;

/// Fixed-arity aggregation row key: an ordered tuple of dictionary word ids.
///
/// Keys are stored inline (length plus a fixed id array) so they are plain
/// `Copy` values, cheap to hash and to hold inside table entries. Ordering
/// between keys carries no meaning; only equality and hashing do.
#[derive(Clone, Copy, Eq)]
pub struct ReportKey {
    len: u8,
    ids: [WordId; MAX_KEY_PARTS],
}

impl ReportKey {
    /// Builds a key from its components.
    ///
    /// Panics if `parts` exceeds [`MAX_KEY_PARTS`]; arity is fixed per
    /// report at configuration time, so an oversized key is a programming
    /// error.
    pub fn new(parts: &[WordId]) -> Self {
        assert!(
            parts.len() <= MAX_KEY_PARTS,
            "report key arity {} exceeds maximum {}",
            parts.len(),
            MAX_KEY_PARTS
        );

        let mut ids = [0; MAX_KEY_PARTS];
        ids[..parts.len()].copy_from_slice(parts);
        Self {
            len: parts.len() as u8,
            ids,
        }
    }

    /// The key's components, in order.
    pub fn parts(&self) -> &[WordId] {
        &self.ids[..usize::from(self.len)]
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Renders each component as `id<text>`, `|`-separated, resolving ids
    /// through the dictionary. Stable format used in logs.
    pub fn resolve(&self, dict: &Dictionary) -> String {
        use std::fmt::Write;

        let mut out = String::with_capacity(self.len() * 12);
        for (i, id) in self.parts().iter().enumerate() {
            if i > 0 {
                out.push('|');
            }
            let _ = write!(out, "{}<{}>", id, dict.get_word(*id));
        }
        out
    }
}

impl PartialEq for ReportKey {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.parts() == other.parts()
    }
}

impl Hash for ReportKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash only the populated prefix so equal keys of any arity hash
        // identically regardless of the unused tail.
        for id in self.parts() {
            state.write_u32(*id);
        }
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.parts().iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReportKey({self})")
    }
}
