//! Per-message reference tables.
//!
//! Encoding keeps maps from content/identity to the index assigned on first
//! write; decoding keeps positional lists indexed by back-reference. All
//! tables are reset at the start of each top-level message.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{AmfError, Result};
use crate::object::Traits;
use crate::value::{NodeId, Value};

/// Append-only index assignment for the write side.
#[derive(Debug)]
pub(crate) struct WriteTable<K> {
    indices: HashMap<K, usize>,
    next: usize,
}

impl<K: Hash + Eq> Default for WriteTable<K> {
    fn default() -> Self {
        Self {
            indices: HashMap::new(),
            next: 0,
        }
    }
}

impl<K: Hash + Eq> WriteTable<K> {
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<usize>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.indices.get(key).copied()
    }

    /// Assign the next index to `key` unless it already has one.
    pub(crate) fn add(&mut self, key: K) {
        if let std::collections::hash_map::Entry::Vacant(slot) = self.indices.entry(key) {
            slot.insert(self.next);
            self.next += 1;
        }
    }

    /// Consume an index without a key, keeping later indices aligned with the reader.
    pub(crate) fn skip(&mut self) {
        self.next += 1;
    }

    pub(crate) fn clear(&mut self) {
        self.indices.clear();
        self.next = 0;
    }
}

/// Reference tables used by the serializer.
#[derive(Debug, Default)]
pub(crate) struct WriteCaches {
    pub(crate) strings: WriteTable<String>,
    pub(crate) objects: WriteTable<NodeId>,
    pub(crate) traits: WriteTable<Traits>,
}

impl WriteCaches {
    /// Strings are cached by content; the empty string is never cached.
    pub(crate) fn add_string(&mut self, s: &str) {
        if !s.is_empty() {
            self.strings.add(s.to_string());
        }
    }

    pub(crate) fn reset(&mut self) {
        self.strings.clear();
        self.objects.clear();
        self.traits.clear();
    }
}

/// Reference tables used by the deserializer.
#[derive(Debug, Default)]
pub(crate) struct ReadCaches {
    pub(crate) strings: Vec<String>,
    pub(crate) objects: Vec<Value>,
    pub(crate) traits: Vec<Traits>,
}

impl ReadCaches {
    pub(crate) fn string(&self, index: usize) -> Result<&str> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or(AmfError::InvalidReference {
                table: "string",
                index,
            })
    }

    pub(crate) fn object(&self, index: usize) -> Result<Value> {
        self.objects
            .get(index)
            .cloned()
            .ok_or(AmfError::InvalidReference {
                table: "object",
                index,
            })
    }

    pub(crate) fn trait_at(&self, index: usize) -> Result<Traits> {
        self.traits
            .get(index)
            .cloned()
            .ok_or(AmfError::InvalidReference {
                table: "trait",
                index,
            })
    }

    pub(crate) fn reset(&mut self) {
        self.strings.clear();
        self.objects.clear();
        self.traits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_table_assigns_in_order() {
        let mut table = WriteTable::<String>::default();
        table.add("a".to_string());
        table.skip();
        table.add("b".to_string());
        table.add("a".to_string());
        assert_eq!(table.get("a"), Some(0));
        assert_eq!(table.get("b"), Some(2));
        table.clear();
        assert_eq!(table.get("a"), None);
    }

    #[test]
    fn empty_string_is_never_cached() {
        let mut caches = WriteCaches::default();
        caches.add_string("");
        caches.add_string("x");
        assert_eq!(caches.strings.get(""), None);
        assert_eq!(caches.strings.get("x"), Some(0));
    }

    #[test]
    fn read_reference_out_of_range() {
        let caches = ReadCaches::default();
        assert!(matches!(
            caches.string(3),
            Err(AmfError::InvalidReference { table: "string", index: 3 })
        ));
        assert!(caches.object(0).is_err());
        assert!(caches.trait_at(0).is_err());
    }
}
