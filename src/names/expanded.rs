//! Expanded Name Index
//!
//! Interns `(namespace, local name, kind)` triples into dense expanded type ids.
//!
//! - Ids `0..NTYPES` are pre-populated with the unnamed built-in kinds, so
//!   `id < NTYPES` means "exactly that kind" without a table lookup
//! - Chained hash table over entry indices; rehashes to `2n + 1` buckets when
//!   the entry count passes 3/4 of the bucket count
//! - Ids are never reused or renumbered

use crate::dom::node::{NodeType, NTYPES};
use std::hash::{Hash, Hasher};

const INITIAL_BUCKETS: usize = 127;
const LOAD_FACTOR: f64 = 0.75;

/// End of a bucket chain
const NO_ENTRY: u32 = u32::MAX;

#[derive(Debug, Clone)]
struct ExtendedType {
    kind: u32,
    namespace: Box<str>,
    local_name: Box<str>,
    hash: u64,
}

impl ExtendedType {
    #[inline]
    fn matches(&self, namespace: &str, local_name: &str, kind: u32) -> bool {
        self.kind == kind && &*self.local_name == local_name && &*self.namespace == namespace
    }
}

#[derive(Debug)]
pub struct ExpandedNameIndex {
    entries: Vec<ExtendedType>,
    /// Head entry of each bucket chain
    buckets: Vec<u32>,
    /// Next entry in the same chain, parallel to `entries`
    chain: Vec<u32>,
    threshold: usize,
}

impl Default for ExpandedNameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpandedNameIndex {
    pub fn new() -> Self {
        let mut index = Self {
            entries: Vec::with_capacity(INITIAL_BUCKETS),
            buckets: vec![NO_ENTRY; INITIAL_BUCKETS],
            chain: Vec::with_capacity(INITIAL_BUCKETS),
            threshold: (INITIAL_BUCKETS as f64 * LOAD_FACTOR) as usize,
        };
        for kind in 0..NTYPES {
            index.insert(kind, "", "");
        }
        index
    }

    fn hash_of(namespace: &str, local_name: &str, kind: u32) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut ns = DefaultHasher::new();
        namespace.hash(&mut ns);
        let mut local = DefaultHasher::new();
        local_name.hash(&mut local);
        (kind as u64)
            .wrapping_add(ns.finish())
            .wrapping_add(local.finish())
    }

    #[inline]
    fn bucket(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    fn insert(&mut self, kind: u32, namespace: &str, local_name: &str) -> u32 {
        let hash = Self::hash_of(namespace, local_name, kind);
        let id = self.entries.len() as u32;
        self.entries.push(ExtendedType {
            kind,
            namespace: Box::from(namespace),
            local_name: Box::from(local_name),
            hash,
        });
        let bucket = self.bucket(hash);
        self.chain.push(self.buckets[bucket]);
        self.buckets[bucket] = id;

        if self.entries.len() > self.threshold {
            self.rehash();
        }
        id
    }

    fn rehash(&mut self) {
        let capacity = self.buckets.len() * 2 + 1;
        self.buckets = vec![NO_ENTRY; capacity];
        self.threshold = (capacity as f64 * LOAD_FACTOR) as usize;
        for id in 0..self.entries.len() {
            let bucket = self.bucket(self.entries[id].hash);
            self.chain[id] = self.buckets[bucket];
            self.buckets[bucket] = id as u32;
        }
    }

    fn find(&self, namespace: &str, local_name: &str, kind: u32) -> Option<u32> {
        let hash = Self::hash_of(namespace, local_name, kind);
        let mut id = self.buckets[self.bucket(hash)];
        while id != NO_ENTRY {
            let entry = &self.entries[id as usize];
            if entry.hash == hash && entry.matches(namespace, local_name, kind) {
                return Some(id);
            }
            id = self.chain[id as usize];
        }
        None
    }

    /// Look up or create the expanded type id for a triple.
    /// An empty `namespace` means "no namespace".
    pub fn intern(&mut self, namespace: &str, local_name: &str, kind: NodeType) -> u32 {
        match self.find(namespace, local_name, kind.code()) {
            Some(id) => id,
            None => self.insert(kind.code(), namespace, local_name),
        }
    }

    /// Search-only variant of [`ExpandedNameIndex::intern`]
    pub fn lookup(&self, namespace: &str, local_name: &str, kind: NodeType) -> Option<u32> {
        self.find(namespace, local_name, kind.code())
    }

    #[inline]
    pub fn kind_of(&self, id: u32) -> Option<NodeType> {
        if id < NTYPES {
            return NodeType::from_code(id);
        }
        NodeType::from_code(self.entries.get(id as usize)?.kind)
    }

    /// Namespace URI, or `None` for "no namespace" and unknown ids
    pub fn namespace_of(&self, id: u32) -> Option<&str> {
        let entry = self.entries.get(id as usize)?;
        if entry.namespace.is_empty() {
            None
        } else {
            Some(&*entry.namespace)
        }
    }

    pub fn local_name_of(&self, id: u32) -> Option<&str> {
        self.entries.get(id as usize).map(|e| &*e.local_name)
    }

    /// Number of ids handed out, including the built-in range
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
