//! Symbol Table
//!
//! Bijective `string <-> id` mapping for namespace URIs and prefixes.
//! Id 0 is reserved for the empty string. Uses a hash index with collision
//! lists to avoid storing duplicate strings.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

#[derive(Debug)]
pub struct SymbolTable {
    /// Strings indexed by id
    entries: Vec<Box<str>>,
    /// Hash of string content -> list of ids with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            entries: Vec::with_capacity(64),
            hash_index: HashMap::new(),
        };
        // Entry 0 is reserved for ""
        table.entries.push(Box::from(""));
        table
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning its stable id
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        let hash = Self::compute_hash(s);
        if let Some(id) = self.find(hash, s) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(Box::from(s));
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Look up without interning
    pub fn lookup(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        self.find(Self::compute_hash(s), s)
    }

    fn find(&self, hash: u64, s: &str) -> Option<u32> {
        self.hash_index
            .get(&hash)?
            .iter()
            .copied()
            .find(|&id| &*self.entries[id as usize] == s)
    }

    /// Resolve an id back to its string
    #[inline]
    pub fn resolve(&self, id: u32) -> Option<&str> {
        self.entries.get(id as usize).map(|s| &**s)
    }

    /// Number of distinct strings, including the reserved empty string
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}
