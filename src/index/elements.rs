//! Element Name Index
//!
//! One identity-sorted list per element expanded type. Elements are appended
//! in construction order, so every list stays sorted without extra work and
//! "next element named X at or after identity N" is a binary search.

use crate::dom::node::NodeId;

#[derive(Debug, Default)]
pub struct ElementIndex {
    /// Lists indexed by expanded type id
    lists: Vec<Vec<NodeId>>,
}

impl ElementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `element` under `exptype`. Identities must arrive increasing.
    pub fn insert(&mut self, exptype: u32, element: NodeId) {
        let slot = exptype as usize;
        if self.lists.len() <= slot {
            self.lists.resize_with(slot + 1, Vec::new);
        }
        let list = &mut self.lists[slot];
        debug_assert!(list.last().map_or(true, |&last| last < element));
        list.push(element);
    }

    /// First indexed element of `exptype` with identity >= `lower_bound`
    pub fn find_from(&self, exptype: u32, lower_bound: NodeId) -> Option<NodeId> {
        let list = self.lists.get(exptype as usize)?;
        let at = list.partition_point(|&id| id < lower_bound);
        list.get(at).copied()
    }
}
