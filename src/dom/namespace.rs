//! Namespace Scope Index
//!
//! Per-element lists of the namespace declaration nodes in scope there.
//!
//! - Lists are cumulative: a new element's list starts as a copy of its
//!   nearest declaring ancestor's list
//! - Redeclaring a prefix replaces the inherited entry in place
//! - Owning elements are kept in increasing identity order, so lookup is a
//!   binary search followed by a short climb of the parent chain

use super::node::{NodeId, NULL};

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// One in-scope declaration: the namespace node and its expanded type
/// (kind NAMESPACE, local name = declared prefix)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeEntry {
    pub node: NodeId,
    pub exptype: u32,
}

#[derive(Debug, Default)]
pub struct NamespaceScopeIndex {
    /// Elements owning a list, strictly increasing
    elements: Vec<NodeId>,
    /// Scope list per entry of `elements`
    scopes: Vec<Vec<ScopeEntry>>,
}

impl NamespaceScopeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `entry` is declared on `element`.
    ///
    /// `parent_of` resolves parent links of already-built nodes. `uppermost`
    /// is the first node under the Document (the Document itself if empty).
    pub fn declare<F>(&mut self, element: NodeId, entry: ScopeEntry, parent_of: &F, uppermost: NodeId)
    where
        F: Fn(NodeId) -> NodeId,
    {
        if self.elements.last() != Some(&element) {
            debug_assert!(self.elements.last().map_or(true, |&last| last < element));
            let inherited = match parent_of(element) {
                NULL => Vec::new(),
                parent => self
                    .find_scope(parent, parent_of, uppermost)
                    .map(<[ScopeEntry]>::to_vec)
                    .unwrap_or_default(),
            };
            self.elements.push(element);
            self.scopes.push(inherited);
        }

        if let Some(list) = self.scopes.last_mut() {
            match list.iter_mut().rev().find(|e| e.exptype == entry.exptype) {
                Some(slot) => *slot = entry,
                None => list.push(entry),
            }
        }
    }

    /// Declarations in scope at `element`, or `None` when no ancestor-or-self
    /// declares anything.
    pub fn find_scope<F>(&self, element: NodeId, parent_of: &F, uppermost: NodeId) -> Option<&[ScopeEntry]>
    where
        F: Fn(NodeId) -> NodeId,
    {
        let mut at = match self.elements.binary_search(&element) {
            Ok(found) => return Some(&self.scopes[found]),
            Err(0) => return None,
            Err(insert_at) => insert_at - 1,
        };

        let mut candidate = self.elements[at];
        let mut ancestor = parent_of(element);

        // The first structural node is an ancestor of every later element
        if at == 0 && ancestor != NULL && candidate < ancestor && candidate == uppermost {
            return Some(&self.scopes[0]);
        }

        while ancestor != NULL && ancestor > 0 {
            if candidate == ancestor {
                return Some(&self.scopes[at]);
            } else if candidate < ancestor {
                // Too deep in the tree
                while ancestor != NULL && candidate < ancestor {
                    ancestor = parent_of(ancestor);
                }
            } else if at > 0 {
                // Too late in the list
                at -= 1;
                candidate = self.elements[at];
            } else {
                break;
            }
        }
        None
    }

    /// Number of elements that own a scope list
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
