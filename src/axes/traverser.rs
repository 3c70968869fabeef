//! Stateless Axis Traversal
//!
//! `first(context)` and `next(context, current)` carry the whole traversal
//! state, so one traverser can serve any number of walks. The walk helpers
//! at the bottom are shared with the stateful iterators.

use super::Axis;
use crate::dom::node::{NodeHandle, NodeId, NodeType, DOCUMENT_ID, NTYPES, NULL};
use crate::dom::Document;

#[derive(Debug, Clone, Copy)]
pub struct AxisTraverser<'d> {
    doc: &'d Document,
    axis: Axis,
}

impl<'d> AxisTraverser<'d> {
    pub fn new(doc: &'d Document, axis: Axis) -> Self {
        Self { doc, axis }
    }

    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn first(&self, context: NodeHandle) -> Option<NodeHandle> {
        let ctx = self.doc.make_node_identity(context)?;
        self.doc.handle_of(self.first_id(ctx, None))
    }

    pub fn first_typed(&self, context: NodeHandle, required_type: u32) -> Option<NodeHandle> {
        let ctx = self.doc.make_node_identity(context)?;
        self.doc.handle_of(self.first_id(ctx, Some(required_type)))
    }

    pub fn next(&self, context: NodeHandle, current: NodeHandle) -> Option<NodeHandle> {
        let ctx = self.doc.make_node_identity(context)?;
        let cur = self.doc.make_node_identity(current)?;
        self.doc.handle_of(self.next_id(ctx, cur, None))
    }

    pub fn next_typed(&self, context: NodeHandle, current: NodeHandle, required_type: u32) -> Option<NodeHandle> {
        let ctx = self.doc.make_node_identity(context)?;
        let cur = self.doc.make_node_identity(current)?;
        self.doc.handle_of(self.next_id(ctx, cur, Some(required_type)))
    }

    fn first_id(&self, ctx: NodeId, node_type: Option<u32>) -> NodeId {
        if let Some(exptype) = node_type.filter(|&t| indexable(self.doc, t)) {
            match self.axis {
                Axis::Child => return next_indexed_child(self.doc, exptype, ctx, ctx + 1),
                Axis::Descendant => return next_indexed_descendant(self.doc, exptype, ctx, ctx + 1),
                _ => {}
            }
        }
        let first = self.first_candidate(ctx);
        self.filter_from(ctx, first, node_type)
    }

    fn next_id(&self, ctx: NodeId, cur: NodeId, node_type: Option<u32>) -> NodeId {
        if self.doc.record(ctx).is_none() || self.doc.record(cur).is_none() {
            return NULL;
        }
        if let Some(exptype) = node_type.filter(|&t| indexable(self.doc, t)) {
            match self.axis {
                Axis::Child => return next_indexed_child(self.doc, exptype, ctx, cur + 1),
                Axis::Descendant | Axis::DescendantOrSelf => {
                    return next_indexed_descendant(self.doc, exptype, ctx, cur + 1)
                }
                _ => {}
            }
        }
        let next = self.next_candidate(ctx, cur);
        self.filter_from(ctx, next, node_type)
    }

    fn filter_from(&self, ctx: NodeId, mut candidate: NodeId, node_type: Option<u32>) -> NodeId {
        let Some(required) = node_type else {
            return candidate;
        };
        while candidate != NULL && !self.doc.matches_type(candidate, required) {
            candidate = self.next_candidate(ctx, candidate);
        }
        candidate
    }

    fn first_candidate(&self, ctx: NodeId) -> NodeId {
        let doc = self.doc;
        if doc.record(ctx).is_none() {
            return NULL;
        }
        match self.axis {
            Axis::Self_ | Axis::AncestorOrSelf | Axis::DescendantOrSelf => ctx,
            Axis::Parent | Axis::Ancestor => doc.parent_of(ctx),
            Axis::Root | Axis::DescendantsOrSelfFromRoot => DOCUMENT_ID,
            Axis::Child => doc.first_child_of(ctx),
            Axis::Attribute => doc.first_attribute_of(ctx),
            Axis::Namespace => doc.scope_of(ctx).first().map_or(NULL, |e| e.node),
            Axis::NamespaceDecls => doc.first_decl_of(ctx),
            Axis::Descendant => next_descendant(doc, ctx, ctx),
            Axis::DescendantsFromRoot => next_descendant(doc, DOCUMENT_ID, DOCUMENT_ID),
            Axis::FollowingSibling => doc.next_sibling_of(ctx),
            Axis::PrecedingSibling => doc.prev_sibling_of(ctx),
            Axis::Following => following_start(doc, ctx),
            Axis::Preceding => self.next_candidate(ctx, ctx),
        }
    }

    fn next_candidate(&self, ctx: NodeId, cur: NodeId) -> NodeId {
        let doc = self.doc;
        match self.axis {
            Axis::Self_ | Axis::Parent | Axis::Root => NULL,
            Axis::Ancestor | Axis::AncestorOrSelf => doc.parent_of(cur),
            Axis::Child | Axis::FollowingSibling => doc.next_sibling_of(cur),
            Axis::PrecedingSibling => doc.prev_sibling_of(cur),
            Axis::Attribute => doc.next_attribute_of(cur),
            Axis::NamespaceDecls => doc.next_decl_of(cur),
            Axis::Namespace => {
                let scope = doc.scope_of(ctx);
                scope
                    .iter()
                    .position(|e| e.node == cur)
                    .and_then(|at| scope.get(at + 1))
                    .map_or(NULL, |e| e.node)
            }
            Axis::Descendant | Axis::DescendantOrSelf => next_descendant(doc, ctx, cur),
            Axis::DescendantsFromRoot | Axis::DescendantsOrSelfFromRoot => {
                next_descendant(doc, DOCUMENT_ID, cur)
            }
            Axis::Following => next_in_document(doc, cur),
            Axis::Preceding => {
                let mut candidate = cur;
                while candidate > DOCUMENT_ID + 1 {
                    candidate -= 1;
                    if doc.kind_of(candidate).is_some_and(NodeType::is_attached) {
                        continue;
                    }
                    if doc.special_find(ctx, candidate).is_some() {
                        return candidate;
                    }
                }
                NULL
            }
        }
    }
}

// ============================================================================
// Shared walks
// ============================================================================

/// Typed lookups go through the element index only for exact element types
pub(super) fn indexable(doc: &Document, required_type: u32) -> bool {
    required_type >= NTYPES
        && doc.index_enabled()
        && doc.kind_of_type(required_type) == Some(NodeType::Element)
}

/// Next node after `cur` inside `root`'s subtree, skipping attached nodes
pub(super) fn next_descendant(doc: &Document, root: NodeId, cur: NodeId) -> NodeId {
    let mut candidate = cur;
    loop {
        candidate += 1;
        let Some(kind) = doc.kind_of(candidate) else {
            return NULL;
        };
        let parent = doc.parent_of(candidate);
        if parent == NULL || parent < root {
            return NULL;
        }
        if !kind.is_attached() {
            return candidate;
        }
    }
}

/// Next non-attached node after `cur` in document order
pub(super) fn next_in_document(doc: &Document, cur: NodeId) -> NodeId {
    let mut candidate = cur;
    loop {
        candidate += 1;
        match doc.kind_of(candidate) {
            None => return NULL,
            Some(kind) if kind.is_attached() => continue,
            Some(_) => return candidate,
        }
    }
}

/// First node of the following axis
pub(super) fn following_start(doc: &Document, ctx: NodeId) -> NodeId {
    let mut node = ctx;
    if doc.kind_of(ctx).is_some_and(NodeType::is_attached) {
        node = doc.parent_of(ctx);
        let first = doc.first_child_of(node);
        if first != NULL {
            return first;
        }
    }
    while node != NULL {
        let sibling = doc.next_sibling_of(node);
        if sibling != NULL {
            return sibling;
        }
        node = doc.parent_of(node);
    }
    NULL
}

/// Next indexed element of `exptype` at or after `from` whose parent is `root`
pub(super) fn next_indexed_child(doc: &Document, exptype: u32, root: NodeId, from: NodeId) -> NodeId {
    let mut from = from;
    loop {
        let candidate = doc.next_indexed(exptype, from, root);
        if candidate == NULL {
            return NULL;
        }
        let mut ancestor = doc.parent_of(candidate);
        if ancestor == root {
            return candidate;
        }
        // Deeper inside root's subtree, or already past it
        while ancestor != NULL && ancestor > root {
            ancestor = doc.parent_of(ancestor);
        }
        if ancestor != root {
            return NULL;
        }
        from = candidate + 1;
    }
}

/// Next indexed element of `exptype` at or after `from` inside `root`'s subtree
pub(super) fn next_indexed_descendant(doc: &Document, exptype: u32, root: NodeId, from: NodeId) -> NodeId {
    let candidate = doc.next_indexed(exptype, from, root);
    if candidate == NULL || root == DOCUMENT_ID {
        return candidate;
    }
    let mut ancestor = doc.parent_of(candidate);
    while ancestor != NULL && ancestor > root {
        ancestor = doc.parent_of(ancestor);
    }
    if ancestor == root {
        candidate
    } else {
        NULL
    }
}
