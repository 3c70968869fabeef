//! Stateful Axis Iterators
//!
//! Every axis is an `AxisIter` over a small cursor type. The cursor holds
//! the walk position; `AxisIter` adds the optional type filter, the start
//! node, position counting and the mark checkpoint.
//!
//! Reverse axes materialize what they need at start (the ancestor chain or
//! the earlier siblings) and then emit nearest-first.

use super::traverser::{
    following_start, indexable, next_descendant, next_in_document, next_indexed_child,
    next_indexed_descendant,
};
use super::Axis;
use crate::dom::node::{NodeHandle, NodeId, NodeType, DOCUMENT_ID, NULL};
use crate::dom::Document;

/// Bookkeeping shared by every iterator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterState {
    /// Identity the iterator was last started at, NULL before the first start
    pub start: NodeId,
    pub restartable: bool,
    /// 1-based index of the last node returned
    pub position: usize,
}

impl Default for IterState {
    fn default() -> Self {
        Self {
            start: NULL,
            restartable: true,
            position: 0,
        }
    }
}

/// A resettable cursor along one axis
pub trait AxisIterator<'d> {
    fn document(&self) -> &'d Document;

    fn state(&self) -> &IterState;

    fn state_mut(&mut self) -> &mut IterState;

    /// (Re)start at `node`. Ignored once the iterator is non-restartable.
    fn set_start_node(&mut self, node: NodeHandle);

    /// Next node on the axis, `None` at the end
    fn next(&mut self) -> Option<NodeHandle>;

    /// Checkpoint the cursor
    fn set_mark(&mut self);

    /// Return to the last checkpoint
    fn goto_mark(&mut self);

    fn is_reverse(&self) -> bool;

    fn box_clone(&self) -> Box<dyn AxisIterator<'d> + 'd>;

    /// Rewind to the start node
    fn reset(&mut self) {
        let start = self.state().start;
        let Some(handle) = self.document().handle_of(start) else {
            return;
        };
        let was_restartable = self.state().restartable;
        self.state_mut().restartable = true;
        self.set_start_node(handle);
        self.state_mut().restartable = was_restartable;
    }

    fn start_node(&self) -> Option<NodeHandle> {
        self.document().handle_of(self.state().start)
    }

    fn position(&self) -> usize {
        self.state().position
    }

    fn is_restartable(&self) -> bool {
        self.state().restartable
    }

    fn set_restartable(&mut self, restartable: bool) {
        self.state_mut().restartable = restartable;
    }

    /// Size of the whole sequence. Leaves the cursor and any mark in place.
    fn last(&mut self) -> usize;

    /// Copy of this iterator for independent use; the copy cannot be restarted
    fn clone_iterator(&self) -> Box<dyn AxisIterator<'d> + 'd> {
        let mut clone = self.box_clone();
        clone.set_restartable(false);
        clone
    }

    /// Drain what is left
    fn remaining(&mut self) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        while let Some(handle) = self.next() {
            out.push(handle);
        }
        out
    }
}

// ============================================================================
// Cursors
// ============================================================================

/// Walk position along one axis
trait Cursor: Clone + std::fmt::Debug + 'static {
    fn start(&mut self, doc: &Document, context: NodeId, node_type: Option<u32>);

    /// Next candidate; the caller applies the type filter
    fn step(&mut self, doc: &Document) -> NodeId;
}

/// Self, parent and root: at most one node
#[derive(Debug, Clone)]
struct SingleCursor {
    axis: Axis,
    pending: NodeId,
}

impl Cursor for SingleCursor {
    fn start(&mut self, doc: &Document, context: NodeId, _node_type: Option<u32>) {
        self.pending = match self.axis {
            Axis::Parent => doc.parent_of(context),
            Axis::Root => DOCUMENT_ID,
            _ => context,
        };
    }

    fn step(&mut self, _doc: &Document) -> NodeId {
        std::mem::replace(&mut self.pending, NULL)
    }
}

#[derive(Debug, Clone)]
struct ChildCursor {
    parent: NodeId,
    current: NodeId,
    started: bool,
    /// Element type looked up through the element index
    indexed: Option<u32>,
}

impl Cursor for ChildCursor {
    fn start(&mut self, doc: &Document, context: NodeId, node_type: Option<u32>) {
        self.parent = context;
        self.current = NULL;
        self.started = false;
        self.indexed = node_type.filter(|&t| indexable(doc, t));
    }

    fn step(&mut self, doc: &Document) -> NodeId {
        let next = match (self.started, self.indexed) {
            (false, Some(exptype)) => next_indexed_child(doc, exptype, self.parent, self.parent + 1),
            (true, Some(exptype)) if self.current != NULL => {
                next_indexed_child(doc, exptype, self.parent, self.current + 1)
            }
            (false, None) => doc.first_child_of(self.parent),
            (true, None) if self.current != NULL => doc.next_sibling_of(self.current),
            _ => NULL,
        };
        self.started = true;
        self.current = next;
        next
    }
}

/// Attribute, namespace-declaration and following-sibling chains
#[derive(Debug, Clone)]
struct ChainCursor {
    axis: Axis,
    context: NodeId,
    current: NodeId,
    started: bool,
}

impl Cursor for ChainCursor {
    fn start(&mut self, _doc: &Document, context: NodeId, _node_type: Option<u32>) {
        self.context = context;
        self.current = NULL;
        self.started = false;
    }

    fn step(&mut self, doc: &Document) -> NodeId {
        let next = if !self.started {
            self.started = true;
            match self.axis {
                Axis::Attribute => doc.first_attribute_of(self.context),
                Axis::NamespaceDecls => doc.first_decl_of(self.context),
                _ => doc.next_sibling_of(self.context),
            }
        } else if self.current == NULL {
            NULL
        } else {
            match self.axis {
                Axis::Attribute => doc.next_attribute_of(self.current),
                Axis::NamespaceDecls => doc.next_decl_of(self.current),
                _ => doc.next_sibling_of(self.current),
            }
        };
        self.current = next;
        next
    }
}

/// Nodes collected at start, emitted in order
#[derive(Debug, Clone)]
struct ListCursor {
    axis: Axis,
    nodes: Vec<NodeId>,
    at: usize,
}

impl Cursor for ListCursor {
    fn start(&mut self, doc: &Document, context: NodeId, _node_type: Option<u32>) {
        self.at = 0;
        self.nodes.clear();
        match self.axis {
            Axis::Ancestor | Axis::AncestorOrSelf => {
                if self.axis == Axis::AncestorOrSelf && doc.record(context).is_some() {
                    self.nodes.push(context);
                }
                let mut ancestor = doc.parent_of(context);
                while ancestor != NULL {
                    self.nodes.push(ancestor);
                    ancestor = doc.parent_of(ancestor);
                }
            }
            Axis::PrecedingSibling => {
                if doc.kind_of(context).is_some_and(|k| !k.is_attached()) {
                    let mut sibling = doc.first_child_of(doc.parent_of(context));
                    while sibling != NULL && sibling != context {
                        self.nodes.push(sibling);
                        sibling = doc.next_sibling_of(sibling);
                    }
                    self.nodes.reverse();
                }
            }
            _ => {
                self.nodes = doc.scope_of(context).into_iter().map(|e| e.node).collect();
            }
        }
    }

    fn step(&mut self, _doc: &Document) -> NodeId {
        match self.nodes.get(self.at) {
            Some(&id) => {
                self.at += 1;
                id
            }
            None => NULL,
        }
    }
}

#[derive(Debug, Clone)]
struct DescendantCursor {
    axis: Axis,
    root: NodeId,
    current: NodeId,
    include_self: bool,
    indexed: Option<u32>,
}

impl Cursor for DescendantCursor {
    fn start(&mut self, doc: &Document, context: NodeId, node_type: Option<u32>) {
        let from_root = matches!(
            self.axis,
            Axis::DescendantsFromRoot | Axis::DescendantsOrSelfFromRoot
        );
        self.root = if from_root { DOCUMENT_ID } else { context };
        self.current = self.root;
        self.include_self = matches!(
            self.axis,
            Axis::DescendantOrSelf | Axis::DescendantsOrSelfFromRoot
        ) && doc.record(self.root).is_some();
        self.indexed = node_type.filter(|&t| indexable(doc, t));
        if doc.record(context).is_none() {
            self.current = NULL;
        }
    }

    fn step(&mut self, doc: &Document) -> NodeId {
        if self.include_self {
            self.include_self = false;
            return self.root;
        }
        if self.current == NULL {
            return NULL;
        }
        self.current = match self.indexed {
            Some(exptype) => next_indexed_descendant(doc, exptype, self.root, self.current + 1),
            None => next_descendant(doc, self.root, self.current),
        };
        self.current
    }
}

#[derive(Debug, Clone)]
struct FollowingCursor {
    current: NodeId,
    pending: NodeId,
}

impl Cursor for FollowingCursor {
    fn start(&mut self, doc: &Document, context: NodeId, _node_type: Option<u32>) {
        self.pending = following_start(doc, context);
        self.current = NULL;
    }

    fn step(&mut self, doc: &Document) -> NodeId {
        if self.pending != NULL {
            self.current = std::mem::replace(&mut self.pending, NULL);
        } else if self.current != NULL {
            self.current = next_in_document(doc, self.current);
        }
        self.current
    }
}

/// Walks identities downward, stepping over the context's ancestors
#[derive(Debug, Clone)]
struct PrecedingCursor {
    current: NodeId,
    /// Ancestors of the context, nearest first
    ancestors: Vec<NodeId>,
    next_ancestor: usize,
}

impl Cursor for PrecedingCursor {
    fn start(&mut self, doc: &Document, context: NodeId, _node_type: Option<u32>) {
        self.ancestors.clear();
        self.next_ancestor = 0;
        let mut ancestor = doc.parent_of(context);
        while ancestor != NULL {
            self.ancestors.push(ancestor);
            ancestor = doc.parent_of(ancestor);
        }
        self.current = if doc.record(context).is_some() { context } else { DOCUMENT_ID };
    }

    fn step(&mut self, doc: &Document) -> NodeId {
        while self.current > DOCUMENT_ID + 1 {
            self.current -= 1;
            if self.ancestors.get(self.next_ancestor) == Some(&self.current) {
                self.next_ancestor += 1;
                continue;
            }
            if doc.kind_of(self.current).is_some_and(NodeType::is_attached) {
                continue;
            }
            return self.current;
        }
        self.current = DOCUMENT_ID;
        NULL
    }
}

// ============================================================================
// Iterator
// ============================================================================

#[derive(Debug, Clone)]
struct AxisIter<'d, C: Cursor> {
    doc: &'d Document,
    axis: Axis,
    node_type: Option<u32>,
    state: IterState,
    cursor: C,
    mark: Option<(C, usize)>,
}

impl<'d, C: Cursor> AxisIter<'d, C> {
    fn new(doc: &'d Document, axis: Axis, node_type: Option<u32>, cursor: C) -> Self {
        Self {
            doc,
            axis,
            node_type,
            state: IterState::default(),
            cursor,
            mark: None,
        }
    }
}

impl<'d, C: Cursor> AxisIterator<'d> for AxisIter<'d, C> {
    fn document(&self) -> &'d Document {
        self.doc
    }

    fn state(&self) -> &IterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut IterState {
        &mut self.state
    }

    fn set_start_node(&mut self, node: NodeHandle) {
        if !self.state.restartable && self.state.start != NULL {
            return;
        }
        let context = self
            .doc
            .make_node_identity(node)
            .filter(|&id| self.doc.record(id).is_some())
            .unwrap_or(NULL);
        self.state.start = context;
        self.state.position = 0;
        self.cursor.start(self.doc, context, self.node_type);
    }

    fn next(&mut self) -> Option<NodeHandle> {
        if self.state.start == NULL {
            return None;
        }
        loop {
            let id = self.cursor.step(self.doc);
            if id == NULL {
                return None;
            }
            if self.node_type.is_none_or(|t| self.doc.matches_type(id, t)) {
                self.state.position += 1;
                return self.doc.handle_of(id);
            }
        }
    }

    fn set_mark(&mut self) {
        self.mark = Some((self.cursor.clone(), self.state.position));
    }

    fn goto_mark(&mut self) {
        if let Some((cursor, position)) = &self.mark {
            self.cursor = cursor.clone();
            self.state.position = *position;
        }
    }

    fn is_reverse(&self) -> bool {
        self.axis.is_reverse()
    }

    fn box_clone(&self) -> Box<dyn AxisIterator<'d> + 'd> {
        Box::new(self.clone())
    }

    fn last(&mut self) -> usize {
        let saved = (self.cursor.clone(), self.state);
        self.reset();
        let mut count = 0;
        while self.next().is_some() {
            count += 1;
        }
        (self.cursor, self.state) = saved;
        count
    }
}

pub(super) fn build<'d>(doc: &'d Document, axis: Axis, node_type: Option<u32>) -> Box<dyn AxisIterator<'d> + 'd> {
    match axis {
        Axis::Self_ | Axis::Parent | Axis::Root => {
            Box::new(AxisIter::new(doc, axis, node_type, SingleCursor { axis, pending: NULL }))
        }
        Axis::Child => Box::new(AxisIter::new(
            doc,
            axis,
            node_type,
            ChildCursor {
                parent: NULL,
                current: NULL,
                started: false,
                indexed: None,
            },
        )),
        Axis::Attribute | Axis::NamespaceDecls | Axis::FollowingSibling => Box::new(AxisIter::new(
            doc,
            axis,
            node_type,
            ChainCursor {
                axis,
                context: NULL,
                current: NULL,
                started: false,
            },
        )),
        Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling | Axis::Namespace => {
            Box::new(AxisIter::new(
                doc,
                axis,
                node_type,
                ListCursor {
                    axis,
                    nodes: Vec::new(),
                    at: 0,
                },
            ))
        }
        Axis::Descendant
        | Axis::DescendantOrSelf
        | Axis::DescendantsFromRoot
        | Axis::DescendantsOrSelfFromRoot => Box::new(AxisIter::new(
            doc,
            axis,
            node_type,
            DescendantCursor {
                axis,
                root: NULL,
                current: NULL,
                include_self: false,
                indexed: None,
            },
        )),
        Axis::Following => Box::new(AxisIter::new(
            doc,
            axis,
            node_type,
            FollowingCursor {
                current: NULL,
                pending: NULL,
            },
        )),
        Axis::Preceding => Box::new(AxisIter::new(
            doc,
            axis,
            node_type,
            PrecedingCursor {
                current: NULL,
                ancestors: Vec::new(),
                next_ancestor: 0,
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{AttributeEvent, BuildEvent};
    use crate::config::DtmConfig;
    use crate::dom::namespace::ns;
    use crate::dom::DocumentAccess;
    use crate::testing::{doc_from, doc_with, scenario_a_events, scenario_b_events};
    use proptest::prelude::*;

    fn ids(doc: &Document, handles: Vec<NodeHandle>) -> Vec<NodeId> {
        handles
            .into_iter()
            .map(|h| doc.make_node_identity(h).unwrap())
            .collect()
    }

    fn axis_ids(doc: &Document, axis: Axis, context: NodeId) -> Vec<NodeId> {
        ids(doc, doc.axis_nodes(axis, doc.make_node_handle(context).unwrap()))
    }

    fn typed_ids(doc: &Document, axis: Axis, context: NodeId, required: u32) -> Vec<NodeId> {
        let mut iter = doc.typed_axis_iterator(axis, required);
        iter.set_start_node(doc.make_node_handle(context).unwrap());
        ids(doc, iter.remaining())
    }

    /// Events for a random well-formed tree: ops are (kind, name)
    fn tree_events(ops: &[(u8, u8)]) -> Vec<BuildEvent> {
        const NAMES: [&str; 3] = ["p", "q", "r"];
        let mut events = vec![BuildEvent::start("root")];
        let mut depth = 0;
        for &(kind, name) in ops {
            match kind {
                0 => {
                    events.push(BuildEvent::start(NAMES[name as usize % NAMES.len()]));
                    depth += 1;
                }
                1 if depth > 0 => {
                    events.push(BuildEvent::EndElement);
                    depth -= 1;
                }
                2 => events.push(BuildEvent::text("t")),
                _ => events.push(BuildEvent::comment("c")),
            }
        }
        for _ in 0..=depth {
            events.push(BuildEvent::EndElement);
        }
        events
    }

    #[test]
    fn test_ancestor_nearest_first() {
        let doc = doc_from(scenario_a_events());
        assert_eq!(axis_ids(&doc, Axis::Ancestor, 4), vec![3, 1, 0]);
        assert_eq!(axis_ids(&doc, Axis::AncestorOrSelf, 2), vec![2, 1, 0]);
        assert!(axis_ids(&doc, Axis::Ancestor, 0).is_empty());

        let iter = doc.axis_iterator(Axis::Ancestor);
        assert!(iter.is_reverse());
        assert!(!doc.axis_iterator(Axis::Descendant).is_reverse());
    }

    #[test]
    fn test_single_node_axes() {
        let doc = doc_from(scenario_a_events());
        assert_eq!(axis_ids(&doc, Axis::Self_, 3), vec![3]);
        assert_eq!(axis_ids(&doc, Axis::Parent, 3), vec![1]);
        assert!(axis_ids(&doc, Axis::Parent, 0).is_empty());
        assert_eq!(axis_ids(&doc, Axis::Root, 4), vec![0]);
        assert_eq!(typed_ids(&doc, Axis::Self_, 3, NodeType::Text.code()), Vec::<NodeId>::new());
        assert_eq!(typed_ids(&doc, Axis::Root, 4, NodeType::Document.code()), vec![0]);
    }

    #[test]
    fn test_forward_axes() {
        let doc = doc_from(scenario_a_events());
        assert_eq!(axis_ids(&doc, Axis::Child, 1), vec![2, 3]);
        assert_eq!(axis_ids(&doc, Axis::Child, 0), vec![1]);
        assert_eq!(axis_ids(&doc, Axis::Descendant, 0), vec![1, 2, 3, 4]);
        assert_eq!(axis_ids(&doc, Axis::DescendantOrSelf, 1), vec![1, 2, 3, 4]);
        assert_eq!(axis_ids(&doc, Axis::FollowingSibling, 2), vec![3]);
        assert_eq!(axis_ids(&doc, Axis::Following, 2), vec![3, 4]);
        assert!(axis_ids(&doc, Axis::Following, 4).is_empty());
        assert_eq!(axis_ids(&doc, Axis::DescendantsFromRoot, 4), vec![1, 2, 3, 4]);
        assert_eq!(axis_ids(&doc, Axis::DescendantsOrSelfFromRoot, 2), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_preceding_axes() {
        let doc = doc_from(scenario_a_events());
        assert_eq!(axis_ids(&doc, Axis::PrecedingSibling, 3), vec![2]);
        assert!(axis_ids(&doc, Axis::PrecedingSibling, 2).is_empty());
        assert_eq!(axis_ids(&doc, Axis::Preceding, 4), vec![2]);
        assert_eq!(axis_ids(&doc, Axis::Preceding, 3), vec![2]);
        assert!(axis_ids(&doc, Axis::Preceding, 2).is_empty());
    }

    #[test]
    fn test_attribute_and_namespace_axes() {
        let doc = doc_from(vec![
            BuildEvent::start_with(
                "a",
                vec![
                    AttributeEvent::from_qname("xmlns:p", ns::XMLNS, "urn:p"),
                    AttributeEvent::new("x", "1"),
                    AttributeEvent::new("y", "2"),
                ],
            ),
            BuildEvent::start_with(
                "b",
                vec![AttributeEvent::from_qname("xmlns:q", ns::XMLNS, "urn:q")],
            ),
            BuildEvent::EndElement,
            BuildEvent::EndElement,
        ]);
        // a 1, xmlns:p 2, @x 3, @y 4, b 5, xmlns:q 6
        assert_eq!(axis_ids(&doc, Axis::Attribute, 1), vec![3, 4]);
        assert!(axis_ids(&doc, Axis::Attribute, 5).is_empty());
        assert_eq!(axis_ids(&doc, Axis::NamespaceDecls, 1), vec![2]);
        assert_eq!(axis_ids(&doc, Axis::NamespaceDecls, 5), vec![6]);
        assert_eq!(axis_ids(&doc, Axis::Namespace, 1), vec![2]);
        assert_eq!(axis_ids(&doc, Axis::Namespace, 5), vec![2, 6]);
        assert_eq!(axis_ids(&doc, Axis::Child, 1), vec![5]);

        let y = doc.lookup_expanded_type("", "y", NodeType::Attribute).unwrap();
        assert_eq!(typed_ids(&doc, Axis::Attribute, 1, y), vec![4]);
    }

    #[test]
    fn test_scenario_b_scope() {
        let doc = doc_from(scenario_b_events());
        assert_eq!(axis_ids(&doc, Axis::Namespace, 3), vec![2]);
        assert_eq!(axis_ids(&doc, Axis::Namespace, 1), vec![2]);
        let decl = doc.make_node_handle(2).unwrap();
        assert_eq!(doc.local_name(decl), "p");
        assert_eq!(doc.node_value(decl).as_deref(), Some("urn:x"));
        let b = doc.make_node_handle(3).unwrap();
        assert_eq!(doc.namespace_uri(b).as_deref(), Some("urn:x"));
        assert_eq!(doc.namespace_scope(b), vec![decl]);
    }

    #[test]
    fn test_redeclared_prefix_shadows() {
        let doc = doc_from(vec![
            BuildEvent::start("a"),
            BuildEvent::namespace_decl("p", "urn:outer"),
            BuildEvent::namespace_decl("r", "urn:r"),
            BuildEvent::start("b"),
            BuildEvent::namespace_decl("p", "urn:inner"),
            BuildEvent::start("c"),
            BuildEvent::EndElement,
            BuildEvent::EndElement,
            BuildEvent::EndElement,
        ]);
        // a 1, p 2, r 3, b 4, p 5, c 6
        let scope: Vec<String> = ids(&doc, doc.axis_nodes(Axis::Namespace, doc.make_node_handle(6).unwrap()))
            .into_iter()
            .map(|id| doc.node_value(doc.make_node_handle(id).unwrap()).unwrap())
            .collect();
        assert_eq!(scope.len(), 2);
        assert!(scope.contains(&"urn:inner".to_string()));
        assert!(scope.contains(&"urn:r".to_string()));
        assert_eq!(axis_ids(&doc, Axis::Namespace, 4), axis_ids(&doc, Axis::Namespace, 6));
    }

    #[test]
    fn test_mark_and_goto_mark() {
        let doc = doc_from(scenario_a_events());
        let mut iter = doc.axis_iterator(Axis::Descendant);
        iter.set_start_node(doc.make_node_handle(0).unwrap());
        assert_eq!(iter.next(), doc.make_node_handle(1));
        iter.set_mark();
        assert_eq!(iter.next(), doc.make_node_handle(2));
        assert_eq!(iter.next(), doc.make_node_handle(3));
        assert_eq!(iter.position(), 3);
        iter.goto_mark();
        assert_eq!(iter.position(), 1);
        assert_eq!(iter.next(), doc.make_node_handle(2));
    }

    #[test]
    fn test_last_preserves_cursor() {
        let doc = doc_from(scenario_a_events());
        let mut iter = doc.axis_iterator(Axis::Descendant);
        iter.set_start_node(doc.make_node_handle(1).unwrap());
        assert_eq!(iter.next(), doc.make_node_handle(2));
        iter.set_mark();
        assert_eq!(iter.last(), 3);
        assert_eq!(iter.position(), 1);
        assert_eq!(iter.next(), doc.make_node_handle(3));
        iter.goto_mark();
        assert_eq!(iter.next(), doc.make_node_handle(3));
    }

    #[test]
    fn test_reset_and_restartable() {
        let doc = doc_from(scenario_a_events());
        let a = doc.make_node_handle(1).unwrap();
        let c = doc.make_node_handle(3).unwrap();

        let mut iter = doc.axis_iterator(Axis::Child);
        iter.set_start_node(a);
        let first = iter.remaining();
        iter.reset();
        assert_eq!(iter.remaining(), first);
        assert_eq!(iter.start_node(), Some(a));

        let mut clone = iter.clone_iterator();
        assert!(!clone.is_restartable());
        assert!(iter.is_restartable());
        // A non-restartable iterator keeps its start node
        clone.set_start_node(c);
        assert_eq!(clone.start_node(), Some(a));
        clone.reset();
        assert_eq!(ids(&doc, clone.remaining()), vec![2, 3]);

        iter.set_start_node(c);
        assert_eq!(ids(&doc, iter.remaining()), vec![4]);
    }

    #[test]
    fn test_unstarted_iterator_is_empty() {
        let doc = doc_from(scenario_a_events());
        for axis in Axis::ALL {
            let mut iter = doc.axis_iterator(axis);
            assert_eq!(iter.next(), None, "{axis}");
            assert_eq!(iter.start_node(), None);
        }
    }

    #[test]
    fn test_typed_descendants_index_and_scan_agree() {
        let events = tree_events(&[(0, 0), (0, 1), (1, 0), (0, 0), (1, 0), (1, 0), (0, 0), (2, 0)]);
        let indexed = doc_from(events.clone());
        let plain = doc_with(DtmConfig::default().with_element_index(false), events);
        let p = indexed.lookup_expanded_type("", "p", NodeType::Element).unwrap();
        assert_eq!(plain.lookup_expanded_type("", "p", NodeType::Element), Some(p));
        for context in 0..indexed.node_count() {
            for axis in [Axis::Child, Axis::Descendant, Axis::DescendantOrSelf] {
                assert_eq!(
                    typed_ids(&indexed, axis, context, p),
                    typed_ids(&plain, axis, context, p),
                    "{axis} from {context}"
                );
            }
        }
    }

    proptest! {
        #[test]
        fn prop_ancestor_descendant_duality(ops in prop::collection::vec((0u8..4, 0u8..3), 0..40)) {
            let doc = doc_from(tree_events(&ops));
            let n = doc.node_count();
            for a in 0..n {
                let descendants = axis_ids(&doc, Axis::Descendant, a);
                for d in 0..n {
                    let ancestors = axis_ids(&doc, Axis::Ancestor, d);
                    prop_assert_eq!(descendants.contains(&d), ancestors.contains(&a));
                }
            }
        }

        #[test]
        fn prop_sibling_axes_mirror(ops in prop::collection::vec((0u8..4, 0u8..3), 0..40)) {
            let doc = doc_from(tree_events(&ops));
            for node in 1..doc.node_count() {
                let parent = doc.parent_of(node);
                let children = axis_ids(&doc, Axis::Child, parent);
                let at = children.iter().position(|&c| c == node).unwrap();

                let mut before: Vec<NodeId> = children[..at].to_vec();
                before.reverse();
                prop_assert_eq!(axis_ids(&doc, Axis::PrecedingSibling, node), before);
                prop_assert_eq!(axis_ids(&doc, Axis::FollowingSibling, node), children[at + 1..].to_vec());
            }
        }

        #[test]
        fn prop_document_order_partition(ops in prop::collection::vec((0u8..4, 0u8..3), 0..40)) {
            let doc = doc_from(tree_events(&ops));
            let n = doc.node_count();
            for node in 1..n {
                let mut all: Vec<NodeId> = axis_ids(&doc, Axis::AncestorOrSelf, node);
                all.extend(axis_ids(&doc, Axis::Descendant, node));
                all.extend(axis_ids(&doc, Axis::Following, node));
                all.extend(axis_ids(&doc, Axis::Preceding, node));
                all.sort_unstable();
                prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
            }
        }

        #[test]
        fn prop_start_twice_same_sequence(ops in prop::collection::vec((0u8..4, 0u8..3), 0..30)) {
            let doc = doc_from(tree_events(&ops));
            for axis in Axis::ALL {
                for node in 0..doc.node_count() {
                    let handle = doc.make_node_handle(node).unwrap();
                    let mut iter = doc.axis_iterator(axis);
                    iter.set_start_node(handle);
                    let once = iter.remaining();
                    iter.set_start_node(handle);
                    prop_assert_eq!(iter.remaining(), once.clone());
                    prop_assert_eq!(iter.last(), once.len());
                }
            }
        }

        #[test]
        fn prop_iterator_matches_traverser(ops in prop::collection::vec((0u8..4, 0u8..3), 0..30)) {
            let doc = doc_from(tree_events(&ops));
            for axis in Axis::ALL {
                let traverser = doc.axis_traverser(axis);
                for node in 0..doc.node_count() {
                    let ctx = doc.make_node_handle(node).unwrap();
                    let mut walked = Vec::new();
                    let mut current = traverser.first(ctx);
                    while let Some(h) = current {
                        walked.push(h);
                        current = traverser.next(ctx, h);
                    }
                    prop_assert_eq!(doc.axis_nodes(axis, ctx), walked);
                }
            }
        }
    }

    #[test]
    fn test_unbuilt_context_yields_nothing() {
        let doc = doc_from(scenario_a_events());
        let ghost = doc.make_node_handle(100).unwrap();
        assert_eq!(doc.node_type(ghost), None);
        for axis in Axis::ALL {
            assert_eq!(doc.axis_traverser(axis).first(ghost), None, "{axis} traverser");
            assert!(doc.axis_nodes(axis, ghost).is_empty(), "{axis} iterator");
        }
    }
}
