//! Axes Module
//!
//! Navigation along XPath-style axes over a [`Document`]:
//! - `AxisTraverser`: stateless, every call takes the context and the
//!   current node
//! - `AxisIterator`: stateful cursors with reset, mark and restore
//!
//! Forward axes run in document order. Reverse axes (ancestor,
//! preceding-sibling, preceding) emit the nearest node first.

pub mod iterator;
pub mod traverser;

pub use iterator::{AxisIterator, IterState};
pub use traverser::AxisTraverser;

use crate::dom::node::NodeHandle;
use crate::dom::Document;

/// Axis identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    /// In-scope namespace nodes
    Namespace,
    /// Namespace nodes declared on the element itself
    NamespaceDecls,
    Parent,
    Preceding,
    PrecedingSibling,
    Self_,
    Root,
    /// Descendants of the context's document root
    DescendantsFromRoot,
    /// The document root and its descendants
    DescendantsOrSelfFromRoot,
}

impl Axis {
    pub const ALL: [Axis; 17] = [
        Axis::Ancestor,
        Axis::AncestorOrSelf,
        Axis::Attribute,
        Axis::Child,
        Axis::Descendant,
        Axis::DescendantOrSelf,
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Namespace,
        Axis::NamespaceDecls,
        Axis::Parent,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::Self_,
        Axis::Root,
        Axis::DescendantsFromRoot,
        Axis::DescendantsOrSelfFromRoot,
    ];

    #[inline]
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Namespace => "namespace",
            Axis::NamespaceDecls => "namespace-decls",
            Axis::Parent => "parent",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::Self_ => "self",
            Axis::Root => "root",
            Axis::DescendantsFromRoot => "descendants-from-root",
            Axis::DescendantsOrSelfFromRoot => "descendants-or-self-from-root",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Document {
    /// Stateless traverser for `axis`
    pub fn axis_traverser(&self, axis: Axis) -> AxisTraverser<'_> {
        AxisTraverser::new(self, axis)
    }

    /// Stateful iterator for `axis`, not yet started
    pub fn axis_iterator(&self, axis: Axis) -> Box<dyn AxisIterator<'_> + '_> {
        iterator::build(self, axis, None)
    }

    /// Stateful iterator filtered by a node kind code (`< NTYPES`) or an
    /// exact expanded type (`>= NTYPES`)
    pub fn typed_axis_iterator(&self, axis: Axis, required_type: u32) -> Box<dyn AxisIterator<'_> + '_> {
        iterator::build(self, axis, Some(required_type))
    }

    /// Every node on `axis` from `context`, in the axis's own order
    pub fn axis_nodes(&self, axis: Axis, context: NodeHandle) -> Vec<NodeHandle> {
        let mut iter = self.axis_iterator(axis);
        iter.set_start_node(context);
        iter.remaining()
    }
}
