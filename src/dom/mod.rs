//! DOM Module - Table-backed document model
//!
//! Implements the node store behind the tree view:
//! - Fixed-width records in a chunked table, addressed by dense identity
//! - Expanded-type interning for names
//! - Lazily built namespace scopes
//! - Handles minted through a shared registry

pub mod document;
mod dump;
pub mod namespace;
pub mod node;
pub mod view;

pub use document::Document;
pub use namespace::{NamespaceScopeIndex, ScopeEntry};
pub use node::{NodeHandle, NodeId, NodeType, DOCUMENT_ID, NOT_PROCESSED, NTYPES, NULL};
pub use view::NodeRef;

/// Trait for tree-view access by handle.
///
/// Absent relations come back as `None`, never as a sentinel value.
pub trait DocumentAccess {
    /// The Document node of the tree `node` belongs to
    fn document_root(&self, node: NodeHandle) -> Option<NodeHandle>;

    /// The single top-level element
    fn document_element(&self) -> Option<NodeHandle>;

    fn node_type(&self, node: NodeHandle) -> Option<NodeType>;

    /// Qualified name, or the fixed `#text`-style name for unnamed kinds
    fn node_name(&self, node: NodeHandle) -> String;

    fn local_name(&self, node: NodeHandle) -> String;

    fn prefix(&self, node: NodeHandle) -> String;

    fn namespace_uri(&self, node: NodeHandle) -> Option<String>;

    /// Character content for text-like kinds, attributes and namespaces
    fn node_value(&self, node: NodeHandle) -> Option<String>;

    /// XPath string value
    fn string_value(&self, node: NodeHandle) -> String;

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn first_child(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn last_child(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn previous_sibling(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn first_attribute(&self, element: NodeHandle) -> Option<NodeHandle>;

    fn next_attribute(&self, attribute: NodeHandle) -> Option<NodeHandle>;

    /// Attribute by expanded name; `None` namespace means no namespace
    fn attribute_node(
        &self,
        element: NodeHandle,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<NodeHandle>;

    /// First namespace node: every in-scope declaration when `in_scope`,
    /// otherwise only those declared on the element itself
    fn first_namespace_node(&self, element: NodeHandle, in_scope: bool) -> Option<NodeHandle>;

    fn next_namespace_node(
        &self,
        element: NodeHandle,
        current: NodeHandle,
        in_scope: bool,
    ) -> Option<NodeHandle>;

    fn has_child_nodes(&self, node: NodeHandle) -> bool {
        self.first_child(node).is_some()
    }

    /// Children collected into a Vec
    fn children_vec(&self, node: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut child = self.first_child(node);
        while let Some(c) = child {
            out.push(c);
            child = self.next_sibling(c);
        }
        out
    }

    /// Attributes collected into a Vec
    fn attributes_vec(&self, element: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut attr = self.first_attribute(element);
        while let Some(a) = attr {
            out.push(a);
            attr = self.next_attribute(a);
        }
        out
    }
}
