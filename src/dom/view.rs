//! Node Proxy
//!
//! A `NodeRef` pairs a handle with the document that minted it, so tree-view
//! code can navigate without passing the document around. The view is
//! read-only: every mutation reports [`DtmError::ReadOnly`].

use super::node::{NodeHandle, NodeType};
use super::DocumentAccess;
use crate::error::{DtmError, Result};

pub struct NodeRef<'d, D: DocumentAccess + ?Sized> {
    doc: &'d D,
    handle: NodeHandle,
}

// Manual impls: a derive would demand `D: Clone`
impl<D: DocumentAccess + ?Sized> Clone for NodeRef<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: DocumentAccess + ?Sized> Copy for NodeRef<'_, D> {}

impl<D: DocumentAccess + ?Sized> PartialEq for NodeRef<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(self.doc, other.doc) && self.handle == other.handle
    }
}

impl<D: DocumentAccess + ?Sized> Eq for NodeRef<'_, D> {}

impl<D: DocumentAccess + ?Sized> std::fmt::Debug for NodeRef<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("handle", &format_args!("{:#x}", self.handle))
            .field("name", &self.name())
            .finish()
    }
}

impl<'d, D: DocumentAccess + ?Sized> NodeRef<'d, D> {
    #[inline]
    pub fn new(doc: &'d D, handle: NodeHandle) -> Self {
        Self { doc, handle }
    }

    #[inline]
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    #[inline]
    pub fn document(&self) -> &'d D {
        self.doc
    }

    #[inline]
    fn wrap(&self, handle: Option<NodeHandle>) -> Option<Self> {
        handle.map(|h| Self::new(self.doc, h))
    }

    pub fn node_type(&self) -> Option<NodeType> {
        self.doc.node_type(self.handle)
    }

    pub fn name(&self) -> String {
        self.doc.node_name(self.handle)
    }

    pub fn local_name(&self) -> String {
        self.doc.local_name(self.handle)
    }

    pub fn prefix(&self) -> String {
        self.doc.prefix(self.handle)
    }

    pub fn namespace_uri(&self) -> Option<String> {
        self.doc.namespace_uri(self.handle)
    }

    pub fn value(&self) -> Option<String> {
        self.doc.node_value(self.handle)
    }

    pub fn string_value(&self) -> String {
        self.doc.string_value(self.handle)
    }

    pub fn parent(&self) -> Option<Self> {
        self.wrap(self.doc.parent(self.handle))
    }

    pub fn first_child(&self) -> Option<Self> {
        self.wrap(self.doc.first_child(self.handle))
    }

    pub fn last_child(&self) -> Option<Self> {
        self.wrap(self.doc.last_child(self.handle))
    }

    pub fn next_sibling(&self) -> Option<Self> {
        self.wrap(self.doc.next_sibling(self.handle))
    }

    pub fn previous_sibling(&self) -> Option<Self> {
        self.wrap(self.doc.previous_sibling(self.handle))
    }

    pub fn has_child_nodes(&self) -> bool {
        self.doc.has_child_nodes(self.handle)
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'d, D>> + 'd {
        let doc = self.doc;
        std::iter::successors(self.first_child(), move |n| {
            doc.next_sibling(n.handle).map(|h| NodeRef::new(doc, h))
        })
    }

    pub fn attributes(&self) -> impl Iterator<Item = NodeRef<'d, D>> + 'd {
        let doc = self.doc;
        let first = doc.first_attribute(self.handle).map(|h| NodeRef::new(doc, h));
        std::iter::successors(first, move |n| {
            doc.next_attribute(n.handle).map(|h| NodeRef::new(doc, h))
        })
    }

    /// Attribute value by expanded name
    pub fn attribute(&self, namespace: Option<&str>, local_name: &str) -> Option<String> {
        self.doc
            .attribute_node(self.handle, namespace, local_name)
            .and_then(|h| self.doc.node_value(h))
    }

    pub fn owner_document(&self) -> Option<Self> {
        self.wrap(self.doc.document_root(self.handle))
    }

    // Mutations are not supported by a table-backed store

    pub fn set_node_value(&self, _value: &str) -> Result<()> {
        Err(DtmError::ReadOnly("set_node_value"))
    }

    pub fn append_child(&self, _child: &Self) -> Result<()> {
        Err(DtmError::ReadOnly("append_child"))
    }

    pub fn remove_child(&self, _child: &Self) -> Result<()> {
        Err(DtmError::ReadOnly("remove_child"))
    }

    pub fn set_attribute(&self, _name: &str, _value: &str) -> Result<()> {
        Err(DtmError::ReadOnly("set_attribute"))
    }
}

#[cfg(test)]
mod tests {
    use crate::build::{AttributeEvent, BuildEvent};
    use crate::dom::{DocumentAccess, NodeType};
    use crate::error::DtmError;
    use crate::testing::{doc_from, scenario_a_events};

    #[test]
    fn test_navigation_through_proxies() {
        let doc = doc_from(scenario_a_events());
        let a = doc.node(doc.document_element().unwrap()).unwrap();
        assert_eq!(a.name(), "a");
        let names: Vec<String> = a.children().map(|c| c.name()).collect();
        assert_eq!(names, vec!["b", "c"]);

        let c = a.last_child().unwrap();
        assert_eq!(c.previous_sibling().unwrap().name(), "b");
        let text = c.first_child().unwrap();
        assert_eq!(text.node_type(), Some(NodeType::Text));
        assert_eq!(text.value().as_deref(), Some("text"));
        assert_eq!(text.parent(), Some(c));
        assert!(!text.has_child_nodes());
        assert_eq!(
            text.owner_document().unwrap().node_type(),
            Some(NodeType::Document)
        );
    }

    #[test]
    fn test_attributes_through_proxy() {
        let doc = doc_from(vec![
            BuildEvent::start_with(
                "a",
                vec![
                    AttributeEvent::new("x", "1"),
                    AttributeEvent::from_qname("p:y", "urn:p", "2"),
                ],
            ),
            BuildEvent::EndElement,
        ]);
        let a = doc.node(doc.document_element().unwrap()).unwrap();
        let names: Vec<String> = a.attributes().map(|n| n.name()).collect();
        assert_eq!(names, vec!["x", "p:y"]);
        assert_eq!(a.attribute(Some("urn:p"), "y").as_deref(), Some("2"));
        assert_eq!(a.attribute(None, "y"), None);
        assert!(!a.has_child_nodes());
    }

    #[test]
    fn test_mutations_are_read_only() {
        let doc = doc_from(scenario_a_events());
        let a = doc.node(doc.document_element().unwrap()).unwrap();
        let b = a.first_child().unwrap();
        assert_eq!(a.set_node_value("v"), Err(DtmError::ReadOnly("set_node_value")));
        assert_eq!(a.append_child(&b), Err(DtmError::ReadOnly("append_child")));
        assert_eq!(a.remove_child(&b), Err(DtmError::ReadOnly("remove_child")));
        assert_eq!(a.set_attribute("k", "v"), Err(DtmError::ReadOnly("set_attribute")));
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let doc = doc_from(scenario_a_events());
        let other = doc_from(scenario_a_events());
        // Both documents own distinct registries, so each has store id 0;
        // a handle outside any assigned range is foreign to both
        let stray = 5u32 << doc.config().identity_bits;
        assert!(matches!(doc.node(stray), Err(DtmError::ForeignHandle { .. })));
        assert!(other.node(other.document_element().unwrap()).is_ok());
    }
}
