//! Construction Event Types
//!
//! Defines the structural events a document is built from. Events own their
//! strings: the store copies character data into its own buffer, so no event
//! has to outlive the call that delivers it.

use crate::dom::namespace::ns;
use memchr::memchr;

/// Split a qualified name into `(prefix, local)`. No colon means no prefix.
#[inline]
pub fn split_qname(qname: &str) -> (&str, &str) {
    match memchr(b':', qname.as_bytes()) {
        Some(colon) => (&qname[..colon], &qname[colon + 1..]),
        None => ("", qname),
    }
}

/// One attribute, either inside a start tag or delivered on its own
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeEvent {
    pub namespace: String,
    pub local_name: String,
    pub prefix: String,
    pub value: String,
    /// Declared as an ID attribute (DTD or schema)
    pub is_id: bool,
}

impl AttributeEvent {
    /// Attribute in no namespace
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Build from a qualified name such as `p:attr` or `xmlns:p`
    pub fn from_qname(qname: &str, namespace: impl Into<String>, value: impl Into<String>) -> Self {
        let (prefix, local) = split_qname(qname);
        Self {
            namespace: namespace.into(),
            local_name: local.to_string(),
            prefix: prefix.to_string(),
            value: value.into(),
            is_id: false,
        }
    }

    pub fn with_id(mut self, is_id: bool) -> Self {
        self.is_id = is_id;
        self
    }

    /// Prefix declared by this attribute when it is really an `xmlns`
    /// declaration (`""` for the default namespace)
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.prefix == "xmlns" {
            Some(&self.local_name)
        } else if self.prefix.is_empty() && self.local_name == "xmlns" {
            Some("")
        } else if self.namespace == ns::XMLNS {
            Some(&self.local_name)
        } else {
            None
        }
    }
}

/// A structural construction event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    StartDocument,

    /// Start of an element. `attributes` is the raw attribute list; entries
    /// that are `xmlns` declarations become namespace nodes.
    StartElement {
        namespace: String,
        local_name: String,
        prefix: String,
        attributes: Vec<AttributeEvent>,
    },

    /// Attribute of the element just started (before any content)
    Attribute(AttributeEvent),

    /// Namespace declaration on the element just started (before its attributes)
    NamespaceDecl { prefix: String, uri: String },

    Text(String),
    CData(String),
    Comment(String),

    ProcessingInstruction { target: String, data: String },

    EndElement,
    EndDocument,
}

impl BuildEvent {
    /// Start tag in no namespace, without attributes
    pub fn start(local_name: impl Into<String>) -> Self {
        BuildEvent::StartElement {
            namespace: String::new(),
            local_name: local_name.into(),
            prefix: String::new(),
            attributes: Vec::new(),
        }
    }

    /// Start tag from a qualified name and its resolved namespace
    pub fn start_ns(namespace: impl Into<String>, qname: &str) -> Self {
        let (prefix, local) = split_qname(qname);
        BuildEvent::StartElement {
            namespace: namespace.into(),
            local_name: local.to_string(),
            prefix: prefix.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Start tag in no namespace with attributes
    pub fn start_with(local_name: impl Into<String>, attributes: Vec<AttributeEvent>) -> Self {
        BuildEvent::StartElement {
            namespace: String::new(),
            local_name: local_name.into(),
            prefix: String::new(),
            attributes,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        BuildEvent::Text(content.into())
    }

    pub fn comment(content: impl Into<String>) -> Self {
        BuildEvent::Comment(content.into())
    }

    pub fn namespace_decl(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        BuildEvent::NamespaceDecl {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// Events that only make sense right after a start tag
    #[inline]
    pub fn is_start_tag_part(&self) -> bool {
        matches!(self, BuildEvent::Attribute(_) | BuildEvent::NamespaceDecl { .. })
    }
}
