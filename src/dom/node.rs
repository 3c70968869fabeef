//! Node identifiers, kinds and record word layout
//!
//! Uses NodeId (u32) for dense in-store identities and NodeHandle (u32) for
//! registry-wide references.
//!
//! Record words:
//! - w0: kind in the low 8 bits, namespace symbol id above
//! - w1: parent identity
//! - w2: next sibling (elements), char offset (text, comment), or value span index
//! - w3: expanded type, or char length (text, comment)

/// Dense, store-local node identity (index into the record store)
pub type NodeId = u32;

/// Registry-wide node handle: `(store_id << K) | local`
pub type NodeHandle = u32;

/// "No such node". Never a valid identity or handle.
pub const NULL: u32 = u32::MAX;

/// "Not built yet, arrives later". Only ever seen in record words of an
/// incomplete store; readers pull more construction when they meet it.
pub const NOT_PROCESSED: u32 = u32::MAX - 1;

/// Identity of the Document node in every store
pub const DOCUMENT_ID: NodeId = 0;

pub const FIELD_TYPE: usize = 0;
pub const FIELD_PARENT: usize = 1;
pub const FIELD_NEXT: usize = 2;
pub const FIELD_DATA: usize = 3;

/// Text offset/length share w2/w3 with next/exptype
pub const FIELD_TEXT_OFFSET: usize = FIELD_NEXT;
pub const FIELD_TEXT_LEN: usize = FIELD_DATA;

const KIND_BITS: u32 = 8;
const KIND_MASK: u32 = (1 << KIND_BITS) - 1;

/// Number of built-in node kinds; expanded types below this are unnamed kinds
pub const NTYPES: u32 = 14;

/// Type of node, using the DOM node-type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CDataSection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
    Namespace = 13,
}

impl NodeType {
    /// Decode a kind tag. Code 0 and codes >= NTYPES are not node kinds.
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => NodeType::Element,
            2 => NodeType::Attribute,
            3 => NodeType::Text,
            4 => NodeType::CDataSection,
            5 => NodeType::EntityReference,
            6 => NodeType::Entity,
            7 => NodeType::ProcessingInstruction,
            8 => NodeType::Comment,
            9 => NodeType::Document,
            10 => NodeType::DocumentType,
            11 => NodeType::DocumentFragment,
            12 => NodeType::Notation,
            13 => NodeType::Namespace,
            _ => return None,
        })
    }

    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Kinds that store `(offset, len)` character data directly in w2/w3
    #[inline]
    pub const fn stores_text(self) -> bool {
        matches!(
            self,
            NodeType::Text | NodeType::CDataSection | NodeType::Comment
        )
    }

    /// Attribute and namespace nodes are attached to an element but are not
    /// part of its child/sibling chain
    #[inline]
    pub const fn is_attached(self) -> bool {
        matches!(self, NodeType::Attribute | NodeType::Namespace)
    }

    /// Kinds whose next sibling is found positionally (identity + 1)
    #[inline]
    pub const fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeType::Text
                | NodeType::CDataSection
                | NodeType::Comment
                | NodeType::ProcessingInstruction
        )
    }

    /// Lowercase kind name used in diagnostics
    pub const fn label(self) -> &'static str {
        match self {
            NodeType::Element => "element",
            NodeType::Attribute => "attribute",
            NodeType::Text => "text",
            NodeType::CDataSection => "cdata",
            NodeType::EntityReference => "entity-reference",
            NodeType::Entity => "entity",
            NodeType::ProcessingInstruction => "processing-instruction",
            NodeType::Comment => "comment",
            NodeType::Document => "document",
            NodeType::DocumentType => "doctype",
            NodeType::DocumentFragment => "fragment",
            NodeType::Notation => "notation",
            NodeType::Namespace => "namespace",
        }
    }

    /// DOM node name for kinds without a qualified name
    pub const fn fixed_name(self) -> Option<&'static str> {
        match self {
            NodeType::Text => Some("#text"),
            NodeType::CDataSection => Some("#cdata-section"),
            NodeType::Comment => Some("#comment"),
            NodeType::Document => Some("#document"),
            NodeType::DocumentFragment => Some("#document-fragment"),
            _ => None,
        }
    }
}

/// Pack kind and namespace symbol id into w0
#[inline]
pub const fn pack_type(kind: NodeType, namespace_id: u32) -> u32 {
    (namespace_id << KIND_BITS) | kind.code()
}

/// Kind tag stored in w0
#[inline]
pub const fn kind_code(w0: u32) -> u32 {
    w0 & KIND_MASK
}

/// Namespace symbol id stored in w0
#[inline]
pub const fn namespace_code(w0: u32) -> u32 {
    w0 >> KIND_BITS
}

/// Largest namespace symbol id that fits in w0
pub const MAX_NAMESPACE_ID: u32 = u32::MAX >> KIND_BITS;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_type() {
        let w0 = pack_type(NodeType::Element, 5);
        assert_eq!(kind_code(w0), 1);
        assert_eq!(namespace_code(w0), 5);
        assert_eq!(NodeType::from_code(kind_code(w0)), Some(NodeType::Element));
    }

    #[test]
    fn test_codes_cover_reserved_range() {
        assert_eq!(NodeType::from_code(0), None);
        for code in 1..NTYPES {
            assert_eq!(NodeType::from_code(code).map(NodeType::code), Some(code));
        }
        assert_eq!(NodeType::from_code(NTYPES), None);
    }

    #[test]
    fn test_sentinels_distinct() {
        assert_ne!(NULL, NOT_PROCESSED);
        assert!(NOT_PROCESSED > MAX_NAMESPACE_ID);
    }

    #[test]
    fn test_kind_predicates() {
        assert!(NodeType::Attribute.is_attached());
        assert!(NodeType::Namespace.is_attached());
        assert!(!NodeType::Element.is_attached());
        assert!(NodeType::Comment.stores_text());
        assert!(!NodeType::ProcessingInstruction.stores_text());
        assert!(NodeType::ProcessingInstruction.is_leaf());
        assert_eq!(NodeType::Text.fixed_name(), Some("#text"));
        assert_eq!(NodeType::Element.fixed_name(), None);
    }
}
