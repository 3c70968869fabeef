//! Tree Builder
//!
//! Applies construction events to a document's storage, one record at a time.
//!
//! - Records are appended strictly in event order
//! - A closed element's next-sibling word is patched when its next sibling
//!   arrives, or to NULL when its parent closes
//! - Namespace nodes precede attribute nodes for every element
//! - Adjacent text runs are coalesced into one node when the run ends

use super::events::{AttributeEvent, BuildEvent};
use crate::dom::document::DocumentData;
use crate::dom::namespace::{ns, ScopeEntry};
use crate::dom::node::{
    pack_type, NodeId, NodeType, DOCUMENT_ID, FIELD_NEXT, FIELD_PARENT, MAX_NAMESPACE_ID,
    NOT_PROCESSED, NULL,
};
use crate::error::{DtmError, Result};
use crate::registry::HandleRegistry;
use crate::store::Span;
use std::cell::RefCell;

/// Text run accumulated but not yet materialized
#[derive(Debug, Clone, Copy)]
struct PendingText {
    span: Span,
    all_cdata: bool,
}

/// Builder state for one document
///
/// Uses a stack of open parents (bottom is always the Document) plus the
/// single "previous sibling" cursor needed for back-patching.
#[derive(Debug)]
pub(crate) struct TreeBuilder {
    strip_whitespace: bool,
    /// Open parents; `open[0]` is the Document
    open: Vec<NodeId>,
    previous_sibling: NodeId,
    /// `previous_sibling` is a closed element whose next link is still open
    previous_was_parent: bool,
    pending_text: Option<PendingText>,
    /// Directly after a start tag, before any content
    in_start_tag: bool,
    seen_attribute: bool,
    started: bool,
    ended: bool,
}

impl TreeBuilder {
    pub(crate) fn new(strip_whitespace: bool) -> Self {
        Self {
            strip_whitespace,
            open: vec![DOCUMENT_ID],
            previous_sibling: NULL,
            previous_was_parent: false,
            pending_text: None,
            in_start_tag: false,
            seen_attribute: false,
            started: false,
            ended: false,
        }
    }

    /// Get the current parent (innermost open element, or the Document)
    #[inline]
    fn current_parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or(DOCUMENT_ID)
    }

    /// Number of open elements
    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.open.len() - 1
    }

    /// Apply one event
    pub(crate) fn apply(
        &mut self,
        data: &mut DocumentData,
        registry: &RefCell<HandleRegistry>,
        event: BuildEvent,
    ) -> Result<()> {
        if self.ended || data.complete {
            return Err(DtmError::MalformedEvents(
                "event delivered after the document was completed".to_string(),
            ));
        }
        if !event.is_start_tag_part() {
            // A text event keeps the flag off too; only start tags set it
            self.in_start_tag = false;
        }

        match event {
            BuildEvent::StartDocument => {
                if self.started || data.records.slots_used() > 0 {
                    return Err(DtmError::MalformedEvents(
                        "start of document after content".to_string(),
                    ));
                }
                self.started = true;
                Ok(())
            }
            BuildEvent::StartElement {
                namespace,
                local_name,
                prefix,
                attributes,
            } => self.start_element(data, registry, &namespace, &local_name, &prefix, &attributes),
            BuildEvent::Attribute(attr) => {
                if !self.in_start_tag {
                    return Err(DtmError::MalformedEvents(format!(
                        "attribute '{}' outside a start tag",
                        attr.local_name
                    )));
                }
                self.attribute(data, registry, &attr)
            }
            BuildEvent::NamespaceDecl { prefix, uri } => {
                if !self.in_start_tag {
                    return Err(DtmError::MalformedEvents(format!(
                        "namespace declaration for '{prefix}' outside a start tag"
                    )));
                }
                self.namespace_decl(data, registry, &prefix, &uri)
            }
            BuildEvent::Text(content) => {
                self.characters(data, &content, false);
                Ok(())
            }
            BuildEvent::CData(content) => {
                self.characters(data, &content, true);
                Ok(())
            }
            BuildEvent::Comment(content) => {
                self.flush_text(data, registry)?;
                let span = data.text.append(&content);
                let id = self.append_node(
                    data,
                    registry,
                    [pack_type(NodeType::Comment, 0), self.current_parent(), span.offset, span.len],
                )?;
                self.previous_sibling = id;
                Ok(())
            }
            BuildEvent::ProcessingInstruction { target, data: content } => {
                self.flush_text(data, registry)?;
                let span_index = data.push_span(&content);
                let exptype = data.names.intern("", &target, NodeType::ProcessingInstruction);
                let id = self.append_node(
                    data,
                    registry,
                    [
                        pack_type(NodeType::ProcessingInstruction, 0),
                        self.current_parent(),
                        span_index,
                        exptype,
                    ],
                )?;
                self.previous_sibling = id;
                Ok(())
            }
            BuildEvent::EndElement => self.end_element(data, registry),
            BuildEvent::EndDocument => self.end_document(data, registry),
        }
    }

    fn start_element(
        &mut self,
        data: &mut DocumentData,
        registry: &RefCell<HandleRegistry>,
        namespace: &str,
        local_name: &str,
        prefix: &str,
        attributes: &[AttributeEvent],
    ) -> Result<()> {
        self.flush_text(data, registry)?;

        let parent = self.current_parent();
        if parent == DOCUMENT_ID && data.document_element != NULL {
            return Err(DtmError::MalformedEvents(format!(
                "second document element '{local_name}'"
            )));
        }

        let namespace_id = intern_namespace(data, namespace)?;
        let exptype = data.names.intern(namespace, local_name, NodeType::Element);
        let id = self.append_node(
            data,
            registry,
            [pack_type(NodeType::Element, namespace_id), parent, NOT_PROCESSED, exptype],
        )?;
        data.set_prefix(id, prefix);
        if let Some(index) = data.elements.as_mut() {
            index.insert(exptype, id);
        }
        if parent == DOCUMENT_ID {
            data.document_element = id;
        }

        self.open.push(id);
        self.previous_sibling = NULL;
        self.previous_was_parent = false;
        self.in_start_tag = true;
        self.seen_attribute = false;

        // Two passes: declarations first, so attribute scans can stop at the
        // first record that is neither
        for attr in attributes {
            if let Some(declared) = attr.declared_prefix() {
                self.namespace_decl(data, registry, declared, &attr.value)?;
            }
        }
        for attr in attributes {
            if attr.declared_prefix().is_none() {
                self.attribute(data, registry, attr)?;
            }
        }
        Ok(())
    }

    fn attribute(
        &mut self,
        data: &mut DocumentData,
        registry: &RefCell<HandleRegistry>,
        attr: &AttributeEvent,
    ) -> Result<()> {
        if let Some(declared) = attr.declared_prefix() {
            return self.namespace_decl(data, registry, declared, &attr.value);
        }

        let element = self.current_parent();
        // The xml prefix is bound without a declaration
        let namespace = if attr.prefix == "xml" && attr.namespace.is_empty() {
            ns::XML
        } else {
            attr.namespace.as_str()
        };
        let namespace_id = intern_namespace(data, namespace)?;
        let span_index = data.push_span(&attr.value);
        let exptype = data.names.intern(namespace, &attr.local_name, NodeType::Attribute);
        let id = self.append_node(
            data,
            registry,
            [pack_type(NodeType::Attribute, namespace_id), element, span_index, exptype],
        )?;
        data.set_prefix(id, &attr.prefix);
        if attr.is_id {
            data.ids.entry(attr.value.clone()).or_insert(element);
        }
        self.seen_attribute = true;
        Ok(())
    }

    fn namespace_decl(
        &mut self,
        data: &mut DocumentData,
        registry: &RefCell<HandleRegistry>,
        prefix: &str,
        uri: &str,
    ) -> Result<()> {
        if self.seen_attribute {
            return Err(DtmError::MalformedEvents(format!(
                "namespace declaration for '{prefix}' after attributes"
            )));
        }
        let element = self.current_parent();
        let span_index = data.push_span(uri);
        let exptype = data.names.intern("", prefix, NodeType::Namespace);
        let id = self.append_node(
            data,
            registry,
            [pack_type(NodeType::Namespace, 0), element, span_index, exptype],
        )?;

        let uppermost = if data.records.slots_used() > 0 { 1 } else { DOCUMENT_ID };
        let records = &data.records;
        data.scopes.declare(
            element,
            ScopeEntry { node: id, exptype },
            &|n: NodeId| records.read_field(n, FIELD_PARENT),
            uppermost,
        );
        Ok(())
    }

    fn characters(&mut self, data: &mut DocumentData, content: &str, cdata: bool) {
        let span = data.text.append(content);
        match self.pending_text.as_mut() {
            Some(pending) => {
                pending.span.merge_adjacent(span);
                pending.all_cdata &= cdata;
            }
            None => {
                self.pending_text = Some(PendingText {
                    span,
                    all_cdata: cdata,
                });
            }
        }
    }

    /// Materialize the accumulated text run, if any
    pub(crate) fn flush_text(
        &mut self,
        data: &mut DocumentData,
        registry: &RefCell<HandleRegistry>,
    ) -> Result<()> {
        let Some(pending) = self.pending_text.take() else {
            return Ok(());
        };
        if pending.span.is_empty() {
            return Ok(());
        }
        if self.strip_whitespace && data.text.is_whitespace(pending.span) {
            data.text.truncate(pending.span.offset);
            return Ok(());
        }

        let kind = if pending.all_cdata {
            NodeType::CDataSection
        } else {
            NodeType::Text
        };
        let id = self.append_node(
            data,
            registry,
            [pack_type(kind, 0), self.current_parent(), pending.span.offset, pending.span.len],
        )?;
        self.previous_sibling = id;
        Ok(())
    }

    fn end_element(&mut self, data: &mut DocumentData, registry: &RefCell<HandleRegistry>) -> Result<()> {
        self.flush_text(data, registry)?;
        if self.open.len() <= 1 {
            return Err(DtmError::MalformedEvents(
                "end of element without a matching start".to_string(),
            ));
        }
        self.close_dangling_sibling(data);
        self.previous_sibling = self.open.pop().unwrap_or(NULL);
        self.previous_was_parent = true;
        Ok(())
    }

    fn end_document(&mut self, data: &mut DocumentData, registry: &RefCell<HandleRegistry>) -> Result<()> {
        self.flush_text(data, registry)?;
        if self.open.len() > 1 {
            return Err(DtmError::MalformedEvents(format!(
                "end of document with {} unclosed element(s)",
                self.depth()
            )));
        }
        self.close_dangling_sibling(data);
        self.ended = true;
        data.complete = true;
        log::debug!(
            "document complete: {} nodes, {} bytes of character data",
            data.records.slots_used() + 1,
            data.text.len()
        );
        Ok(())
    }

    /// Last child of the parent being closed gets a NULL next link
    fn close_dangling_sibling(&mut self, data: &mut DocumentData) {
        if self.previous_was_parent {
            data.records.write_field(self.previous_sibling, FIELD_NEXT, NULL);
            self.previous_was_parent = false;
        }
    }

    /// Stop construction and leave every appended record well-formed.
    ///
    /// Pending text becomes a node, and every next-sibling word that could
    /// still be waiting (closed previous sibling, open elements) becomes NULL.
    pub(crate) fn freeze(&mut self, data: &mut DocumentData, registry: &RefCell<HandleRegistry>) {
        if data.complete {
            self.ended = true;
            return;
        }
        if let Err(err) = self.flush_text(data, registry) {
            log::warn!("dropping pending text while freezing: {err}");
            self.pending_text = None;
        }
        self.close_dangling_sibling(data);
        for &element in self.open.iter().skip(1) {
            if data.records.read_field(element, FIELD_NEXT) == NOT_PROCESSED {
                data.records.write_field(element, FIELD_NEXT, NULL);
            }
        }
        self.open.truncate(1);
        self.ended = true;
        data.complete = true;
        log::debug!("construction frozen at {} nodes", data.records.slots_used() + 1);
    }

    /// Append a record, extending the handle range first when the new
    /// identity starts a fresh `2^K` block, then back-patch the closed
    /// previous sibling.
    fn append_node(
        &mut self,
        data: &mut DocumentData,
        registry: &RefCell<HandleRegistry>,
        words: [u32; 4],
    ) -> Result<NodeId> {
        let next = data.records.slots_used() + 1;
        if next >= NOT_PROCESSED {
            return Err(DtmError::MalformedEvents("identity space exhausted".to_string()));
        }
        let range = (next >> data.identity_bits) as usize;
        if range >= data.store_ids.len() {
            let mut registry = registry.borrow_mut();
            let store_id = registry.first_free_id().ok_or(DtmError::StoreIdsExhausted {
                identity_bits: data.identity_bits,
            })?;
            registry.add_store(data.key, store_id, next)?;
            data.store_ids.push(store_id);
            log::debug!("identity {next} overflows into store id {store_id}");
        }

        let id = data.records.append(&words);
        if self.previous_was_parent {
            data.records.write_field(self.previous_sibling, FIELD_NEXT, id);
            self.previous_was_parent = false;
        }
        Ok(id)
    }
}

fn intern_namespace(data: &mut DocumentData, namespace: &str) -> Result<u32> {
    let id = data.namespaces.intern(namespace);
    if id > MAX_NAMESPACE_ID {
        return Err(DtmError::MalformedEvents(format!(
            "too many distinct namespaces (limit {MAX_NAMESPACE_ID})"
        )));
    }
    Ok(id)
}
