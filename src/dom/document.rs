//! Document
//!
//! One document's node store plus the machinery that builds it.
//!
//! - Reads take `&self`; storage sits in a `RefCell` so that a read which
//!   meets an unbuilt node can pull one more construction event and retry
//! - In the default mode every event is pushed before reading starts; in
//!   incremental mode an [`EventSource`] is pulled on demand
//! - Navigation primitives work on dense identities and return the NULL
//!   sentinel; the public [`DocumentAccess`] surface works on handles and
//!   returns `Option`

use super::namespace::{ns, NamespaceScopeIndex, ScopeEntry};
use super::node::{
    kind_code, namespace_code, pack_type, NodeHandle, NodeId, NodeType, DOCUMENT_ID, FIELD_DATA,
    FIELD_NEXT, FIELD_PARENT, FIELD_TEXT_LEN, FIELD_TEXT_OFFSET, FIELD_TYPE, NOT_PROCESSED, NTYPES,
    NULL,
};
use super::view::NodeRef;
use super::DocumentAccess;
use crate::build::{BuildEvent, EventSource, Progress, TreeBuilder};
use crate::config::DtmConfig;
use crate::error::{DtmError, Result};
use crate::index::ElementIndex;
use crate::names::{ExpandedNameIndex, SymbolTable};
use crate::registry::{DocumentKey, HandleRegistry, SharedRegistry};
use crate::store::{RecordStore, Span, TextBuffer, RECORD_WIDTH};
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) type Record = [u32; RECORD_WIDTH];

// ============================================================================
// Storage
// ============================================================================

/// Everything construction writes and reads consult
#[derive(Debug)]
pub(crate) struct DocumentData {
    pub(crate) records: RecordStore,
    pub(crate) text: TextBuffer,
    /// Value spans for attributes, namespace URIs and PI data
    pub(crate) spans: Vec<Span>,
    pub(crate) names: ExpandedNameIndex,
    pub(crate) namespaces: SymbolTable,
    pub(crate) prefixes: SymbolTable,
    /// `(identity, prefix symbol)` for prefixed nodes, identity-ordered
    prefix_column: Vec<(NodeId, u32)>,
    pub(crate) scopes: NamespaceScopeIndex,
    pub(crate) elements: Option<ElementIndex>,
    /// ID attribute value -> owning element
    pub(crate) ids: HashMap<String, NodeId>,
    /// Store id per `2^K` identity range
    pub(crate) store_ids: Vec<u32>,
    pub(crate) identity_bits: u8,
    pub(crate) key: DocumentKey,
    pub(crate) document_element: NodeId,
    pub(crate) complete: bool,
    pub(crate) released: bool,
}

impl DocumentData {
    #[inline]
    pub(crate) fn is_built(&self, id: NodeId) -> bool {
        id <= self.records.slots_used()
    }

    #[inline]
    pub(crate) fn raw_record(&self, id: NodeId) -> Record {
        let r = self.records.read_record(id);
        [r[0], r[1], r[2], r[3]]
    }

    /// Append `value` to the character buffer and return its span index
    pub(crate) fn push_span(&mut self, value: &str) -> u32 {
        let span = self.text.append(value);
        let index = self.spans.len() as u32;
        self.spans.push(span);
        index
    }

    pub(crate) fn set_prefix(&mut self, id: NodeId, prefix: &str) {
        if !prefix.is_empty() {
            let symbol = self.prefixes.intern(prefix);
            self.prefix_column.push((id, symbol));
        }
    }

    pub(crate) fn prefix_of(&self, id: NodeId) -> &str {
        match self.prefix_column.binary_search_by_key(&id, |&(node, _)| node) {
            Ok(at) => self.prefixes.resolve(self.prefix_column[at].1).unwrap_or(""),
            Err(_) => "",
        }
    }

    #[inline]
    pub(crate) fn span_text(&self, index: u32) -> &str {
        self.spans
            .get(index as usize)
            .map_or("", |&span| self.text.slice(span))
    }

    /// Character data held directly by a record, if its kind has any
    pub(crate) fn own_text(&self, record: &Record) -> Option<&str> {
        let kind = NodeType::from_code(kind_code(record[FIELD_TYPE]))?;
        if kind.stores_text() {
            Some(self.text.slice(Span::new(
                record[FIELD_TEXT_OFFSET],
                record[FIELD_TEXT_LEN],
            )))
        } else if matches!(
            kind,
            NodeType::Attribute | NodeType::Namespace | NodeType::ProcessingInstruction
        ) {
            Some(self.span_text(record[FIELD_NEXT]))
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn exptype_of_record(record: &Record) -> u32 {
        match NodeType::from_code(kind_code(record[FIELD_TYPE])) {
            Some(kind) if kind.stores_text() => kind.code(),
            _ => record[FIELD_DATA],
        }
    }

    pub(crate) fn local_name(&self, record: &Record) -> String {
        match NodeType::from_code(kind_code(record[FIELD_TYPE])) {
            Some(
                NodeType::Element
                | NodeType::Attribute
                | NodeType::ProcessingInstruction
                | NodeType::Namespace,
            ) => self
                .names
                .local_name_of(record[FIELD_DATA])
                .unwrap_or("")
                .to_string(),
            _ => String::new(),
        }
    }

    pub(crate) fn node_name(&self, id: NodeId, record: &Record) -> String {
        let Some(kind) = NodeType::from_code(kind_code(record[FIELD_TYPE])) else {
            return String::new();
        };
        if let Some(fixed) = kind.fixed_name() {
            return fixed.to_string();
        }
        let local = self.names.local_name_of(record[FIELD_DATA]).unwrap_or("");
        match kind {
            NodeType::Namespace if local.is_empty() => "xmlns".to_string(),
            NodeType::Namespace => format!("xmlns:{local}"),
            NodeType::Element | NodeType::Attribute => match self.prefix_of(id) {
                "" => local.to_string(),
                prefix => format!("{prefix}:{local}"),
            },
            _ => local.to_string(),
        }
    }

    pub(crate) fn namespace_uri(&self, record: &Record) -> Option<String> {
        match NodeType::from_code(kind_code(record[FIELD_TYPE]))? {
            NodeType::Element | NodeType::Attribute => self
                .namespaces
                .resolve(namespace_code(record[FIELD_TYPE]))
                .filter(|uri| !uri.is_empty())
                .map(str::to_string),
            NodeType::Namespace => Some(ns::XMLNS.to_string()),
            _ => None,
        }
    }

    /// Depth without pulling; ancestors of a built node are always built
    pub(crate) fn raw_level(&self, id: NodeId) -> u32 {
        let mut level = 0;
        let mut current = self.records.read_field(id, FIELD_PARENT);
        while current != NULL {
            level += 1;
            current = self.records.read_field(current, FIELD_PARENT);
        }
        level
    }
}

// ============================================================================
// Document
// ============================================================================

struct PullState {
    builder: TreeBuilder,
    source: Option<Box<dyn EventSource>>,
    /// Construction failure not yet reported through `demand_more`
    failure: Option<DtmError>,
}

/// A document table model: one tree, its handles and its construction state
pub struct Document {
    config: DtmConfig,
    pub(crate) data: RefCell<DocumentData>,
    pull: RefCell<PullState>,
    registry: RefCell<SharedRegistry>,
    protocol_fault: Cell<bool>,
    base_uri: RefCell<Option<String>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("config", &self.config)
            .field("nodes", &self.node_count())
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl Document {
    /// Empty document with its own registry
    pub fn new(config: DtmConfig) -> Result<Self> {
        let registry = HandleRegistry::shared(config.identity_bits)?;
        Self::with_registry(config, registry)
    }

    /// Empty document minting handles from a shared registry
    pub fn with_registry(config: DtmConfig, registry: SharedRegistry) -> Result<Self> {
        config.validate()?;
        let identity_bits = registry.borrow().identity_bits();
        if identity_bits != config.identity_bits {
            return Err(DtmError::InvalidConfig(format!(
                "registry uses {identity_bits} identity bits, document asks for {}",
                config.identity_bits
            )));
        }

        let mut records = RecordStore::with_block_bits(config.block_bits)?;
        records.write_record(
            DOCUMENT_ID,
            &[
                pack_type(NodeType::Document, 0),
                NULL,
                NULL,
                NodeType::Document.code(),
            ],
        );

        let (key, store_id) = {
            let mut reg = registry.borrow_mut();
            let key = reg.register_document();
            let store_id = reg
                .first_free_id()
                .ok_or(DtmError::StoreIdsExhausted { identity_bits })?;
            reg.add_store(key, store_id, 0)?;
            (key, store_id)
        };

        let data = DocumentData {
            records,
            text: TextBuffer::new(),
            spans: Vec::new(),
            names: ExpandedNameIndex::new(),
            namespaces: SymbolTable::new(),
            prefixes: SymbolTable::new(),
            prefix_column: Vec::new(),
            scopes: NamespaceScopeIndex::new(),
            elements: config.index_elements.then(ElementIndex::new),
            ids: HashMap::new(),
            store_ids: vec![store_id],
            identity_bits,
            key,
            document_element: NULL,
            complete: false,
            released: false,
        };

        let document = Self {
            pull: RefCell::new(PullState {
                builder: TreeBuilder::new(config.strip_whitespace),
                source: None,
                failure: None,
            }),
            config,
            data: RefCell::new(data),
            registry: RefCell::new(registry),
            protocol_fault: Cell::new(false),
            base_uri: RefCell::new(None),
        };
        document.document_registration();
        Ok(document)
    }

    /// Build a complete document from a sequence of events
    pub fn from_events<I>(config: DtmConfig, events: I) -> Result<Self>
    where
        I: IntoIterator<Item = BuildEvent>,
    {
        let document = Self::new(config)?;
        for event in events {
            document.push(event)?;
        }
        document.finish()?;
        Ok(document)
    }

    /// Document that builds itself from `source` as reads demand it
    pub fn incremental<S>(config: DtmConfig, source: S) -> Result<Self>
    where
        S: EventSource + 'static,
    {
        let document = Self::new(config)?;
        document.set_incremental_source(source)?;
        Ok(document)
    }

    #[inline]
    pub fn config(&self) -> &DtmConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Apply one event directly (non-incremental construction)
    pub fn push(&self, event: BuildEvent) -> Result<()> {
        let mut pull = self.pull.try_borrow_mut().map_err(|_| {
            DtmError::Protocol("event pushed while a demand is outstanding".to_string())
        })?;
        if pull.source.is_some() {
            return Err(DtmError::Protocol(
                "events cannot be pushed while an incremental source is attached".to_string(),
            ));
        }
        let registry = self.registry.borrow();
        let mut data = self.data.try_borrow_mut().map_err(|_| {
            DtmError::Protocol("event pushed while the store is being read".to_string())
        })?;

        let result = pull.builder.apply(&mut data, &registry, event);
        if let Err(err) = &result {
            log::error!("construction failed: {err}");
            pull.builder.freeze(&mut data, &registry);
        }
        result
    }

    /// End construction, supplying the end-of-document event if it is missing
    pub fn finish(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        self.push(BuildEvent::EndDocument)
    }

    /// Drain `source` to completion
    pub fn build_from<S: EventSource>(&self, mut source: S) -> Result<()> {
        loop {
            match source.next_event() {
                Ok(Some(event)) => self.push(event)?,
                Ok(None) => return self.finish(),
                Err(err) => {
                    log::error!("event source failed: {err}");
                    self.freeze();
                    return Err(err);
                }
            }
        }
    }

    /// Attach the source that incremental reads pull from
    pub fn set_incremental_source<S>(&self, source: S) -> Result<()>
    where
        S: EventSource + 'static,
    {
        let mut pull = self.pull.try_borrow_mut().map_err(|_| {
            DtmError::Protocol("source attached during an outstanding demand".to_string())
        })?;
        if self.is_complete() {
            return Err(DtmError::Protocol("document is already complete".to_string()));
        }
        pull.source = Some(Box::new(source));
        Ok(())
    }

    /// Ask the producer for one more event (`want_more = true`), or withdraw
    /// and freeze the store at its current size (`want_more = false`).
    ///
    /// A producer failure is reported here exactly once; afterwards the store
    /// is frozen and reports [`Progress::Exhausted`].
    pub fn demand_more(&self, want_more: bool) -> Result<Progress> {
        if !want_more {
            self.withdraw();
            return Ok(Progress::Exhausted);
        }
        if self.pull.try_borrow_mut().is_err() {
            self.protocol_fault.set(true);
            return Err(DtmError::Protocol(
                "demand issued while another demand is outstanding".to_string(),
            ));
        }
        if !self.is_complete() && !self.pull_event() {
            return Err(DtmError::Protocol(
                "no incremental source attached".to_string(),
            ));
        }
        if let Some(err) = self.pull.borrow_mut().failure.take() {
            return Err(err);
        }
        Ok(if self.is_complete() {
            Progress::Exhausted
        } else {
            Progress::MoreAvailable
        })
    }

    /// Construction has ended (normally, by withdrawal, or by failure)
    pub fn is_complete(&self) -> bool {
        self.data.borrow().complete
    }

    /// Whether `identity` has been built. Never triggers construction.
    pub fn is_built(&self, identity: NodeId) -> bool {
        identity < NOT_PROCESSED && self.data.borrow().is_built(identity)
    }

    /// Number of nodes built so far, the Document included
    pub fn node_count(&self) -> u32 {
        self.data.borrow().records.slots_used() + 1
    }

    /// Failure recorded by the last construction step, if not yet reported
    pub fn construction_error(&self) -> Option<DtmError> {
        self.pull.try_borrow().ok()?.failure.clone()
    }

    fn freeze(&self) {
        if let Ok(mut pull) = self.pull.try_borrow_mut() {
            let registry = self.registry.borrow();
            let mut data = self.data.borrow_mut();
            pull.builder.freeze(&mut data, &registry);
        }
    }

    fn withdraw(&self) {
        let Ok(mut pull) = self.pull.try_borrow_mut() else {
            log::error!("withdrawal requested during an outstanding demand");
            self.protocol_fault.set(true);
            return;
        };
        if let Some(mut source) = pull.source.take() {
            source.stop();
        }
        let registry = self.registry.borrow();
        let mut data = self.data.borrow_mut();
        if !data.complete {
            log::debug!(
                "construction withdrawn at {} nodes",
                data.records.slots_used() + 1
            );
        }
        pull.builder.freeze(&mut data, &registry);
    }

    /// Deliver one event from the incremental source.
    ///
    /// Returns `false` when nothing could be delivered: construction is over,
    /// there is no source, or a demand is already in progress.
    fn pull_event(&self) -> bool {
        if self.data.borrow().complete {
            return false;
        }
        let Ok(mut guard) = self.pull.try_borrow_mut() else {
            log::error!("nested construction demand");
            self.protocol_fault.set(true);
            return false;
        };
        let pull = &mut *guard;
        let Some(source) = pull.source.as_mut() else {
            return false;
        };
        let outcome = source.next_event();

        let registry = self.registry.borrow();
        let Ok(mut data) = self.data.try_borrow_mut() else {
            self.protocol_fault.set(true);
            return false;
        };
        let result = match outcome {
            Ok(Some(event)) => {
                log::trace!("demand delivered {event:?}");
                pull.builder.apply(&mut data, &registry, event)
            }
            // Stream ended: close the document, failing if elements are open
            Ok(None) => pull.builder.apply(&mut data, &registry, BuildEvent::EndDocument),
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            log::error!("construction failed: {err}");
            pull.failure = Some(err);
            pull.builder.freeze(&mut data, &registry);
        } else if self.protocol_fault.get() {
            pull.failure = Some(DtmError::Protocol(
                "construction re-entered during a demand".to_string(),
            ));
            pull.builder.freeze(&mut data, &registry);
        }
        if data.complete {
            if let Some(mut source) = pull.source.take() {
                source.stop();
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Registry hooks and handle addressing
    // ------------------------------------------------------------------

    #[inline]
    fn identity_mask(&self) -> u32 {
        (1u32 << self.config.identity_bits) - 1
    }

    /// Registry this document currently mints handles from
    pub fn registry(&self) -> SharedRegistry {
        self.registry.borrow().clone()
    }

    /// Called once the document has been adopted by a registry
    pub fn document_registration(&self) {
        let data = self.data.borrow();
        log::debug!(
            "document {:?} registered with store id(s) {:?}",
            data.key,
            data.store_ids
        );
    }

    /// Withdraw construction and give every store id back to the registry.
    /// Handles minted by this document stop resolving.
    pub fn document_release(&self) {
        self.withdraw();
        let mut data = self.data.borrow_mut();
        if data.released {
            return;
        }
        let freed = self.registry.borrow().borrow_mut().release(data.key);
        data.released = true;
        data.store_ids.clear();
        log::debug!("document {:?} released {freed} store id(s)", data.key);
    }

    /// Move this document to `registry`. Every identity range is registered
    /// afresh there, so handles change while identities stay put.
    pub fn migrate_owner(&self, registry: SharedRegistry) -> Result<()> {
        let identity_bits = registry.borrow().identity_bits();
        if identity_bits != self.config.identity_bits {
            return Err(DtmError::InvalidConfig(format!(
                "cannot migrate to a registry with {identity_bits} identity bits"
            )));
        }
        let mut data = self.data.borrow_mut();
        // store_ids is empty after a release; the highest identity decides
        let ranges = ((data.records.slots_used() >> identity_bits) + 1) as usize;

        let old = self.registry.replace(Rc::clone(&registry));
        if !data.released {
            old.borrow_mut().release(data.key);
        }

        let mut reg = registry.borrow_mut();
        let key = reg.register_document();
        let mut store_ids = Vec::with_capacity(ranges);
        for range in 0..ranges {
            let assigned = reg
                .first_free_id()
                .ok_or(DtmError::StoreIdsExhausted { identity_bits })
                .and_then(|id| {
                    reg.add_store(key, id, (range as u32) << identity_bits)
                        .map(|()| id)
                });
            match assigned {
                Ok(id) => store_ids.push(id),
                Err(err) => {
                    reg.release(key);
                    data.released = true;
                    data.store_ids.clear();
                    log::error!("migration failed, document left unregistered: {err}");
                    return Err(err);
                }
            }
        }
        data.key = key;
        data.store_ids = store_ids;
        data.released = false;
        log::debug!("document migrated to store id(s) {:?}", data.store_ids);
        Ok(())
    }

    /// Handle for an identity, `None` for NULL or unassigned ranges
    pub fn make_node_handle(&self, identity: NodeId) -> Option<NodeHandle> {
        if identity >= NOT_PROCESSED {
            return None;
        }
        let data = self.data.borrow();
        let bits = self.config.identity_bits;
        let store_id = *data.store_ids.get((identity >> bits) as usize)?;
        Some((store_id << bits) | (identity & self.identity_mask()))
    }

    /// Identity for a handle, `None` when the handle was minted elsewhere
    pub fn make_node_identity(&self, handle: NodeHandle) -> Option<NodeId> {
        if handle >= NOT_PROCESSED {
            return None;
        }
        let data = self.data.borrow();
        if data.released {
            return None;
        }
        let store_id = handle >> self.config.identity_bits;
        let slot = self.registry.borrow().borrow().resolve(store_id);
        match slot {
            Some(slot) if slot.owner == data.key => Some(slot.offset | (handle & self.identity_mask())),
            _ => {
                log::warn!("handle {handle:#x} does not belong to document {:?}", data.key);
                None
            }
        }
    }

    /// Proxy node for a handle; foreign handles are rejected loudly
    pub fn node(&self, handle: NodeHandle) -> Result<NodeRef<'_, Self>> {
        match self.make_node_identity(handle) {
            Some(_) => Ok(NodeRef::new(self, handle)),
            None => Err(DtmError::ForeignHandle { handle }),
        }
    }

    #[inline]
    pub(crate) fn handle_of(&self, identity: NodeId) -> Option<NodeHandle> {
        if identity == NULL {
            None
        } else {
            self.make_node_handle(identity)
        }
    }

    // ------------------------------------------------------------------
    // Identity-level navigation primitives (lazy)
    // ------------------------------------------------------------------

    /// Copy of a record, building more of the document when it is not there
    /// yet. `None` once construction has ended without reaching it.
    pub(crate) fn record(&self, id: NodeId) -> Option<Record> {
        if id >= NOT_PROCESSED {
            return None;
        }
        loop {
            {
                let data = self.data.borrow();
                if data.is_built(id) {
                    return Some(data.raw_record(id));
                }
                if data.complete {
                    return None;
                }
            }
            if !self.pull_event() {
                return None;
            }
        }
    }

    #[inline]
    pub(crate) fn kind_of(&self, id: NodeId) -> Option<NodeType> {
        self.record(id)
            .and_then(|r| NodeType::from_code(kind_code(r[FIELD_TYPE])))
    }

    #[inline]
    pub(crate) fn exptype_of(&self, id: NodeId) -> u32 {
        self.record(id)
            .map_or(NULL, |r| DocumentData::exptype_of_record(&r))
    }

    #[inline]
    pub(crate) fn parent_of(&self, id: NodeId) -> NodeId {
        self.record(id).map_or(NULL, |r| r[FIELD_PARENT])
    }

    /// Resolve a word that may still read NOT_PROCESSED
    fn resolved_field(&self, id: NodeId, field: usize) -> u32 {
        loop {
            let value = self.data.borrow().records.read_field(id, field);
            if value != NOT_PROCESSED {
                return value;
            }
            if !self.pull_event() {
                return NULL;
            }
        }
    }

    /// First record after `id`'s attribute and namespace block
    fn first_after_attached(&self, id: NodeId) -> NodeId {
        let mut k = id + 1;
        loop {
            match self.kind_of(k) {
                Some(kind) if kind.is_attached() => k += 1,
                Some(_) => return k,
                None => return NULL,
            }
        }
    }

    pub(crate) fn first_child_of(&self, id: NodeId) -> NodeId {
        if !matches!(self.kind_of(id), Some(NodeType::Element | NodeType::Document)) {
            return NULL;
        }
        let candidate = self.first_after_attached(id);
        if candidate != NULL && self.parent_of(candidate) == id {
            candidate
        } else {
            NULL
        }
    }

    pub(crate) fn next_sibling_of(&self, id: NodeId) -> NodeId {
        let Some(record) = self.record(id) else {
            return NULL;
        };
        match NodeType::from_code(kind_code(record[FIELD_TYPE])) {
            Some(NodeType::Element) => self.resolved_field(id, FIELD_NEXT),
            Some(kind) if kind.is_leaf() => match self.record(id + 1) {
                Some(next)
                    if next[FIELD_PARENT] == record[FIELD_PARENT]
                        && !NodeType::from_code(kind_code(next[FIELD_TYPE]))
                            .is_some_and(NodeType::is_attached) =>
                {
                    id + 1
                }
                _ => NULL,
            },
            _ => NULL,
        }
    }

    pub(crate) fn prev_sibling_of(&self, id: NodeId) -> NodeId {
        match self.kind_of(id) {
            None | Some(NodeType::Document) => return NULL,
            Some(kind) if kind.is_attached() => return NULL,
            _ => {}
        }
        let parent = self.parent_of(id);
        let mut child = self.first_child_of(parent);
        let mut previous = NULL;
        while child != NULL && child != id {
            previous = child;
            child = self.next_sibling_of(child);
        }
        if child == id { previous } else { NULL }
    }

    pub(crate) fn last_child_of(&self, id: NodeId) -> NodeId {
        let mut child = self.first_child_of(id);
        let mut last = NULL;
        while child != NULL {
            last = child;
            child = self.next_sibling_of(child);
        }
        last
    }

    pub(crate) fn first_attribute_of(&self, id: NodeId) -> NodeId {
        if self.kind_of(id) != Some(NodeType::Element) {
            return NULL;
        }
        let mut k = id + 1;
        loop {
            match self.kind_of(k) {
                Some(NodeType::Namespace) => k += 1,
                Some(NodeType::Attribute) => return k,
                _ => return NULL,
            }
        }
    }

    pub(crate) fn next_attribute_of(&self, id: NodeId) -> NodeId {
        if self.kind_of(id) != Some(NodeType::Attribute) {
            return NULL;
        }
        if self.kind_of(id + 1) == Some(NodeType::Attribute) {
            id + 1
        } else {
            NULL
        }
    }

    /// First namespace node physically attached to `id`
    pub(crate) fn first_decl_of(&self, id: NodeId) -> NodeId {
        if self.kind_of(id) == Some(NodeType::Element) && self.kind_of(id + 1) == Some(NodeType::Namespace) {
            id + 1
        } else {
            NULL
        }
    }

    pub(crate) fn next_decl_of(&self, id: NodeId) -> NodeId {
        if self.kind_of(id) == Some(NodeType::Namespace) && self.kind_of(id + 1) == Some(NodeType::Namespace) {
            id + 1
        } else {
            NULL
        }
    }

    /// Namespace declarations in scope at an element
    pub(crate) fn scope_of(&self, element: NodeId) -> Vec<ScopeEntry> {
        if self.kind_of(element) != Some(NodeType::Element) {
            return Vec::new();
        }
        // Makes every declaration on the element itself visible
        self.first_after_attached(element);

        let data = self.data.borrow();
        let records = &data.records;
        let parent_of = |n: NodeId| records.read_field(n, FIELD_PARENT);
        let uppermost = if records.slots_used() > 0 { 1 } else { DOCUMENT_ID };
        data.scopes
            .find_scope(element, &parent_of, uppermost)
            .map(<[ScopeEntry]>::to_vec)
            .unwrap_or_default()
    }

    pub(crate) fn level_of(&self, id: NodeId) -> u32 {
        if self.record(id).is_none() {
            return 0;
        }
        self.data.borrow().raw_level(id)
    }

    /// Whether every node of `root`'s subtree has been built
    pub(crate) fn subtree_complete(&self, root: NodeId) -> bool {
        let data = self.data.borrow();
        if data.complete {
            return true;
        }
        if root == DOCUMENT_ID || !data.is_built(root) {
            return false;
        }
        let record = data.raw_record(root);
        kind_code(record[FIELD_TYPE]) != NodeType::Element.code() || record[FIELD_NEXT] != NOT_PROCESSED
    }

    #[inline]
    pub(crate) fn index_enabled(&self) -> bool {
        self.config.index_elements
    }

    /// Next indexed element of `exptype` at or after `from`, building more
    /// while `root`'s subtree is still open
    pub(crate) fn next_indexed(&self, exptype: u32, from: NodeId, root: NodeId) -> NodeId {
        loop {
            let found = self
                .data
                .borrow()
                .elements
                .as_ref()
                .and_then(|index| index.find_from(exptype, from));
            if let Some(id) = found {
                return id;
            }
            if self.subtree_complete(root) || !self.pull_event() {
                return NULL;
            }
        }
    }

    pub(crate) fn special_find(&self, start: NodeId, candidate: NodeId) -> Option<NodeId> {
        self.data.borrow().records.special_find(start, candidate)
    }

    /// Node-type test shared by every typed axis
    pub(crate) fn matches_type(&self, id: NodeId, required: u32) -> bool {
        if required >= NTYPES {
            self.exptype_of(id) == required
        } else {
            self.kind_of(id).map(NodeType::code) == Some(required)
        }
    }

    fn string_value_of(&self, id: NodeId) -> String {
        let Some(record) = self.record(id) else {
            return String::new();
        };
        match NodeType::from_code(kind_code(record[FIELD_TYPE])) {
            Some(NodeType::Element | NodeType::Document) => {
                let mut out = String::new();
                let mut current = self.first_child_of(id);
                if current == NULL {
                    return out;
                }
                while let Some(r) = self.record(current) {
                    let parent = r[FIELD_PARENT];
                    if parent == NULL || parent < id {
                        break;
                    }
                    if matches!(
                        NodeType::from_code(kind_code(r[FIELD_TYPE])),
                        Some(NodeType::Text | NodeType::CDataSection)
                    ) {
                        if let Some(text) = self.data.borrow().own_text(&r) {
                            out.push_str(text);
                        }
                    }
                    current += 1;
                }
                out
            }
            _ => self
                .data
                .borrow()
                .own_text(&record)
                .unwrap_or("")
                .to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Names and lookups
    // ------------------------------------------------------------------

    /// Intern an expanded type (used to build typed axis tests)
    pub fn expanded_type_id(&self, namespace: &str, local_name: &str, kind: NodeType) -> u32 {
        self.data.borrow_mut().names.intern(namespace, local_name, kind)
    }

    /// Search-only variant of [`Document::expanded_type_id`]
    pub fn lookup_expanded_type(&self, namespace: &str, local_name: &str, kind: NodeType) -> Option<u32> {
        self.data.borrow().names.lookup(namespace, local_name, kind)
    }

    /// Expanded type of a node
    pub fn expanded_type(&self, node: NodeHandle) -> Option<u32> {
        let id = self.make_node_identity(node)?;
        Some(self.exptype_of(id)).filter(|&t| t != NULL)
    }

    pub fn kind_of_type(&self, exptype: u32) -> Option<NodeType> {
        self.data.borrow().names.kind_of(exptype)
    }

    pub fn namespace_of_type(&self, exptype: u32) -> Option<String> {
        self.data.borrow().names.namespace_of(exptype).map(str::to_string)
    }

    pub fn local_name_of_type(&self, exptype: u32) -> Option<String> {
        self.data.borrow().names.local_name_of(exptype).map(str::to_string)
    }

    /// Depth of a node; the Document is level 0
    pub fn level(&self, node: NodeHandle) -> Option<u32> {
        let id = self.make_node_identity(node)?;
        self.record(id)?;
        Some(self.level_of(id))
    }

    /// Whether `second` is at or after `first` in document order
    pub fn is_node_after(&self, first: NodeHandle, second: NodeHandle) -> bool {
        match (self.make_node_identity(first), self.make_node_identity(second)) {
            (Some(a), Some(b)) => a <= b,
            _ => false,
        }
    }

    /// Base URI of the document entity, `None` when unknown
    pub fn document_base_uri(&self) -> Option<String> {
        self.base_uri.borrow().clone()
    }

    pub fn set_document_base_uri(&self, uri: Option<&str>) {
        *self.base_uri.borrow_mut() = uri.map(str::to_string);
    }

    /// Whether `node` is a text child of an element made only of XML
    /// whitespace. CDATA sections never count.
    pub fn is_character_element_content_whitespace(&self, node: NodeHandle) -> bool {
        let Some(id) = self.make_node_identity(node) else {
            return false;
        };
        let Some(record) = self.record(id) else {
            return false;
        };
        if NodeType::from_code(kind_code(record[FIELD_TYPE])) != Some(NodeType::Text) {
            return false;
        }
        if self.kind_of(record[FIELD_PARENT]) != Some(NodeType::Element) {
            return false;
        }
        let span = Span::new(record[FIELD_TEXT_OFFSET], record[FIELD_TEXT_LEN]);
        self.data.borrow().text.is_whitespace(span)
    }

    /// Element owning the ID attribute with this value
    pub fn element_by_id(&self, value: &str) -> Option<NodeHandle> {
        loop {
            let (found, complete) = {
                let data = self.data.borrow();
                (data.ids.get(value).copied(), data.complete)
            };
            if let Some(id) = found {
                return self.handle_of(id);
            }
            if complete || !self.pull_event() {
                return None;
            }
        }
    }

    /// Namespace nodes in scope at an element, in declaration order
    pub fn namespace_scope(&self, element: NodeHandle) -> Vec<NodeHandle> {
        let Some(id) = self.make_node_identity(element) else {
            return Vec::new();
        };
        self.scope_of(id)
            .into_iter()
            .filter_map(|entry| self.handle_of(entry.node))
            .collect()
    }

    fn data_ref(&self) -> Ref<'_, DocumentData> {
        self.data.borrow()
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        let data = self.data.get_mut();
        if data.released {
            return;
        }
        if let Ok(mut registry) = self.registry.get_mut().try_borrow_mut() {
            registry.release(data.key);
        }
    }
}

// ============================================================================
// Tree-view surface
// ============================================================================

impl DocumentAccess for Document {
    fn document_root(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.make_node_identity(node)?;
        self.handle_of(DOCUMENT_ID)
    }

    fn document_element(&self) -> Option<NodeHandle> {
        loop {
            let (element, complete) = {
                let data = self.data.borrow();
                (data.document_element, data.complete)
            };
            if element != NULL {
                return self.handle_of(element);
            }
            if complete || !self.pull_event() {
                return None;
            }
        }
    }

    fn node_type(&self, node: NodeHandle) -> Option<NodeType> {
        self.kind_of(self.make_node_identity(node)?)
    }

    fn node_name(&self, node: NodeHandle) -> String {
        let Some(id) = self.make_node_identity(node) else {
            return String::new();
        };
        match self.record(id) {
            Some(record) => self.data_ref().node_name(id, &record),
            None => String::new(),
        }
    }

    fn local_name(&self, node: NodeHandle) -> String {
        let Some(id) = self.make_node_identity(node) else {
            return String::new();
        };
        match self.record(id) {
            Some(record) => self.data_ref().local_name(&record),
            None => String::new(),
        }
    }

    fn prefix(&self, node: NodeHandle) -> String {
        let Some(id) = self.make_node_identity(node) else {
            return String::new();
        };
        match self.kind_of(id) {
            Some(NodeType::Namespace) => {
                if self.local_name(node).is_empty() {
                    String::new()
                } else {
                    "xmlns".to_string()
                }
            }
            Some(NodeType::Element | NodeType::Attribute) => self.data_ref().prefix_of(id).to_string(),
            _ => String::new(),
        }
    }

    fn namespace_uri(&self, node: NodeHandle) -> Option<String> {
        let id = self.make_node_identity(node)?;
        let record = self.record(id)?;
        self.data_ref().namespace_uri(&record)
    }

    fn node_value(&self, node: NodeHandle) -> Option<String> {
        let id = self.make_node_identity(node)?;
        let record = self.record(id)?;
        self.data_ref().own_text(&record).map(str::to_string)
    }

    fn string_value(&self, node: NodeHandle) -> String {
        match self.make_node_identity(node) {
            Some(id) => self.string_value_of(id),
            None => String::new(),
        }
    }

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.handle_of(self.parent_of(self.make_node_identity(node)?))
    }

    fn first_child(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.handle_of(self.first_child_of(self.make_node_identity(node)?))
    }

    fn last_child(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.handle_of(self.last_child_of(self.make_node_identity(node)?))
    }

    fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.handle_of(self.next_sibling_of(self.make_node_identity(node)?))
    }

    fn previous_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.handle_of(self.prev_sibling_of(self.make_node_identity(node)?))
    }

    fn first_attribute(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.handle_of(self.first_attribute_of(self.make_node_identity(node)?))
    }

    fn next_attribute(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.handle_of(self.next_attribute_of(self.make_node_identity(node)?))
    }

    fn attribute_node(&self, element: NodeHandle, namespace: Option<&str>, local_name: &str) -> Option<NodeHandle> {
        let element = self.make_node_identity(element)?;
        let mut attr = self.first_attribute_of(element);
        // Resolve after the first scan so the attribute names are interned
        let wanted = self.lookup_expanded_type(namespace.unwrap_or(""), local_name, NodeType::Attribute)?;
        while attr != NULL {
            if self.exptype_of(attr) == wanted {
                return self.handle_of(attr);
            }
            attr = self.next_attribute_of(attr);
        }
        None
    }

    fn first_namespace_node(&self, element: NodeHandle, in_scope: bool) -> Option<NodeHandle> {
        let id = self.make_node_identity(element)?;
        if in_scope {
            let first = self.scope_of(id).first()?.node;
            self.handle_of(first)
        } else {
            self.handle_of(self.first_decl_of(id))
        }
    }

    fn next_namespace_node(&self, element: NodeHandle, current: NodeHandle, in_scope: bool) -> Option<NodeHandle> {
        let id = self.make_node_identity(element)?;
        let current = self.make_node_identity(current)?;
        if in_scope {
            let scope = self.scope_of(id);
            let at = scope.iter().position(|e| e.node == current)?;
            self.handle_of(scope.get(at + 1)?.node)
        } else {
            self.handle_of(self.next_decl_of(current))
        }
    }
}
