//! RustyDTM - table-backed document model with lazy construction
//!
//! Layers:
//! A: Record storage (store): chunked fixed-width records plus character data
//! B: Names (names): symbol tables and expanded-type interning
//! C: Construction (build): events, sources, incremental pull handoff
//! D: Document (dom): handles, navigation primitives, namespace scopes
//! E: Axes (axes): stateless traversers and stateful iterators
//!
//! ```
//! use rustydtm::{Axis, BuildEvent, Document, DocumentAccess, DtmConfig};
//!
//! let doc = Document::from_events(
//!     DtmConfig::default(),
//!     vec![
//!         BuildEvent::start("a"),
//!         BuildEvent::start("b"),
//!         BuildEvent::EndElement,
//!         BuildEvent::text("hi"),
//!         BuildEvent::EndElement,
//!     ],
//! )
//! .unwrap();
//!
//! let a = doc.document_element().unwrap();
//! assert_eq!(doc.axis_nodes(Axis::Child, a).len(), 2);
//! assert_eq!(doc.string_value(a), "hi");
//! ```

pub mod axes;
pub mod build;
pub mod config;
pub mod dom;
pub mod error;
pub mod index;
pub mod names;
pub mod registry;
pub mod store;

#[cfg(test)]
mod testing;

pub use axes::{Axis, AxisIterator, AxisTraverser};
pub use build::{AttributeEvent, BuildEvent, EventSink, EventSource, IterSource, Progress, ThreadedSource};
pub use config::DtmConfig;
pub use dom::{Document, DocumentAccess, NodeHandle, NodeId, NodeRef, NodeType};
pub use error::{DtmError, Result};
pub use registry::{HandleRegistry, SharedRegistry};
