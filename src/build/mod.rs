//! Build Module - incremental construction
//!
//! - `BuildEvent`: structural events a document is built from
//! - `EventSource`: pull-side producer, same-thread or threaded
//! - `TreeBuilder`: applies events to a document's storage

pub(crate) mod builder;
pub mod events;
pub mod source;

pub(crate) use builder::TreeBuilder;
pub use events::{split_qname, AttributeEvent, BuildEvent};
pub use source::{EventSink, EventSource, IterSource, ThreadedSource};

/// Outcome of one construction demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The store grew and more events may follow
    MoreAvailable,
    /// Construction has ended; the store will not grow again
    Exhausted,
}
