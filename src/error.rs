//! Error types
//!
//! One enum covers every failure the store can report:
//! - Configuration and addressing faults (caller contract violations)
//! - Construction failures (malformed event streams, producer errors)
//! - Handoff protocol violations
//! - Attempted mutation through the read-only tree view
//!
//! "Not found" is never an error. Lookups return `Option` instead.

use thiserror::Error;

/// Errors raised by the document table model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DtmError {
    /// RecordStore asked for a record width it cannot lay out in blocks
    #[error("invalid record width {width}: must be a power of two no larger than the block size ({block})")]
    InvalidRecordWidth { width: usize, block: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The registry has no store id left to hand out
    #[error("no free store id left in the registry (identity bits = {identity_bits})")]
    StoreIdsExhausted { identity_bits: u8 },

    /// A handle minted by another document was presented to this one
    #[error("handle {handle:#x} does not belong to this document")]
    ForeignHandle { handle: u32 },

    #[error("operation not permitted on read-only view: {0}")]
    ReadOnly(&'static str),

    /// The event stream broke nesting or ordering rules
    #[error("malformed event stream: {0}")]
    MalformedEvents(String),

    /// The upstream producer failed (I/O, parse error, panic)
    #[error("event source failed: {0}")]
    Source(String),

    /// The consumer withdrew its demand; the producer should stop
    #[error("construction withdrawn by the consumer")]
    Withdrawn,

    #[error("handoff protocol violation: {0}")]
    Protocol(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, DtmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DtmError::ForeignHandle { handle: 0x10005 };
        assert_eq!(err.to_string(), "handle 0x10005 does not belong to this document");

        let err = DtmError::ReadOnly("append_child");
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_read_only_distinct_from_not_found() {
        // Mutation failures carry their own variant; lookups never produce one.
        let err = DtmError::ReadOnly("set_node_value");
        assert!(matches!(err, DtmError::ReadOnly(_)));
        assert_ne!(err, DtmError::Withdrawn);
    }
}
