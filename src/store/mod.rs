//! Store Module - raw storage for one document
//!
//! - `RecordStore`: chunked fixed-width integer records
//! - `TextBuffer`: shared character data
//! - `Span`: `(offset, len)` into the character data

pub mod records;
pub mod span;
pub mod text;

pub use records::{RecordStore, RECORD_WIDTH};
pub use span::Span;
pub use text::TextBuffer;
